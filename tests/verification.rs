use docverify_core::{
    fingerprint, FieldMap, FileKind, Finding, LogoRegistry, VerificationRequest, Verifier,
};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, StringFormat};
use std::io::Cursor;
use std::sync::Arc;
use std::thread;

const LIMIT: usize = 10 * 1024 * 1024;

fn encode(img: &RgbImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img.clone())
        .write_to(&mut out, format)
        .unwrap();
    out.into_inner()
}

fn statement_scan() -> RgbImage {
    RgbImage::from_fn(320, 320, |x, y| {
        if x < 128 && y < 64 {
            Rgb([10, 60, 160])
        } else {
            Rgb([245, 245, 245])
        }
    })
}

fn other_logo() -> RgbImage {
    RgbImage::from_pixel(260, 260, Rgb([180, 20, 40]))
}

fn pdf(info: Option<&[(&str, &str)]>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(fields) = info {
        let mut dict = Dictionary::new();
        for (key, value) in fields {
            dict.set(*key, Object::String(value.as_bytes().to_vec(), StringFormat::Literal));
        }
        let info_id = doc.add_object(dict);
        doc.trailer.set("Info", info_id);
    }

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}

fn amount() -> FieldMap {
    FieldMap::from([("Amount".to_string(), "9,624.50".to_string())])
}

#[test]
fn bank_statement_with_unknown_logo() {
    let reference = fingerprint::logo_fingerprint(&DynamicImage::ImageRgb8(other_logo()));
    let registry = LogoRegistry::from_entries(vec![("Acme Bank".to_string(), reference)]);
    let verifier = Verifier::new(Arc::new(registry));

    let request = VerificationRequest::new(
        encode(&statement_scan(), ImageOutputFormat::Png),
        FileKind::ImagePng,
        "bank statement",
        amount(),
        LIMIT,
    )
    .unwrap();
    let result = verifier.verify(&request);

    assert!(result.is_forged());
    assert_eq!(result.issues(), &[Finding::LogoFingerprintMismatch]);
    assert!(!result.valid());
    assert!(result.check_failures().is_empty());

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["is_forged"], true);
    assert_eq!(json["valid"], false);
    assert_eq!(json["issues"], serde_json::json!(["logo fingerprint mismatch"]));
    assert_eq!(json["fields"]["Amount"], "9,624.50");
}

#[test]
fn missing_logo_directory_degrades_to_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let registry = LogoRegistry::build(&dir.path().join("logos"));
    assert!(registry.is_empty());

    let verifier = Verifier::new(Arc::new(registry));
    for scan in [statement_scan(), other_logo()] {
        let request = VerificationRequest::new(
            encode(&scan, ImageOutputFormat::Png),
            FileKind::ImagePng,
            "Bank Statement",
            amount(),
            LIMIT,
        )
        .unwrap();
        assert!(verifier
            .verify(&request)
            .issues()
            .contains(&Finding::LogoFingerprintMismatch));
    }
}

#[test]
fn registry_built_from_directory_recognises_its_logo() {
    let dir = tempfile::tempdir().unwrap();
    DynamicImage::ImageRgb8(statement_scan())
        .save(dir.path().join("acme_bank.png"))
        .unwrap();
    let registry = LogoRegistry::build(dir.path());
    assert!(registry.get("Acme Bank").is_some());

    let verifier = Verifier::new(Arc::new(registry));
    let request = VerificationRequest::new(
        encode(&statement_scan(), ImageOutputFormat::Png),
        FileKind::ImagePng,
        "bank account statement",
        amount(),
        LIMIT,
    )
    .unwrap();
    let result = verifier.verify(&request);

    assert!(!result.is_forged(), "{:?}", result.issues());
    assert!(result.valid());
}

#[test]
fn future_dated_pdf() {
    let verifier = Verifier::new(Arc::new(LogoRegistry::default()));
    let request = VerificationRequest::new(
        pdf(Some(&[("CreationDate", "D:20990101000000Z")])),
        FileKind::Pdf,
        "employee payslip",
        amount(),
        LIMIT,
    )
    .unwrap();
    let result = verifier.verify(&request);

    assert_eq!(result.issues(), &[Finding::FutureCreationDate]);
    assert!(result.is_forged());
    assert!(!result.valid());
}

#[test]
fn pdf_without_info_is_clean() {
    let verifier = Verifier::new(Arc::new(LogoRegistry::default()));
    let request =
        VerificationRequest::new(pdf(None), FileKind::Pdf, "employee payslip", amount(), LIMIT)
            .unwrap();
    let result = verifier.verify(&request);

    assert!(result.issues().is_empty());
    assert!(result.check_failures().is_empty());
    assert!(result.valid());
}

#[test]
fn verification_is_idempotent_and_thread_safe() {
    let verifier = Arc::new(Verifier::new(Arc::new(LogoRegistry::default())));
    let request = Arc::new(
        VerificationRequest::new(
            encode(&statement_scan(), ImageOutputFormat::Jpeg(80)),
            FileKind::ImageJpeg,
            "Bank Statement",
            amount(),
            LIMIT,
        )
        .unwrap(),
    );

    let first = verifier.verify(&request);
    assert_eq!(verifier.verify(&request), first);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let verifier = verifier.clone();
            let request = request.clone();
            thread::spawn(move || verifier.verify(&request))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), first);
    }
}

#[test]
fn forged_flag_tracks_issues() {
    let verifier = Verifier::new(Arc::new(LogoRegistry::default()));
    let mut with_routing = amount();
    with_routing.insert("routing_number".into(), "021000021".into());

    let cases = vec![
        (pdf(None), FileKind::Pdf, "Bank Statement", with_routing.clone()),
        (pdf(Some(&[("Producer", "Word")])), FileKind::Pdf, "1099 tax form", amount()),
        (b"garbage".to_vec(), FileKind::Pdf, "Unknown", FieldMap::new()),
        (
            encode(&other_logo(), ImageOutputFormat::Png),
            FileKind::ImagePng,
            "Bank Statement",
            with_routing,
        ),
    ];

    for (bytes, kind, label, fields) in cases {
        let request = VerificationRequest::new(bytes, kind, label, fields, LIMIT).unwrap();
        let result = verifier.verify(&request);
        assert_eq!(result.is_forged(), !result.issues().is_empty());
        if result.is_forged() {
            assert!(!result.valid());
        }
    }
}
