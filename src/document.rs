use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::PreconditionError;

/// 抽取出的字段：字段名 -> 值
pub type FieldMap = BTreeMap<String, String>;

/// 默认上传大小上限 (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 上传文件类型。闭合枚举，检查项的选择只看这里，不再到处比较扩展名字符串。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    ImageJpeg,
    ImagePng,
    Pdf,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Result<Self, PreconditionError> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Ok(FileKind::ImageJpeg),
            "png" => Ok(FileKind::ImagePng),
            "pdf" => Ok(FileKind::Pdf),
            _ => Err(PreconditionError::UnsupportedType(ext.to_string())),
        }
    }

    pub fn from_filename(name: &str) -> Result<Self, PreconditionError> {
        if name.trim().is_empty() {
            return Err(PreconditionError::MissingFilename);
        }
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| PreconditionError::UnsupportedType(name.to_string()))?;
        Self::from_extension(ext)
    }

    pub fn image_format(&self) -> Option<image::ImageFormat> {
        match self {
            FileKind::ImageJpeg => Some(image::ImageFormat::Jpeg),
            FileKind::ImagePng => Some(image::ImageFormat::Png),
            FileKind::Pdf => None,
        }
    }
}

/// 外部分类器给出的文档类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DocumentType {
    BankStatement,
    W2TaxForm,
    Form1099,
    CellPhoneBill,
    SchoolEnrollment,
    Payslip,
    UtilityWater,
    UtilityElectricity,
    UtilityGas,
    Unknown,
}

impl DocumentType {
    /// 交给分类器的候选标签
    pub const CANDIDATE_LABELS: [&'static str; 9] = [
        "bank account statement",
        "W-2 tax form",
        "cell-phone bill",
        "school-enrollment certificate",
        "employee payslip",
        "1099 tax form",
        "utility bill - water",
        "utility bill - electricity",
        "utility bill - gas",
    ];

    /// 解析分类器输出。大小写、各种连字符、多余空白都会被归一化；
    /// 不认识的标签一律视为 `Unknown`。
    pub fn from_label(label: &str) -> Self {
        let normalized = label
            .to_lowercase()
            .chars()
            .map(|c| match c {
                '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '_' => ' ',
                c => c,
            })
            .collect::<String>();
        let normalized = normalized.split_whitespace().collect::<Vec<_>>().join(" ");

        match normalized.as_str() {
            "bank statement" | "bank account statement" => DocumentType::BankStatement,
            "w 2" | "w2" | "w 2 tax form" | "w2 tax form" => DocumentType::W2TaxForm,
            "1099" | "1099 tax form" => DocumentType::Form1099,
            "cell phone bill" => DocumentType::CellPhoneBill,
            "school enrollment" | "school enrollment certificate" => {
                DocumentType::SchoolEnrollment
            }
            "payslip" | "employee payslip" => DocumentType::Payslip,
            "utility bill water" => DocumentType::UtilityWater,
            "utility bill electricity" => DocumentType::UtilityElectricity,
            "utility bill gas" => DocumentType::UtilityGas,
            _ => DocumentType::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::BankStatement => "bank account statement",
            DocumentType::W2TaxForm => "W-2 tax form",
            DocumentType::Form1099 => "1099 tax form",
            DocumentType::CellPhoneBill => "cell-phone bill",
            DocumentType::SchoolEnrollment => "school-enrollment certificate",
            DocumentType::Payslip => "employee payslip",
            DocumentType::UtilityWater => "utility bill - water",
            DocumentType::UtilityElectricity => "utility bill - electricity",
            DocumentType::UtilityGas => "utility bill - gas",
            DocumentType::Unknown => "Unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        *self != DocumentType::Unknown
    }

    pub fn is_bank_statement(&self) -> bool {
        *self == DocumentType::BankStatement
    }
}

/// 单次核验请求。前置条件（类型、大小、非空）在构造时就检查完。
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    bytes: Vec<u8>,
    kind: FileKind,
    claimed_label: String,
    fields: FieldMap,
}

impl VerificationRequest {
    pub fn new(
        bytes: Vec<u8>,
        kind: FileKind,
        claimed_label: impl Into<String>,
        fields: FieldMap,
        max_bytes: usize,
    ) -> Result<Self, PreconditionError> {
        if bytes.is_empty() {
            return Err(PreconditionError::Empty);
        }
        if bytes.len() > max_bytes {
            return Err(PreconditionError::TooLarge {
                size: bytes.len(),
                limit: max_bytes,
            });
        }
        Ok(Self {
            bytes,
            kind,
            claimed_label: claimed_label.into(),
            fields,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> FileKind {
        self.kind
    }

    pub fn claimed_label(&self) -> &str {
        &self.claimed_label
    }

    pub fn document_type(&self) -> DocumentType {
        DocumentType::from_label(&self.claimed_label)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }
}
