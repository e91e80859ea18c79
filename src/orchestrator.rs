use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::document::{DocumentType, FileKind, VerificationRequest};
use crate::error::CheckError;
use crate::evidence::{CheckFailure, Finding, VerificationResult};
use crate::fingerprint;
use crate::heuristics::{self, DomainRule};
use crate::metadata;
use crate::recompression;
use crate::registry::LogoRegistry;

/// 噪声分数严格大于该值即视为异常。
///
/// 分数是 q95 重压缩差值图的灰度标准差：纯色或大色块的扫描件接近 0，
/// 1px 棋盘格约 0.8，未经压缩的随机噪声约 1.5。
pub const NOISE_THRESHOLD: f64 = 1.0;
/// 解码前按图片头声明的尺寸做像素预算，超过即不解码
pub const MAX_IMAGE_PIXELS: u64 = 40_000_000;
/// 创建年份晚于该年即视为“未来日期”
pub const FUTURE_YEAR_CUTOFF: u16 = 2030;

/// 检查项执行失败时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// 记录到结果的 `check_failures` 中
    #[default]
    Report,
    /// 仅写日志
    Skip,
}

/// 取证检查项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    DocumentMetadata,
    LogoFingerprint,
    RecompressionNoise,
    DomainRules,
}

impl CheckKind {
    pub fn name(&self) -> &'static str {
        match self {
            CheckKind::DocumentMetadata => "document-metadata",
            CheckKind::LogoFingerprint => "logo-fingerprint",
            CheckKind::RecompressionNoise => "recompression-noise",
            CheckKind::DomainRules => "domain-rules",
        }
    }

    /// 检查项选择表，返回顺序即执行顺序
    pub fn plan(kind: FileKind, document_type: DocumentType) -> &'static [CheckKind] {
        use CheckKind::*;
        match (kind, document_type.is_bank_statement()) {
            (FileKind::Pdf, _) => &[DocumentMetadata, DomainRules],
            (FileKind::ImageJpeg | FileKind::ImagePng, true) => {
                &[LogoFingerprint, RecompressionNoise, DomainRules]
            }
            (FileKind::ImageJpeg | FileKind::ImagePng, false) => &[RecompressionNoise, DomainRules],
        }
    }
}

/// 核验编排器 (Verification Orchestrator)
///
/// **职责**: 按文件类型和声明的文档类型挑选检查项，全部跑完（不短路），汇总成一个结论。
/// 阈值常量和选择表只有这里知道，其余模块都是纯度量函数。
pub struct Verifier {
    registry: Arc<LogoRegistry>,
    rules: Vec<Box<dyn DomainRule>>,
    failure_policy: FailurePolicy,
    scratch_dir: PathBuf,
    noise_threshold: f64,
    max_image_pixels: u64,
}

impl Verifier {
    pub fn new(registry: Arc<LogoRegistry>) -> Self {
        Self {
            registry,
            rules: heuristics::default_rules(),
            failure_policy: FailurePolicy::default(),
            scratch_dir: std::env::temp_dir(),
            noise_threshold: NOISE_THRESHOLD,
            max_image_pixels: MAX_IMAGE_PIXELS,
        }
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn DomainRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn with_noise_threshold(mut self, threshold: f64) -> Self {
        self.noise_threshold = threshold;
        self
    }

    pub fn with_max_image_pixels(mut self, max_pixels: u64) -> Self {
        self.max_image_pixels = max_pixels;
        self
    }

    pub fn registry(&self) -> &LogoRegistry {
        &self.registry
    }

    /// 执行一次完整核验。对合法请求永不失败：单项检查出错只会记录，不会中断其余检查。
    #[instrument(skip_all, fields(kind = ?request.kind(), label = request.claimed_label()))]
    pub fn verify(&self, request: &VerificationRequest) -> VerificationResult {
        let document_type = request.document_type();
        if !document_type.is_known() {
            warn!("⚠️ 未知文档类型 {:?}，结果将判为无效", request.claimed_label());
        }

        // 图片只解码一次，供指纹、噪声、摘要共用
        let decoded = request
            .kind()
            .image_format()
            .map(|format| decode_within_budget(request.bytes(), format, self.max_image_pixels));
        let image = decoded.as_ref().and_then(|d| d.as_ref().ok());

        let mut issues = Vec::new();
        let mut failures = Vec::new();

        for &check in CheckKind::plan(request.kind(), document_type) {
            let outcome = match check {
                CheckKind::DocumentMetadata => {
                    metadata::inspect(request.bytes(), FUTURE_YEAR_CUTOFF).map_err(CheckError::from)
                }
                CheckKind::LogoFingerprint => decoded_image(&decoded).map(|img| self.check_logo(img)),
                CheckKind::RecompressionNoise => {
                    decoded_image(&decoded).and_then(|img| self.check_noise(img))
                }
                CheckKind::DomainRules => Ok(self.check_rules(request, document_type)),
            };

            match outcome {
                Ok(found) => issues.extend(found),
                Err(e) => {
                    warn!("⚠️ 检查 {} 未能完成: {}", check.name(), e);
                    if self.failure_policy == FailurePolicy::Report {
                        failures.push(CheckFailure {
                            check: check.name(),
                            reason: e.to_string(),
                        });
                    }
                }
            }
        }

        let digest = fingerprint::document_digest(request.bytes(), image);
        let result = VerificationResult::new(
            issues,
            failures,
            request.claimed_label().to_string(),
            document_type,
            request.fields().clone(),
            digest,
        );

        info!(
            "✅ 核验完成: forged={}, valid={}, issues={:?}",
            result.is_forged(),
            result.valid(),
            result.issues()
        );
        result
    }

    fn check_logo(&self, img: &DynamicImage) -> Vec<Finding> {
        let fp = fingerprint::logo_fingerprint(img);
        if self.registry.contains(&fp) {
            vec![]
        } else {
            vec![Finding::LogoFingerprintMismatch]
        }
    }

    fn check_noise(&self, img: &DynamicImage) -> Result<Vec<Finding>, CheckError> {
        let score = recompression::noise_score_in(img, &self.scratch_dir)?;
        debug!("🔬 重压缩噪声分数 {:.3}", score);
        Ok(if score > self.noise_threshold {
            vec![Finding::HighRecompressionNoise]
        } else {
            vec![]
        })
    }

    fn check_rules(&self, request: &VerificationRequest, document_type: DocumentType) -> Vec<Finding> {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to(document_type))
            .filter_map(|rule| {
                let found = rule.evaluate(request.fields());
                if let Some(finding) = found {
                    debug!("规则 {} 触发: {}", rule.name(), finding);
                }
                found
            })
            .collect()
    }
}

/// 先只读图片头拿尺寸，超出像素预算直接拒绝，避免解压炸弹在解码时耗尽内存
fn decode_within_budget(bytes: &[u8], format: ImageFormat, max_pixels: u64) -> Result<DynamicImage, String> {
    let (width, height) = image::io::Reader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| e.to_string())?;
    let pixels = u64::from(width) * u64::from(height);
    if pixels > max_pixels {
        return Err(format!(
            "image is {}x{} ({} pixels), over the budget of {} pixels",
            width, height, pixels, max_pixels
        ));
    }
    image::load_from_memory_with_format(bytes, format).map_err(|e| e.to_string())
}

fn decoded_image(
    decoded: &Option<Result<DynamicImage, String>>,
) -> Result<&DynamicImage, CheckError> {
    match decoded {
        Some(Ok(img)) => Ok(img),
        Some(Err(e)) => Err(CheckError::Decode(e.clone())),
        None => Err(CheckError::Decode("not an image".into())),
    }
}
