use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::document::DocumentType;

/// 单条取证信号 (Forensic Finding)
///
/// 只有真正的取证信号才会进入这里。检查本身跑不起来属于 `CheckFailure`，两者绝不混用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finding {
    LogoFingerprintMismatch,
    HighRecompressionNoise,
    FutureCreationDate,
    ProducerIsWordProcessor,
    RoutingNumberUnusual,
}

impl Finding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Finding::LogoFingerprintMismatch => "logo fingerprint mismatch",
            Finding::HighRecompressionNoise => "high recompression noise",
            Finding::FutureCreationDate => "future creation date",
            Finding::ProducerIsWordProcessor => "producer is word processor",
            Finding::RoutingNumberUnusual => "routing number unusual",
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Finding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// 某一项检查未能执行完成（解码失败、PDF 结构损坏、临时文件 I/O ...）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub check: &'static str,
    pub reason: String,
}

/// 上传文件的审计摘要，仅供展示
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentDigest {
    pub sha256: String,
    pub perceptual_hash: Option<String>,
}

/// 核验结论 (Verdict)
///
/// `is_forged` 与 `valid` 都由构造函数推导，外部无法写入，
/// 因此 `is_forged == !issues.is_empty()` 恒成立。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VerificationResult {
    is_forged: bool,
    issues: Vec<Finding>,
    valid: bool,
    document_type: String,
    fields: BTreeMap<String, String>,
    check_failures: Vec<CheckFailure>,
    digest: DocumentDigest,
}

impl VerificationResult {
    pub fn new(
        issues: Vec<Finding>,
        check_failures: Vec<CheckFailure>,
        document_label: String,
        document_type: DocumentType,
        fields: BTreeMap<String, String>,
        digest: DocumentDigest,
    ) -> Self {
        let is_forged = !issues.is_empty();
        let valid = !is_forged && document_type.is_known() && !fields.is_empty();
        Self {
            is_forged,
            issues,
            valid,
            document_type: document_label,
            fields,
            check_failures,
            digest,
        }
    }

    pub fn is_forged(&self) -> bool {
        self.is_forged
    }

    pub fn issues(&self) -> &[Finding] {
        &self.issues
    }

    pub fn valid(&self) -> bool {
        self.valid
    }

    pub fn document_type(&self) -> &str {
        &self.document_type
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn check_failures(&self) -> &[CheckFailure] {
        &self.check_failures
    }

    pub fn digest(&self) -> &DocumentDigest {
        &self.digest
    }
}
