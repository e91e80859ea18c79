//! 文档伪造检测核心 (Document Forgery Detection Core)
//!
//! 启动时构建只读的 logo 指纹库；每个请求跑一组互相独立的取证检查
//! （logo 指纹、重压缩噪声、PDF 元数据、领域规则），汇总成可解释的结论。

pub mod api;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod evidence;
pub mod extractor;
pub mod fingerprint;
pub mod heuristics;
pub mod metadata;
pub mod orchestrator;
pub mod recompression;
pub mod registry;

pub use document::{DocumentType, FieldMap, FileKind, VerificationRequest};
pub use evidence::{CheckFailure, Finding, VerificationResult};
pub use orchestrator::{FailurePolicy, Verifier};
pub use registry::LogoRegistry;
