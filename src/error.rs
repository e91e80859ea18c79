//! 错误分类 (Error Taxonomy)
//!
//! - `PreconditionError`: 请求在进入任何检查之前就被拒绝（类型不支持 / 文件过大 / 请求残缺）。
//! - `FingerprintError` / `NoiseError` / `MetadataError`: 单个度量函数执行失败。
//! - `CheckError`: 编排器把上面的度量失败统一收口，记录为 CheckFailure，绝不算作伪造信号。

use std::io;

use image::ImageError;
use thiserror::Error;

/// 请求前置条件不满足
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreconditionError {
    #[error("missing filename")]
    MissingFilename,

    #[error("unsupported file type: {0:?}")]
    UnsupportedType(String),

    #[error("empty upload")]
    Empty,

    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },
}

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("image decode error: {0}")]
    Image(#[from] ImageError),
}

/// 重压缩噪声分析失败（临时文件 I/O 或编解码）
#[derive(Error, Debug)]
pub enum NoiseError {
    #[error("scratch file error: {0}")]
    Io(#[from] io::Error),

    #[error("re-encode error: {0}")]
    Image(#[from] ImageError),
}

/// PDF 结构损坏。字段缺失不是错误。
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("corrupt PDF structure: {0}")]
    Corrupt(String),
}

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("cannot decode image: {0}")]
    Decode(String),

    #[error(transparent)]
    Noise(#[from] NoiseError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
