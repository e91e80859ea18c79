use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Pixel};
use img_hash::{HashAlg, HasherConfig};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::FingerprintError;
use crate::evidence::DocumentDigest;

/// 左上角裁剪窗口边长 (px)
pub const CROP_SIZE: u32 = 250;
/// 降采样后的边长 (px)
pub const SAMPLE_SIZE: u32 = 64;

/// Logo 指纹：16 字节 MD5 摘要。
///
/// 只做精确匹配：两张图当且仅当指纹逐位相同时才算“同一个 logo”。
/// 裁剪位置、缩放、颜色只要有变化，指纹就会变。这是刻意的脆弱性，不要改成相似度。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 计算 logo 指纹
///
/// 流程：裁剪左上角 250×250 -> 灰度化 -> 降采样到 64×64 -> MD5(原始像素字节)。
///
/// 图片不足 250×250 时，窗口超出部分用黑色 (亮度 0) 填充，
/// 保证窗口始终是锚定在左上角的正方形，指纹含义不变。
///
/// 注意：灰度用 Rec.709 权重、降采样用 Triangle 滤波，与 PIL (Rec.601 + bicubic) 不同，
/// 其它系统导出的指纹库不能直接复用，必须从 logo 原图重建。
pub fn logo_fingerprint(img: &DynamicImage) -> Fingerprint {
    let (width, height) = img.dimensions();
    let mut window = GrayImage::new(CROP_SIZE, CROP_SIZE);
    for y in 0..height.min(CROP_SIZE) {
        for x in 0..width.min(CROP_SIZE) {
            window.put_pixel(x, y, img.get_pixel(x, y).to_luma());
        }
    }

    let sampled: image::ImageBuffer<Luma<u8>, Vec<u8>> =
        imageops::resize(&window, SAMPLE_SIZE, SAMPLE_SIZE, FilterType::Triangle);

    Fingerprint(md5::compute(sampled.as_raw()).0)
}

/// 从磁盘解码一张参考图片并计算指纹
pub fn fingerprint_file(path: &Path) -> Result<Fingerprint, FingerprintError> {
    let bytes = std::fs::read(path)?;
    let img = image::load_from_memory(&bytes)?;
    Ok(logo_fingerprint(&img))
}

/// 上传文件的审计摘要
///
/// - SHA256：原始字节完整性，任何一个字节变化都会雪崩。
/// - 梯度 pHash：仅图片有，用于人工核对“内容同一性”，不参与任何判定。
pub fn document_digest(bytes: &[u8], img: Option<&DynamicImage>) -> DocumentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let sha256 = format!("{:x}", hasher.finalize());

    let perceptual_hash = img.map(|img| {
        let hasher = HasherConfig::new()
            .hash_alg(HashAlg::Gradient)
            .hash_size(8, 8)
            .to_hasher();
        hasher.hash_image(img).to_base64()
    });

    DocumentDigest {
        sha256,
        perceptual_hash,
    }
}
