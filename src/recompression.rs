//! 重压缩噪声分析 (Error Level Analysis)
//!
//! 原理：在一次 JPEG 压缩之后被修改过的区域，对第二次压缩的响应与周围不同，
//! 会留下可测的噪声差异。这里只负责“测量”，返回原始分数；阈值由编排器持有。

use image::{DynamicImage, GenericImageView, ImageOutputFormat, Pixel, Rgb, RgbImage};
use std::io::Write;
use std::path::Path;

use crate::error::NoiseError;

/// 重压缩使用的固定 JPEG 质量
pub const RECOMPRESS_QUALITY: u8 = 95;

/// 在系统临时目录下计算噪声分数
pub fn noise_score(img: &DynamicImage) -> Result<f64, NoiseError> {
    noise_score_in(img, &std::env::temp_dir())
}

/// 计算噪声分数，临时文件放在 `scratch_dir` 下
///
/// 1. 拍平成 8-bit RGB；
/// 2. 以固定质量重新编码为 JPEG，写入临时文件；
/// 3. 逐像素、逐通道取绝对差，再把差值图转为灰度；
/// 4. 返回灰度差值的总体标准差。
///
/// 临时文件是 `NamedTempFile`，离开作用域即删除，成功或任何 `?` 提前返回都一样。
pub fn noise_score_in(img: &DynamicImage, scratch_dir: &Path) -> Result<f64, NoiseError> {
    let original = DynamicImage::ImageRgb8(flatten_rgb(img));

    let mut scratch = tempfile::Builder::new()
        .prefix("ela-")
        .suffix(".jpg")
        .tempfile_in(scratch_dir)?;
    original.write_to(
        scratch.as_file_mut(),
        ImageOutputFormat::Jpeg(RECOMPRESS_QUALITY),
    )?;
    scratch.as_file_mut().flush()?;

    let recompressed = image::open(scratch.path())?;

    let levels = original.pixels().filter_map(|(x, y, before)| {
        if x >= recompressed.width() || y >= recompressed.height() {
            return None;
        }
        let after = recompressed.get_pixel(x, y);
        let diff = Rgb([
            before[0].abs_diff(after[0]),
            before[1].abs_diff(after[1]),
            before[2].abs_diff(after[2]),
        ]);
        Some(f64::from(diff.to_luma()[0]))
    });

    Ok(std_dev(levels))
}

/// 丢掉 alpha 通道
fn flatten_rgb(img: &DynamicImage) -> RgbImage {
    let (width, height) = img.dimensions();
    RgbImage::from_fn(width, height, |x, y| img.get_pixel(x, y).to_rgb())
}

// 总体标准差，单遍 Welford 累加，不缓存逐像素的值
fn std_dev(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut count = 0u64;
    let mut mean = 0.0;
    let mut m2 = 0.0;
    for value in values {
        count += 1;
        let delta = value - mean;
        mean += delta / count as f64;
        m2 += delta * (value - mean);
    }
    if count == 0 {
        return 0.0;
    }
    (m2 / count as f64).sqrt()
}
