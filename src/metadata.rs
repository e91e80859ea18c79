use lazy_static::lazy_static;
use lopdf::{Dictionary, Document, Object};
use regex::bytes::Regex;
use std::collections::HashSet;
use tracing::debug;

use crate::error::MetadataError;
use crate::evidence::Finding;

/// 通用文字处理软件的 Producer 前缀（小写比较）
const WORD_PROCESSOR_PREFIXES: [&str; 3] = ["word", "microsoft word", "microsoft® word"];

/// xref 链最多跟随的段数（每次增量更新追加一段）
const MAX_XREF_SECTIONS: usize = 1024;

lazy_static! {
    static ref STARTXREF: Regex = Regex::new(r"startxref\s+(\d+)").unwrap();
    static ref PREV: Regex = Regex::new(r"/Prev\s+(\d+)").unwrap();
    // trailer 字典在 `startxref` 之前结束；xref 流的字典在 `stream` 之前结束
    static ref SECTION_END: Regex = Regex::new(r"startxref|stream").unwrap();
}

/// PDF 文档信息字典 (`/Info`) 中与取证相关的字段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub creation_date: Option<String>,
    pub producer: Option<String>,
}

/// 读取 trailer 中的 `/Info` 字典（直接字典或间接引用都支持）
///
/// 没有 `/Info` 或字段缺失都不是错误；只有 PDF 本身解析失败才返回 `MetadataError::Corrupt`。
pub fn read_info(pdf: &[u8]) -> Result<DocumentInfo, MetadataError> {
    check_xref_chain(pdf)?;
    let document = Document::load_mem(pdf).map_err(|e| MetadataError::Corrupt(e.to_string()))?;

    let info = match document.trailer.get(b"Info") {
        Ok(Object::Dictionary(dict)) => Some(dict),
        Ok(Object::Reference(id)) => match document.get_object(*id) {
            Ok(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        },
        _ => None,
    };

    Ok(match info {
        Some(dict) => DocumentInfo {
            creation_date: text_field(dict, b"CreationDate"),
            producer: text_field(dict, b"Producer"),
        },
        None => DocumentInfo::default(),
    })
}

/// 检查 PDF 元数据
///
/// - `/CreationDate`：跳过 `D:` 前缀取第 [2, 6) 位作为年份，晚于 `year_cutoff` 即报告。
/// - `/Producer`：以文字处理软件签名开头即报告。
pub fn inspect(pdf: &[u8], year_cutoff: u16) -> Result<Vec<Finding>, MetadataError> {
    let info = read_info(pdf)?;
    debug!(?info, "📄 PDF 元数据");

    let mut findings = Vec::new();

    if let Some(year) = info.creation_date.as_deref().and_then(creation_year) {
        if year > year_cutoff {
            findings.push(Finding::FutureCreationDate);
        }
    }

    if let Some(producer) = info.producer.as_deref() {
        let producer = producer.trim().to_lowercase();
        if WORD_PROCESSOR_PREFIXES
            .iter()
            .any(|prefix| producer.starts_with(prefix))
        {
            findings.push(Finding::ProducerIsWordProcessor);
        }
    }

    Ok(findings)
}

/// 沿 `startxref` -> `/Prev` 走一遍 xref 链，偏移重复或段数超限即判为损坏。
/// 起点的选取方式与 lopdf 相同，走的就是 lopdf 随后要走的那条链。
///
/// lopdf 跟随 `/Prev` 时不记录走过的偏移，指回自身的 trailer 会让 `load_mem` 永远不返回。
/// 偏移越界或找不到 `/Prev` 时停止，其余结构问题留给 lopdf 报告。
fn check_xref_chain(pdf: &[u8]) -> Result<(), MetadataError> {
    let mut next = xref_start(pdf);
    let mut seen = HashSet::new();

    while let Some(offset) = next {
        if !seen.insert(offset) {
            return Err(MetadataError::Corrupt(format!(
                "xref /Prev chain loops back to offset {}",
                offset
            )));
        }
        if seen.len() > MAX_XREF_SECTIONS {
            return Err(MetadataError::Corrupt(format!(
                "xref chain longer than {} sections",
                MAX_XREF_SECTIONS
            )));
        }
        let section = match pdf.get(offset..) {
            Some(section) => section,
            None => break,
        };
        let end = SECTION_END.find(section).map_or(section.len(), |m| m.start());
        next = PREV
            .captures(&section[..end])
            .and_then(|caps| parse_offset(&caps[1]));
    }
    Ok(())
}

// 末尾 512 字节内第一个 `%%EOF`，再从它之前 25 字节起找第一个 `startxref`
fn xref_start(pdf: &[u8]) -> Option<usize> {
    let tail = pdf.len() - pdf.len().min(512);
    let eof = tail + pdf[tail..].windows(5).position(|w| w == b"%%EOF")?;
    if eof <= 25 {
        return None;
    }
    let caps = STARTXREF.captures(&pdf[eof - 25..])?;
    parse_offset(&caps[1])
}

fn parse_offset(digits: &[u8]) -> Option<usize> {
    std::str::from_utf8(digits).ok()?.parse().ok()
}

fn creation_year(date: &str) -> Option<u16> {
    let year = date.get(2..6)?;
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    year.parse().ok()
}

fn text_field(dict: &Dictionary, key: &[u8]) -> Option<String> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Some(decode_text(bytes)),
        _ => None,
    }
}

/// PDF 文本串：带 BOM 的按 UTF-16BE 解码，否则按 Latin-1 近似 PDFDocEncoding
fn decode_text(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| char::from(b)).collect(),
    }
}
