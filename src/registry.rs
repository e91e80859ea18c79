use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::fingerprint::{self, Fingerprint};

/// 可识别的参考图片扩展名
const LOGO_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Logo 指纹库 (Logo Fingerprint Registry)
///
/// **职责**: 进程启动时扫描参考目录，一次性算好所有已知 logo 的指纹。
///
/// 构建完成后只读，不提供任何修改方法；发布到 `Arc` 之后可被任意多个核验请求并发读取，无需加锁。
/// 想更新 logo 只能重启进程。
#[derive(Debug, Clone, Default)]
pub struct LogoRegistry {
    entries: BTreeMap<String, Fingerprint>,
    known: HashSet<Fingerprint>,
}

impl LogoRegistry {
    /// 扫描目录构建指纹库
    ///
    /// - 目录不存在：返回空库并告警（系统退化为“没有已知 logo”，而不是启动失败）。
    /// - 单张图片读不了 / 解码失败：告警并跳过，绝不中断整个构建。
    pub fn build(directory: &Path) -> Self {
        let listing = match std::fs::read_dir(directory) {
            Ok(listing) => listing,
            Err(e) => {
                warn!("⚠️ Logo 目录不可用 {}: {}", directory.display(), e);
                return Self::default();
            }
        };

        // 排序保证构建结果与目录遍历顺序无关
        let mut paths: Vec<PathBuf> = listing
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && is_logo_file(path))
            .collect();
        paths.sort();

        let mut registry = Self::default();
        for path in paths {
            let identity = match identity_from_path(&path) {
                Some(identity) => identity,
                None => {
                    warn!("⚠️ 无法从文件名推导身份，跳过: {}", path.display());
                    continue;
                }
            };

            match fingerprint::fingerprint_file(&path) {
                Ok(fp) => {
                    debug!("🔖 {} -> {}", identity, fp);
                    registry.insert(identity, fp);
                }
                Err(e) => warn!("⚠️ 计算 logo 指纹失败 {}: {}", path.display(), e),
            }
        }

        info!("📚 已加载 {} 个 logo 指纹", registry.len());
        registry
    }

    /// 直接由 (身份, 指纹) 对构建
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Fingerprint)>,
    {
        let mut registry = Self::default();
        for (identity, fp) in entries {
            registry.insert(identity, fp);
        }
        registry
    }

    // 同名覆盖：后来者胜出，旧指纹随之失效
    fn insert(&mut self, identity: String, fp: Fingerprint) {
        match self.entries.insert(identity.clone(), fp) {
            Some(previous) => {
                warn!("⚠️ 重复的 logo 身份 {:?}，旧指纹 {} 被覆盖", identity, previous);
                self.known = self.entries.values().copied().collect();
            }
            None => {
                self.known.insert(fp);
            }
        }
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.known.contains(fp)
    }

    pub fn get(&self, identity: &str) -> Option<&Fingerprint> {
        self.entries.get(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Fingerprint)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 导出为扁平的 身份 -> 指纹(hex) 映射，供运维核对
    pub fn export(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|(identity, fp)| (identity.clone(), fp.to_hex()))
            .collect()
    }
}

fn is_logo_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| LOGO_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// `first_national_bank.png` -> `First National Bank`
fn identity_from_path(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(title_case(&stem.replace('_', " ")))
}

/// 每段字母的首字母大写，其余小写
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn solid(rgb: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(260, 260, Rgb(rgb)))
    }

    #[test]
    fn identity_is_title_cased() {
        assert_eq!(
            identity_from_path(Path::new("logos/first_national_bank.png")).unwrap(),
            "First National Bank"
        );
        assert_eq!(identity_from_path(Path::new("CHASE.jpg")).unwrap(), "Chase");
        assert_eq!(title_case("bank of america2go"), "Bank Of America2Go");
    }

    #[test]
    fn only_image_extensions_are_logos() {
        assert!(is_logo_file(Path::new("a.png")));
        assert!(is_logo_file(Path::new("a.JPEG")));
        assert!(is_logo_file(Path::new("a.jpg")));
        assert!(!is_logo_file(Path::new("a.gif")));
        assert!(!is_logo_file(Path::new("a.txt")));
        assert!(!is_logo_file(Path::new("png")));
    }

    #[test]
    fn missing_directory_yields_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let registry = LogoRegistry::build(&dir.path().join("does-not-exist"));
        assert!(registry.is_empty());
        assert!(registry.export().is_empty());
    }

    #[test]
    fn build_skips_broken_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        solid([200, 10, 10]).save(dir.path().join("chase_bank.png")).unwrap();
        solid([10, 10, 200]).save(dir.path().join("wells_fargo.png")).unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"ignore me").unwrap();

        let registry = LogoRegistry::build(dir.path());

        assert_eq!(registry.len(), 2);
        let chase = *registry.get("Chase Bank").unwrap();
        assert!(registry.contains(&chase));
        assert!(registry.get("Wells Fargo").is_some());
        assert!(registry.get("Broken").is_none());

        let exported = registry.export();
        assert_eq!(exported["Chase Bank"], chase.to_hex());
        let json = serde_json::to_value(&exported).unwrap();
        assert!(json.is_object());
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn duplicate_identity_replaces_fingerprint() {
        let first = fingerprint::logo_fingerprint(&solid([1, 2, 3]));
        let second = fingerprint::logo_fingerprint(&solid([200, 200, 200]));
        let registry = LogoRegistry::from_entries(vec![
            ("Acme".to_string(), first),
            ("Acme".to_string(), second),
        ]);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&second));
        assert!(!registry.contains(&first));
    }
}
