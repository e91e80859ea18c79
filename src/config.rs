use anyhow::{bail, Context};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::document::DEFAULT_MAX_UPLOAD_BYTES;
use crate::orchestrator::{FailurePolicy, MAX_IMAGE_PIXELS, NOISE_THRESHOLD};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub logo_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub failure_policy: FailurePolicy,
    pub classifier_timeout: Duration,
    pub noise_threshold: f64,
    pub max_image_pixels: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let port: u16 = lookup("PORT")
            .unwrap_or_else(|| "3000".to_string())
            .parse()
            .context("PORT must be a number")?;
        let max_upload_bytes = match lookup("MAX_UPLOAD_MB") {
            Some(mb) => {
                let mb: usize = mb.parse().context("MAX_UPLOAD_MB must be a number")?;
                mb * 1024 * 1024
            }
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };
        let timeout_ms: u64 = lookup("CLASSIFIER_TIMEOUT_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse()
            .context("CLASSIFIER_TIMEOUT_MS must be a number")?;
        let noise_threshold: f64 = match lookup("NOISE_THRESHOLD") {
            Some(v) => v.parse().context("NOISE_THRESHOLD must be a number")?,
            None => NOISE_THRESHOLD,
        };
        let max_image_pixels: u64 = match lookup("MAX_IMAGE_PIXELS") {
            Some(v) => v.parse().context("MAX_IMAGE_PIXELS must be a number")?,
            None => MAX_IMAGE_PIXELS,
        };

        let failure_policy = match lookup("CHECK_FAILURE_POLICY").as_deref() {
            None | Some("report") => FailurePolicy::Report,
            Some("skip") => FailurePolicy::Skip,
            Some(other) => bail!("CHECK_FAILURE_POLICY must be `report` or `skip`, got {:?}", other),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            logo_dir: lookup("LOGO_DIR")
                .unwrap_or_else(|| "logos".to_string())
                .into(),
            max_upload_bytes,
            failure_policy,
            classifier_timeout: Duration::from_millis(timeout_ms),
            noise_threshold,
            max_image_pixels,
        })
    }
}
