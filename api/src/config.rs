/// Process configuration, read from the environment (and `.env`) at startup.
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub api_secret: String,
    pub api_url: String,
    pub host: String,
    pub port: u16,
    pub extracted_dir: PathBuf,
    pub frontend_dir: PathBuf,
    pub fetch_timeout: Duration,
    pub upstream_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let Some(api_key) = first_var(&["VIDEO_API_KEY", "OPENTOK_API_KEY", "VONAGE_APP_ID"]) else {
            bail!("VIDEO_API_KEY (or OPENTOK_API_KEY / VONAGE_APP_ID) must be set");
        };
        let Some(api_secret) = first_var(&["VIDEO_API_SECRET", "OPENTOK_API_SECRET"]) else {
            bail!("VIDEO_API_SECRET (or OPENTOK_API_SECRET) must be set");
        };

        let api_url = std::env::var("VIDEO_API_URL")
            .unwrap_or_else(|_| "https://api.opentok.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let host = std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = first_var(&["PORT", "VCR_PORT"])
            .and_then(|p| p.parse().ok())
            .unwrap_or(3345);
        let extracted_dir = std::env::var("EXTRACTED_DIR")
            .unwrap_or_else(|_| "./extracted".to_string())
            .into();
        let frontend_dir = std::env::var("FRONTEND_DIR")
            .unwrap_or_else(|_| "../frontend/dist".to_string())
            .into();
        let fetch_timeout = secs_var("FETCH_TIMEOUT_SECS", 120);
        let upstream_timeout = secs_var("UPSTREAM_TIMEOUT_SECS", 30);

        Ok(Self {
            api_key,
            api_secret,
            api_url,
            host,
            port,
            extracted_dir,
            frontend_dir,
            fetch_timeout,
            upstream_timeout,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// First non-empty value among several variable names.
fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|n| std::env::var(n).ok())
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn secs_var(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}
