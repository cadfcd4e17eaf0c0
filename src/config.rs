use std::path::PathBuf;

/// Runtime configuration, read from the environment in `main`.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub private_dir: PathBuf,
    pub public_dir: PathBuf,
    pub temporary_dir: PathBuf,
    pub smtp_relay: Option<String>,
    pub smtp_from: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            private_dir: std::env::var("PRIVATE_FILES_DIR")
                .unwrap_or_else(|_| "data/private".to_string())
                .into(),
            public_dir: std::env::var("PUBLIC_FILES_DIR")
                .unwrap_or_else(|_| "data/public".to_string())
                .into(),
            temporary_dir: std::env::var("TEMPORARY_FILES_DIR")
                .unwrap_or_else(|_| "data/tmp".to_string())
                .into(),
            smtp_relay: std::env::var("SMTP_RELAY").ok(),
            smtp_from: std::env::var("SMTP_FROM").ok(),
        }
    }
}
