//! Configuration management for lexvault.
//!
//! Settings load from a TOML file (`lexvault.toml` in the data directory by
//! default) with serde defaults for every field, so a missing or partial
//! config file always yields a working setup.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chat::LlmConfig;

/// Default OCR confidence below which a document needs human verification.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.85;

/// Default upload size ceiling (50 MB).
pub const DEFAULT_MAX_BYTES: u64 = 50 * 1024 * 1024;

fn default_allowed_types() -> Vec<String> {
    ["pdf", "docx", "jpg", "jpeg", "png"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_BYTES
}

fn default_confidence_threshold() -> f32 {
    DEFAULT_CONFIDENCE_THRESHOLD
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8520
}

/// Intake validation and categorization policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    /// File extensions accepted for upload.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
    /// Maximum accepted file size in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Extraction confidence at or above which a document is categorized
    /// automatically. Below it, the document is routed to human verification.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            allowed_types: default_allowed_types(),
            max_bytes: default_max_bytes(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

impl IntakeConfig {
    /// Whether the given file extension is on the allow-list.
    pub fn allows_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(&ext))
    }
}

/// HTTP server binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Root data directory. Blobs live under `{data_dir}/documents`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Settings {
    /// Load settings from an explicit config path, or fall back to
    /// `{data_dir}/lexvault.toml`, or defaults when no file exists.
    pub fn load(config_path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let candidate = match config_path {
            Some(p) => Some(expand_path(p)),
            None => {
                let dir = data_dir
                    .map(|p| expand_path(p))
                    .unwrap_or_else(default_data_dir);
                let p = dir.join("lexvault.toml");
                p.exists().then_some(p)
            }
        };

        let mut settings = match candidate {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)?;
                let settings: Settings = toml::from_str(&raw)?;
                tracing::debug!("Loaded settings from {}", path.display());
                settings
            }
            None => Settings::default(),
        };

        // CLI flag wins over the config file.
        if let Some(dir) = data_dir {
            settings.data_dir = Some(expand_path(dir));
        }
        Ok(settings)
    }

    /// Resolved data directory.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .as_ref()
            .map(|p| expand_path(p))
            .unwrap_or_else(default_data_dir)
    }

    /// Directory where document blobs are stored.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir().join("documents")
    }
}

/// Expand `~` and environment variables in a path.
fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => path.to_path_buf(),
    }
}

/// Default data directory: `$LEXVAULT_DATA_DIR`, or `~/.local/share/lexvault`.
fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LEXVAULT_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("lexvault")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let intake = IntakeConfig::default();
        assert_eq!(intake.max_bytes, 50 * 1024 * 1024);
        assert!((intake.confidence_threshold - 0.85).abs() < f32::EPSILON);
        assert!(intake.allows_extension("pdf"));
        assert!(intake.allows_extension("PDF"));
        assert!(!intake.allows_extension("exe"));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [intake]
            confidence_threshold = 0.7
            "#,
        )
        .unwrap();
        assert!((settings.intake.confidence_threshold - 0.7).abs() < f32::EPSILON);
        assert_eq!(settings.intake.max_bytes, DEFAULT_MAX_BYTES);
        assert_eq!(settings.server.port, 8520);
    }
}
