//! Configuration: data directory, service settings, per-request options.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 3010;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;
pub const DEFAULT_LANGUAGE: &str = "en";

/// Service config file name inside the data directory.
pub const CONFIG_FILE: &str = "blackline.json";

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";
pub const DEFAULT_NER_ENDPOINT: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_ENGLISH_NER_MODEL: &str = "dslim/bert-base-NER";
pub const DEFAULT_MULTILINGUAL_NER_MODEL: &str = "Davlan/bert-base-multilingual-cased-ner-hrl";

/// OCR collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrSettings {
    #[serde(default = "default_vision_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Words below this confidence are dropped from the layout.
    #[serde(default = "default_word_confidence")]
    pub word_confidence_threshold: f64,
}

/// NER collaborator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NerSettings {
    #[serde(default = "default_ner_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "default_english_model")]
    pub english_model: String,
    #[serde(default = "default_multilingual_model")]
    pub multilingual_model: String,
    /// Directory holding `model.onnx`, `tokenizer.json` and `config.json`
    /// for the local fallback model. Relative paths resolve against the
    /// data directory.
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,
}

/// Persisted service configuration (`blackline.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub ner: NerSettings,
    #[serde(skip)]
    pub config_path: PathBuf,
}

fn default_vision_endpoint() -> String {
    DEFAULT_VISION_ENDPOINT.into()
}
fn default_word_confidence() -> f64 {
    0.7
}
fn default_ner_endpoint() -> String {
    DEFAULT_NER_ENDPOINT.into()
}
fn default_english_model() -> String {
    DEFAULT_ENGLISH_NER_MODEL.into()
}
fn default_multilingual_model() -> String {
    DEFAULT_MULTILINGUAL_NER_MODEL.into()
}
fn default_model_dir() -> PathBuf {
    PathBuf::from("models/ner")
}
fn default_threshold() -> f64 {
    DEFAULT_CONFIDENCE_THRESHOLD
}
fn default_language() -> String {
    DEFAULT_LANGUAGE.into()
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            endpoint: default_vision_endpoint(),
            api_key: None,
            word_confidence_threshold: default_word_confidence(),
        }
    }
}

impl Default for NerSettings {
    fn default() -> Self {
        Self {
            endpoint: default_ner_endpoint(),
            api_token: None,
            english_model: default_english_model(),
            multilingual_model: default_multilingual_model(),
            model_dir: default_model_dir(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            language: DEFAULT_LANGUAGE.into(),
            ocr: OcrSettings::default(),
            ner: NerSettings::default(),
            config_path: PathBuf::new(),
        }
    }
}

impl ServiceConfig {
    /// Load config from file, falling back to env vars and defaults.
    pub fn load(config_path: &Path) -> Self {
        let mut config: ServiceConfig = std::fs::read_to_string(config_path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();

        config.config_path = config_path.to_path_buf();

        if config.ocr.api_key.is_none() {
            config.ocr.api_key = std::env::var("GOOGLE_VISION_API_KEY").ok();
        }
        if config.ner.api_token.is_none() {
            config.ner.api_token = std::env::var("HF_TOKEN").ok();
        }

        config
    }

    /// Save config to disk.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.config_path, json)?;
        info!("Saved service config to {}", self.config_path.display());
        Ok(())
    }

    /// Write a default config file at `config_path` unless one exists.
    /// Secrets are left to the environment. Returns whether a file was written.
    pub fn init(config_path: &Path) -> Result<bool> {
        if config_path.exists() {
            return Ok(false);
        }
        let config = ServiceConfig {
            config_path: config_path.to_path_buf(),
            ..ServiceConfig::default()
        };
        config.save()?;
        Ok(true)
    }

    /// Default per-request options.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            confidence_threshold: self.confidence_threshold,
            language: self.language.clone(),
        }
    }
}

/// Top-level Blackline configuration.
#[derive(Debug, Clone)]
pub struct BlacklineConfig {
    /// HTTP server port.
    pub port: u16,
    /// Root data directory.
    pub data_dir: PathBuf,
    pub service: ServiceConfig,
}

impl BlacklineConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);

        let data_dir = data_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&data_dir)?;

        let service = ServiceConfig::load(&data_dir.join(CONFIG_FILE));
        PipelineOptions::new(service.confidence_threshold, &service.language)?;

        Ok(Self {
            port,
            data_dir,
            service,
        })
    }

    /// Absolute path of the local NER model directory.
    pub fn model_dir(&self) -> PathBuf {
        if self.service.ner.model_dir.is_absolute() {
            self.service.ner.model_dir.clone()
        } else {
            self.data_dir.join(&self.service.ner.model_dir)
        }
    }
}

/// Per-request pipeline options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOptions {
    pub confidence_threshold: f64,
    pub language: String,
}

impl PipelineOptions {
    /// Validated constructor: threshold must lie in `[0, 1]`.
    pub fn new(confidence_threshold: f64, language: &str) -> Result<Self> {
        if !(0.0..=1.0).contains(&confidence_threshold) {
            return Err(Error::Config(format!(
                "confidence threshold {} outside [0, 1]",
                confidence_threshold
            )));
        }
        let language = if language.trim().is_empty() {
            DEFAULT_LANGUAGE.to_string()
        } else {
            language.trim().to_lowercase()
        };
        Ok(Self {
            confidence_threshold,
            language,
        })
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            language: DEFAULT_LANGUAGE.into(),
        }
    }
}
