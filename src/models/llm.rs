use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingImagePolicy {
    Abort,
    Placeholder,
}

impl std::str::FromStr for MissingImagePolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(Self::Abort),
            "placeholder" => Ok(Self::Placeholder),
            other => Err(AppError::Config(format!(
                "unknown missing image policy '{other}' (expected 'abort' or 'placeholder')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMRuntimeConfig {
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub llm: LLMRuntimeConfig,
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
    #[serde(default = "default_missing_image")]
    pub missing_image: MissingImagePolicy,
    #[serde(default = "default_payload_dir")]
    pub payload_dir: PathBuf,
    #[serde(default = "default_instruction")]
    pub instruction: String,
}

impl ProbeConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, AppError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let llm = LLMRuntimeConfig {
            model_id: get("BEDROCK_MODEL").unwrap_or_else(default_model_id),
            api_key: get("AWS_BEARER_TOKEN_BEDROCK"),
            region: get("AWS_REGION").unwrap_or_else(default_region),
            base_url: get("BEDROCK_BASE_URL"),
            max_tokens: parse_or(get("BEDROCK_MAX_TOKENS"), "BEDROCK_MAX_TOKENS", default_max_tokens)?,
            temperature: get("BEDROCK_TEMPERATURE")
                .map(|v| parse_value(&v, "BEDROCK_TEMPERATURE"))
                .transpose()?,
            timeout_secs: parse_or(get("BEDROCK_TIMEOUT_SECS"), "BEDROCK_TIMEOUT_SECS", default_timeout_secs)?,
        };

        let missing_image = match get("PROBE_MISSING_IMAGE") {
            Some(v) => v.parse()?,
            None => default_missing_image(),
        };

        Ok(Self {
            llm,
            image_path: get("PROBE_IMAGE_PATH").map(PathBuf::from).unwrap_or_else(default_image_path),
            missing_image,
            payload_dir: get("PROBE_PAYLOAD_DIR").map(PathBuf::from).unwrap_or_else(default_payload_dir),
            instruction: get("PROBE_INSTRUCTION").unwrap_or_else(default_instruction),
        })
    }
}

fn parse_value<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Config(format!("{key} has an invalid value '{raw}'")))
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: fn() -> T) -> Result<T, AppError> {
    match raw {
        Some(v) => parse_value(&v, key),
        None => Ok(default()),
    }
}

fn default_model_id() -> String {
    "bedrock/us.anthropic.claude-3-5-sonnet-20241022-v2:0".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_image_path() -> PathBuf {
    PathBuf::from("console2.png")
}

fn default_missing_image() -> MissingImagePolicy {
    MissingImagePolicy::Placeholder
}

fn default_payload_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_instruction() -> String {
    "Go to the bedrock console and click purchase provisioned throughput".to_string()
}
