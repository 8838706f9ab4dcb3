//! Provisioning configuration
//!
//! All knobs come from environment variables with static defaults, resolved
//! once at startup into an immutable [`SetupConfig`] that every step receives.
//! Nothing re-reads ambient state mid-run.

use std::path::PathBuf;

use serde::Serialize;

/// Default conda environment name
pub const DEFAULT_ENV_NAME: &str = "multitalk";
/// Default Python interpreter version for the environment
pub const DEFAULT_PYTHON_VERSION: &str = "3.10";
/// Pinned PyTorch stack, built against CUDA 12.1
pub const DEFAULT_TORCH_VERSION: &str = "2.4.1";
pub const DEFAULT_TORCHVISION_VERSION: &str = "0.19.1";
pub const DEFAULT_TORCHAUDIO_VERSION: &str = "2.4.1";
pub const DEFAULT_TORCH_INDEX_URL: &str = "https://download.pytorch.org/whl/cu121";
pub const DEFAULT_XFORMERS_VERSION: &str = "0.0.28";
pub const DEFAULT_FLASH_ATTN_VERSION: &str = "2.7.4.post1";
/// Default root for downloaded model weights, relative to the invocation dir
pub const DEFAULT_WEIGHTS_DIR: &str = "weights";

const BASE_MODEL_SUBDIR: &str = "Wan2.1-I2V-14B-480P";
const AUDIO_ENCODER_SUBDIR: &str = "chinese-wav2vec2-base";
const APP_MODEL_SUBDIR: &str = "MeiGen-MultiTalk";

/// Immutable configuration record for a provisioning run
#[derive(Debug, Clone, Serialize)]
pub struct SetupConfig {
    pub env_name: String,
    pub python_version: String,
    pub torch_version: String,
    pub torchvision_version: String,
    pub torchaudio_version: String,
    pub torch_index_url: String,
    pub xformers_version: String,
    pub flash_attn_version: String,
    pub weights_root: PathBuf,
    pub base_model_dir: PathBuf,
    pub audio_encoder_dir: PathBuf,
    pub app_model_dir: PathBuf,
    /// Hub access token; never serialized into `print-config` output
    #[serde(skip_serializing)]
    pub hf_token: Option<String>,
    pub skip_weights: bool,
}

impl SetupConfig {
    /// Resolve configuration from the process environment
    pub fn from_env() -> Self {
        Self::resolve(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an explicit lookup function
    ///
    /// Tests pass a closure over a map instead of mutating the process
    /// environment.
    pub fn resolve<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let weights_root = PathBuf::from(get("WEIGHTS_DIR", DEFAULT_WEIGHTS_DIR));

        // The three model directories derive from the weights root unless
        // independently overridden.
        let child = |key: &str, subdir: &str| {
            lookup(key)
                .map(PathBuf::from)
                .unwrap_or_else(|| weights_root.join(subdir))
        };

        let base_model_dir = child("BASE_MODEL_DIR", BASE_MODEL_SUBDIR);
        let audio_encoder_dir = child("WAV2VEC_DIR", AUDIO_ENCODER_SUBDIR);
        let app_model_dir = child("MULTITALK_DIR", APP_MODEL_SUBDIR);

        // An empty token means "no token": never attempt a login with an
        // empty value.
        let hf_token = lookup("HF_TOKEN").filter(|t| !t.trim().is_empty());

        let skip_weights = lookup("SKIP_WEIGHTS").as_deref() == Some("1");

        Self {
            env_name: get("CONDA_ENV_NAME", DEFAULT_ENV_NAME),
            python_version: get("PYTHON_VERSION", DEFAULT_PYTHON_VERSION),
            torch_version: get("TORCH_VERSION", DEFAULT_TORCH_VERSION),
            torchvision_version: get("TORCHVISION_VERSION", DEFAULT_TORCHVISION_VERSION),
            torchaudio_version: get("TORCHAUDIO_VERSION", DEFAULT_TORCHAUDIO_VERSION),
            torch_index_url: get("TORCH_INDEX_URL", DEFAULT_TORCH_INDEX_URL),
            xformers_version: get("XFORMERS_VERSION", DEFAULT_XFORMERS_VERSION),
            flash_attn_version: get("FLASH_ATTN_VERSION", DEFAULT_FLASH_ATTN_VERSION),
            weights_root,
            base_model_dir,
            audio_encoder_dir,
            app_model_dir,
            hf_token,
            skip_weights,
        }
    }

    /// The three model target directories, in download order
    pub fn model_dirs(&self) -> [&PathBuf; 3] {
        [
            &self.base_model_dir,
            &self.audio_encoder_dir,
            &self.app_model_dir,
        ]
    }
}
