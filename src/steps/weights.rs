//! Model artifact retrieval
//!
//! The three target directories are created unconditionally before the skip
//! flag is consulted; the flag gates downloads only. Downloads go through the
//! hub client into a plain directory layout, so re-running is last-write-wins
//! at the file level.

use std::path::Path;

use log::info;

use crate::config::SetupConfig;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::pipeline::StepReport;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "weights";
pub const NAME: &str = "Model weight downloads";

/// Base video diffusion model
pub const BASE_MODEL_REPO: &str = "Wan-AI/Wan2.1-I2V-14B-480P";
/// Audio encoder
pub const AUDIO_ENCODER_REPO: &str = "TencentGameMate/chinese-wav2vec2-base";
/// Main application model
pub const APP_MODEL_REPO: &str = "MeiGen-AI/MeiGen-MultiTalk";

/// Safetensors weights for the audio encoder only exist on a pending-change
/// ref, not on the default branch, so that one file is fetched separately at
/// a pinned revision on top of the snapshot.
pub const AUDIO_ENCODER_EXTRA_FILE: &str = "model.safetensors";
pub const AUDIO_ENCODER_EXTRA_REVISION: &str = "refs/pr/1";

pub const SKIP_MESSAGE: &str = "Skipping model weight downloads (SKIP_WEIGHTS=1)";

fn download_snapshot(
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
    repo: &str,
    dest: &Path,
) -> Result<()> {
    let dest = dest.to_string_lossy().to_string();
    info!("Downloading {} -> {}", repo, dest);
    conda.run_in_env(runner, &["hf", "download", repo, "--local-dir", &dest])?;
    Ok(())
}

fn download_file_at_revision(
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
    repo: &str,
    file: &str,
    revision: &str,
    dest: &Path,
) -> Result<()> {
    let dest = dest.to_string_lossy().to_string();
    info!("Downloading {}:{} at {} -> {}", repo, file, revision, dest);
    conda.run_in_env(
        runner,
        &[
            "hf",
            "download",
            repo,
            file,
            "--revision",
            revision,
            "--local-dir",
            &dest,
        ],
    )?;
    Ok(())
}

pub fn run(
    config: &SetupConfig,
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
) -> Result<StepReport> {
    // Directory creation happens ahead of the flag check and is idempotent.
    for dir in config.model_dirs() {
        std::fs::create_dir_all(dir)?;
    }

    if config.skip_weights {
        println!("{}", SKIP_MESSAGE);
        return Ok(StepReport::skipped(ID, NAME, SKIP_MESSAGE));
    }

    download_snapshot(conda, runner, BASE_MODEL_REPO, &config.base_model_dir)?;
    download_snapshot(conda, runner, AUDIO_ENCODER_REPO, &config.audio_encoder_dir)?;
    download_file_at_revision(
        conda,
        runner,
        AUDIO_ENCODER_REPO,
        AUDIO_ENCODER_EXTRA_FILE,
        AUDIO_ENCODER_EXTRA_REVISION,
        &config.audio_encoder_dir,
    )?;
    download_snapshot(conda, runner, APP_MODEL_REPO, &config.app_model_dir)?;

    Ok(StepReport::completed(
        ID,
        NAME,
        format!(
            "3 repositories (4 fetches) into {}",
            config.weights_root.display()
        ),
    ))
}
