//! Pinned PyTorch stack
//!
//! Upgrades pip itself, then installs torch/torchvision/torchaudio at exact
//! pins from the CUDA wheel index, then xformers from the same index. No
//! retries: a failed pinned install aborts the run.

use log::info;

use crate::config::SetupConfig;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::pipeline::StepReport;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "torch";
pub const NAME: &str = "Pinned PyTorch stack";

pub fn run(
    config: &SetupConfig,
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
) -> Result<StepReport> {
    conda.pip(runner, &["install", "--upgrade", "pip"])?;

    let torch = format!("torch=={}", config.torch_version);
    let torchvision = format!("torchvision=={}", config.torchvision_version);
    let torchaudio = format!("torchaudio=={}", config.torchaudio_version);

    info!(
        "Installing torch {} / torchvision {} / torchaudio {} from {}",
        config.torch_version,
        config.torchvision_version,
        config.torchaudio_version,
        config.torch_index_url
    );
    conda.pip(
        runner,
        &[
            "install",
            &torch,
            &torchvision,
            &torchaudio,
            "--index-url",
            &config.torch_index_url,
        ],
    )?;

    let xformers = format!("xformers=={}", config.xformers_version);
    conda.pip(
        runner,
        &["install", &xformers, "--index-url", &config.torch_index_url],
    )?;

    Ok(StepReport::completed(
        ID,
        NAME,
        format!(
            "torch {} + xformers {} from {}",
            config.torch_version, config.xformers_version, config.torch_index_url
        ),
    ))
}
