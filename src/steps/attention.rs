//! Attention-acceleration dependencies
//!
//! The auxiliary packages install quickly; the pinned flash-attn build is the
//! step most likely to break on a mismatched CUDA/compiler toolchain. Its
//! failure propagates as-is, and the error's recovery suggestions point at
//! the toolchain.

use log::info;

use crate::config::SetupConfig;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::pipeline::StepReport;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "attention";
pub const NAME: &str = "Attention acceleration packages";

const AUX_PACKAGES: &[&str] = &["misaki[en]", "ninja", "psutil", "packaging"];

pub fn run(
    config: &SetupConfig,
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
) -> Result<StepReport> {
    let mut args: Vec<&str> = vec!["install"];
    args.extend_from_slice(AUX_PACKAGES);
    conda.pip(runner, &args)?;

    let flash_attn = format!("flash-attn=={}", config.flash_attn_version);
    info!("Building {} (this can take a while)", flash_attn);
    conda.pip(runner, &["install", &flash_attn, "--no-build-isolation"])?;

    Ok(StepReport::completed(
        ID,
        NAME,
        format!("misaki[en], ninja, psutil, packaging, {}", flash_attn),
    ))
}
