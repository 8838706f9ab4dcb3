//! Manifest and native-library installation
//!
//! Installs every dependency in `requirements.txt` (fixed path, relative to
//! the invocation directory), then librosa through conda-forge — its compiled
//! native dependencies are better served by the conda channel than by the
//! wheel index used elsewhere.

use crate::config::SetupConfig;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::pipeline::StepReport;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "manifest";
pub const NAME: &str = "Manifest + native dependencies";

const MANIFEST_PATH: &str = "requirements.txt";
const CONDA_CHANNEL: &str = "conda-forge";
const NATIVE_PACKAGE: &str = "librosa";

pub fn run(
    _config: &SetupConfig,
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
) -> Result<StepReport> {
    conda.pip(runner, &["install", "-r", MANIFEST_PATH])?;
    conda.install_from_channel(runner, CONDA_CHANNEL, NATIVE_PACKAGE)?;

    Ok(StepReport::completed(
        ID,
        NAME,
        format!("{} + {} via {}", MANIFEST_PATH, NATIVE_PACKAGE, CONDA_CHANNEL),
    ))
}
