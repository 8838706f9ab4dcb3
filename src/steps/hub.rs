//! Hub client setup and optional authentication
//!
//! Installs the hub download client into the environment (fatal on failure),
//! then logs in non-interactively when a token is configured. Login failure
//! is tolerated: public repositories still download without it.

use log::{info, warn};

use crate::config::SetupConfig;
use crate::error::Result;
use crate::exec::CommandRunner;
use crate::pipeline::StepReport;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "hub";
pub const NAME: &str = "Hub client + authentication";

const HUB_CLIENT_SPEC: &str = "huggingface_hub[cli]";

pub fn run(
    config: &SetupConfig,
    conda: &CondaHandle,
    runner: &dyn CommandRunner,
) -> Result<StepReport> {
    conda.pip(runner, &["install", "-U", HUB_CLIENT_SPEC])?;

    let report = match &config.hf_token {
        Some(token) => {
            match conda.run_in_env(runner, &["hf", "auth", "login", "--token", token]) {
                Ok(_) => {
                    info!("Authenticated with the hub");
                    StepReport::completed(ID, NAME, "client installed; authenticated with token")
                }
                Err(e) => {
                    warn!("Hub login failed; continuing without authentication: {}", e);
                    StepReport::degraded(
                        ID,
                        NAME,
                        "client installed; login failed, continuing unauthenticated",
                    )
                }
            }
        }
        None => StepReport::completed(ID, NAME, "client installed; no token configured"),
    };

    Ok(report)
}
