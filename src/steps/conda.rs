//! Environment manager bootstrap and environment creation
//!
//! If `conda` is already on PATH it is reused as-is. Otherwise the latest
//! Miniconda installer for the current architecture is fetched and run in
//! batch mode into `~/miniconda3`. The named environment is created only when
//! no environment with that exact name exists.
//!
//! "Activation" is process-local: later steps issue their in-environment
//! commands through `conda run -n <env>`, so nothing leaks into the caller's
//! shell.

use std::path::PathBuf;

use log::info;

use crate::config::SetupConfig;
use crate::error::{Result, SetupError};
use crate::exec::{run_checked, CmdOutput, CommandRunner};
use crate::pipeline::StepReport;

pub const ID: &str = "conda";
pub const NAME: &str = "Conda bootstrap + environment";

const MINICONDA_URL_BASE: &str = "https://repo.anaconda.com/miniconda";

/// A usable conda install plus the target environment name
///
/// Later steps run their commands through this handle so they stay scoped to
/// the named environment regardless of where conda itself came from.
#[derive(Debug, Clone)]
pub struct CondaHandle {
    program: String,
    env_name: String,
}

impl CondaHandle {
    pub fn new(program: impl Into<String>, env_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            env_name: env_name.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// Run a command inside the environment via `conda run -n <env>`
    pub fn run_in_env(&self, runner: &dyn CommandRunner, args: &[&str]) -> Result<CmdOutput> {
        let mut full: Vec<&str> = vec!["run", "-n", &self.env_name];
        full.extend_from_slice(args);
        run_checked(runner, &self.program, &full)
    }

    /// Run `python -m pip <args>` inside the environment
    pub fn pip(&self, runner: &dyn CommandRunner, args: &[&str]) -> Result<CmdOutput> {
        let mut full: Vec<&str> = vec!["python", "-m", "pip"];
        full.extend_from_slice(args);
        self.run_in_env(runner, &full)
    }

    /// Install a package into the environment from a conda channel
    pub fn install_from_channel(
        &self,
        runner: &dyn CommandRunner,
        channel: &str,
        package: &str,
    ) -> Result<CmdOutput> {
        run_checked(
            runner,
            &self.program,
            &[
                "install", "-n", &self.env_name, "-c", channel, package, "-y",
            ],
        )
    }

    /// Whether an environment with this exact name already exists
    pub fn env_exists(&self, runner: &dyn CommandRunner) -> Result<bool> {
        let output = runner
            .run(&self.program, &["env", "list"])
            .map_err(|e| SetupError::EnvList {
                reason: e.to_string(),
            })?;
        if !output.success() {
            return Err(SetupError::EnvList {
                reason: output.stderr.trim().to_string(),
            });
        }
        Ok(parse_env_list(&output.stdout, &self.env_name))
    }
}

/// Exact first-column match against `conda env list` output
fn parse_env_list(stdout: &str, env_name: &str) -> bool {
    stdout
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .any(|name| name == env_name)
}

/// Locate conda, bootstrapping Miniconda when it is not on PATH
fn locate_or_bootstrap(runner: &dyn CommandRunner) -> Result<(String, String)> {
    if runner.lookup("conda") {
        return Ok(("conda".to_string(), "reused conda on PATH".to_string()));
    }

    let arch = match std::env::consts::ARCH {
        "x86_64" => "x86_64",
        "aarch64" => "aarch64",
        other => {
            return Err(SetupError::Bootstrap {
                reason: format!("unsupported architecture: {}", other),
            })
        }
    };

    let url = format!("{}/Miniconda3-latest-Linux-{}.sh", MINICONDA_URL_BASE, arch);
    let installer = std::env::temp_dir().join("miniconda-installer.sh");
    let installer_str = installer.to_string_lossy().to_string();

    let home = dirs::home_dir().ok_or_else(|| SetupError::Bootstrap {
        reason: "could not resolve home directory".to_string(),
    })?;
    let prefix: PathBuf = home.join("miniconda3");
    let prefix_str = prefix.to_string_lossy().to_string();

    info!("conda not found; fetching Miniconda installer from {}", url);
    run_checked(runner, "curl", &["-fsSL", &url, "-o", &installer_str])?;
    run_checked(runner, "bash", &[&installer_str, "-b", "-p", &prefix_str])?;

    let conda = prefix.join("bin").join("conda");
    Ok((
        conda.to_string_lossy().to_string(),
        format!("bootstrapped Miniconda into {}", prefix_str),
    ))
}

pub fn ensure(
    config: &SetupConfig,
    runner: &dyn CommandRunner,
) -> Result<(StepReport, CondaHandle)> {
    let (program, bootstrap_detail) = locate_or_bootstrap(runner)?;
    let handle = CondaHandle::new(program, config.env_name.clone());

    let detail = if handle.env_exists(runner)? {
        info!("Environment '{}' already exists", config.env_name);
        format!(
            "{}; environment '{}' already exists",
            bootstrap_detail, config.env_name
        )
    } else {
        info!(
            "Creating environment '{}' (python {})",
            config.env_name, config.python_version
        );
        let python_spec = format!("python={}", config.python_version);
        run_checked(
            runner,
            handle.program(),
            &["create", "-n", &config.env_name, &python_spec, "-y"],
        )?;
        format!(
            "{}; created environment '{}' (python {})",
            bootstrap_detail, config.env_name, config.python_version
        )
    };

    Ok((StepReport::completed(ID, NAME, detail), handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;
    use crate::pipeline::StepStatus;

    const ENV_LIST: &str = "# conda environments:\n#\nbase                  *  /opt/conda\nmultitalk                /opt/conda/envs/multitalk\n";

    fn config() -> SetupConfig {
        SetupConfig::resolve(|_| None)
    }

    #[test]
    fn test_parse_env_list_exact_match() {
        assert!(parse_env_list(ENV_LIST, "multitalk"));
        assert!(parse_env_list(ENV_LIST, "base"));
        assert!(!parse_env_list(ENV_LIST, "multi"));
        assert!(!parse_env_list(ENV_LIST, "multitalk2"));
    }

    #[test]
    fn test_existing_env_is_not_recreated() {
        let mut runner = ScriptedRunner::new();
        runner.stdout_for("env list", ENV_LIST);

        let (report, handle) = ensure(&config(), &runner).unwrap();
        assert_eq!(report.status, StepStatus::Completed);
        assert!(report.detail.contains("already exists"));
        assert_eq!(handle.program(), "conda");
        assert_eq!(runner.count_containing("create -n"), 0);
    }

    #[test]
    fn test_missing_env_is_created() {
        let mut runner = ScriptedRunner::new();
        runner.stdout_for("env list", "# conda environments:\nbase  /opt/conda\n");

        let (report, _) = ensure(&config(), &runner).unwrap();
        assert!(report.detail.contains("created environment 'multitalk'"));
        assert_eq!(
            runner.count_containing("create -n multitalk python=3.10 -y"),
            1
        );
    }

    #[test]
    fn test_conda_on_path_skips_bootstrap() {
        let mut runner = ScriptedRunner::new();
        runner.stdout_for("env list", ENV_LIST);

        ensure(&config(), &runner).unwrap();
        assert_eq!(runner.count_containing("curl"), 0);
        assert_eq!(runner.count_containing("miniconda-installer"), 0);
    }

    #[test]
    fn test_bootstrap_when_conda_missing() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("conda");
        runner.stdout_for("env list", "");

        let (report, handle) = ensure(&config(), &runner).unwrap();
        assert_eq!(runner.count_containing("curl -fsSL"), 1);
        assert_eq!(runner.count_containing("miniconda-installer.sh -b -p"), 1);
        assert!(handle.program().ends_with("miniconda3/bin/conda"));
        assert!(report.detail.contains("bootstrapped Miniconda"));
    }

    #[test]
    fn test_bootstrap_fetch_failure_is_fatal() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("conda");
        runner.fail_for("curl");

        let err = ensure(&config(), &runner).unwrap_err();
        assert_eq!(err.error_code(), "COMMAND_FAILED");
    }

    #[test]
    fn test_run_in_env_scopes_command() {
        let runner = ScriptedRunner::new();
        let handle = CondaHandle::new("conda", "multitalk");

        handle.run_in_env(&runner, &["hf", "--version"]).unwrap();
        assert_eq!(
            runner.commands(),
            vec!["conda run -n multitalk hf --version"]
        );
    }

    #[test]
    fn test_pip_goes_through_python_module() {
        let runner = ScriptedRunner::new();
        let handle = CondaHandle::new("conda", "multitalk");

        handle.pip(&runner, &["install", "ninja"]).unwrap();
        assert_eq!(
            runner.commands(),
            vec!["conda run -n multitalk python -m pip install ninja"]
        );
    }

    #[test]
    fn test_env_list_failure_maps_to_env_list_error() {
        let mut runner = ScriptedRunner::new();
        runner.respond("env list", CmdOutput::failed("conda broken"));

        let handle = CondaHandle::new("conda", "multitalk");
        let err = handle.env_exists(&runner).unwrap_err();
        assert_eq!(err.error_code(), "ENV_LIST_FAILED");
    }
}
