//! Media toolkit installation with fallback
//!
//! conda-forge first, then the OS package manager if one is present. Unlike
//! most steps this never aborts the run: a machine without ffmpeg still
//! reaches a usable state, and the summary carries the warning.

use log::{info, warn};

use crate::exec::CommandRunner;
use crate::pipeline::{first_success, Candidate, StepReport};
use crate::steps::base_tools::detect_pkg_manager;
use crate::steps::conda::CondaHandle;

pub const ID: &str = "ffmpeg";
pub const NAME: &str = "FFmpeg toolkit";

pub fn run(conda: &CondaHandle, runner: &dyn CommandRunner) -> StepReport {
    let candidates = vec![
        Candidate {
            name: "conda-forge",
            attempt: Box::new(|| {
                conda
                    .install_from_channel(runner, "conda-forge", "ffmpeg")
                    .is_ok()
            }),
        },
        Candidate {
            name: "os package manager",
            attempt: Box::new(|| match detect_pkg_manager(runner) {
                Some(manager) => manager.install(runner, &["ffmpeg"]),
                None => false,
            }),
        },
    ];

    match first_success(candidates) {
        Some(winner) => {
            info!("Installed ffmpeg via {}", winner);
            StepReport::completed(ID, NAME, format!("installed via {}", winner))
        }
        None => {
            warn!(
                "Could not install ffmpeg via conda-forge or the OS package manager. \
                 Install it manually (e.g. 'sudo apt-get install ffmpeg') before running inference."
            );
            StepReport::degraded(
                ID,
                NAME,
                "not installed; install ffmpeg manually before running inference",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;
    use crate::pipeline::StepStatus;

    fn conda() -> CondaHandle {
        CondaHandle::new("conda", "multitalk")
    }

    #[test]
    fn test_conda_forge_preferred() {
        let runner = ScriptedRunner::new();

        let report = run(&conda(), &runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(report.detail, "installed via conda-forge");
        assert_eq!(runner.count_containing("apt-get"), 0);
    }

    #[test]
    fn test_falls_back_to_os_manager() {
        let mut runner = ScriptedRunner::new();
        runner.fail_for("-c conda-forge ffmpeg");
        runner.mark_missing("sudo");

        let report = run(&conda(), &runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(report.detail, "installed via os package manager");
        assert_eq!(runner.count_containing("apt-get install -y ffmpeg"), 1);
    }

    #[test]
    fn test_no_fallback_without_os_manager() {
        let mut runner = ScriptedRunner::new();
        runner.fail_for("-c conda-forge ffmpeg");
        runner.mark_missing("apt-get");
        runner.mark_missing("dnf");

        let report = run(&conda(), &runner);
        assert_eq!(report.status, StepStatus::Degraded);
        // Only the conda attempt hit the runner
        assert_eq!(runner.count_containing("ffmpeg"), 1);
    }

    #[test]
    fn test_both_paths_failing_degrades() {
        let mut runner = ScriptedRunner::new();
        runner.fail_for("ffmpeg");
        runner.mark_missing("sudo");

        let report = run(&conda(), &runner);
        assert_eq!(report.status, StepStatus::Degraded);
        assert!(report.detail.contains("manually"));
    }
}
