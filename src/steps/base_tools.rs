//! Base OS build tools
//!
//! Installs the compiler toolchain, git, and curl through whichever system
//! package manager is detected. Non-fatal: a machine without apt or dnf gets
//! a warning and the run continues, since the tools may already be present.

use log::{info, warn};

use crate::exec::CommandRunner;
use crate::pipeline::{Candidate, first_success, StepReport};

pub const ID: &str = "base-tools";
pub const NAME: &str = "Base build tools";

/// Recognized system package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgManager {
    /// Debian family
    Apt,
    /// Red Hat family
    Dnf,
}

impl PkgManager {
    pub fn binary(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Dnf => "dnf",
        }
    }

    fn toolchain_packages(&self) -> &'static [&'static str] {
        match self {
            Self::Apt => &["build-essential", "git", "curl"],
            Self::Dnf => &["gcc", "gcc-c++", "make", "git", "curl"],
        }
    }

    /// Install packages, going through `sudo -n` when sudo is available.
    /// Without sudo the manager runs bare, matching unprivileged use: it may
    /// fail and the caller decides whether that is fatal.
    pub fn install(&self, runner: &dyn CommandRunner, packages: &[&str]) -> bool {
        let mut args: Vec<&str> = Vec::new();
        let program = if runner.lookup("sudo") {
            args.push("-n");
            args.push(self.binary());
            "sudo"
        } else {
            self.binary()
        };

        if *self == Self::Apt {
            let mut update_args = args.clone();
            update_args.push("update");
            // A stale index is not fatal; the install below still decides.
            if let Ok(out) = runner.run(program, &update_args) {
                if !out.success() {
                    warn!("apt-get update failed; continuing with stale package index");
                }
            }
        }

        args.push("install");
        args.push("-y");
        args.extend_from_slice(packages);

        matches!(runner.run(program, &args), Ok(out) if out.success())
    }
}

/// Detect the system package manager, preferring apt over dnf
pub fn detect_pkg_manager(runner: &dyn CommandRunner) -> Option<PkgManager> {
    if runner.lookup("apt-get") {
        Some(PkgManager::Apt)
    } else if runner.lookup("dnf") {
        Some(PkgManager::Dnf)
    } else {
        None
    }
}

pub fn run(runner: &dyn CommandRunner) -> StepReport {
    let candidates = vec![
        Candidate {
            name: "apt-get",
            attempt: Box::new(|| {
                runner.lookup("apt-get")
                    && PkgManager::Apt.install(runner, PkgManager::Apt.toolchain_packages())
            }),
        },
        Candidate {
            name: "dnf",
            attempt: Box::new(|| {
                runner.lookup("dnf")
                    && PkgManager::Dnf.install(runner, PkgManager::Dnf.toolchain_packages())
            }),
        },
    ];

    match first_success(candidates) {
        Some(winner) => {
            info!("Installed base build tools via {}", winner);
            StepReport::completed(ID, NAME, format!("installed via {}", winner))
        }
        None => {
            warn!(
                "No supported package manager found (apt-get or dnf); \
                 ensure gcc, git, and curl are installed manually"
            );
            StepReport::degraded(
                ID,
                NAME,
                "no supported package manager; install gcc, git, and curl manually",
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::ScriptedRunner;
    use crate::pipeline::StepStatus;

    #[test]
    fn test_prefers_apt_when_present() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("sudo");

        let report = run(&runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(report.detail, "installed via apt-get");
        assert_eq!(runner.count_containing("apt-get install -y"), 1);
        assert_eq!(runner.count_containing("dnf"), 0);
    }

    #[test]
    fn test_falls_back_to_dnf() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("apt-get");
        runner.mark_missing("sudo");

        let report = run(&runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(report.detail, "installed via dnf");
        assert_eq!(runner.count_containing("dnf install -y gcc"), 1);
    }

    #[test]
    fn test_degrades_when_no_manager_found() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("apt-get");
        runner.mark_missing("dnf");

        let report = run(&runner);
        assert_eq!(report.status, StepStatus::Degraded);
        assert!(runner.commands().is_empty());
    }

    #[test]
    fn test_uses_sudo_when_available() {
        let runner = ScriptedRunner::new();

        let report = run(&runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(runner.count_containing("sudo -n apt-get install -y"), 1);
    }

    #[test]
    fn test_apt_failure_tries_dnf() {
        let mut runner = ScriptedRunner::new();
        runner.mark_missing("sudo");
        runner.fail_for("apt-get install");

        let report = run(&runner);
        assert_eq!(report.status, StepStatus::Completed);
        assert_eq!(report.detail, "installed via dnf");
    }
}
