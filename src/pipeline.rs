//! Provisioning pipeline
//!
//! Runs the steps strictly in order. The default policy is abort-on-error:
//! the first failing step ends the run with no rollback, and recovery is
//! re-running (each step skips work that is already done). Three steps are
//! deliberately exempt and degrade to warnings instead: base-tool
//! provisioning, the ffmpeg install, and hub login.

use serde::Serialize;

use crate::config::SetupConfig;
use crate::error::SetupError;
use crate::exec::CommandRunner;
use crate::steps;

/// Outcome of a single pipeline step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepStatus {
    /// Step ran and succeeded
    Completed,
    /// Step was gated off by configuration
    Skipped,
    /// Step failed but is non-essential; the run continued
    Degraded,
    /// Step failed and aborted the run
    Failed,
}

/// Record of one executed step, kept for the final summary
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub id: &'static str,
    pub name: &'static str,
    pub status: StepStatus,
    pub detail: String,
}

impl StepReport {
    pub fn completed(id: &'static str, name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            id,
            name,
            status: StepStatus::Completed,
            detail: detail.into(),
        }
    }

    pub fn skipped(id: &'static str, name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            id,
            name,
            status: StepStatus::Skipped,
            detail: detail.into(),
        }
    }

    pub fn degraded(id: &'static str, name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            id,
            name,
            status: StepStatus::Degraded,
            detail: detail.into(),
        }
    }

    pub fn failed(id: &'static str, name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            id,
            name,
            status: StepStatus::Failed,
            detail: detail.into(),
        }
    }
}

/// One fallback strategy for a step that tolerates failure
pub struct Candidate<'a> {
    pub name: &'static str,
    pub attempt: Box<dyn Fn() -> bool + 'a>,
}

/// Try candidates in order; the name of the first one that succeeds is
/// recorded in the step report.
pub fn first_success(candidates: Vec<Candidate<'_>>) -> Option<&'static str> {
    for candidate in candidates {
        if (candidate.attempt)() {
            return Some(candidate.name);
        }
    }
    None
}

/// Result of a full pipeline run
#[derive(Debug)]
pub struct PipelineRun {
    pub reports: Vec<StepReport>,
    pub error: Option<SetupError>,
}

impl PipelineRun {
    pub fn success(&self) -> bool {
        self.error.is_none()
    }
}

/// Ordered step descriptions, used by `provision --dry-run`
pub fn plan() -> Vec<&'static str> {
    vec![
        "base-tools: install compiler toolchain, git, curl via the detected OS package manager (warn if none)",
        "conda: bootstrap Miniconda if absent, create the named environment if absent",
        "torch: pip-install the pinned torch/torchvision/torchaudio stack and xformers from the CUDA index",
        "attention: pip-install misaki[en], ninja, psutil, packaging, then the pinned flash-attn build",
        "manifest: pip-install requirements.txt, then conda-install librosa from conda-forge",
        "ffmpeg: install via conda-forge, falling back to the OS package manager (warn if both fail)",
        "hub: install the hub client; log in when a token is configured (login failure tolerated)",
        "weights: create the three model directories, then download the weight bundles unless skipped",
    ]
}

/// Run all provisioning steps in order against the given runner
pub fn run_pipeline(config: &SetupConfig, runner: &dyn CommandRunner) -> PipelineRun {
    let mut reports = Vec::new();

    // Exempt: a machine without a recognized package manager can still be
    // provisioned if the build tools already exist.
    reports.push(steps::base_tools::run(runner));

    let conda = match steps::conda::ensure(config, runner) {
        Ok((report, handle)) => {
            reports.push(report);
            handle
        }
        Err(e) => {
            reports.push(StepReport::failed(
                steps::conda::ID,
                steps::conda::NAME,
                e.to_string(),
            ));
            return PipelineRun {
                reports,
                error: Some(e),
            };
        }
    };

    let strict: Vec<(
        &'static str,
        &'static str,
        Box<dyn Fn() -> crate::Result<StepReport> + '_>,
    )> = vec![
        (
            steps::torch::ID,
            steps::torch::NAME,
            Box::new(|| steps::torch::run(config, &conda, runner)),
        ),
        (
            steps::attention::ID,
            steps::attention::NAME,
            Box::new(|| steps::attention::run(config, &conda, runner)),
        ),
        (
            steps::manifest::ID,
            steps::manifest::NAME,
            Box::new(|| steps::manifest::run(config, &conda, runner)),
        ),
    ];

    for (id, name, step) in strict {
        match step() {
            Ok(report) => reports.push(report),
            Err(e) => {
                reports.push(StepReport::failed(id, name, e.to_string()));
                return PipelineRun {
                    reports,
                    error: Some(e),
                };
            }
        }
    }

    // Exempt: missing media tooling does not block a usable environment.
    reports.push(steps::ffmpeg::run(&conda, runner));

    // Client install is strict; the login inside degrades on failure.
    match steps::hub::run(config, &conda, runner) {
        Ok(report) => reports.push(report),
        Err(e) => {
            reports.push(StepReport::failed(
                steps::hub::ID,
                steps::hub::NAME,
                e.to_string(),
            ));
            return PipelineRun {
                reports,
                error: Some(e),
            };
        }
    }

    match steps::weights::run(config, &conda, runner) {
        Ok(report) => reports.push(report),
        Err(e) => {
            reports.push(StepReport::failed(
                steps::weights::ID,
                steps::weights::NAME,
                e.to_string(),
            ));
            return PipelineRun {
                reports,
                error: Some(e),
            };
        }
    }

    PipelineRun {
        reports,
        error: None,
    }
}
