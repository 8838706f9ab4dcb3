//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use log::info;

use crate::config::SetupConfig;
use crate::exec::{CommandRunner, SystemRunner};
use crate::pipeline::{plan, run_pipeline, StepReport, StepStatus};
use crate::probe::gpu_status_summary;
use crate::steps;
use crate::steps::conda::CondaHandle;

/// Run the full provisioning pipeline.
pub fn provision(dry_run: bool, skip_weights: bool) -> anyhow::Result<()> {
    let mut config = SetupConfig::from_env();
    if skip_weights {
        config.skip_weights = true;
    }

    if dry_run {
        println!("Provisioning plan (dry run, nothing executed):");
        for (i, step) in plan().iter().enumerate() {
            println!("  {}. {}", i + 1, step);
        }
        return Ok(());
    }

    info!("Provisioning environment '{}'", config.env_name);

    let runner = SystemRunner::new();
    let run = run_pipeline(&config, &runner);

    print_summary(&config, &run.reports);

    if let Some(e) = run.error {
        eprintln!("\nProvisioning failed [{}]: {}", e.error_code(), e);
        for hint in e.recovery_suggestions() {
            eprintln!("  hint: {}", hint);
        }
        return Err(e.into());
    }

    Ok(())
}

/// Create the model directories and download weights only.
///
/// Reuses the conda step to locate the environment, so this also works on a
/// fresh machine (it will bootstrap conda and create the environment first).
pub fn weights() -> anyhow::Result<()> {
    let config = SetupConfig::from_env();
    let runner = SystemRunner::new();

    let (_, conda) = steps::conda::ensure(&config, &runner)?;
    let report = steps::weights::run(&config, &conda, &runner)?;

    println!("{}: {}", report.name, report.detail);
    print_model_dirs(&config);

    Ok(())
}

/// Report tool presence, environment state, and GPU capability.
pub fn check() -> anyhow::Result<()> {
    let config = SetupConfig::from_env();
    let runner = SystemRunner::new();

    println!("=== rigup check ===");
    for tool in ["conda", "git", "curl", "ffmpeg", "nvidia-smi"] {
        let state = if runner.lookup(tool) { "found" } else { "missing" };
        println!("  {:<12} {}", tool, state);
    }

    if runner.lookup("conda") {
        let conda = CondaHandle::new("conda", config.env_name.clone());
        match conda.env_exists(&runner) {
            Ok(true) => {
                println!("  environment '{}' exists", config.env_name);
                let hub = conda.run_in_env(&runner, &["hf", "version"]).is_ok();
                println!(
                    "  hub client   {}",
                    if hub { "installed" } else { "not installed" }
                );
            }
            Ok(false) => println!("  environment '{}' does not exist", config.env_name),
            Err(e) => println!("  could not query environments: {}", e),
        }
    }

    println!();
    println!("{}", gpu_status_summary(&runner));

    Ok(())
}

/// Print the resolved configuration as JSON (the token is never included).
pub fn print_config() -> anyhow::Result<()> {
    let config = SetupConfig::from_env();
    let json = serde_json::to_string_pretty(&config)?;
    println!("{}", json);
    println!();
    println!(
        "hub token: {}",
        if config.hf_token.is_some() {
            "configured"
        } else {
            "not set"
        }
    );
    Ok(())
}

fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Completed => " ok ",
        StepStatus::Skipped => "skip",
        StepStatus::Degraded => "WARN",
        StepStatus::Failed => "FAIL",
    }
}

/// Print the end-of-run summary: step outcomes, directory locations, and
/// next-step hints.
pub fn print_summary(config: &SetupConfig, reports: &[StepReport]) {
    println!();
    println!("=== rigup provisioning summary ===");
    println!("{:-<70}", "");
    for report in reports {
        println!(
            "[{}] {:<32} {}",
            status_marker(report.status),
            report.name,
            report.detail
        );
    }
    println!("{:-<70}", "");

    print_model_dirs(config);

    println!();
    println!("Next steps:");
    println!("  conda activate {}", config.env_name);
    println!(
        "  python generate_multitalk.py --ckpt_dir {}",
        config.base_model_dir.display()
    );
}

fn print_model_dirs(config: &SetupConfig) {
    println!("Weights root: {}", config.weights_root.display());
    println!("  base model:    {}", config.base_model_dir.display());
    println!("  audio encoder: {}", config.audio_encoder_dir.display());
    println!("  app model:     {}", config.app_model_dir.display());
}
