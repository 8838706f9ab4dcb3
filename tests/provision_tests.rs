//! Integration tests for the provisioning pipeline
//!
//! Drives `run_pipeline` end-to-end against a scripted command runner, so no
//! real package manager, conda install, or network is touched.

use std::collections::HashMap;
use std::path::Path;

use pretty_assertions::assert_eq;

use rigup::config::SetupConfig;
use rigup::exec::ScriptedRunner;
use rigup::pipeline::{run_pipeline, StepStatus};
use rigup::steps::weights::SKIP_MESSAGE;

const ENV_LIST_WITH_MULTITALK: &str = "# conda environments:\n#\nbase                  *  /opt/conda\nmultitalk                /opt/conda/envs/multitalk\n";
const ENV_LIST_BASE_ONLY: &str = "# conda environments:\n#\nbase                  *  /opt/conda\n";

fn config_in(root: &Path, extra: &[(&str, &str)]) -> SetupConfig {
    let mut map: HashMap<String, String> = extra
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.insert(
        "WEIGHTS_DIR".to_string(),
        root.to_string_lossy().to_string(),
    );
    SetupConfig::resolve(move |key| map.get(key).cloned())
}

/// Runner for a machine where every tool is present and the environment
/// already exists.
fn provisioned_machine() -> ScriptedRunner {
    let mut runner = ScriptedRunner::new();
    runner.stdout_for("env list", ENV_LIST_WITH_MULTITALK);
    runner
}

#[test]
fn full_run_completes_every_step_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    let ids: Vec<&str> = run.reports.iter().map(|r| r.id).collect();
    assert_eq!(
        ids,
        vec![
            "base-tools",
            "conda",
            "torch",
            "attention",
            "manifest",
            "ffmpeg",
            "hub",
            "weights"
        ]
    );
    assert!(run
        .reports
        .iter()
        .all(|r| r.status == StepStatus::Completed));

    assert_eq!(runner.count_containing("hf download"), 4);
}

#[test]
fn existing_environment_is_not_recreated() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());
    assert_eq!(runner.count_containing("create -n"), 0);
    // conda was found on PATH, so no installer was fetched
    assert_eq!(runner.count_containing("miniconda-installer"), 0);
}

#[test]
fn rerun_is_idempotent_for_env_and_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[("SKIP_WEIGHTS", "1")]);

    for _ in 0..2 {
        let runner = provisioned_machine();
        let run = run_pipeline(&config, &runner);
        assert!(run.success());
        assert_eq!(runner.count_containing("create -n"), 0);
    }
    for dir in config.model_dirs() {
        assert!(dir.is_dir());
    }
}

#[test]
fn skip_flag_gates_downloads_but_not_directory_creation() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[("SKIP_WEIGHTS", "1")]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    assert_eq!(runner.count_containing("hf download"), 0);
    for dir in config.model_dirs() {
        assert!(dir.is_dir(), "{} should exist", dir.display());
    }

    let weights = run.reports.iter().find(|r| r.id == "weights").unwrap();
    assert_eq!(weights.status, StepStatus::Skipped);
    assert_eq!(weights.detail, SKIP_MESSAGE);
}

#[test]
fn no_token_means_no_login_invocation() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[("HF_TOKEN", "")]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());
    assert_eq!(runner.count_containing("auth login"), 0);
}

#[test]
fn configured_token_logs_in_and_tolerates_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[("HF_TOKEN", "hf_abc")]);

    let mut runner = provisioned_machine();
    runner.fail_for("auth login");

    let run = run_pipeline(&config, &runner);
    assert!(run.success(), "login failure must not abort the run");

    let hub = run.reports.iter().find(|r| r.id == "hub").unwrap();
    assert_eq!(hub.status, StepStatus::Degraded);
    assert_eq!(runner.count_containing("auth login --token hf_abc"), 1);
}

#[test]
fn ffmpeg_falls_back_to_os_manager_then_warns() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);

    // conda channel fails, apt present: fallback wins
    let mut runner = provisioned_machine();
    runner.fail_for("-c conda-forge ffmpeg");
    runner.mark_missing("sudo");

    let run = run_pipeline(&config, &runner);
    assert!(run.success());
    let ffmpeg = run.reports.iter().find(|r| r.id == "ffmpeg").unwrap();
    assert_eq!(ffmpeg.status, StepStatus::Completed);
    assert_eq!(ffmpeg.detail, "installed via os package manager");

    // conda channel fails and no OS manager: degraded, run still finishes
    let mut runner = provisioned_machine();
    runner.fail_for("-c conda-forge ffmpeg");
    runner.mark_missing("apt-get");
    runner.mark_missing("dnf");

    let run = run_pipeline(&config, &runner);
    assert!(run.success(), "missing ffmpeg must not abort the run");
    let ffmpeg = run.reports.iter().find(|r| r.id == "ffmpeg").unwrap();
    assert_eq!(ffmpeg.status, StepStatus::Degraded);
    // Summary-adjacent steps after ffmpeg still ran
    assert_eq!(runner.count_containing("hf download"), 4);
}

#[test]
fn missing_package_manager_degrades_base_tools_only() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);

    let mut runner = provisioned_machine();
    runner.mark_missing("apt-get");
    runner.mark_missing("dnf");

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    let base = run.reports.iter().find(|r| r.id == "base-tools").unwrap();
    assert_eq!(base.status, StepStatus::Degraded);
    // ffmpeg still completed via conda-forge
    let ffmpeg = run.reports.iter().find(|r| r.id == "ffmpeg").unwrap();
    assert_eq!(ffmpeg.status, StepStatus::Completed);
}

#[test]
fn failed_pinned_install_aborts_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);

    let mut runner = provisioned_machine();
    runner.fail_for("torch==2.4.1");

    let run = run_pipeline(&config, &runner);
    assert!(!run.success());

    let torch = run.reports.iter().find(|r| r.id == "torch").unwrap();
    assert_eq!(torch.status, StepStatus::Failed);

    // Nothing after the failing step ran
    assert_eq!(runner.count_containing("flash-attn"), 0);
    assert_eq!(runner.count_containing("hf download"), 0);
    assert!(run.reports.iter().all(|r| r.id != "weights"));
}

#[test]
fn weights_root_override_relocates_download_targets() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("relocated");
    let config = config_in(&root, &[]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    let base_dir = root.join("Wan2.1-I2V-14B-480P");
    assert!(base_dir.is_dir());
    assert_eq!(
        runner.count_containing(&base_dir.to_string_lossy()),
        1
    );
}

#[test]
fn fresh_machine_bootstraps_conda_and_creates_env() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[("SKIP_WEIGHTS", "1")]);

    let mut runner = ScriptedRunner::new();
    runner.mark_missing("conda");
    runner.stdout_for("env list", ENV_LIST_BASE_ONLY);

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    assert_eq!(runner.count_containing("curl -fsSL"), 1);
    assert_eq!(runner.count_containing("-b -p"), 1);
    assert_eq!(
        runner.count_containing("create -n multitalk python=3.10 -y"),
        1
    );
}

#[test]
fn audio_encoder_repo_is_fetched_twice_with_pinned_file() {
    let tmp = tempfile::tempdir().unwrap();
    let config = config_in(tmp.path(), &[]);
    let runner = provisioned_machine();

    let run = run_pipeline(&config, &runner);
    assert!(run.success());

    assert_eq!(
        runner.count_containing("hf download TencentGameMate/chinese-wav2vec2-base"),
        2
    );
    assert_eq!(
        runner.count_containing("model.safetensors --revision refs/pr/1"),
        1
    );
}
