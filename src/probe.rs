//! Machine diagnostics for the `check` command
//!
//! Detects NVIDIA GPUs via nvidia-smi and judges whether the machine can run
//! the 14B diffusion model. Absence of a GPU is reported, never fatal; the
//! provisioning pipeline itself does not depend on this probe.

use serde::Serialize;

use crate::exec::CommandRunner;

/// VRAM verdict for the 14B diffusion model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VramVerdict {
    /// Enough VRAM to run without offloading
    Comfortable,
    /// Runs with model offloading enabled
    NeedsOffload,
    /// Not enough VRAM for inference
    Unsupported,
}

impl VramVerdict {
    pub fn for_free_vram_gb(free_gb: f32) -> Self {
        if free_gb >= 24.0 {
            Self::Comfortable
        } else if free_gb >= 11.0 {
            Self::NeedsOffload
        } else {
            Self::Unsupported
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Comfortable => "enough VRAM for the 14B model without offloading",
            Self::NeedsOffload => "run with model offloading enabled (11-24GB VRAM)",
            Self::Unsupported => "insufficient VRAM for the 14B model (needs 11GB+)",
        }
    }
}

/// Information about the detected GPU
#[derive(Debug, Clone, Serialize)]
pub struct GpuInfo {
    pub name: String,
    pub vram_total_gb: f32,
    pub vram_free_gb: f32,
    pub driver_version: String,
    pub cuda_version: Option<String>,
    pub verdict: VramVerdict,
}

impl GpuInfo {
    /// Detect the first NVIDIA GPU via nvidia-smi; None when no compatible
    /// GPU (or no driver) is found.
    pub fn detect(runner: &dyn CommandRunner) -> Option<Self> {
        let output = runner
            .run(
                "nvidia-smi",
                &[
                    "--query-gpu=name,memory.total,memory.free,driver_version",
                    "--format=csv,noheader,nounits",
                ],
            )
            .ok()?;

        if !output.success() {
            return None;
        }

        let line = output.stdout.lines().next()?;
        let parts: Vec<&str> = line.split(',').map(|s| s.trim()).collect();
        if parts.len() < 4 {
            return None;
        }

        let name = parts[0].to_string();
        let vram_total_mb: f32 = parts[1].parse().ok()?;
        let vram_free_mb: f32 = parts[2].parse().ok()?;
        let driver_version = parts[3].to_string();

        let vram_free_gb = vram_free_mb / 1024.0;

        Some(Self {
            name,
            vram_total_gb: vram_total_mb / 1024.0,
            vram_free_gb,
            driver_version,
            cuda_version: detect_cuda_version(runner),
            verdict: VramVerdict::for_free_vram_gb(vram_free_gb),
        })
    }
}

/// Parse the CUDA version out of the default nvidia-smi banner
fn detect_cuda_version(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner.run("nvidia-smi", &[]).ok()?;
    if !output.success() {
        return None;
    }
    parse_cuda_banner(&output.stdout)
}

fn parse_cuda_banner(stdout: &str) -> Option<String> {
    for line in stdout.lines() {
        if let Some(idx) = line.find("CUDA Version:") {
            let rest = &line[idx + "CUDA Version:".len()..];
            let version: String = rest
                .trim_start()
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if !version.is_empty() {
                return Some(version);
            }
        }
    }
    None
}

/// Human-readable GPU status for the `check` command
pub fn gpu_status_summary(runner: &dyn CommandRunner) -> String {
    match GpuInfo::detect(runner) {
        Some(gpu) => {
            let mut summary = format!(
                "GPU: {}\n\
                 VRAM: {:.1}GB total, {:.1}GB free\n\
                 Driver: {}",
                gpu.name, gpu.vram_total_gb, gpu.vram_free_gb, gpu.driver_version
            );
            if let Some(cuda) = &gpu.cuda_version {
                summary.push_str(&format!("\nCUDA: {}", cuda));
            }
            summary.push_str(&format!("\nVerdict: {}", gpu.verdict.description()));
            summary
        }
        None => "No compatible GPU detected (nvidia-smi unavailable or no NVIDIA device)."
            .to_string(),
    }
}
