//! rigup - GPU development machine provisioning
//!
//! Provisions a machine for the MultiTalk audio-driven video generation
//! stack: conda bootstrap, a pinned PyTorch/CUDA environment, attention
//! acceleration libraries, ffmpeg, the hub download client, and the model
//! weight bundles.
//!
//! # Architecture
//!
//! - Configuration is resolved once at startup from environment variables
//!   into an immutable [`config::SetupConfig`].
//! - Every external tool invocation goes through the
//!   [`exec::CommandRunner`] trait, so steps are unit-testable against a
//!   scripted runner.
//! - [`pipeline::run_pipeline`] runs the steps strictly in order;
//!   non-essential steps degrade to warnings instead of aborting.

pub mod cli;
pub mod config;
pub mod error;
pub mod exec;
pub mod pipeline;
pub mod probe;
pub mod steps;

pub use error::{Result, SetupError};
