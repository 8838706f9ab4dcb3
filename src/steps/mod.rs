//! Provisioning steps
//!
//! One module per phase, in pipeline order. Each step takes the resolved
//! configuration and a [`crate::exec::CommandRunner`] and produces a
//! [`crate::pipeline::StepReport`].

pub mod attention;
pub mod base_tools;
pub mod conda;
pub mod ffmpeg;
pub mod hub;
pub mod manifest;
pub mod torch;
pub mod weights;
