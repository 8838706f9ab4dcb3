//! Command execution abstraction
//!
//! Every external tool invocation (package managers, conda, pip, the hub
//! client) goes through the [`CommandRunner`] trait so each provisioning step
//! can be unit-tested against a scripted runner instead of a live system.

use std::collections::HashSet;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;

use crate::error::{Result, SetupError};

/// Captured output of a finished child process
#[derive(Debug, Clone, Default)]
pub struct CmdOutput {
    /// Exit code, or None when the process was killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Successful empty output
    pub fn ok() -> Self {
        Self {
            status: Some(0),
            ..Default::default()
        }
    }

    /// Failed output with the given stderr text
    pub fn failed(stderr: &str) -> Self {
        Self {
            status: Some(1),
            stderr: stderr.to_string(),
            ..Default::default()
        }
    }
}

/// Executes external commands and answers PATH lookups
pub trait CommandRunner {
    /// Run a command to completion, capturing its output
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput>;

    /// Whether a program is resolvable (on PATH, or an existing explicit path)
    fn lookup(&self, program: &str) -> bool;
}

/// Run a command and fail with [`SetupError::CommandFailed`] on a non-zero exit
pub fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<CmdOutput> {
    let output = runner.run(program, args)?;
    if output.success() {
        Ok(output)
    } else {
        Err(SetupError::CommandFailed {
            command: render_command(program, args),
            status: output.status,
            stderr: tail(&output.stderr, 2000),
        })
    }
}

fn render_command(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let start = text.len() - max;
        // Don't split a UTF-8 sequence
        let start = (start..text.len())
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(text.len());
        text[start..].to_string()
    }
}

/// Real runner backed by `std::process::Command`
///
/// Inherits the caller's environment, so hub cache variables and proxies set
/// by the user flow through to the child tools untouched.
#[derive(Debug, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| SetupError::Spawn {
                program: program.to_string(),
                source: e,
            })?;

        Ok(CmdOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn lookup(&self, program: &str) -> bool {
        // Explicit paths bypass the PATH scan
        if program.contains(std::path::MAIN_SEPARATOR) {
            return Path::new(program).is_file();
        }

        let Some(path_var) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&path_var).any(|dir| dir.join(program).is_file())
    }
}

/// Scripted runner for tests
///
/// Responses are keyed by substring match against the rendered command line;
/// the first matching rule wins. Unmatched commands succeed with empty
/// output, so tests only script the interesting cases. Every invocation is
/// recorded for assertions.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    missing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

#[derive(Debug)]
struct Rule {
    needle: String,
    output: CmdOutput,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a canned output for commands whose rendered line contains `needle`
    pub fn respond(&mut self, needle: &str, output: CmdOutput) {
        self.rules.push(Rule {
            needle: needle.to_string(),
            output,
        });
    }

    /// Script stdout for matching commands
    pub fn stdout_for(&mut self, needle: &str, stdout: &str) {
        self.respond(
            needle,
            CmdOutput {
                status: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            },
        );
    }

    /// Script a non-zero exit for matching commands
    pub fn fail_for(&mut self, needle: &str) {
        self.respond(needle, CmdOutput::failed("scripted failure"));
    }

    /// Make `lookup` report the program as absent
    pub fn mark_missing(&mut self, program: &str) {
        self.missing.insert(program.to_string());
    }

    /// All recorded command lines, in invocation order
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Number of recorded command lines containing `needle`
    pub fn count_containing(&self, needle: &str) -> usize {
        self.commands().iter().filter(|c| c.contains(needle)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CmdOutput> {
        let rendered = render_command(program, args);
        self.calls.lock().expect("calls lock").push(rendered.clone());

        for rule in &self.rules {
            if rendered.contains(&rule.needle) {
                return Ok(rule.output.clone());
            }
        }
        Ok(CmdOutput::ok())
    }

    fn lookup(&self, program: &str) -> bool {
        !self.missing.contains(program)
    }
}
