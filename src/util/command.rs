use std::process::Command;

use tracing::debug;

use crate::error::{MirrorError, Result};

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Local command execution.
pub trait Runner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands on this host with `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!(command = %render(program, args), "run");
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| MirrorError::message(format!("{}: {}", program, e)))?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

pub fn render(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{} {}", program, args.join(" "))
    }
}

/// Runs a command and turns a non-zero exit into `MirrorError::Command`.
pub fn run_checked(runner: &dyn Runner, program: &str, args: &[&str]) -> Result<CommandOutput> {
    let output = runner.run(program, args)?;
    check(render(program, args), output)
}

pub fn check(command: String, output: CommandOutput) -> Result<CommandOutput> {
    if !output.success() {
        return Err(MirrorError::Command {
            command,
            code: output.code,
            stderr: output.stderr,
        });
    }
    Ok(output)
}
