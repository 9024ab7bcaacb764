//! Scripted stand-ins for the local runner, the remote shell and the sync
//! engine. Replies are matched by command-line prefix, first match wins;
//! unmatched commands succeed with empty output.

use std::cell::RefCell;
use std::io::Write;

use crate::backup::btrbk::{SyncConfig, SyncProvider};
use crate::error::{MirrorError, Result};
use crate::remote::RemoteShell;
use crate::util::command::{render, CommandOutput, Runner};

pub const SAMPLE_LISTING: &str = "BYT;\n\
/dev/mmcblk0:10485760B:sd/mmc:512:512:msdos:SD card:;\n\
1:0B:1048576B:1048576B:fat32::lba;\n\
2:1048576B:10485760B:9437184B:btrfs::;\n";

pub const SAMPLE_UUID: &str = "3f1c9a52-77d4-4b8e-9e0a-1c2d3e4f5a6b";

pub fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: 0,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn failed(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code,
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[derive(Default)]
struct Script {
    replies: Vec<(String, CommandOutput)>,
    journal: RefCell<Vec<String>>,
}

impl Script {
    fn answer(&self, line: String) -> CommandOutput {
        let reply = self
            .replies
            .iter()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, output)| output.clone())
            .unwrap_or_default();
        self.journal.borrow_mut().push(line);
        reply
    }

    fn journal(&self) -> Vec<String> {
        self.journal.borrow().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.journal
            .borrow()
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }
}

#[derive(Default)]
pub struct FakeRunner {
    script: Script,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.reply(prefix, ok(stdout))
    }

    pub fn reply(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.script.replies.push((prefix.to_string(), output));
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.script.journal()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.script.count(prefix)
    }
}

impl Runner for FakeRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        Ok(self.script.answer(render(program, args)))
    }
}

pub struct FakeRemote {
    script: Script,
    stream_data: Vec<u8>,
    address: String,
}

impl FakeRemote {
    pub fn new() -> Self {
        FakeRemote {
            script: Script::default(),
            stream_data: Vec::new(),
            address: "192.0.2.10".to_string(),
        }
    }

    pub fn respond(self, prefix: &str, stdout: &str) -> Self {
        self.reply(prefix, ok(stdout))
    }

    pub fn reply(mut self, prefix: &str, output: CommandOutput) -> Self {
        self.script.replies.push((prefix.to_string(), output));
        self
    }

    /// Bytes produced by every streamed command.
    pub fn with_stream(mut self, data: Vec<u8>) -> Self {
        self.stream_data = data;
        self
    }

    pub fn journal(&self) -> Vec<String> {
        self.script.journal()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.script.count(prefix)
    }
}

impl RemoteShell for FakeRemote {
    fn exec(&self, command: &str) -> Result<CommandOutput> {
        Ok(self.script.answer(command.to_string()))
    }

    fn stream(&self, command: &str, sink: &mut dyn Write) -> Result<u64> {
        let output = self.script.answer(command.to_string());
        if !output.success() {
            return Err(MirrorError::Command {
                command: command.to_string(),
                code: output.code,
                stderr: output.stderr,
            });
        }
        for chunk in self.stream_data.chunks(4096) {
            sink.write_all(chunk)?;
            sink.flush()?;
        }
        Ok(self.stream_data.len() as u64)
    }

    fn address(&self) -> &str {
        &self.address
    }
}

/// Sync engine double that records every configuration it receives.
pub struct FakeSync {
    exit_code: i32,
    runs: RefCell<Vec<SyncConfig>>,
}

impl FakeSync {
    pub fn succeeding() -> Self {
        FakeSync {
            exit_code: 0,
            runs: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(exit_code: i32) -> Self {
        FakeSync {
            exit_code,
            runs: RefCell::new(Vec::new()),
        }
    }

    pub fn runs(&self) -> Vec<SyncConfig> {
        self.runs.borrow().clone()
    }
}

impl SyncProvider for FakeSync {
    fn run(&self, config: &SyncConfig) -> Result<()> {
        self.runs.borrow_mut().push(config.clone());
        if self.exit_code != 0 {
            return Err(MirrorError::SyncEngine {
                code: self.exit_code,
                stderr: "ERROR: simulated failure".to_string(),
            });
        }
        Ok(())
    }
}
