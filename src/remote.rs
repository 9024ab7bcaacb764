use std::io::{Read, Write};
use std::net::ToSocketAddrs;
use std::process::{Command, Stdio};
use std::thread;

use tracing::{debug, info};

use crate::config::model::Settings;
use crate::error::{MirrorError, Result};
use crate::util::command::CommandOutput;

const COPY_CHUNK: usize = 64 * 1024;

/// Command channel to the host that owns the source device.
pub trait RemoteShell {
    /// Runs `command` through the remote shell and buffers its output.
    fn exec(&self, command: &str) -> Result<CommandOutput>;

    /// Runs `command` and copies its stdout into `sink` as it arrives,
    /// flushing after every chunk. Returns the number of bytes copied.
    fn stream(&self, command: &str, sink: &mut dyn Write) -> Result<u64>;

    /// Address the remote host is reachable at, as seen from this side.
    fn address(&self) -> &str;
}

/// Remote session backed by the system `ssh` client.
#[derive(Debug, Clone)]
pub struct SshSession {
    destination: String,
    address: String,
    options: Vec<String>,
}

impl SshSession {
    pub fn connect(host: &str, settings: &Settings) -> Result<Self> {
        let mut options = vec!["-o".to_string(), "BatchMode=yes".to_string()];
        if let Some(identity) = &settings.ssh_identity {
            options.push("-i".to_string());
            options.push(identity.to_string_lossy().to_string());
        }
        for opt in &settings.ssh_options {
            options.push("-o".to_string());
            options.push(opt.clone());
        }
        let session = SshSession {
            destination: format!("{}@{}", settings.user, host),
            address: resolve_address(host),
            options,
        };

        let output = session
            .command("true")
            .output()
            .map_err(|e| MirrorError::Connection(format!("ssh {}: {}", host, e)))?;
        if !output.status.success() {
            return Err(MirrorError::Connection(format!(
                "ssh {}: {}",
                session.destination,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        info!(host, address = %session.address, "connected");
        Ok(session)
    }

    fn command(&self, remote_command: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(&self.options)
            .arg(&self.destination)
            .arg("--")
            .arg(remote_command);
        cmd
    }
}

impl RemoteShell for SshSession {
    fn exec(&self, command: &str) -> Result<CommandOutput> {
        debug!(host = %self.destination, command, "remote run");
        let output = self
            .command(command)
            .output()
            .map_err(|e| MirrorError::message(format!("ssh {}: {}", self.destination, e)))?;
        Ok(CommandOutput {
            code: output.status.code().unwrap_or(1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    fn stream(&self, command: &str, sink: &mut dyn Write) -> Result<u64> {
        debug!(host = %self.destination, command, "remote stream");
        let mut child = self
            .command(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MirrorError::message(format!("ssh {}: {}", self.destination, e)))?;

        let stderr_reader = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut text = String::new();
                let _ = stderr.read_to_string(&mut text);
                text
            })
        });

        let mut copied = 0u64;
        let copy_result = match child.stdout.take() {
            Some(mut stdout) => copy_chunks(&mut stdout, sink, &mut copied),
            None => Ok(()),
        };
        if copy_result.is_err() {
            let _ = child.kill();
        }
        let status = child.wait()?;
        let stderr = stderr_reader
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        copy_result?;

        if !status.success() {
            return Err(MirrorError::Command {
                command: command.to_string(),
                code: status.code().unwrap_or(1),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(copied)
    }

    fn address(&self) -> &str {
        &self.address
    }
}

fn copy_chunks(source: &mut dyn Read, sink: &mut dyn Write, copied: &mut u64) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK];
    loop {
        let n = source.read(&mut buf)?;
        if n == 0 {
            return Ok(());
        }
        sink.write_all(&buf[..n])?;
        sink.flush()?;
        *copied += n as u64;
    }
}

fn resolve_address(host: &str) -> String {
    (host, 22)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| host.to_string())
}

/// Quotes `value` for safe interpolation into a POSIX shell command line.
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-=,:@+".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn shell_join(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| shell_quote(w))
        .collect::<Vec<_>>()
        .join(" ")
}
