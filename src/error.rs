use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("{0}")]
    Message(String),
    #[error("malformed partition listing: {0}")]
    Format(String),
    #[error("{command} failed: {stderr}")]
    Probe { command: String, stderr: String },
    #[error("no partitions found on {0}")]
    NoPartitions(String),
    #[error("no {0} partition found")]
    NoFilesystemPartition(String),
    #[error("filesystem uuid: {0}")]
    Identifier(String),
    #[error("mount {0}")]
    Mount(String),
    #[error("sync engine exited with code {code}: {stderr}")]
    SyncEngine { code: i32, stderr: String },
    #[error("no snapshot of {0} found")]
    NoSnapshot(String),
    #[error("output file size ({local}) does not match remote device size ({remote})")]
    SizeMismatch { local: u64, remote: u64 },
    #[error("connection: {0}")]
    Connection(String),
    #[error("{command} failed with exit code {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },
    #[error("raw copy produced {copied} of {expected} bytes")]
    ShortCopy { expected: u64, copied: u64 },
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parse config: {0}")]
    Parse(String),
    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, MirrorError>;

impl MirrorError {
    pub fn message(msg: impl Into<String>) -> Self {
        MirrorError::Message(msg.into())
    }

    pub fn format(msg: impl Into<String>) -> Self {
        MirrorError::Format(msg.into())
    }
}

impl From<ConfigError> for MirrorError {
    fn from(err: ConfigError) -> Self {
        MirrorError::Config(err)
    }
}
