pub mod backup;
pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod image;
pub mod mount;
pub mod remote;
pub mod types;
pub mod util;

#[cfg(test)]
mod testing;
