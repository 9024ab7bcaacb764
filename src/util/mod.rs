pub mod command;
pub mod paths;
pub mod policy;
