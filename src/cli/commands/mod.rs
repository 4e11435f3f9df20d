//! CLI command modules

pub mod add;
pub mod config;
pub mod discover;
pub mod elt;
pub mod init;
pub mod invoke;
pub mod list;
pub mod profile;
pub mod remove;
pub mod schedule;
