//! Project configuration for conduit

pub mod config;
pub mod tool;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use config::{ProjectConfig, CONFIG_VERSION};
pub use tool::ToolConfig;
