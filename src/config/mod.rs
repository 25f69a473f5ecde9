//! Compiler configuration for awflow.
//!
//! This module defines the `CompilerConfig` struct that represents the optional
//! `.github/awflow.yaml` file. Every field has a default, so a repository without
//! the file compiles with stock settings. Unknown fields are kept for forward
//! compatibility.

mod model;
mod operations;

#[cfg(test)]
mod tests;

pub use model::CompilerConfig;
pub use operations::CONFIG_FILE;
