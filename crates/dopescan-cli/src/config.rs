//! Job configuration: built-in defaults, the TOML job file, `-S key=value` overrides and
//! command-line flags, merged in that order of increasing precedence.

pub mod builder;
pub mod defaults;
pub mod file;
pub mod models;
