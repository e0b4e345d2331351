//! Storage infrastructure: configuration file persistence.
//!
//! The emulator keeps no runtime state on disk.  The only file it reads is
//! the TOML configuration handled by [`config`]:
//!
//! - Reading it from `--config <path>` or the platform config directory.
//! - Writing a fully-populated default file on request, so users have
//!   something to edit.
//! - Falling back to defaults when no file exists yet.

pub mod config;
