//! Checksum registry CLI library components.
//!
//! The `cr` binary is a thin dispatcher; command handlers live here so they can
//! be exercised from tests.

pub mod commands;
