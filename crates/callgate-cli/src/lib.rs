//! callgate CLI — library half of the `callgate` binary.
//!
//! Command implementations live here so integration tests can drive them
//! without spawning the binary.

pub mod commands;
