//! afdo-core
//!
//! Core library for bisecting AutoFDO profiles.
//!
//! Given a profile that produces a working build and one that does not, plus
//! a decider that can judge any mix of the two, this crate finds the function
//! profiles (alone or in combination) that make the build go bad.
//!
//! All substantive logic lives here so it is fully testable; the CLI only
//! wires files and an external decider script into it.

pub mod analysis;
pub mod bisect;
pub mod config;
pub mod decider;
pub mod profile;
pub mod state;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
