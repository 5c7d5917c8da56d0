#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![warn(warnings)]

//! Small helpers shared by the Vacasa Connect crates.

pub mod humantime_serde;
mod secret_string;

pub use secret_string::SecretString;
