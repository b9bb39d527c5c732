//! Test Helper Utilities
//!
//! Shared utilities for testing finna-gen

#![allow(dead_code)]

pub mod lookup_stub;
pub mod store_utils;

pub use lookup_stub::{record, Script, ScriptedLookup};
pub use store_utils::{read_lines, seed_store};
