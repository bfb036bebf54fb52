//! Shared helpers for integration tests.
//!
//! Each test binary compiles its own copy; not every binary exercises
//! every helper.
#![allow(dead_code)]

pub mod behaviors;
pub mod fixtures;

#[allow(unused_imports)]
pub use behaviors::*;
#[allow(unused_imports)]
pub use fixtures::*;
