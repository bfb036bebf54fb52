//! Small cross-cutting utilities.

pub mod json_ext;
