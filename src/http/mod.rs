//! Internal HTTP layer for opencode server communication.
//!
//! This module is `pub(crate)`; the pieces callers need are re-exported from
//! the crate root.

pub(crate) mod common;
pub(crate) mod error_helpers;
pub(crate) mod loud_wire;
pub(crate) mod sse_parser;
