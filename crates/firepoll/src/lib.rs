//! Public facade crate for `firepoll`.
//!
//! This crate intentionally contains no IO or provider-specific logic.
//! It re-exports the backend-agnostic types/traits from `firepoll-core`.

pub use firepoll_core::*;
