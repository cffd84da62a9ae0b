//! Purpose: Library crate behind the `layerlens` CLI and tests.
//! Exports: `api` (engine and handles), `core` (triangulations, layered structures, errors).
//! Role: Builds and recognizes layered lens space triangulations.
//! Invariants: Core modules prefer explicit inputs/outputs over hidden state.
pub mod api;
pub mod core;
