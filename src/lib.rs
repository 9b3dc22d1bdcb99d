//! Forestry inventory processing
//!
//! Reads a field sheet of nested sampling plots (S1/S2 trees, R1..R3
//! regeneration) and derives per-tree metrics (DAP, basal area, volume,
//! Z-score), per-level indicators and sampling errors.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
