//! Deterministic generative art keyed by transaction hashes, shown on an
//! infinite pan/zoom grid.

pub mod animation;
pub mod art;
pub mod cache;
pub mod cell_index;
pub mod config;
pub mod error_codes;
pub mod noise;
pub mod prng;
pub mod renderer;
pub mod session;
pub mod sketch;
pub mod source;
pub mod viewport;
