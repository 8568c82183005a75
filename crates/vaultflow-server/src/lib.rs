#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;

pub mod handler;
pub mod state;

pub use crate::error::{ApiError, Result};
pub use crate::handler::routes;
pub use crate::state::AppState;

/// Tracing target for server operations.
pub const TRACING_TARGET: &str = "vaultflow_server";
