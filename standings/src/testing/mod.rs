//! Testing utilities for adapters.
//!
//! This module provides:
//! - A scripted [`Requester`](crate::requester::Requester) with a call log
//! - Descriptor and row fixtures

mod fixtures;
mod mocks;

pub use fixtures::{google_round_descriptor, marathon_descriptor, row_with_results, srm_descriptor};
pub use mocks::{connection_error, status_error, ScriptedRequester};
