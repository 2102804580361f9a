//! # Standings
//!
//! Acquisition of contest standings from competitive-programming judges.
//!
//! A caller hands a [`ContestDescriptor`](models::ContestDescriptor) to the
//! [`AdapterRegistry`](adapter::AdapterRegistry), which picks the judge
//! adapter. The adapter:
//!
//! - **Resolves** the data source and standings URL of the contest
//! - **Lists** scoreboard pages through a shared [`Requester`](requester::Requester)
//! - **Enriches** rows with per-participant details on a bounded
//!   [`FetchEngine`](engine::FetchEngine)
//! - **Normalizes** everything into one
//!   [`StandingsDocument`](models::StandingsDocument)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use standings::prelude::*;
//!
//! let config = StandingsConfig::from_file("standings.json")?;
//! let registry = AdapterRegistry::from_config(&config)?;
//! let adapter = registry.for_descriptor(&descriptor).expect("supported judge");
//! let document = adapter.fetch_standings(&descriptor, None, None).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod adapter;
pub mod config;
pub mod engine;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod observability;
pub mod requester;
pub mod retry;
pub mod table;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::adapter::{Adapter, AdapterRegistry, FetchPhase, PhaseTracker, Session};
    pub use crate::config::StandingsConfig;
    pub use crate::engine::{EngineHandle, FetchEngine, FetchProgress, UnitOutcome};
    pub use crate::errors::{FetchError, Result, StandingsError};
    pub use crate::models::{
        ContestDescriptor, ParticipantRow, Place, ProblemDescriptor, ProblemResult, ProblemSet, ProfileInfo,
        ScoreValue, StandingsDocument, Statistics,
    };
    pub use crate::observability::{init_tracing, LogFormat};
    pub use crate::requester::{HttpRequester, Method, Request, Requester, Response};
    pub use crate::retry::RetryPolicy;
}
