//! Data model shared by every adapter.

mod descriptor;
mod profile;
mod standings;

pub use descriptor::ContestDescriptor;
pub use profile::{ProfileAction, ProfileInfo};
pub use standings::{
    AdvanceFilter, Advancement, Medal, ParticipantRow, Place, ProblemDescriptor, ProblemResult,
    ProblemSet, ScoreValue, Solved, StandingsDocument, StandingsOptions, Statistics, Subscore,
};
