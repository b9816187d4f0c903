#![deny(missing_docs)]
//! Orchestrator state machine for the knowledge-graph-augmented tutoring
//! agent: Planner, sub-task dispatch, Judge, and Responder, wired into one
//! `plan → execute → aggregate → judge → (plan | respond)` loop per turn.

mod graph;
mod judge;
mod planner;
mod responder;
mod stream_support;

pub use graph::{run_turn, OrchModels, OrchestratorConfig};
pub use judge::{build_judge_prompt, parse_verdict, Verdict};
pub use planner::{build_planner_prompt, parse_plan};
pub use responder::{build_responder_prompt, APOLOGY_TEXT};
pub use stream_support::stream_scope;
