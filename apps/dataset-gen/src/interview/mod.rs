//! Interview pipeline: the question battery, role-play prompts, the per-pair
//! session engine, call pacing, and the dataset-wide orchestrator.

pub mod engine;
pub mod orchestrator;
pub mod pacing;
pub mod prompts;
pub mod questions;
