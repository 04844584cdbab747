//! Session orchestration module.

mod orchestrator;
mod rig;
mod roster;
mod stats;

pub use orchestrator::{Session, SessionOptions};
pub use stats::SessionStats;
