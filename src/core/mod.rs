//! Core engine module
//!
//! Window, main loop, timing and frame statistics

mod debug;
mod engine;
mod time;

pub use debug::{DebugInfo, FrameStats};
pub use engine::{Engine, EngineConfig, EngineContext, EngineError, Game};
pub use time::Time;
