//! Input handling module
//!
//! Raw keyboard and mouse state tracking.

mod state;

pub use state::Input;
