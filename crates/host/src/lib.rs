//! Host utilities for notebook sessions
//!
//! Resource stats are gathered by invoking the usual system tools and
//! capturing their output; the completion sound is the terminal bell.

pub mod beep;
pub mod probe;

pub use beep::{beep, beep_stdout};
pub use probe::{probe, run_command, CommandOutput, HostStat};
