//! External engine execution.
//!
//! Spawns engine binaries without a shell, enforces timeouts, and trims their
//! output before it reaches callers.

mod output;
mod subprocess;

pub use output::sanitize_output;
pub use subprocess::{run_command, SubprocessBuilder, SubprocessResult};
