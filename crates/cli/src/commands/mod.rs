//! CLI command implementations

mod resolve;
mod tools;

pub use resolve::{cmd_resolve, cmd_tasks};
pub use tools::cmd_tools;
