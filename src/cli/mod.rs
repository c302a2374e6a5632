//! # CLI Module
//!
//! ### `serve`
//!
//! ```bash
//! objrouter serve --config config/config.yaml --addr 127.0.0.1:8080
//! ```
//!
//! Logging is configured from `OBJR_LOG_*`, the coroutine stack from
//! `OBJR_STACK_SIZE`.
//!
//! ### `issue-token`
//!
//! ```bash
//! objrouter issue-token --config config/config.yaml --user name://Users/alice --role Admin
//! ```
//!
//! Prints a token for the given identity, signed with the configured secret.
//! Handy for calling role-protected actions from scripts.

mod commands;


pub use commands::{issue_token, run, run_cli, Cli, Commands};
