//! Command handlers, one module per subcommand.

pub mod check;
pub mod completion;
pub mod config_cmd;
pub mod deploy;
pub mod diff_cmd;
pub mod status_cmd;
pub mod version;
