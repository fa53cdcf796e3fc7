pub use todosync_cli::cli;
pub use todosync_cli::commands;
pub use todosync_cli::config;
pub use todosync_cli::{run, run_blocking};

pub use todosync_core as core;
pub use todosync_core::model;
pub use todosync_core::query;
pub use todosync_core::{AppConfig, TodoSync, ViewSnapshot};
