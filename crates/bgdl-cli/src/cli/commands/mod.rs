//! CLI command handlers. Each command is in its own file.

mod add;
mod import;
mod run;
mod session;
mod status;

pub use add::run_add;
pub use import::run_import;
pub use run::run_queue;
pub use status::run_status;

#[cfg(test)]
pub(crate) use status::progress_cell;
