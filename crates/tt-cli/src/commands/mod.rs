//! CLI subcommand implementations.

pub mod project;
pub mod report;
pub mod status;
pub mod track;
pub mod util;
