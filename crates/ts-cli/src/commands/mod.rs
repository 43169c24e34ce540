//! CLI subcommand implementations.

pub mod backfill;
pub mod balance;
pub mod clock;
pub mod edit;
pub mod holidays;
pub mod mark;
pub mod show;
pub mod util;
