//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::backfill::BackfillArgs;
use crate::commands::balance::BalanceArgs;
use crate::commands::clock::ClockArgs;
use crate::commands::edit::EditArgs;
use crate::commands::holidays::HolidaysArgs;
use crate::commands::mark::MarkArgs;
use crate::commands::show::ShowArgs;

/// Personal timesheet.
///
/// Records clock-in and clock-out times per day, fills gaps from the
/// system auth logs and keeps a running flex time balance.
#[derive(Debug, Parser)]
#[command(name = "ts", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a clock-in or clock-out time.
    Clock(ClockArgs),

    /// Correct the times stored for a day.
    Edit(EditArgs),

    /// Mark a day as taken from the flex balance.
    Flex(MarkArgs),

    /// Mark a day as paid time off.
    Pto(MarkArgs),

    /// List entries for a period.
    Show(ShowArgs),

    /// Fill the timesheet from auth log activity.
    Backfill(BackfillArgs),

    /// Compute or record the flex time balance.
    Balance(BalanceArgs),

    /// Import or list holidays.
    Holidays(HolidaysArgs),
}
