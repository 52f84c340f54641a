use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "bf-cli")]
#[command(about = "Blockflow command interpreter CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Execute one block of a flowchart file to completion.
    Run(RunArgs),
    /// Validate a flowchart file and print each command's summary.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    /// Path to the flowchart JSON file.
    pub(crate) flowchart: String,
    /// Block to execute; defaults to the first block in the file.
    #[arg(long = "block")]
    pub(crate) block: Option<String>,
    #[arg(long = "seed")]
    pub(crate) seed: Option<u32>,
    /// Delay each command entry by this many milliseconds.
    #[arg(long = "step-delay-ms")]
    pub(crate) step_delay_ms: Option<u64>,
    /// Simulated tick interval while the block is executing.
    #[arg(long = "tick-ms", default_value_t = 16)]
    pub(crate) tick_ms: u64,
    /// Template printed after the run, with {$name} placeholders.
    #[arg(long = "report")]
    pub(crate) report: Option<String>,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    pub(crate) flowchart: String,
}
