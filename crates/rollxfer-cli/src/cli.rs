use clap::{Args, Parser, Subcommand};
use rollxfer_core::profile::DataProfile;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rollxfer")]
#[command(about = "Select inspection data of a knitting roll and upload it to cloud backup")]
#[command(after_help = "Run '<command> --help' for detailed options on each command.")]
pub struct Cli {
    /// Override the configuration directory for this invocation
    #[arg(long, global = true, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,
    /// Log every remote command (same as RUST_LOG=debug)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    /// Assumed upload speed in MiB/s for time estimates
    #[arg(long, global = true, value_name = "MIB")]
    pub throughput_mib: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the date folders recorded for a roll
    Dates(RollArgs),
    /// List the cameras recorded for a roll on a date
    Cameras(RollArgs),
    /// List defect types found under the selected cameras
    Defects(RollArgs),
    /// Show which files a doff range selects, their size and upload time
    Plan(SelectArgs),
    /// Upload the files a doff range selects, one at a time
    Upload(UploadArgs),
    /// Upload a whole roll folder in a single batch
    UploadRoll(UploadRollArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RollArgs {
    /// Dataset to work on: mdd, fda, mdd-legacy or full-roll
    #[arg(long, default_value = "mdd")]
    pub profile: DataProfile,
    /// Roll as shown by the roll picker, e.g. "12 - R34"
    #[arg(long)]
    pub roll: String,
    /// Roll date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,
    /// Camera folder to include (repeatable)
    #[arg(long = "camera", value_name = "CAMERA")]
    pub cameras: Vec<String>,
    /// Defect type to include (repeatable)
    #[arg(long = "defect", value_name = "DEFECT")]
    pub defects: Vec<String>,
}

#[derive(Args, Clone, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub roll: RollArgs,
    /// Lowest doff id to include
    #[arg(long)]
    pub min: Option<u64>,
    /// Highest doff id to include
    #[arg(long)]
    pub max: Option<u64>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct TargetArgs {
    /// Mill name used for the backup folder
    #[arg(long)]
    pub mill: Option<String>,
    /// Machine name used for the backup folder
    #[arg(long)]
    pub machine: Option<String>,
    /// Upload script on the inspection machine
    #[arg(long, value_name = "PATH")]
    pub script: Option<String>,
}

#[derive(Args, Clone, Debug)]
pub struct UploadArgs {
    #[command(flatten)]
    pub select: SelectArgs,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Args, Clone, Debug)]
pub struct UploadRollArgs {
    /// Data root to upload from: mdd or fda
    #[arg(long, default_value = "mdd")]
    pub profile: DataProfile,
    /// Roll as shown by the roll picker, e.g. "12 - R34"
    #[arg(long)]
    pub roll: String,
    #[command(flatten)]
    pub target: TargetArgs,
    /// Skip the confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}
