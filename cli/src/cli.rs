use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "farmzone",
    about = "Timed points mining with exactly-once reward claims.",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short = 's',
        long = "store",
        default_value = "db_farmstore",
        global = true,
        help = "RocksDB directory of the local document store"
    )]
    pub store: PathBuf,

    #[arg(
        short = 'r',
        long = "remote",
        global = true,
        help = "JSON-RPC endpoint of a remote store, e.g. http://127.0.0.1:3000/api"
    )]
    pub remote: Option<String>,

    #[arg(short = 'u', long = "user", global = true, help = "User id (defaults to the identity file)")]
    pub user: Option<String>,

    #[arg(short = 'i', long = "identity", global = true)]
    pub identity_path: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Print verbose output", global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {

    // Account Commands

    Register {
        #[arg(long = "referred-by", help = "User id of the member who referred you")]
        referred_by: Option<String>,
    },

    // Mining Commands

    Start {},
    Claim {
        #[arg(short = 'y', long = "yes", help = "Skip the confirmation prompt")]
        yes: bool,
    },
    Status {},
    Watch {
        #[arg(long = "auto-claim", help = "Claim as soon as the session matures")]
        auto_claim: bool,

        #[arg(long = "repeat", requires = "auto_claim", help = "Start a new session after each claim")]
        repeat: bool,
    },

    // Admin Commands

    #[command(subcommand)]
    Settings(SettingsCommands),

    Web {
        #[arg(help = "Port to run the web RPC service on")]
        port: Option<u16>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SettingsCommands {
    Show {},
    Set {
        #[arg(long = "duration", help = "Session length in hours")]
        duration: Option<f64>,

        #[arg(long = "reward", help = "Reward per completed session")]
        reward: Option<f64>,

        #[arg(long = "referral-bonus", help = "Bonus per referral at each milestone")]
        referral_bonus: Option<f64>,

        #[arg(long = "referral-milestone", help = "Referrals needed per milestone")]
        referral_milestone: Option<u64>,
    },
}
