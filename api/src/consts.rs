pub const USERS: &str                      = "users";
pub const SETTINGS: &str                   = "settings";

pub const TICKER: &str                     = "FZ";
pub const REFERRAL_CODE_PREFIX: &str       = "FZ-";
pub const REFERRAL_CODE_LEN: usize         = 6;

pub const ONE_SECOND_MS: i64               = 1_000;
pub const SECONDS_PER_HOUR: i64            = 3_600;
pub const ONE_HOUR_MS: i64                 = SECONDS_PER_HOUR * ONE_SECOND_MS;

pub const DEFAULT_MINING_DURATION_HOURS: f64 = 8.0;
pub const DEFAULT_TOTAL_REWARD: f64          = 6.0;
pub const DEFAULT_REFERRAL_BONUS: f64        = 5.0;
pub const DEFAULT_REFERRAL_MILESTONE: u64    = 100;
// One hundred years.
pub const MAX_MINING_DURATION_HOURS: f64     = 876_000.0;

pub const LEVEL_MILESTONES: [f64; 5]       = [0.0, 500.0, 1_000.0, 2_000.0, 5_000.0];
pub const MAX_LEVEL: usize                 = LEVEL_MILESTONES.len() - 1;

// Transaction log
pub const TX_TYPE_MINING: &str             = "mining";
pub const TX_STATUS_COMPLETED: &str        = "completed";
pub const TX_DESCRIPTION_MINING: &str      = "Mining Reward";

// Countdown label shown once a session has matured
pub const CLAIM_LABEL: &str                = "Claim";
pub const START_LABEL: &str                = "Start Mining";

// Decimal places shown for the live earned amount
pub const EARNED_DISPLAY_DECIMALS: usize   = 6;
