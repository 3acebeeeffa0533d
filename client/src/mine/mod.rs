pub mod claim;
pub mod controller;
pub mod referral;
pub mod register;
pub mod start;
pub mod updater;

pub use claim::{ClaimOutcome, ClaimReceipt};
pub use controller::MiningController;
pub use referral::check_referral_milestones;
pub use register::register_user;
pub use updater::LiveUpdater;
