use rand::Rng;
use crate::consts::*;

const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Helper: format a second count as `HH:MM:SS`
pub fn format_time(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Helper: countdown text, `Claim` once nothing is left
pub fn format_remaining(seconds: i64) -> String {
    if seconds > 0 {
        format_time(seconds)
    } else {
        CLAIM_LABEL.to_string()
    }
}

/// Helper: live earned amount with six decimals and the ticker
pub fn format_earned(amount: f64) -> String {
    format!("{:.*} {}", EARNED_DISPLAY_DECIMALS, amount, TICKER)
}

/// Helper: settled amount with two decimals and the ticker
pub fn format_amount(amount: f64) -> String {
    format!("{:.2} {}", amount, TICKER)
}

/// Helper: generate a referral code such as `FZ-7QK2ZD`
pub fn generate_referral_code<R: Rng>(rng: &mut R) -> String {
    let suffix: String = (0..REFERRAL_CODE_LEN)
        .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
        .collect();
    format!("{}{}", REFERRAL_CODE_PREFIX, suffix)
}

/// Helper: generate a log key that sorts by creation time
pub fn generate_push_id<R: Rng>(now: i64, rng: &mut R) -> String {
    format!("{:013x}{:08x}", now.max(0), rng.gen::<u32>())
}
