use anyhow::Result;
use std::sync::Arc;

use farm_client::{register_user, StoreError, UserStore};

use crate::cli::{Cli, Commands};
use crate::log;

pub async fn handle_register_command<S: UserStore>(
    cli: Cli,
    store: Arc<S>,
    user_id: &str,
) -> Result<()> {
    if let Commands::Register { referred_by } = cli.command {
        log::print_divider();
        log::print_info("Registering user...");

        let doc = match register_user(store.as_ref(), user_id, referred_by.as_deref()).await {
            Ok(doc) => doc,
            Err(StoreError::UserExists(_)) => {
                log::print_error("This user is already registered");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        log::print_section_header("User Registered");
        log::print_message(&format!("User: {}", user_id));
        if let Some(code) = &doc.referral_code {
            log::print_message(&format!("Referral code: {}", code));
        }
        if let Some(referrer) = &doc.referred_by {
            log::print_message(&format!("Referred by: {}", referrer));
        }

        log::print_divider();
        log::print_info("Start your first session:");
        log::print_title("farmzone start");
        log::print_divider();
    }
    Ok(())
}
