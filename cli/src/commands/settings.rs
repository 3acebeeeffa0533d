use anyhow::Result;
use std::sync::Arc;

use farm_api::prelude::*;
use farm_client::{load_settings, save_settings, SettingsStore};

use crate::cli::{Cli, Commands, SettingsCommands};
use crate::log;

pub async fn handle_settings_commands<S: SettingsStore>(cli: Cli, store: Arc<S>) -> Result<()> {
    let Commands::Settings(command) = cli.command else {
        return Ok(());
    };

    match command {
        SettingsCommands::Show {} => {
            let settings = load_settings(store.as_ref()).await?;
            print_settings(&settings);
        }
        SettingsCommands::Set {
            duration,
            reward,
            referral_bonus,
            referral_milestone,
        } => {
            let current = load_settings(store.as_ref()).await?;
            let next = apply_overrides(current, duration, reward, referral_bonus, referral_milestone);
            if next == current {
                log::print_message("Nothing to change");
                return Ok(());
            }

            save_settings(store.as_ref(), &next).await?;
            log::print_success("Settings saved");
            print_settings(&next);
        }
    }
    Ok(())
}

fn apply_overrides(
    mut settings: AppSettings,
    duration: Option<f64>,
    reward: Option<f64>,
    referral_bonus: Option<f64>,
    referral_milestone: Option<u64>,
) -> AppSettings {
    if let Some(hours) = duration {
        settings.mining.mining_duration = hours;
    }
    if let Some(reward) = reward {
        settings.mining.total_reward = reward;
    }
    if let Some(bonus) = referral_bonus {
        settings.referral.referral_bonus = bonus;
    }
    if let Some(milestone) = referral_milestone {
        settings.referral.referral_milestone = milestone;
    }
    settings
}

fn print_settings(settings: &AppSettings) {
    let mining = &settings.mining;
    log::print_section_header("Mining Settings");
    log::print_message(&format!("Session length: {} hours", mining.mining_duration));
    log::print_message(&format!("Reward per session: {}", format_amount(mining.total_reward)));
    log::print_count(&format!("Rate: {:.4} {}/hour", mining.reward_per_hour(), TICKER));

    log::print_section_header("Referral Settings");
    log::print_message(&format!("Bonus per referral: {}", format_amount(settings.referral.referral_bonus)));
    log::print_message(&format!("Milestone every {} referrals", settings.referral.referral_milestone));
    log::print_divider();
}
