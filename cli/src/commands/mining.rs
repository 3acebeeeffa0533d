use anyhow::{anyhow, Result};
use chrono::{Local, TimeZone};
use dialoguer::{theme::ColorfulTheme, Confirm};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

use farm_api::prelude::*;
use farm_client::{
    watch_settings, MiningController, ServerClock, SettingsStore, UserStore, SETTINGS_POLL,
};

use crate::cli::{Cli, Commands};
use crate::log;
use crate::sink::TerminalSink;

/// Pause before retrying a failed start or claim while watching.
const WATCH_RETRY: Duration = Duration::from_secs(5);
/// Slack added after a session's end so the store sees it matured.
const MATURITY_SLACK: Duration = Duration::from_millis(250);
const RECENT_TRANSACTIONS: usize = 5;

type Controller<S> = MiningController<S, ServerClock>;

async fn build_controller<S>(
    store: Arc<S>,
    user_id: &str,
    sink: Arc<TerminalSink>,
) -> Result<(Controller<S>, JoinHandle<()>)>
where
    S: UserStore + SettingsStore + 'static,
{
    let clock = Arc::new(ServerClock::new());
    let offset = clock.calibrate(store.as_ref()).await;
    ::log::debug!("clock offset to store: {} ms", offset);

    let (settings, listener) = watch_settings(Arc::clone(&store), SETTINGS_POLL).await?;
    let mut controller = MiningController::new(store, clock, settings, sink.clone())
        .with_hooks(sink.clone())
        .with_events(sink);
    controller.sign_in(user_id);
    Ok((controller, listener))
}

async fn require_document<S: UserStore>(controller: &Controller<S>) -> Result<UserDocument> {
    controller.snapshot().await?.ok_or_else(|| {
        anyhow!("User is not registered. Run `farmzone register` first.")
    })
}

fn format_datetime(ms: i64) -> String {
    match Local.timestamp_millis_opt(ms).single() {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => ms.to_string(),
    }
}

pub async fn handle_mining_commands<S>(cli: Cli, store: Arc<S>, user_id: &str) -> Result<()>
where
    S: UserStore + SettingsStore + 'static,
{
    let live = matches!(cli.command, Commands::Watch { .. });
    let sink = Arc::new(if live { TerminalSink::live() } else { TerminalSink::default() });
    let (controller, listener) = build_controller(store, user_id, sink).await?;

    let result = match cli.command {
        Commands::Start {} => start(&controller).await,
        Commands::Claim { yes } => claim(&controller, yes).await,
        Commands::Status {} => status(&controller).await,
        Commands::Watch { auto_claim, repeat } => watch(&controller, auto_claim, repeat).await,
        _ => Ok(()),
    };

    controller.teardown();
    listener.abort();
    result
}

async fn start<S: UserStore>(controller: &Controller<S>) -> Result<()> {
    require_document(controller).await?;
    log::print_divider();
    log::print_info("Starting mining session...");

    let Ok(record) = controller.start().await else {
        return Ok(());
    };

    if let (Some(start), Some(end)) = (record.mining_start_time, record.mining_end_time) {
        let settings = controller.settings().mining;
        log::print_section_header("Session Started");
        log::print_message(&format!("Started: {}", format_datetime(start)));
        log::print_message(&format!("Ends: {}", format_datetime(end)));
        log::print_count(&format!("Reward: {}", format_amount(settings.total_reward)));

        log::print_divider();
        log::print_info("Follow along:");
        log::print_title("farmzone watch --auto-claim");
        log::print_divider();
    }
    Ok(())
}

async fn claim<S: UserStore>(controller: &Controller<S>, yes: bool) -> Result<()> {
    let doc = require_document(controller).await?;
    let now = controller.now();
    log::print_divider();

    match classify(&doc.mining_record(), now) {
        SessionState::Idle => {
            log::print_error("No mining session to claim. Run `farmzone start` first.");
            return Ok(());
        }
        SessionState::Active { end, .. } => {
            log::print_message(&format!(
                "Not ready to claim yet: {} left",
                format_time(remaining_seconds(end, now))
            ));
            return Ok(());
        }
        SessionState::Claimable { .. } => {}
    }

    let reward = controller.settings().mining.total_reward;
    log::print_message(&format!("Claimable: {}", format_amount(reward)));

    if !yes {
        let proceed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("→ Proceed with claim?")
            .default(true)
            .interact()
            .map_err(|e| anyhow!("Failed to get user input: {}", e))?;
        if !proceed {
            log::print_error("Claim cancelled");
            return Ok(());
        }
    }

    let outcome = controller.claim().await;
    if outcome.credited {
        let doc = require_document(controller).await?;
        log::print_section_header("Reward Claimed");
        log::print_count(&format!("Balance: {}", format_amount(doc.balance)));
        log::print_count(&format!("Total mined: {}", format_amount(doc.total_mined)));
        log::print_divider();
    }
    Ok(())
}

async fn status<S: UserStore>(controller: &Controller<S>) -> Result<()> {
    let doc = require_document(controller).await?;
    let settings = controller.settings();
    let now = controller.now();
    let record = doc.mining_record();
    let state = classify(&record, now);

    log::print_section_header("Account");
    log::print_count(&format!("Balance: {}", format_amount(doc.balance)));
    log::print_count(&format!("Total mined: {}", format_amount(doc.total_mined)));

    let level = level_progress(doc.total_mined);
    if level.level > MAX_LEVEL {
        log::print_message(&format!("Level {} (max)", level.level));
    } else {
        log::print_message(&format!(
            "Level {}: {:.0}% ({:.2} / {:.2} to next)",
            level.level, level.progress, level.current, level.required
        ));
    }
    if let Some(code) = &doc.referral_code {
        log::print_message(&format!("Referral code: {}", code));
    }
    log::print_message(&format!(
        "Referrals: {} (rewards {})",
        doc.referral_count(),
        format_amount(doc.referral_rewards)
    ));

    log::print_section_header("Mining");
    log::print_message(&format!("Status: {}", state.label()));
    log::print_count(&format!(
        "Rate: {:.4} {}/hour",
        settings.mining.reward_per_hour(),
        TICKER
    ));
    if let Some((start, end)) = state.window() {
        log::print_message(&format!("Started: {}", format_datetime(start)));
        log::print_message(&format!("Ends: {}", format_datetime(end)));
        log::print_message(&format!(
            "Remaining: {}",
            format_remaining(remaining_seconds(end, now))
        ));
        log::print_count(&format!(
            "Earned: {}",
            format_earned(earned(&record, &settings.mining, now))
        ));
    }

    if !doc.transactions.is_empty() {
        log::print_section_header("Recent Transactions");
        let mut recent: Vec<_> = doc.transactions.values().collect();
        recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        for tx in recent.into_iter().take(RECENT_TRANSACTIONS) {
            log::print_message(&format!(
                "{}  {}  {}  ({})",
                format_datetime(tx.timestamp),
                tx.description,
                format_amount(tx.amount),
                tx.status
            ));
        }
    }
    log::print_divider();
    Ok(())
}

async fn watch<S: UserStore>(controller: &Controller<S>, auto_claim: bool, repeat: bool) -> Result<()> {
    require_document(controller).await?;
    log::print_divider();
    log::print_info("Watching mining session (Ctrl-C to stop)...");

    loop {
        match controller.resume().await? {
            SessionState::Idle if repeat => {
                if let Err(e) = controller.start().await {
                    if !e.is_retryable() {
                        return Ok(());
                    }
                    if !pause(WATCH_RETRY).await {
                        break;
                    }
                }
            }
            SessionState::Idle => {
                log::print_message("No active session. Run `farmzone start`.");
                break;
            }
            SessionState::Active { end, .. } => {
                let left = (end - controller.now()).max(0) as u64;
                if !pause(Duration::from_millis(left) + MATURITY_SLACK).await {
                    break;
                }
            }
            SessionState::Claimable { .. } if auto_claim => {
                let outcome = controller.claim().await;
                let retry = outcome.error.as_ref().is_some_and(|e| e.is_retryable());
                if retry {
                    if !pause(WATCH_RETRY).await {
                        break;
                    }
                    continue;
                }
                if !repeat {
                    break;
                }
            }
            SessionState::Claimable { .. } => {
                log::end_live();
                log::print_message("Session complete. Run `farmzone claim` to collect.");
                break;
            }
        }
    }

    controller.teardown();
    log::end_live();
    Ok(())
}

/// Sleep unless interrupted. Returns false on Ctrl-C.
async fn pause(duration: Duration) -> bool {
    tokio::select! {
        _ = sleep(duration) => true,
        _ = tokio::signal::ctrl_c() => {
            log::end_live();
            log::print_message("Stopped watching");
            false
        }
    }
}
