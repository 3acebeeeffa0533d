mod cli;
mod commands;
mod identity;
mod log;
mod sink;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use env_logger::Env;
use farm_client::RemoteStore;

use cli::{Cli, Commands};
use commands::web;
use identity::{get_identity_path, get_or_create_identity};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    log::print_title("⛏ FARMZONE");

    if let Commands::Web { port } = &cli.command {
        if cli.remote.is_some() {
            return Err(anyhow!("`web` serves the local store; remove --remote"));
        }
        return web::handle_web_command(&cli.store, *port).await;
    }

    let user_id = match cli.user.clone() {
        Some(user_id) => user_id,
        None => {
            let identity_path = get_identity_path(cli.identity_path.clone())?;
            let (identity, created) = get_or_create_identity(&identity_path)?;
            if created {
                log::print_message(&format!("Created a new identity at {}", identity_path.display()));
            }
            identity.user_id
        }
    };
    log::print_message(&format!("User: {}", user_id));

    match cli.remote.clone() {
        Some(url) => {
            log::print_message(&format!("Connected to: {}", url));
            let store = Arc::new(RemoteStore::new(url));
            commands::run(cli, store, user_id).await
        }
        None => {
            let store = farm_network::open(&cli.store)?;
            log::print_message(&format!("Using store: {}", cli.store.display()));
            commands::run(cli, Arc::new(store), user_id).await
        }
    }
}
