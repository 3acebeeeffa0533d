pub mod account;
pub mod mining;
pub mod settings;
pub mod web;

use std::sync::Arc;

use anyhow::{anyhow, Result};
use farm_client::{SettingsStore, UserStore};

use crate::cli::{Cli, Commands};

pub async fn run<S>(cli: Cli, store: Arc<S>, user_id: String) -> Result<()>
where
    S: UserStore + SettingsStore + 'static,
{
    match cli.command {
        Commands::Register { .. } => account::handle_register_command(cli, store, &user_id).await,

        Commands::Start { .. } |
        Commands::Claim { .. } |
        Commands::Status { .. } |
        Commands::Watch { .. } => mining::handle_mining_commands(cli, store, &user_id).await,

        Commands::Settings(_) => settings::handle_settings_commands(cli, store).await,

        Commands::Web { .. } => Err(anyhow!("`web` is handled before a store is opened")),
    }
}
