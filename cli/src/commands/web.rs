use anyhow::Result;
use std::path::Path;

use farm_network::web_loop;

use crate::log;

const DEFAULT_PORT: u16 = 3000;

pub async fn handle_web_command(store_dir: &Path, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(DEFAULT_PORT);

    log::print_divider();
    log::print_info("Starting web RPC service...");
    log::print_message(&format!("Store: {}", store_dir.display()));
    log::print_message(&format!("Listening on http://127.0.0.1:{}/api", port));

    let store = farm_network::open(store_dir)?;
    web_loop(store, port).await?;
    Ok(())
}
