//! Shared state handed to every handler.

use std::path::PathBuf;

use anyhow::Result;

use fitconnect_core::replica::CLIENT_CONFIG_FILE;
use fitconnect_core::{Config, SensayClient};

pub struct AppState {
    pub config: Config,
    pub client: SensayClient,
    /// Where provisioning records the new replica.
    pub client_config_path: PathBuf,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = SensayClient::from_config(&config)?;
        Ok(Self {
            config,
            client,
            client_config_path: PathBuf::from(CLIENT_CONFIG_FILE),
        })
    }
}
