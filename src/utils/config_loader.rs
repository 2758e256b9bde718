use std::collections::HashMap;
use std::path::Path;

use anyhow::{anyhow, Result};

use crate::config::clients::{ServiceConfig, VendorConfig};
use crate::config::proc_loader::file_to_config;
use crate::config::proc_validator::validate_service_config;

/// A loaded file together with its validated clients.
pub struct LoadedConfig {
    pub service: ServiceConfig,
    pub clients: HashMap<String, VendorConfig>,
}

pub async fn run(config_path: &str) -> Result<LoadedConfig> {
    let path = Path::new(config_path);
    let service = file_to_config(path)
        .await
        .map_err(|e| anyhow!("Invalid config format: {}", e))?;
    let clients = validate_service_config(&service)
        .await
        .map_err(|errors| anyhow!("config is not valid:\n - {}", errors.join("\n - ")))?;
    Ok(LoadedConfig { service, clients })
}
