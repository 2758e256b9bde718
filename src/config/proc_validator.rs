//! Whole-file validation with aggregated errors.
//! - every client is validated; the first problem of each is reported
//! - settings invariants (redis url for the redis backend, server address)
//! - at least one client

use std::collections::HashMap;

use tracing::{error, info};

use crate::config::clients::{ServiceConfig, VendorConfig};
use crate::config::settings::{CacheBackend, SettingsConfig};
use crate::observability::metrics::get_metrics;

/// Returns the validated clients by name, or every issue found.
pub async fn validate_service_config(
    cfg: &ServiceConfig,
) -> Result<HashMap<String, VendorConfig>, Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_settings(&cfg.settings, &mut errors);

    if cfg.clients.is_empty() {
        errors.push("config: 'clients' is empty; at least one client required".to_string());
    }

    let mut clients = HashMap::with_capacity(cfg.clients.len());
    for (name, raw) in &cfg.clients {
        match raw.validate(name) {
            Ok(vendor_config) => {
                clients.insert(name.clone(), vendor_config);
            }
            Err(e) => errors.push(e.to_string()),
        }
    }

    if errors.is_empty() {
        info!(clients = clients.len(), "config valid");
        Ok(clients)
    } else {
        errors.sort();
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics()
            .await
            .config_validation_errors
            .inc_by(errors.len() as u64);
        Err(errors)
    }
}

/// SETTINGS VALIDATION
fn validate_settings(settings: &SettingsConfig, errors: &mut Vec<String>) {
    if settings.cache.backend == CacheBackend::Redis
        && settings
            .cache
            .redis_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .is_none()
    {
        errors.push("settings.cache.redis_url is required when backend is 'redis'".to_string());
    }

    if let Some(server) = &settings.server {
        if server.host.is_empty() {
            errors.push("settings.server.host must not be empty".to_string());
        }
        if server.port.parse::<u16>().is_err() {
            errors.push(format!(
                "settings.server.port '{}' must be a valid port",
                server.port
            ));
        }
    }

    if settings.metrics.is_enabled && !settings.metrics.path.starts_with('/') {
        errors.push(format!(
            "settings.metrics.path '{}' must start with '/'",
            settings.metrics.path
        ));
    }

    if let Some(logging) = &settings.logging {
        let level = logging.level.to_ascii_lowercase();
        if !["trace", "debug", "info", "warn", "error"].contains(&level.as_str()) {
            errors.push(format!(
                "settings.logging.level '{}' must be one of trace, debug, info, warn, error",
                logging.level
            ));
        }
    }
}
