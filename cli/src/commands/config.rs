use clap::Subcommand;
use serde_json::json;

use crmdesk_client::config::{StoredConfig, config_path, load_stored, save_stored};
use crmdesk_client::{ClientConfig, ConfigError, ConfigOverrides};

use crate::util::{EXIT_USAGE, mask_key, print_error, print_json};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Save the given --api-url/--project-id/--public-key/--timeout-secs
    /// to the config file, keeping any values already stored
    Init,
    /// Show the resolved settings (key masked)
    Show,
}

pub fn run(overrides: ConfigOverrides, command: ConfigCommands) -> i32 {
    let result = match command {
        ConfigCommands::Init => init(overrides),
        ConfigCommands::Show => show(overrides),
    };
    result.unwrap_or_else(|e| {
        print_error(&e.to_body());
        EXIT_USAGE
    })
}

fn init(overrides: ConfigOverrides) -> Result<i32, ConfigError> {
    let stored = merge(load_stored()?.unwrap_or_default(), overrides)?;
    // validate before writing
    ClientConfig::resolve(ConfigOverrides::default(), Some(stored.clone()))?;
    let path = save_stored(&stored)?;
    tracing::info!(path = %path.display(), "config saved");

    Ok(print_json(&json!({
        "path": path.display().to_string(),
        "api_url": stored.api_url,
        "project_id": stored.project_id,
        "public_key": stored.public_key.as_deref().map(mask_key),
        "timeout_secs": stored.timeout_secs,
    })))
}

fn show(overrides: ConfigOverrides) -> Result<i32, ConfigError> {
    let config = ClientConfig::load(overrides)?;
    Ok(print_json(&json!({
        "path": config_path().display().to_string(),
        "api_url": config.base_url(),
        "project_id": config.project_id,
        "public_key": mask_key(&config.public_key),
        "timeout_secs": config.timeout.as_secs(),
    })))
}

fn merge(stored: StoredConfig, overrides: ConfigOverrides) -> Result<StoredConfig, ConfigError> {
    let timeout_secs = match overrides.timeout_secs {
        Some(raw) => Some(
            raw.trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
        ),
        None => stored.timeout_secs,
    };
    Ok(StoredConfig {
        api_url: overrides.api_url.or(stored.api_url),
        project_id: overrides.project_id.or(stored.project_id),
        public_key: overrides.public_key.or(stored.public_key),
        timeout_secs,
    })
}
