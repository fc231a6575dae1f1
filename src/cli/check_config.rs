//! Handler for the `check-config` command.

use std::path::Path;

use crate::cli::output;
use crate::config::Config;
use crate::error::Result;

/// Load and validate configuration without running a task.
pub fn execute(config_path: &Path) -> Result<()> {
    output::section("Configuration Check");
    output::field("Config file", config_path.display());

    let config = Config::load(config_path)?;
    config.validate()?;
    output::success("Configuration is valid");

    output::section("Summary");
    output::field("Database URL", &config.database_url);
    output::field("Marketplace base URL", &config.http.base_url);
    output::field("HTTP retry attempts", config.http.retry_attempts);
    output::field(
        "Rate limit",
        format!(
            "{}/s spacing, {}/min, {}/hour",
            config.rate_limit.per_second_ms, config.rate_limit.per_minute, config.rate_limit.per_hour
        ),
    );
    output::field(
        "Ready-in-days range",
        format!(
            "[{}, {}] default {}",
            config.supply.ready_days_min, config.supply.ready_days_max, config.supply.ready_days_default
        ),
    );
    output::field("Log format", format!("{:?}", config.logging.format));

    Ok(())
}
