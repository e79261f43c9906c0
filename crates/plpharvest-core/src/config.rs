use std::path::PathBuf;

use crate::app_config::HarvestConfig;
use crate::ConfigError;

pub const DEFAULT_SITE_BASE_URL: &str = "https://www.asos.com";
pub const DEFAULT_API_BASE_URL: &str = "https://www.asos.com/api/product/search/v2";
pub const DEFAULT_MEDIA_BASE_URL: &str = "https://images.asos-media.com/products";

/// Load run configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_harvest_config() -> Result<HarvestConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_harvest_config_from_env()
}

/// Load run configuration from environment variables already in the process.
///
/// Unlike [`load_harvest_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn load_harvest_config_from_env() -> Result<HarvestConfig, ConfigError> {
    build_harvest_config(|key| std::env::var(key))
}

/// Build run configuration using the provided env-var lookup function.
///
/// Every variable is optional. Parsing is decoupled from the process
/// environment so it can be tested with a plain `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if a variable is set to an invalid value.
pub fn build_harvest_config<F>(lookup: F) -> Result<HarvestConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_price = |var: &str| -> Result<Option<f64>, ConfigError> {
        let Some(raw) = optional(var) else {
            return Ok(None);
        };
        let value = raw.parse::<f64>().map_err(|e| invalid(var, e.to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid(var, format!("{raw} is not a non-negative price")));
        }
        Ok(Some(value))
    };

    let parse_bool = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var).as_deref().map(str::to_ascii_lowercase).as_deref() {
            None => Ok(default),
            Some("1" | "true" | "yes" | "on") => Ok(true),
            Some("0" | "false" | "no" | "off") => Ok(false),
            Some(other) => Err(invalid(var, format!("{other} is not a boolean"))),
        }
    };

    let keyword = or_default("HARVEST_KEYWORD", "men");
    let start_url = optional("HARVEST_START_URL");
    let min_price = parse_price("HARVEST_MIN_PRICE")?;
    let max_price = parse_price("HARVEST_MAX_PRICE")?;
    if let (Some(min), Some(max)) = (min_price, max_price) {
        if min > max {
            return Err(invalid(
                "HARVEST_MIN_PRICE",
                format!("{min} is greater than HARVEST_MAX_PRICE {max}"),
            ));
        }
    }

    let sort_by = or_default("HARVEST_SORT_BY", "pricedesc");
    let results_wanted = parse_usize("HARVEST_RESULTS_WANTED", "20")?;
    if results_wanted == 0 {
        return Err(invalid(
            "HARVEST_RESULTS_WANTED",
            "must be a positive integer".to_string(),
        ));
    }

    let detail_mode = parse_bool("HARVEST_DETAIL_MODE", false)?;
    let batch_size = parse_usize("HARVEST_BATCH_SIZE", "25")?.max(1);
    let max_pages = parse_u32("HARVEST_MAX_PAGES", "200")?;
    let max_concurrency = parse_usize("HARVEST_MAX_CONCURRENCY", "4")?.max(1);
    let request_timeout_secs = parse_u64("HARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    let api_timeout_secs = parse_u64("HARVEST_API_TIMEOUT_SECS", "15")?;
    let api_max_retries = parse_u32("HARVEST_API_MAX_RETRIES", "2")?;
    let api_retry_backoff_base_secs = parse_u64("HARVEST_API_RETRY_BACKOFF_BASE_SECS", "1")?;

    let api_base_url = or_default("HARVEST_API_BASE_URL", DEFAULT_API_BASE_URL);
    let site_base_url = or_default("HARVEST_SITE_BASE_URL", DEFAULT_SITE_BASE_URL);
    let media_base_url = or_default("HARVEST_MEDIA_BASE_URL", DEFAULT_MEDIA_BASE_URL);
    let user_agent = or_default(
        "HARVEST_USER_AGENT",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    );
    let proxy_url = optional("HARVEST_PROXY_URL");
    let output_path = PathBuf::from(or_default("HARVEST_OUTPUT_PATH", "products.jsonl"));
    let log_level = or_default("HARVEST_LOG_LEVEL", "info");

    Ok(HarvestConfig {
        keyword,
        start_url,
        min_price,
        max_price,
        sort_by,
        results_wanted,
        detail_mode,
        batch_size,
        max_pages,
        max_concurrency,
        request_timeout_secs,
        api_timeout_secs,
        api_max_retries,
        api_retry_backoff_base_secs,
        api_base_url,
        site_base_url,
        media_base_url,
        user_agent,
        proxy_url,
        output_path,
        log_level,
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
