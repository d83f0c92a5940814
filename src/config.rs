use std::path::PathBuf;
use std::{env, io};

use serde::Serialize;
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::lease::MIN_LEASE_TTL_SECS;
use crate::transform::LocationPolicy;

const DEFAULT_PAGE_SIZE: usize = 100;
const DEFAULT_LEASE_TTL_SECS: u64 = 900;
const DEFAULT_LEASE_NAME: &str = "restaurant-normalization";

#[derive(Clone, Debug, Serialize)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub page_size: usize,
    pub location_policy: LocationPolicy,
    pub strict_fields: bool,
    pub lease_name: String,
    pub lease_ttl_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("restaurant-catalog.db"),
            page_size: DEFAULT_PAGE_SIZE,
            location_policy: LocationPolicy::Skip,
            strict_fields: false,
            lease_name: DEFAULT_LEASE_NAME.to_string(),
            lease_ttl_secs: DEFAULT_LEASE_TTL_SECS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        load_dotenv_if_applicable();
        let defaults = Self::default();
        Ok(Self {
            database_path: env::var("DATABASE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            page_size: parse_usize("PIPELINE_PAGE_SIZE", DEFAULT_PAGE_SIZE).max(1),
            location_policy: parse_location_policy("PIPELINE_LOCATION_POLICY")?,
            strict_fields: parse_bool("PIPELINE_STRICT_FIELDS", false),
            lease_name: env::var("PIPELINE_LEASE_NAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.lease_name),
            lease_ttl_secs: parse_u64("PIPELINE_LEASE_TTL_SECS", DEFAULT_LEASE_TTL_SECS)
                .max(MIN_LEASE_TTL_SECS),
        })
    }
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_location_policy(key: &str) -> AppResult<LocationPolicy> {
    match env::var(key) {
        Ok(value) if value.trim().is_empty() => Ok(LocationPolicy::default()),
        Ok(value) => LocationPolicy::parse(&value).ok_or_else(|| {
            AppError::Config(format!(
                "{key} must be one of skip, zero or omit (got `{value}`)"
            ))
        }),
        Err(_) => Ok(LocationPolicy::default()),
    }
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}
