//! Configuration for the relay process: every key from the External
//! Interfaces section is an environment variable, loaded once at startup.

use clap::Parser;
use std::time::Duration;

/// CLI overrides for local development; the primary loading path is pure
/// environment variables (the source service never used a config file).
#[derive(Parser, Debug)]
#[command(name = "ondemand-minting-relay")]
#[command(about = "Relays on-chain CUDOS payments into marketplace NFT mints")]
struct CliArgs {
    #[arg(long, env = "STATE_FILE")]
    state_file: Option<String>,
    #[arg(long, env = "PORT")]
    port: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub wallet_mnemonic: String,
    pub chain_id: String,
    pub chain_rpc: String,
    pub chain_grpc: String,
    pub bech32_prefix: String,
    pub catalog_backend: String,
    pub catalog_api_key: String,
    pub state_file: String,
    pub starting_height: i64,
    pub max_retries: u32,
    pub retry_interval: Duration,
    pub relay_interval: Duration,
    pub payment_denom: String,
    pub gas_price: u128,
    pub port: u16,
    pub sendgrid_api_key: String,
    pub email_from: String,
    pub service_email: String,
    pub email_send_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required configuration key {0} is missing or empty")]
    Missing(&'static str),
    #[error("invalid value for {key}: {source}")]
    InvalidDuration {
        key: &'static str,
        source: humantime::DurationError,
    },
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

impl Config {
    /// Loads configuration from environment variables (`.env` supported via
    /// `dotenvy`), with CLI overrides for a small set of local-dev knobs.
    /// Required keys return `ConfigError::Missing` rather than panicking.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();

        let wallet_mnemonic = required_env("WALLET_MNEMONIC")?;
        let chain_id = required_env("CHAIN_ID")?;
        let chain_rpc = required_env("CHAIN_RPC")?;
        let chain_grpc = required_env("CHAIN_GRPC")?;
        let catalog_backend = first_non_empty_env(&["AURA_POOL_BACKEND", "CUDOS_MARKETS_BACKEND"])
            .ok_or(ConfigError::Missing("AURA_POOL_BACKEND"))?;

        let bech32_prefix = env_or("CHAIN_BECH32_PREFIX", "cudos");
        let catalog_api_key = env_or("AURA_POOL_API_KEY", "");
        let state_file = cli_args
            .state_file
            .unwrap_or_else(|| env_or("STATE_FILE", "state.json"));
        let starting_height = parse_env_or("STARTING_HEIGHT", 1)?;
        let max_retries = parse_env_or("MAX_RETRIES", 10)?;
        let retry_interval = parse_duration_env_or("RETRY_INTERVAL", "30s")?;
        let relay_interval = parse_duration_env_or("RELAY_INTERVAL", "5s")?;
        let payment_denom = env_or("PAYMENT_DENOM", "acudos");
        let gas_price = parse_env_or("GAS_PRICE", 5_000_000_000_000)?;
        let port = cli_args.port.unwrap_or_else(|| parse_env_or("PORT", 3000).unwrap_or(3000));
        let sendgrid_api_key = env_or("SENDGRID_API_KEY", "");
        let email_from = env_or("EMAIL_FROM", "");
        let service_email = env_or("SERVICE_EMAIL", "");
        let email_send_interval = parse_duration_env_or("EMAIL_SEND_INTERVAL", "30m")?;

        Ok(Config {
            wallet_mnemonic,
            chain_id,
            chain_rpc,
            chain_grpc,
            bech32_prefix,
            catalog_backend,
            catalog_api_key,
            state_file,
            starting_height,
            max_retries,
            retry_interval,
            relay_interval,
            payment_denom,
            gas_price,
            port,
            sendgrid_api_key,
            email_from,
            service_email,
            email_send_interval,
        })
    }
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    match std::env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn first_non_empty_env(keys: &[&'static str]) -> Option<String> {
    keys.iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

fn parse_duration_env_or(key: &'static str, default: &str) -> Result<Duration, ConfigError> {
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    humantime::parse_duration(&value).map_err(|source| ConfigError::InvalidDuration { key, source })
}
