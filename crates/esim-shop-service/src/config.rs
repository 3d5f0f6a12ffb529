//! Service configuration.

use std::str::FromStr;
use std::time::Duration;

use esim_shop_store::DEFAULT_PAYMENT_METHOD_TTL_DAYS;

/// Card number the simulated gateway declines unless configured otherwise.
pub const DEFAULT_DECLINED_CARD_NUMBER: &str = "4000000000000002";

/// Card number the simulated gateway times out on unless configured otherwise.
pub const DEFAULT_TIMEOUT_CARD_NUMBER: &str = "4000000000000119";

/// Longest accepted payment method lifetime, in days.
pub const MAX_PAYMENT_METHOD_TTL_DAYS: i64 = 3650;

/// Where payment methods and orders are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// `RocksDB` under `data_dir`.
    RocksDb,
    /// Process memory; lost on restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(format!("unknown storage backend: {other}")),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/esim-shop").
    pub data_dir: String,

    /// Storage backend (default: `RocksDb`).
    pub storage_backend: StorageBackend,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Seed demo cards for users with no saved payment methods.
    pub seed_demo_payment_methods: bool,

    /// Days a payment method collection lives after its last write.
    pub payment_method_ttl_days: i64,

    /// Simulated order processing latency in milliseconds.
    pub order_processing_latency_ms: u64,

    /// Card numbers (digits only) the simulated gateway declines.
    pub declined_card_numbers: Vec<String>,

    /// Card numbers (digits only) the simulated gateway never answers for.
    pub timeout_card_numbers: Vec<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            storage_backend: std::env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.parse() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        tracing::warn!(error = %e, "Ignoring STORAGE_BACKEND");
                        None
                    }
                })
                .unwrap_or(defaults.storage_backend),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: env_parse("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: env_parse("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            seed_demo_payment_methods: std::env::var("SEED_DEMO_PAYMENT_METHODS")
                .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.seed_demo_payment_methods),
            payment_method_ttl_days: env_parse("PAYMENT_METHOD_TTL_DAYS")
                .map_or(defaults.payment_method_ttl_days, clamp_ttl_days),
            order_processing_latency_ms: env_parse("ORDER_PROCESSING_LATENCY_MS")
                .unwrap_or(defaults.order_processing_latency_ms),
            declined_card_numbers: std::env::var("DECLINED_CARD_NUMBERS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.declined_card_numbers),
            timeout_card_numbers: std::env::var("TIMEOUT_CARD_NUMBERS")
                .map(|s| split_list(&s))
                .unwrap_or(defaults.timeout_card_numbers),
        }
    }

    /// Simulated order processing latency.
    #[must_use]
    pub fn order_processing_latency(&self) -> Duration {
        Duration::from_millis(self.order_processing_latency_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/esim-shop".into(),
            storage_backend: StorageBackend::RocksDb,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            seed_demo_payment_methods: false,
            payment_method_ttl_days: DEFAULT_PAYMENT_METHOD_TTL_DAYS,
            order_processing_latency_ms: 1500,
            declined_card_numbers: vec![DEFAULT_DECLINED_CARD_NUMBER.into()],
            timeout_card_numbers: vec![DEFAULT_TIMEOUT_CARD_NUMBER.into()],
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Clamp a configured payment method lifetime to `1..=MAX_PAYMENT_METHOD_TTL_DAYS`.
fn clamp_ttl_days(days: i64) -> i64 {
    let clamped = days.clamp(1, MAX_PAYMENT_METHOD_TTL_DAYS);
    if clamped != days {
        tracing::warn!(
            configured = days,
            used = clamped,
            "PAYMENT_METHOD_TTL_DAYS out of range"
        );
    }
    clamped
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
