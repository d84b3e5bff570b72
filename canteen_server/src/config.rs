use std::env;

use canteen_common::parse_flag;
use chrono::Duration;
use log::*;

const DEFAULT_CANTEEN_HOST: &str = "127.0.0.1";
const DEFAULT_CANTEEN_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/canteen.db";
const DEFAULT_WALLET_DATABASE_URL: &str = "sqlite://data/canteen_wallet.db";
const DEFAULT_UNPAID_ORDER_TIMEOUT: Duration = Duration::minutes(10);
const DEFAULT_EXPIRY_INTERVAL: Duration = Duration::seconds(60);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The wallet ledger lives in a database of its own.
    pub wallet_database_url: String,
    /// Orders that are still unpaid after this long are cancelled and their stock released.
    pub unpaid_order_timeout: Duration,
    /// How often the expiry worker looks for unpaid orders.
    pub expiry_interval: Duration,
    /// If true, customers are notified when their unpaid orders are cancelled by the expiry worker.
    pub notify_on_expiry: bool,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address in the access log, rather
    /// than the connection's remote address.
    pub use_x_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CANTEEN_HOST.to_string(),
            port: DEFAULT_CANTEEN_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            wallet_database_url: DEFAULT_WALLET_DATABASE_URL.to_string(),
            unpaid_order_timeout: DEFAULT_UNPAID_ORDER_TIMEOUT,
            expiry_interval: DEFAULT_EXPIRY_INTERVAL,
            notify_on_expiry: true,
            use_x_forwarded_for: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CANTEEN_HOST").ok().unwrap_or_else(|| DEFAULT_CANTEEN_HOST.into());
        let port = env::var("CANTEEN_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CANTEEN_PORT. {e} Using the default, {DEFAULT_CANTEEN_PORT}, \
                         instead."
                    );
                    DEFAULT_CANTEEN_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CANTEEN_PORT);
        let database_url = env::var("CANTEEN_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CANTEEN_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let wallet_database_url = env::var("CANTEEN_WALLET_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CANTEEN_WALLET_DATABASE_URL is not set. Using the default, {DEFAULT_WALLET_DATABASE_URL}.");
            DEFAULT_WALLET_DATABASE_URL.to_string()
        });
        let unpaid_order_timeout = duration_from_env(
            "CANTEEN_UNPAID_ORDER_TIMEOUT",
            "minutes",
            Duration::minutes,
            DEFAULT_UNPAID_ORDER_TIMEOUT.num_minutes(),
        );
        let expiry_interval = duration_from_env(
            "CANTEEN_EXPIRY_INTERVAL",
            "seconds",
            Duration::seconds,
            DEFAULT_EXPIRY_INTERVAL.num_seconds(),
        );
        let notify_on_expiry = flag_from_env("CANTEEN_NOTIFY_ON_EXPIRY", true);
        let use_x_forwarded_for = flag_from_env("CANTEEN_USE_X_FORWARDED_FOR", false);
        Self {
            host,
            port,
            database_url,
            wallet_database_url,
            unpaid_order_timeout,
            expiry_interval,
            notify_on_expiry,
            use_x_forwarded_for,
        }
    }
}

/// Reads a positive whole number of `unit`s from the environment, falling back to `default` if the variable is unset or
/// invalid.
fn duration_from_env(var: &str, unit: &str, to_duration: fn(i64) -> Duration, default: i64) -> Duration {
    let value = env::var(var)
        .map_err(|_| info!("🪛️ {var} is not set. Using the default value of {default} {unit}."))
        .and_then(|s| {
            s.parse::<i64>().map_err(|e| warn!("🪛️ Invalid configuration value for {var}. {e}")).and_then(|v| {
                if v > 0 {
                    Ok(v)
                } else {
                    warn!("🪛️ {var} must be positive, but was {v}. Using the default value of {default} {unit}.");
                    Err(())
                }
            })
        })
        .unwrap_or(default);
    to_duration(value)
}

fn flag_from_env(var: &str, default: bool) -> bool {
    match env::var(var) {
        Ok(s) => parse_flag(&s).unwrap_or_else(|| {
            warn!("🪛️ {var} should be true or false, but was '{s}'. Using the default value of {default}.");
            default
        }),
        Err(_) => default,
    }
}
