use std::env;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Supabase,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "supabase" => Ok(StoreBackend::Supabase),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub store_backend: StoreBackend,
    pub server_port: u16,
    pub notification_poll_interval_secs: u64,
    pub notification_refetch_delay_ms: u64,
    pub search_debounce_ms: u64,
    pub session_idle_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            store_backend: parse_or("STORE_BACKEND", StoreBackend::Supabase),
            server_port: parse_or("PORT", 3000),
            notification_poll_interval_secs: parse_or("NOTIFICATION_POLL_INTERVAL_SECS", 30),
            notification_refetch_delay_ms: parse_or("NOTIFICATION_REFETCH_DELAY_MS", 1000),
            search_debounce_ms: parse_or("SEARCH_DEBOUNCE_MS", 300),
            session_idle_timeout_secs: parse_or("SESSION_IDLE_TIMEOUT_SECS", 300),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    /// Supabase settings are only required when the Supabase backend is selected.
    pub fn is_configured(&self) -> bool {
        !self.supabase_jwt_secret.is_empty()
            && (self.store_backend == StoreBackend::Memory
                || (!self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.notification_poll_interval_secs.max(1))
    }

    pub fn refetch_delay(&self) -> Duration {
        Duration::from_millis(self.notification_refetch_delay_ms)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    /// How long a patient session may go without a request before it is
    /// unmounted.
    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs.max(1))
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {} value '{}': {}, using default {:?}", key, raw, e, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {:?}", key, default);
            default
        }
    }
}
