use std::env;
use std::str::FromStr;
use tracing::warn;

/// Which backend holds appointment records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Supabase,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "supabase" | "postgrest" => Ok(StoreBackend::Supabase),
            other => Err(format!("unknown appointment store backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub jwt_secret: String,
    pub auto_confirm_bookings: bool,
    pub store_backend: StoreBackend,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_service_key: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 5001,
            jwt_secret: String::new(),
            auto_confirm_bookings: true,
            store_backend: StoreBackend::Memory,
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: String::new(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            port: env::var("PORT")
                .ok()
                .and_then(|raw| match raw.parse::<u16>() {
                    Ok(port) => Some(port),
                    Err(_) => {
                        warn!("PORT is not a valid port number ({}), using default", raw);
                        None
                    }
                })
                .unwrap_or(defaults.port),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            auto_confirm_bookings: env::var("AUTO_CONFIRM_BOOKINGS")
                .ok()
                .map(|raw| parse_flag(&raw, defaults.auto_confirm_bookings))
                .unwrap_or(defaults.auto_confirm_bookings),
            store_backend: env::var("APPOINTMENT_STORE")
                .ok()
                .and_then(|raw| match raw.parse::<StoreBackend>() {
                    Ok(backend) => Some(backend),
                    Err(e) => {
                        warn!("{}, falling back to in-memory store", e);
                        None
                    }
                })
                .unwrap_or(defaults.store_backend),
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY").unwrap_or_default(),
            supabase_service_key: env::var("SUPABASE_SERVICE_ROLE_KEY").unwrap_or_default(),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        let store_ready = match self.store_backend {
            StoreBackend::Memory => true,
            StoreBackend::Supabase => self.is_supabase_configured(),
        };

        !self.jwt_secret.is_empty() && store_ready
    }

    pub fn is_supabase_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_service_key.is_empty()
    }
}

fn parse_flag(raw: &str, default: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!("Unrecognised boolean value '{}', using {}", raw, default);
            default
        }
    }
}
