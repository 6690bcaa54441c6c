use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
///
/// Built once at startup and passed by reference to every component
/// that needs it. Business logic never reads the environment directly.
#[derive(Debug, Clone)]
pub struct Config {
    // AI provider
    pub anthropic_api_key: String,

    // Google Maps (Geocoding, Distance Matrix, Routes, Directions, Places)
    pub google_maps_api_key: String,

    // Telegram delivery
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,

    // Embedded store
    pub db_path: String,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            anthropic_api_key: required_env("ANTHROPIC_API_KEY"),
            google_maps_api_key: required_env("GOOGLE_MAPS_API_KEY"),
            telegram_bot_token: required_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: required_env("TELEGRAM_CHAT_ID"),
            db_path: env::var("MIETSIGNAL_DB_PATH")
                .unwrap_or_else(|_| "data/listings.db".to_string()),
        }
    }

    /// Log the config with secrets redacted.
    pub fn log_redacted(&self) {
        info!(
            anthropic_api_key = %redact(&self.anthropic_api_key),
            google_maps_api_key = %redact(&self.google_maps_api_key),
            telegram_bot_token = %redact(&self.telegram_bot_token),
            telegram_chat_id = %self.telegram_chat_id,
            db_path = %self.db_path,
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn redact(secret: &str) -> String {
    if secret.chars().count() <= 6 {
        "***".to_string()
    } else {
        let prefix: String = secret.chars().take(6).collect();
        format!("{prefix}***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_only_prefix() {
        assert_eq!(redact("sk-ant-abcdef123456"), "sk-ant***");
        assert_eq!(redact("short"), "***");
    }

    #[test]
    fn redact_handles_multibyte_secrets() {
        assert_eq!(redact("käsekuchen-token"), "käseku***");
        assert_eq!(redact("ääääää"), "***");
    }
}
