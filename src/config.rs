//! Configuration management
//!
//! Ad-platform credentials, the notification relay URL and timeouts are read
//! from environment variables first, then from database settings.

use std::env;
use std::time::Duration;

use crate::db::Database;
use crate::error::{CrmError, CrmResult};

/// A configurable key: database setting name plus overriding environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    pub setting: &'static str,
    pub env: &'static str,
    pub secret: bool,
}

pub const FACEBOOK_APP_ID: ConfigKey = ConfigKey {
    setting: "facebook_app_id",
    env: "FACEBOOK_APP_ID",
    secret: false,
};
pub const FACEBOOK_ACCESS_TOKEN: ConfigKey = ConfigKey {
    setting: "facebook_access_token",
    env: "FACEBOOK_ACCESS_TOKEN",
    secret: true,
};
pub const GOOGLE_ADS_CUSTOMER_ID: ConfigKey = ConfigKey {
    setting: "google_ads_customer_id",
    env: "GOOGLE_ADS_CUSTOMER_ID",
    secret: false,
};
pub const GOOGLE_ADS_ACCESS_TOKEN: ConfigKey = ConfigKey {
    setting: "google_ads_access_token",
    env: "GOOGLE_ADS_ACCESS_TOKEN",
    secret: true,
};
pub const GOOGLE_ADS_DEVELOPER_TOKEN: ConfigKey = ConfigKey {
    setting: "google_ads_developer_token",
    env: "GOOGLE_ADS_DEVELOPER_TOKEN",
    secret: true,
};
pub const NOTIFY_WEBHOOK: ConfigKey = ConfigKey {
    setting: "notify_webhook_url",
    env: "LEADCMD_NOTIFY_WEBHOOK",
    secret: false,
};
pub const BUSY_TIMEOUT_MS: ConfigKey = ConfigKey {
    setting: "busy_timeout_ms",
    env: "LEADCMD_BUSY_TIMEOUT_MS",
    secret: false,
};
pub const HTTP_TIMEOUT_SECS: ConfigKey = ConfigKey {
    setting: "http_timeout_secs",
    env: "LEADCMD_HTTP_TIMEOUT_SECS",
    secret: false,
};

pub const ALL_KEYS: [ConfigKey; 8] = [
    FACEBOOK_APP_ID,
    FACEBOOK_ACCESS_TOKEN,
    GOOGLE_ADS_CUSTOMER_ID,
    GOOGLE_ADS_ACCESS_TOKEN,
    GOOGLE_ADS_DEVELOPER_TOKEN,
    NOTIFY_WEBHOOK,
    BUSY_TIMEOUT_MS,
    HTTP_TIMEOUT_SECS,
];

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Find a key by its setting name or environment variable name.
pub fn lookup_key(name: &str) -> Option<ConfigKey> {
    let lower = name.to_lowercase();
    ALL_KEYS
        .iter()
        .copied()
        .find(|k| k.setting == lower || k.env.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, Default)]
pub struct FacebookCredentials {
    pub app_id: String,
    pub access_token: String,
}

#[derive(Debug, Clone, Default)]
pub struct GoogleAdsCredentials {
    pub customer_id: String,
    pub access_token: String,
    pub developer_token: String,
}

#[derive(Debug, Clone)]
pub struct LeadConfig {
    pub facebook: Option<FacebookCredentials>,
    pub google_ads: Option<GoogleAdsCredentials>,
    pub notify_webhook: Option<String>,
    pub busy_timeout: Duration,
    pub http_timeout: Duration,
}

impl Default for LeadConfig {
    fn default() -> Self {
        Self {
            facebook: None,
            google_ads: None,
            notify_webhook: None,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl LeadConfig {
    /// Load configuration from environment variables and database settings.
    /// Environment variables take precedence over database settings.
    pub fn load(db: &Database) -> CrmResult<Self> {
        let get = |key: ConfigKey| resolve(db, key);

        let facebook = match (get(FACEBOOK_APP_ID)?, get(FACEBOOK_ACCESS_TOKEN)?) {
            (Some(app_id), Some(access_token)) => Some(FacebookCredentials {
                app_id,
                access_token,
            }),
            _ => None,
        };

        let google_ads = match (
            get(GOOGLE_ADS_CUSTOMER_ID)?,
            get(GOOGLE_ADS_ACCESS_TOKEN)?,
            get(GOOGLE_ADS_DEVELOPER_TOKEN)?,
        ) {
            (Some(customer_id), Some(access_token), Some(developer_token)) => {
                Some(GoogleAdsCredentials {
                    customer_id,
                    access_token,
                    developer_token,
                })
            }
            _ => None,
        };

        let busy_timeout = Duration::from_millis(parse_number(
            BUSY_TIMEOUT_MS,
            get(BUSY_TIMEOUT_MS)?,
            DEFAULT_BUSY_TIMEOUT_MS,
        )?);
        let http_timeout = Duration::from_secs(parse_number(
            HTTP_TIMEOUT_SECS,
            get(HTTP_TIMEOUT_SECS)?,
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?);

        Ok(Self {
            facebook,
            google_ads,
            notify_webhook: get(NOTIFY_WEBHOOK)?,
            busy_timeout,
            http_timeout,
        })
    }

    pub fn facebook(&self) -> CrmResult<&FacebookCredentials> {
        self.facebook.as_ref().ok_or_else(|| {
            CrmError::Config("Facebook credentials not configured".to_string())
        })
    }

    pub fn google_ads(&self) -> CrmResult<&GoogleAdsCredentials> {
        self.google_ads.as_ref().ok_or_else(|| {
            CrmError::Config("Google Ads credentials not configured".to_string())
        })
    }
}

/// Environment first, then the settings table. Blank values count as unset.
pub fn resolve(db: &Database, key: ConfigKey) -> CrmResult<Option<String>> {
    if let Ok(value) = env::var(key.env) {
        if !value.trim().is_empty() {
            return Ok(Some(value.trim().to_string()));
        }
    }
    Ok(db
        .get_setting(key.setting)?
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}

/// Show at most the first four characters of a secret.
pub fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    format!("{}****", visible)
}

fn parse_number(key: ConfigKey, value: Option<String>, default: u64) -> CrmResult<u64> {
    match value {
        None => Ok(default),
        Some(v) => v.parse::<u64>().map_err(|_| {
            CrmError::Config(format!("{} must be a whole number, got '{}'", key.setting, v))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_settings() {
        let db = Database::open_memory().unwrap();
        db.set_setting(BUSY_TIMEOUT_MS.setting, "250").unwrap();
        let config = LeadConfig::load(&db).unwrap();
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.google_ads.is_none() || env::var(GOOGLE_ADS_CUSTOMER_ID.env).is_ok());
    }

    #[test]
    fn test_settings_feed_credentials() {
        let db = Database::open_memory().unwrap();
        db.set_setting(GOOGLE_ADS_CUSTOMER_ID.setting, "123-456").unwrap();
        db.set_setting(GOOGLE_ADS_ACCESS_TOKEN.setting, "ya29.token").unwrap();
        db.set_setting(GOOGLE_ADS_DEVELOPER_TOKEN.setting, "dev").unwrap();

        let config = LeadConfig::load(&db).unwrap();
        let google = config.google_ads().unwrap();
        assert_eq!(google.developer_token, "dev");
    }

    #[test]
    fn test_partial_credentials_are_not_configured() {
        let db = Database::open_memory().unwrap();
        db.set_setting(GOOGLE_ADS_CUSTOMER_ID.setting, "123-456").unwrap();
        let config = LeadConfig::load(&db).unwrap();
        if env::var(GOOGLE_ADS_ACCESS_TOKEN.env).is_err() {
            assert!(matches!(config.google_ads(), Err(CrmError::Config(_))));
        }
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let db = Database::open_memory().unwrap();
        db.set_setting(HTTP_TIMEOUT_SECS.setting, "soon").unwrap();
        if env::var(HTTP_TIMEOUT_SECS.env).is_err() {
            assert!(matches!(LeadConfig::load(&db), Err(CrmError::Config(_))));
        }
    }

    #[test]
    fn test_lookup_key_and_mask() {
        assert_eq!(lookup_key("FACEBOOK_APP_ID"), Some(FACEBOOK_APP_ID));
        assert_eq!(lookup_key("notify_webhook_url"), Some(NOTIFY_WEBHOOK));
        assert_eq!(lookup_key("nope"), None);
        assert_eq!(mask("EAABsecret"), "EAAB****");
    }
}
