use std::sync::OnceLock;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct OracleSettings {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            api_key: String::new(),
            model: "openai/gpt-oss-20b".to_string(),
            timeout_secs: 10,
        }
    }
}

impl OracleSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(default)]
pub struct DeliverySettings {
    pub cycle_interval_secs: u64,
    pub send_timeout_secs: u64,
    pub max_attempts: u32,
    pub claim_staleness_secs: u64,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            cycle_interval_secs: 10,
            send_timeout_secs: 15,
            max_attempts: 5,
            claim_staleness_secs: 60,
        }
    }
}

impl DeliverySettings {
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn claim_staleness(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.claim_staleness_secs as i64)
    }
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub telegram: TelegramSettings,
    #[serde(default)]
    pub oracle: OracleSettings,
    #[serde(default)]
    pub delivery: DeliverySettings,
}

impl AppSettings {
    fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(true))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}

pub fn get() -> &'static AppSettings {
    static APPSETTINGS: OnceLock<AppSettings> = OnceLock::new();
    APPSETTINGS.get_or_init(|| AppSettings::new().expect("Could not load application settings"))
}
