use crate::{ApiSettings, EmbedderSettings, LoggingSettings, RawSettings, SearchSettings, SecretSettings};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub api: ApiSettings,
    pub logging: LoggingSettings,
    pub search: SearchSettings,
    pub embedder: EmbedderSettings,
    pub secrets: SecretSettings,
}

impl From<RawSettings> for AppSettings {
    fn from(raw: RawSettings) -> Self {
        Self {
            api: raw.api,
            logging: raw.logging,
            search: raw.search,
            embedder: raw.embedder,
            secrets: raw.secrets,
        }
    }
}

impl SearchSettings {
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl EmbedderSettings {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}
