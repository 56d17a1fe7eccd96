//! Layered settings: defaults, then an optional JSON file named by
//! `CALAGENT_CONFIG`, then environment overrides.

use std::env;
use std::path::Path;

use calagent_llm::LlmSettings;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::agent::ProcessorConfig;
use crate::calendar::google::DEFAULT_BASE_URL as GOOGLE_CALENDAR_BASE_URL;
use crate::error::{CoreError, CoreResult};

pub const CONFIG_PATH_VAR: &str = "CALAGENT_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub agent: AgentSettings,
    pub calendar: CalendarSettings,
    pub llm: LlmSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8787".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// IANA name; every date the agent reasons about is in this zone.
    pub timezone: String,
    pub max_completion_attempts: u32,
    pub max_steps: usize,
    pub stats_window_days: i64,
    pub top_attendees: usize,
    pub event_channel_capacity: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
            max_completion_attempts: 2,
            max_steps: 10,
            stats_window_days: 30,
            top_attendees: 5,
            event_channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalendarBackend {
    #[default]
    Google,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub backend: CalendarBackend,
    pub google_base_url: String,
    pub calendar_id: String,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            backend: CalendarBackend::Google,
            google_base_url: GOOGLE_CALENDAR_BASE_URL.to_string(),
            calendar_id: "primary".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> CoreResult<Self> {
        Self::load_with(|key| env::var(key).ok())
    }

    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let mut settings = match lookup(CONFIG_PATH_VAR).filter(|path| !path.is_empty()) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        settings.apply_overrides(&lookup)?;
        settings.timezone()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            CoreError::Config(format!("failed to read {}: {error}", path.display()))
        })?;
        serde_json::from_str(&raw).map_err(|error| {
            CoreError::Config(format!("failed to parse {}: {error}", path.display()))
        })
    }

    fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> CoreResult<()> {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(bind_addr) = lookup("CALAGENT_BIND_ADDR") {
            self.server.bind_addr = bind_addr;
        }
        if let Some(timezone) = lookup("CALAGENT_TIMEZONE") {
            self.agent.timezone = timezone;
        }
        if let Some(value) = lookup("CALAGENT_MAX_COMPLETION_ATTEMPTS") {
            self.agent.max_completion_attempts = parse_number("CALAGENT_MAX_COMPLETION_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("CALAGENT_MAX_STEPS") {
            self.agent.max_steps = parse_number("CALAGENT_MAX_STEPS", &value)?;
        }
        if let Some(value) = lookup("CALAGENT_CALENDAR_BACKEND") {
            self.calendar.backend = match value.to_ascii_lowercase().as_str() {
                "google" => CalendarBackend::Google,
                "memory" => CalendarBackend::Memory,
                other => {
                    return Err(CoreError::Config(format!(
                        "unknown calendar backend '{other}', expected 'google' or 'memory'"
                    )))
                }
            };
        }
        self.llm.apply_overrides(lookup);
        Ok(())
    }

    pub fn timezone(&self) -> CoreResult<Tz> {
        self.agent.timezone.parse::<Tz>().map_err(|_| {
            CoreError::Config(format!("unknown timezone '{}'", self.agent.timezone))
        })
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            max_completion_attempts: self.agent.max_completion_attempts,
            max_steps: self.agent.max_steps,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> CoreResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| CoreError::Config(format!("{key} must be a number, got '{value}'")))
}
