use serde::{Deserialize, Serialize};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f64 = 0.3;
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 4096;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl LlmSettings {
    /// Applies overrides from `lookup`; `CALAGENT_*` names win over the
    /// generic `OPENAI_*` ones. Unparsable numbers are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(base_url) =
            lookup("CALAGENT_LLM_BASE_URL").or_else(|| lookup("OPENAI_BASE_URL"))
        {
            self.base_url = base_url;
        }
        if let Some(api_key) = lookup("CALAGENT_LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(api_key);
        }
        if let Some(model) = lookup("CALAGENT_LLM_MODEL") {
            self.model = model;
        }
        if let Some(temperature) =
            lookup("CALAGENT_LLM_TEMPERATURE").and_then(|value| value.parse::<f64>().ok())
        {
            self.temperature = temperature;
        }
        if let Some(max_output_tokens) =
            lookup("CALAGENT_LLM_MAX_OUTPUT_TOKENS").and_then(|value| value.parse::<u32>().ok())
        {
            self.max_output_tokens = max_output_tokens;
        }
    }
}
