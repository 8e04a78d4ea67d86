use log::info;
use ratatoskr_states::State;
use serde::Deserialize;
use std::env::vars;
use ustr::Ustr;

const DEFAULT_API_BASE_URL: &str = "http://localhost:8181";
const DEFAULT_BASENAME: &str = "/ratatoskr";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessConfig {
    /// Scheme and host of the backend, without a trailing slash.
    pub api_base_url: String,
    /// Path the application is mounted at, e.g. `/ratatoskr`. Empty for root.
    pub basename: String,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    api_base_url: Option<String>,
    basename: Option<String>,
}

impl BusinessConfig {
    pub fn new(api_base_url: impl Into<String>, basename: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            basename: normalize_basename(&basename.into()),
        }
    }

    /// Reads `API_BASE_URL` and `BASENAME`, falling back to a local backend.
    pub fn from_env() -> anyhow::Result<Self> {
        let raw: RawConfig = serde_env::from_iter(vars())?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawConfig) -> Self {
        let api_base_url = raw.api_base_url.unwrap_or_else(|| {
            info!("API_BASE_URL not set, using {DEFAULT_API_BASE_URL}");
            DEFAULT_API_BASE_URL.to_owned()
        });
        let basename = raw
            .basename
            .unwrap_or_else(|| DEFAULT_BASENAME.to_owned());
        Self::new(api_base_url, basename)
    }

    pub fn api_url(&self) -> Ustr {
        Ustr::from(&format!("{}{}/api", self.api_base_url, self.basename))
    }

    /// The page one level above the application, the target of "go home".
    pub fn home_url(&self) -> String {
        let parent = match self.basename.rfind('/') {
            Some(0) | None => "",
            Some(idx) => &self.basename[..idx],
        };
        format!("{}{}/", self.api_base_url, parent)
    }
}

fn normalize_basename(basename: &str) -> String {
    let trimmed = basename.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL, DEFAULT_BASENAME)
    }
}

impl State for BusinessConfig {}
