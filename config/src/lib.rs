//! Configuration loading for formgate.
//!
//! Reads `~/.formgate/config.toml` (or the file named by `FORMGATE_CONFIG`)
//! and resolves it into per-form [`FormSettings`]. A missing file is not an
//! error: every form falls back to built-in defaults, which means no endpoint
//! and therefore the `mailto:` handoff.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use formgate_types::FormKind;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Minimum time between two accepted submissions of the same form.
pub const DEFAULT_COOLDOWN_MS: i64 = 60_000;
/// Address used by the mail-client fallback when none is configured.
pub const DEFAULT_MAIL_TO: &str = "support@kaijuswap.com";
/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "FORMGATE_CONFIG";

#[derive(Debug, Default, Deserialize)]
pub struct FormgateConfig {
    pub waitlist: Option<FormConfig>,
    pub support: Option<FormConfig>,
    pub http: Option<HttpConfig>,
}

/// Raw `[waitlist]` / `[support]` table.
#[derive(Debug, Default, Deserialize)]
pub struct FormConfig {
    /// Delivery endpoint. Supports `${ENV_VAR}`; empty after expansion means unset.
    pub endpoint: Option<String>,
    /// Recipient of the `mailto:` fallback.
    pub mail_to: Option<String>,
    /// Subject used by the fallback when the form has no subject field.
    pub mail_subject: Option<String>,
    pub cooldown_ms: Option<i64>,
    /// Extra disposable domains, on top of the form's built-in list.
    #[serde(default)]
    pub blocked_domains: Vec<String>,
}

/// Raw `[http]` table.
#[derive(Debug, Default, Deserialize)]
pub struct HttpConfig {
    /// Overall request timeout. Absent or 0 leaves requests unbounded.
    pub timeout_secs: Option<u64>,
    /// Permit plain `http://` endpoints (local testing).
    #[serde(default)]
    pub allow_insecure: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid {form} endpoint {value:?}: {source}")]
    InvalidEndpoint {
        form: FormKind,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("{form} endpoint must use http or https, got {scheme:?}")]
    UnsupportedScheme { form: FormKind, scheme: String },
    #[error("{form} cooldown_ms must not be negative, got {value}")]
    NegativeCooldown { form: FormKind, value: i64 },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Everything the core needs to run one form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSettings {
    pub form: FormKind,
    pub endpoint: Option<Url>,
    pub mail_to: String,
    pub mail_subject: String,
    pub cooldown_ms: i64,
    /// Lowercased, deduplicated blocklist (built-in + configured).
    pub blocked_domains: Vec<String>,
}

impl FormSettings {
    #[must_use]
    pub fn defaults(form: FormKind) -> Self {
        Self {
            form,
            endpoint: None,
            mail_to: DEFAULT_MAIL_TO.to_string(),
            mail_subject: default_mail_subject(form).to_string(),
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            blocked_domains: merge_domains(form, &[]),
        }
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }
}

/// Resolved `[http]` options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HttpSettings {
    pub timeout: Option<Duration>,
    pub allow_insecure: bool,
}

const fn default_mail_subject(form: FormKind) -> &'static str {
    match form {
        FormKind::Waitlist => "Waitlist signup",
        FormKind::Support => "Support request",
    }
}

fn merge_domains(form: FormKind, extra: &[String]) -> Vec<String> {
    let mut domains: Vec<String> = form
        .default_blocked_domains()
        .iter()
        .map(|d| (*d).to_string())
        .chain(extra.iter().map(|d| d.trim().to_ascii_lowercase()))
        .filter(|d| !d.is_empty())
        .collect();
    domains.sort();
    domains.dedup();
    domains
}

/// Expand `${VAR}` references from the environment.
///
/// Unset variables expand to the empty string; an unclosed `${` is kept verbatim.
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

impl FormgateConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(Some(config)),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn form(&self, form: FormKind) -> Option<&FormConfig> {
        match form {
            FormKind::Waitlist => self.waitlist.as_ref(),
            FormKind::Support => self.support.as_ref(),
        }
    }

    /// Resolve one form's settings, applying defaults and env expansion.
    pub fn form_settings(&self, form: FormKind) -> Result<FormSettings, ConfigError> {
        let Some(raw) = self.form(form) else {
            return Ok(FormSettings::defaults(form));
        };

        let endpoint = match raw.endpoint.as_deref().map(expand_env_vars) {
            Some(value) if !value.trim().is_empty() => Some(parse_endpoint(form, value.trim())?),
            _ => None,
        };

        let cooldown_ms = raw.cooldown_ms.unwrap_or(DEFAULT_COOLDOWN_MS);
        if cooldown_ms < 0 {
            return Err(ConfigError::NegativeCooldown {
                form,
                value: cooldown_ms,
            });
        }

        let non_empty = |value: Option<&String>| {
            value
                .map(|v| expand_env_vars(v).trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Ok(FormSettings {
            form,
            endpoint,
            mail_to: non_empty(raw.mail_to.as_ref()).unwrap_or_else(|| DEFAULT_MAIL_TO.to_string()),
            mail_subject: non_empty(raw.mail_subject.as_ref())
                .unwrap_or_else(|| default_mail_subject(form).to_string()),
            cooldown_ms,
            blocked_domains: merge_domains(form, &raw.blocked_domains),
        })
    }

    #[must_use]
    pub fn http_settings(&self) -> HttpSettings {
        let Some(http) = self.http.as_ref() else {
            return HttpSettings::default();
        };
        HttpSettings {
            timeout: http
                .timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            allow_insecure: http.allow_insecure,
        }
    }
}

fn parse_endpoint(form: FormKind, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|source| ConfigError::InvalidEndpoint {
        form,
        value: value.to_string(),
        source,
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme {
            form,
            scheme: other.to_string(),
        }),
    }
}

/// `~/.formgate`
#[must_use]
pub fn formgate_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".formgate"))
}

#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }
    formgate_home().map(|home| home.join("config.toml"))
}

/// Location of the durable throttle store.
#[must_use]
pub fn state_path() -> Option<PathBuf> {
    formgate_home().map(|home| home.join("state").join("throttle.json"))
}
