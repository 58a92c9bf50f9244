//! Broker settings.
//!
//! `BrokerSettings` is the configuration surface the messaging layer
//! consumes: whether it is enabled, where the broker lives, which
//! exchanges and queue to use, and the identity stamped on outbound
//! messages. Settings can be built in code, loaded from a TOML or JSON
//! file, and overridden from `ENVELOPE_MQ_*` environment variables.

mod error;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

pub use error::{ConfigurationError, ExchangeRole};

/// Default AMQP port.
pub const DEFAULT_PORT: u16 = 5672;
/// URL used when nothing else is configured.
pub const DEFAULT_URL: &str = "amqp://localhost:5672";
/// Sender identity used when none is configured.
pub const DEFAULT_APP_ID: &str = "default-app-id";
/// Prefix of environment overrides, e.g. `ENVELOPE_MQ_QUEUE`.
pub const ENV_PREFIX: &str = "ENVELOPE_MQ_";

const REDACTED: &str = "<redacted>";

/// Where and as whom to connect.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ConnectionTarget {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user: None,
            password: None,
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: Option<String>) -> Self {
        self.user = Some(user.into());
        self.password = password;
        self
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionTarget")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Settings for publishers and listeners.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSettings {
    pub enabled: bool,
    /// Full broker URL. Takes precedence over `host`/`port`/`virtual_host`.
    pub url: Option<String>,
    pub host: Option<String>,
    pub virtual_host: Option<String>,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub tasks_exchange: Option<String>,
    pub events_exchange: Option<String>,
    /// Queue consumed by the listener.
    pub queue: Option<String>,
    /// Identity stamped on outbound messages as the sender / app id.
    pub app_id: String,
    /// Start the listener as soon as a node is assembled.
    pub auto_start: bool,
    pub show_parameters_on_startup: bool,
    /// Install the logging unsupported-message handler when none is set.
    pub use_default_unsupported_handlers: bool,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: Some(DEFAULT_URL.to_string()),
            host: None,
            virtual_host: None,
            port: DEFAULT_PORT,
            user: None,
            password: None,
            tasks_exchange: Some("tasks".to_string()),
            events_exchange: Some("events".to_string()),
            queue: None,
            app_id: DEFAULT_APP_ID.to_string(),
            auto_start: true,
            show_parameters_on_startup: true,
            use_default_unsupported_handlers: true,
        }
    }
}

impl fmt::Debug for BrokerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerSettings")
            .field("enabled", &self.enabled)
            .field("url", &self.url)
            .field("host", &self.host)
            .field("virtual_host", &self.virtual_host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("tasks_exchange", &self.tasks_exchange)
            .field("events_exchange", &self.events_exchange)
            .field("queue", &self.queue)
            .field("app_id", &self.app_id)
            .field("auto_start", &self.auto_start)
            .field("show_parameters_on_startup", &self.show_parameters_on_startup)
            .field(
                "use_default_unsupported_handlers",
                &self.use_default_unsupported_handlers,
            )
            .finish()
    }
}

/// Treat empty strings as unset.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl BrokerSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_app_id(mut self, app_id: impl Into<String>) -> Self {
        self.app_id = app_id.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_tasks_exchange(mut self, exchange: Option<&str>) -> Self {
        self.tasks_exchange = exchange.map(str::to_string);
        self
    }

    pub fn with_events_exchange(mut self, exchange: Option<&str>) -> Self {
        self.events_exchange = exchange.map(str::to_string);
        self
    }

    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    // =========================================================================
    // Required settings
    // =========================================================================

    pub fn require_queue(&self) -> Result<&str, ConfigurationError> {
        non_empty(&self.queue).ok_or(ConfigurationError::MissingQueue)
    }

    pub fn require_exchange(&self, role: ExchangeRole) -> Result<&str, ConfigurationError> {
        let exchange = match role {
            ExchangeRole::Tasks => &self.tasks_exchange,
            ExchangeRole::Events => &self.events_exchange,
        };
        non_empty(exchange).ok_or(ConfigurationError::MissingExchange(role))
    }

    /// Resolve where to connect.
    ///
    /// The URL wins when set. Otherwise one is built from host, port and
    /// virtual host: `amqp://host:port[/vhost]`.
    pub fn connection_target(&self) -> Result<ConnectionTarget, ConfigurationError> {
        let url = if let Some(url) = non_empty(&self.url) {
            url.to_string()
        } else if let Some(host) = non_empty(&self.host) {
            let mut url = format!("amqp://{}:{}", host, self.port);
            if let Some(vhost) = non_empty(&self.virtual_host) {
                url.push('/');
                url.push_str(vhost);
            }
            url
        } else {
            return Err(ConfigurationError::MissingConnectionTarget);
        };

        Ok(ConnectionTarget {
            url,
            user: non_empty(&self.user).map(str::to_string),
            password: self.password.clone(),
        })
    }

    // =========================================================================
    // Loading
    // =========================================================================

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigurationError> {
        toml::from_str(raw).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        serde_json::from_str(raw).map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }

    /// Load settings from a `.toml` or `.json` file.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::Invalid(format!("failed to read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|e| e.to_str()).unwrap_or("toml") {
            "toml" => Self::from_toml_str(&raw),
            "json" => Self::from_json_str(&raw),
            ext => Err(ConfigurationError::Invalid(format!(
                "unsupported settings format: .{}",
                ext
            ))),
        }
    }

    /// Apply `ENVELOPE_MQ_*` overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigurationError> {
        self.apply_env_with(|name| std::env::var(name).ok())
    }

    /// Apply overrides read through `lookup`, keyed by the full variable name.
    pub fn apply_env_with<F>(mut self, lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}{}", ENV_PREFIX, suffix));
        let flag = |suffix: &str| -> Result<Option<bool>, ConfigurationError> {
            var(suffix)
                .map(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "1" | "true" | "yes" | "on" => Ok(true),
                    "0" | "false" | "no" | "off" => Ok(false),
                    other => Err(ConfigurationError::Invalid(format!(
                        "{}{} is not a boolean: {}",
                        ENV_PREFIX, suffix, other
                    ))),
                })
                .transpose()
        };

        if let Some(v) = flag("ENABLED")? {
            self.enabled = v;
        }
        if let Some(v) = flag("AUTO_START")? {
            self.auto_start = v;
        }
        if let Some(v) = var("URL") {
            self.url = Some(v);
        }
        if let Some(v) = var("HOST") {
            self.host = Some(v);
        }
        if let Some(v) = var("PORT") {
            self.port = v.trim().parse().map_err(|_| {
                ConfigurationError::Invalid(format!("{}PORT is not a port: {}", ENV_PREFIX, v))
            })?;
        }
        if let Some(v) = var("VIRTUAL_HOST") {
            self.virtual_host = Some(v);
        }
        if let Some(v) = var("USER") {
            self.user = Some(v);
        }
        if let Some(v) = var("PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = var("TASKS_EXCHANGE") {
            self.tasks_exchange = Some(v);
        }
        if let Some(v) = var("EVENTS_EXCHANGE") {
            self.events_exchange = Some(v);
        }
        if let Some(v) = var("QUEUE") {
            self.queue = Some(v);
        }
        if let Some(v) = var("APP_ID") {
            self.app_id = v;
        }
        Ok(self)
    }

    /// Log the effective settings, without the password.
    pub fn log_summary(&self) {
        info!(
            enabled = self.enabled,
            app_id = %self.app_id,
            url = ?self.url,
            host = ?self.host,
            virtual_host = ?self.virtual_host,
            port = self.port,
            user = ?self.user,
            queue = ?self.queue,
            tasks_exchange = ?self.tasks_exchange,
            events_exchange = ?self.events_exchange,
            auto_start = self.auto_start,
            "broker settings"
        );
    }
}
