use serde::Deserialize;

static CONFIG: OnceCell<Config> = OnceCell::const_new();

mod config_dir;
pub use config_dir::{find_config_file, read_config};

mod error;
pub use error::{ConfigError, ConfigResult};
use tokio::sync::OnceCell;

#[derive(Debug, Deserialize)]
pub struct Config {
    host: Host,
    app: App,
    payment: Payment,
    smtp: Smtp,
    #[serde(default)]
    certificate: Certificate,
}

#[derive(Debug, Deserialize)]
pub struct Host {
    bindto: String,
}

#[derive(Debug, Deserialize)]
pub struct App {
    jwt: String,
    database_uri: String,
    #[serde(default)]
    docs: bool,
}

#[derive(Debug, Deserialize)]
pub struct Payment {
    /// Shared secret used to verify inbound provider notifications.
    webhook_secret: String,
}

#[derive(Debug, Deserialize)]
pub struct Smtp {
    relay: String,
    username: String,
    password: String,
    /// Sender mailbox, e.g. `AgriLearn <no-reply@agrilearn.example>`.
    from: String,
    /// Recipient of order notifications.
    admin: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct Certificate {
    /// Optional background image for generated certificates.
    template: Option<String>,
}

impl Config {
    #[tracing::instrument]
    pub async fn get_or_init(use_local: bool) -> &'static Config {
        CONFIG
            .get_or_init(|| async {
                let read_cfg = |use_local| -> ConfigResult<Self> {
                    let bytes = read_config(use_local)?;
                    let text = String::from_utf8(bytes)?;
                    let config: Self = toml::from_str(&text)?;
                    Ok(config)
                };

                let config = match read_cfg(use_local) {
                    Ok(c) => c,
                    Err(e) => {
                        if !matches!(e, error::ConfigError::ConfigNotFound) {
                            crate::error::log_error(&e);
                        }
                        tracing::error!("Config not found.");
                        std::process::exit(1);
                    }
                };

                config
            })
            .await
    }

    #[inline]
    pub fn host(&self) -> &Host {
        &self.host
    }

    #[inline]
    pub fn app(&self) -> &App {
        &self.app
    }

    #[inline]
    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    #[inline]
    pub fn smtp(&self) -> &Smtp {
        &self.smtp
    }

    #[inline]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }
}

impl Host {
    #[inline]
    pub fn bindto(&self) -> &str {
        &self.bindto
    }
}

impl App {
    #[inline]
    pub fn jwt(&self) -> &str {
        &self.jwt
    }

    #[inline]
    pub fn database_uri(&self) -> &str {
        &self.database_uri
    }

    #[inline]
    pub fn docs(&self) -> bool {
        self.docs
    }
}

impl Payment {
    #[inline]
    pub fn webhook_secret(&self) -> &str {
        &self.webhook_secret
    }
}

impl Smtp {
    #[inline]
    pub fn relay(&self) -> &str {
        &self.relay
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }

    #[inline]
    pub fn from(&self) -> &str {
        &self.from
    }

    #[inline]
    pub fn admin(&self) -> &str {
        &self.admin
    }
}

impl Certificate {
    #[inline]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }
}
