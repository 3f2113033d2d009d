use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use problemkit::ProblemOptions;
use serde::{Deserialize, Serialize};

/// Prefix of environment overrides, e.g. `PROBLEMKIT__PROBLEM__WITH_TRACEBACK=true`.
pub const ENV_PREFIX: &str = "PROBLEMKIT__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file does not exist: {0}")]
    MissingFile(PathBuf),
    #[error("invalid configuration: {0}")]
    Invalid(Box<figment::Error>),
    #[error("invalid bind address '{addr}': {source}")]
    BindAddr {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DemoConfig {
    pub bind_addr: String,
    pub port: u16,
    pub problem: ProblemOptions,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_owned(),
            port: 8087,
            problem: ProblemOptions::default(),
        }
    }
}

impl DemoConfig {
    /// Layered load: defaults, then the YAML file (if given), then `PROBLEMKIT__*` env.
    ///
    /// # Errors
    /// Fails when the file is missing or a layer does not fit [`DemoConfig`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.to_path_buf()));
            }
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Command line flags win over every other layer.
    pub fn apply_cli_overrides(&mut self, port: Option<u16>, with_traceback: bool) {
        if let Some(port) = port {
            self.port = port;
        }
        if with_traceback {
            self.problem.with_traceback = true;
        }
    }

    /// # Errors
    /// Fails when `bind_addr` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.bind_addr, self.port);
        addr.parse()
            .map_err(|source| ConfigError::BindAddr { addr, source })
    }
}
