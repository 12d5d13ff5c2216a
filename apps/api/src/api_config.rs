use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use patchgate_core::{AppError, Domain};

const DEFAULT_BODY_LIMIT_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_host: String,
    pub api_port: u16,
    pub policy_path: Option<PathBuf>,
    pub default_domain: Domain,
    pub body_limit_bytes: usize,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let policy_path = optional_env("PATCHGATE_POLICY").map(PathBuf::from);
        let default_domain = optional_env("PATCHGATE_DEFAULT_DOMAIN")
            .map(Domain::new)
            .unwrap_or_default();

        let body_limit_bytes = optional_env("PATCHGATE_BODY_LIMIT_BYTES")
            .map(|value| {
                value.parse::<usize>().map_err(|error| {
                    AppError::Internal(format!("invalid PATCHGATE_BODY_LIMIT_BYTES: {error}"))
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        Ok(Self {
            api_host,
            api_port,
            policy_path,
            default_domain,
            body_limit_bytes,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;

        Ok(SocketAddr::from((host, self.api_port)))
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
