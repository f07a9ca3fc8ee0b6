//! Connection settings for the Elasticsearch cluster.
//!
//! Values come from command-line flags first, then the environment (a `.env`
//! file in the working directory is loaded into the environment at startup),
//! then the defaults below.

use std::path::PathBuf;

use clap::Args;
use thiserror::Error;

/// Default embedding model (768 dimensions, mpnet family).
pub const DEFAULT_MODEL: &str = "sentence-transformers/paraphrase-multilingual-mpnet-base-v2";

/// Default location of the logging configuration.
pub const DEFAULT_LOG_CONFIG: &str = "logging.yaml";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unsupported scheme '{0}' (expected http or https)")]
    BadScheme(String),

    #[error("Elasticsearch host is empty")]
    EmptyHost,

    #[error("invalid Elasticsearch URL '{0}'")]
    BadUrl(String),
}

/// Cluster connection flags shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Full cluster URL; overrides scheme, host and port
    #[arg(long, env = "ES_URL", global = true)]
    pub es_url: Option<String>,

    /// URL scheme used when no explicit URL is given
    #[arg(long, env = "ES_SCHEME", default_value = "https", global = true)]
    pub es_scheme: String,

    #[arg(long, env = "ES_HOST", default_value = "localhost", global = true)]
    pub es_host: String,

    #[arg(long, env = "ES_PORT", default_value_t = 9200, global = true)]
    pub es_port: u16,

    /// Basic-auth user
    #[arg(long, env = "ELASTIC_USER", global = true)]
    pub es_user: Option<String>,

    /// Basic-auth password
    #[arg(long, env = "ELASTIC_PASSWORD", hide_env_values = true, global = true)]
    pub es_password: Option<String>,

    /// PEM bundle with the cluster's CA certificate
    #[arg(long, env = "ES_CERTS", global = true)]
    pub es_ca_certs: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, env = "ES_INSECURE", global = true)]
    pub insecure: bool,
}

/// Resolved, validated connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsConfig {
    base_url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub ca_certs: Option<PathBuf>,
    pub insecure: bool,
}

impl EsConfig {
    /// Plain-HTTP config for a given URL, without auth.
    pub fn for_url(url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: normalize_url(url)?,
            user: None,
            password: None,
            ca_certs: None,
            insecure: false,
        })
    }

    pub fn from_args(args: &ConnectionArgs) -> Result<Self, ConfigError> {
        let base_url = match args.es_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => normalize_url(url)?,
            _ => build_url(&args.es_scheme, &args.es_host, args.es_port)?,
        };

        Ok(Self {
            base_url,
            user: args.es_user.clone().filter(|u| !u.is_empty()),
            password: args.es_password.clone(),
            ca_certs: args.es_ca_certs.clone(),
            insecure: args.insecure,
        })
    }

    /// Cluster root URL, always ending in `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Basic-auth pair. Only present when a user is configured; a missing
    /// password is sent as empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.user
            .as_deref()
            .map(|user| (user, self.password.as_deref().unwrap_or("")))
    }
}

fn build_url(scheme: &str, host: &str, port: u16) -> Result<String, ConfigError> {
    let scheme = scheme.trim().to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::BadScheme(scheme));
    }
    let host = host.trim();
    if host.is_empty() {
        return Err(ConfigError::EmptyHost);
    }
    Ok(format!("{scheme}://{host}:{port}/"))
}

fn normalize_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    let Some((scheme, rest)) = url.split_once("://") else {
        return Err(ConfigError::BadUrl(url.to_string()));
    };
    let scheme = scheme.to_ascii_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::BadScheme(scheme));
    }
    if rest.trim_matches('/').is_empty() {
        return Err(ConfigError::EmptyHost);
    }
    if url.ends_with('/') {
        Ok(format!("{scheme}://{rest}"))
    } else {
        Ok(format!("{scheme}://{rest}/"))
    }
}
