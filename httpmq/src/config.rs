use anyhow::{bail, Result};
use clap::Parser;
use serde_derive::Deserialize;

/// Command line of the server.
#[derive(Debug, Parser)]
#[command(name = "httpmq", version, about = "In-memory message queue over HTTP")]
pub struct Cli {
    /// Port of the queue API, it overrides the listen address of the config file
    #[arg(value_name = "PORT")]
    pub port: Option<u16>,

    /// Path to the config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub network: Network,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
pub struct Network {
    /// Listen address of the queue API.
    pub http_listen: Option<String>,
    /// Listen address of the admin API, it is not started when it is missing.
    pub admin_listen: Option<String>,
}

impl Config {
    pub fn from_toml(s: &str) -> Result<Config> {
        Ok(toml::from_str(s)?)
    }

    pub fn http_listen(&self) -> Result<&str> {
        match self.network.http_listen.as_deref() {
            Some(url) => Ok(url),
            None => bail!("Need a port number argument or network.http_listen in the config file"),
        }
    }
}

pub fn parse_config(path: &str) -> Result<Config> {
    let cfg = std::fs::read_to_string(path)?;

    Config::from_toml(&cfg)
}

/// Load the config file if there is any and apply the command line over it.
pub fn resolve(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => parse_config(path)?,
        None => Config::default(),
    };

    if let Some(port) = cli.port {
        config.network.http_listen = Some(format!("0.0.0.0:{port}"));
    }

    config.http_listen()?;

    Ok(config)
}
