use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
pub const DEFAULT_STAGING_PATH: &str = "/tmp/upgrade_az_cli.sh";
pub const DEFAULT_PACKAGE_DIR: &str = "/tmp/pkgs";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub staging_path: PathBuf,
    pub package_dir: PathBuf,
    pub version: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid BIND_ADDR {bind_addr:?}"))?;

        let staging_path = lookup("UPGRADE_STAGING_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STAGING_PATH));
        let package_dir = lookup("UPGRADE_PACKAGE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PACKAGE_DIR));
        let version =
            lookup("APP_VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());

        Ok(Config {
            bind_addr,
            staging_path,
            package_dir,
            version,
        })
    }
}
