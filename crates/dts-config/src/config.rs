use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::paths::default_storage_dir;

/// Which MCP transport to bind. Binding itself lives in the server crate;
/// this only records the client's choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Stdio,
    Http,
}

impl std::str::FromStr for Transport {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "stdio" => Ok(Self::Stdio),
            "http" => Ok(Self::Http),
            other => anyhow::bail!("unknown TRANSPORT '{other}', expected 'stdio' or 'http'"),
        }
    }
}

/// Server-wide configuration, populated from the environment at startup.
/// See SPEC_FULL.md §6 for the variable table.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub sandbox_root: PathBuf,
    pub storage_dir: PathBuf,
    pub ckg_retention_days: u64,
    pub shell_timeout: Duration,
    pub output_max_bytes: usize,
    pub transport: Transport,
    pub host: String,
    pub port: u16,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {name}='{raw}': {e}")),
    }
}

impl ServerConfig {
    /// Load configuration from the process environment, filling in the
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let sandbox_root = match env_var("SANDBOX_ROOT") {
            Some(raw) => PathBuf::from(raw),
            None => std::env::current_dir().context("resolving current directory")?,
        };
        let sandbox_root = sandbox_root
            .canonicalize()
            .with_context(|| format!("canonicalizing SANDBOX_ROOT {}", sandbox_root.display()))?;

        let storage_dir = match env_var("STORAGE_DIR") {
            Some(raw) => PathBuf::from(raw),
            None => default_storage_dir(),
        };

        let ckg_retention_days = env_parsed("CKG_RETENTION_DAYS", 30u64)?;
        let shell_timeout_secs = env_parsed("SHELL_TIMEOUT_SECS", 60u64)?;
        let output_max_bytes = env_parsed("OUTPUT_MAX_BYTES", 1_048_576usize)?;
        let transport: Transport = match env_var("TRANSPORT") {
            Some(raw) => raw.parse()?,
            None => Transport::Stdio,
        };
        let host = env_var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = env_parsed("PORT", 8787u16)?;

        Ok(Self {
            sandbox_root,
            storage_dir,
            ckg_retention_days,
            shell_timeout: Duration::from_secs(shell_timeout_secs),
            output_max_bytes,
            transport,
            host,
            port,
        })
    }
}
