//! Server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub provisioning: ProvisioningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.page_limit == 0 {
            return Err("server.page_limit must be > 0".into());
        }
        if self.provisioning.template_ref.trim().is_empty() {
            return Err("provisioning.template_ref must not be empty".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound on the page size of tenant listings.
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            page_limit: default_page_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    /// Stable reference to the tenant stack template artifact.
    #[serde(default = "default_template_ref")]
    pub template_ref: String,
    /// Delegated execution identity for backend submissions. Opaque
    /// to the controller, forwarded as-is.
    #[serde(default)]
    pub execution_role: Option<String>,
    /// Let the simulated backend complete submissions on its own.
    /// Meant for local runs without a real backend driving events.
    #[serde(default)]
    pub auto_complete: bool,
}

impl Default for ProvisioningConfig {
    fn default() -> Self {
        Self {
            template_ref: default_template_ref(),
            execution_role: None,
            auto_complete: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_page_limit() -> usize {
    100
}

fn default_template_ref() -> String {
    "templates/tenant-stack@v1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Loads the configuration.
    ///
    /// An explicitly supplied path must exist; a typo should fail the
    /// run, not fall through to defaults. Only the implicit default
    /// path (`silohub.toml`) is allowed to be absent.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                let pathbuf = PathBuf::from(p);
                if !pathbuf.exists() {
                    return Err(format!("config file not found: {p}"));
                }
                builder = builder.add_source(File::from(pathbuf));
            }
            None => {
                let default_path = PathBuf::from("silohub.toml");
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g. SILOHUB__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("SILOHUB")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}
