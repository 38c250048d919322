//! Load config from file and environment.

use serde::Deserialize;
use std::path::PathBuf;

/// Host configuration. File: ~/.config/meshcore/config.toml or /etc/meshcore/config.toml.
/// Env overrides: MESHCORE_MAX_MESSAGE_LEN, MESHCORE_LOOPBACK, MESHCORE_LOG_LEVEL.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Largest payload accepted by send (default 4096).
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Attach the loopback transport at startup (default true).
    #[serde(default = "default_loopback")]
    pub loopback: bool,
    /// Filter used when RUST_LOG is unset (default "info").
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_message_len() -> usize {
    mesh_core::DEFAULT_MAX_MESSAGE_LEN
}
fn default_loopback() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_message_len: default_max_message_len(),
            loopback: default_loopback(),
            log_level: default_log_level(),
        }
    }
}

impl Config {
    pub fn core_config(&self) -> mesh_core::Config {
        mesh_core::Config {
            max_message_len: self.max_message_len,
            ..mesh_core::Config::default()
        }
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let c = load_file().unwrap_or_default();
    apply_overrides(c, |key| std::env::var(key).ok())
}

/// Apply env-style overrides; unparsable values are ignored.
pub fn apply_overrides(mut c: Config, var: impl Fn(&str) -> Option<String>) -> Config {
    if let Some(s) = var("MESHCORE_MAX_MESSAGE_LEN") {
        if let Ok(n) = s.parse::<usize>() {
            c.max_message_len = n;
        }
    }
    if let Some(s) = var("MESHCORE_LOOPBACK") {
        match s.as_str() {
            "1" | "true" | "yes" => c.loopback = true,
            "0" | "false" | "no" => c.loopback = false,
            _ => {}
        }
    }
    if let Some(s) = var("MESHCORE_LOG_LEVEL") {
        if !s.is_empty() {
            c.log_level = s;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/meshcore/config.toml"));
    }
    out.push(PathBuf::from("/etc/meshcore/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            match std::fs::read_to_string(&p) {
                Ok(s) => match toml::from_str::<Config>(&s) {
                    Ok(c) => return Some(c),
                    Err(e) => eprintln!("ignoring {}: {}", p.display(), e),
                },
                Err(e) => eprintln!("cannot read {}: {}", p.display(), e),
            }
            break;
        }
    }
    None
}
