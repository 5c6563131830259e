/*
 * This file is part of ethpci.
 *
 * Copyright (C) 2025 ethpci contributors
 *
 * ethpci is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * ethpci is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with ethpci. If not, see <https://www.gnu.org/licenses/>.
 */

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EthPciError, Result};
use crate::executor::{
    Executor, HostKeyPolicy, RemoteHost, Target, DEFAULT_REMOTE_USER, DEFAULT_SSH_PROGRAM,
    DEFAULT_TIMEOUT,
};
use crate::lspci::DEFAULT_LSPCI_PROGRAM;
use crate::resolver::DEFAULT_SYSFS_ROOT;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// Remote host to inspect; local when absent
    pub host: Option<String>,
    pub user: String,
    pub ssh_program: String,
    pub host_key_policy: HostKeyPolicy,
    /// Per-command limit in seconds, 0 disables
    pub timeout_secs: u64,
    pub lspci_program: String,
    pub sysfs_root: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: None,
            user: DEFAULT_REMOTE_USER.to_string(),
            ssh_program: DEFAULT_SSH_PROGRAM.to_string(),
            host_key_policy: HostKeyPolicy::default(),
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            lspci_program: DEFAULT_LSPCI_PROGRAM.to_string(),
            sysfs_root: DEFAULT_SYSFS_ROOT.to_string(),
        }
    }
}

/// Values given on the command line; each one beats the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub user: Option<String>,
    pub host_key_policy: Option<HostKeyPolicy>,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            self.host = Some(host.clone());
        }
        if let Some(user) = &overrides.user {
            self.user = user.clone();
        }
        if let Some(policy) = overrides.host_key_policy {
            self.host_key_policy = policy;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn target(&self) -> Target {
        match &self.host {
            None => Target::Local,
            Some(host) => Target::Remote(
                RemoteHost::new(host.clone())
                    .with_user(self.user.clone())
                    .with_ssh_program(self.ssh_program.clone())
                    .with_host_key_policy(self.host_key_policy),
            ),
        }
    }

    pub fn executor(&self) -> Executor {
        Executor::new(self.target()).with_timeout(self.timeout())
    }
}

pub fn config_path() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        return Path::new(&xdg).join("ethpci").join("config.json");
    }
    if let Ok(home) = env::var("HOME") {
        return Path::new(&home)
            .join(".config")
            .join("ethpci")
            .join("config.json");
    }
    PathBuf::from("/etc/ethpci/config.json")
}

/// Load `path`, falling back to defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(EthPciError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&data).map_err(|source| EthPciError::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

fn is_safe_host(s: &str) -> bool {
    !s.is_empty() && !s.starts_with('-') && !s.chars().any(|c| c.is_whitespace() || c == '@')
}

pub fn validate_config(cfg: &Config) -> Result<()> {
    if let Some(host) = &cfg.host {
        if !is_safe_host(host) {
            return Err(EthPciError::invalid_config(
                "host",
                "must be non-empty, contain no whitespace or '@' and not start with '-'",
            ));
        }
    }
    if cfg.user.is_empty()
        || cfg.user.starts_with('-')
        || cfg.user.chars().any(char::is_whitespace)
    {
        return Err(EthPciError::invalid_config("user", "must be a plain login name"));
    }
    for (field, value) in [
        ("ssh_program", &cfg.ssh_program),
        ("lspci_program", &cfg.lspci_program),
        ("sysfs_root", &cfg.sysfs_root),
    ] {
        if value.trim().is_empty() {
            return Err(EthPciError::invalid_config(field, "must not be empty"));
        }
    }
    Ok(())
}
