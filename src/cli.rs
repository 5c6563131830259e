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

//! Command Line Interface

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use crate::config::{self, Config, ConfigOverrides};
use crate::device_map::DeviceMapBuilder;
use crate::executor::HostKeyPolicy;
use crate::resolver::InterfaceBinding;

#[derive(Parser, Debug)]
#[command(name = "ethpci")]
#[command(version)]
#[command(about = "Map Ethernet interfaces to PCI addresses")]
#[command(long_about = "Map Ethernet interfaces to PCI addresses

Lists Ethernet-class PCI devices with lspci and finds the interface bound to
each one, whether it is driven by a kernel network driver, bound to uio
(DPDK), or a virtio device inside a VM.

EXAMPLES:
    ethpci                             All interfaces on this machine
    ethpci -i eth0,eth1                Only eth0 and eth1
    ethpci --host dut1                 Inspect dut1 over ssh as root
    ethpci --host dut1 --format json   Same, as JSON

ENVIRONMENT VARIABLES:
    RUST_LOG=debug         Enable debug logging on stderr

FILES:
    ~/.config/ethpci/config.json       Defaults for host, user, ssh, timeouts")]
pub struct Cli {
    /// Remote host to inspect over ssh (default: this machine)
    #[arg(long)]
    pub host: Option<String>,

    /// Comma-separated interface names to print (default: all)
    #[arg(short = 'i', long, value_delimiter = ',')]
    pub interfaces: Option<Vec<String>>,

    /// Remote login user
    #[arg(long)]
    pub user: Option<String>,

    /// Skip ssh host key verification. Only for disposable lab hosts.
    #[arg(long, conflicts_with = "accept_new_host_keys")]
    pub insecure_no_host_key_check: bool,

    /// Trust host keys of hosts not yet in known_hosts
    #[arg(long)]
    pub accept_new_host_keys: bool,

    /// Per-command timeout in seconds, 0 disables
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Config file (default: ~/.config/ethpci/config.json)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Fail when the device listing itself cannot be obtained
    #[arg(long)]
    pub strict: bool,

    /// Append JSON event lines to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        let host_key_policy = if self.insecure_no_host_key_check {
            Some(HostKeyPolicy::Disabled)
        } else if self.accept_new_host_keys {
            Some(HostKeyPolicy::AcceptNew)
        } else {
            None
        };
        ConfigOverrides {
            host: self.host.clone(),
            user: self.user.clone(),
            host_key_policy,
            timeout_secs: self.timeout,
        }
    }

    /// Requested names, trimmed, blanks dropped
    pub fn requested_interfaces(&self) -> Option<Vec<String>> {
        self.interfaces.as_ref().map(|names| {
            names
                .iter()
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect()
        })
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = self.config.clone().unwrap_or_else(config::config_path);
        let mut cfg = config::load_config(&path)?;
        cfg.apply_overrides(&self.overrides());
        config::validate_config(&cfg)?;
        Ok(cfg)
    }
}

/// `<pci-address> -- <interface>` per line
pub fn render_text(bindings: &[&InterfaceBinding]) -> String {
    bindings
        .iter()
        .map(|b| format!("{} -- {}\n", b.address, b.interface))
        .collect()
}

pub fn render_json(bindings: &[&InterfaceBinding]) -> anyhow::Result<String> {
    let mut out = serde_json::to_string_pretty(bindings)?;
    out.push('\n');
    Ok(out)
}

/// Resolve devices per `cli` and return the rendered output.
pub fn run(cli: &Cli) -> anyhow::Result<String> {
    let cfg = cli.load_config()?;
    let executor = cfg.executor();
    let builder = DeviceMapBuilder::new(&executor)
        .with_lspci_program(cfg.lspci_program.as_str())
        .with_sysfs_root(cfg.sysfs_root.as_str());

    let map = if cli.strict {
        builder.try_build().context("listing PCI devices")?
    } else {
        builder.build()
    };

    let requested = cli.requested_interfaces();
    let selected = map.select(requested.as_deref());
    match cli.format {
        OutputFormat::Text => Ok(render_text(&selected)),
        OutputFormat::Json => render_json(&selected),
    }
}
