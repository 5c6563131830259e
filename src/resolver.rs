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

//! Resolve the interface bound to a PCI device by listing its sysfs node.
//!
//! Four bindings are tried in a fixed order and the first hit wins:
//!
//! 1. kernel network driver: `<dev>/net/<ifname>`
//! 2. userspace I/O driver (DPDK): `<dev>/uio/<uioN>`
//! 3. virtio, kernel driver: `<dev>/virtioN/net/<ifname>`
//! 4. virtio, userspace I/O: `<dev>/virtioN/uio/<uioN>`

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::executor::{CommandRunner, ProbeExt};
use crate::lspci::PciAddress;

pub const DEFAULT_SYSFS_ROOT: &str = "/sys/bus/pci/devices";
pub const LIST_PROGRAM: &str = "ls";

const VIRTIO_PREFIX: &str = "virtio";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BindingMode {
    NativeKernel,
    NativeUserspace,
    VirtioKernel,
    VirtioUserspace,
}

impl BindingMode {
    /// Probe order
    pub const ALL: [BindingMode; 4] = [
        BindingMode::NativeKernel,
        BindingMode::NativeUserspace,
        BindingMode::VirtioKernel,
        BindingMode::VirtioUserspace,
    ];

    /// Directory holding the bound interface
    pub fn subdir(self) -> &'static str {
        match self {
            BindingMode::NativeKernel | BindingMode::VirtioKernel => "net",
            BindingMode::NativeUserspace | BindingMode::VirtioUserspace => "uio",
        }
    }

    pub fn is_virtio(self) -> bool {
        matches!(self, BindingMode::VirtioKernel | BindingMode::VirtioUserspace)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BindingMode::NativeKernel => "native-kernel",
            BindingMode::NativeUserspace => "native-userspace",
            BindingMode::VirtioKernel => "virtio-kernel",
            BindingMode::VirtioUserspace => "virtio-userspace",
        }
    }
}

impl fmt::Display for BindingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceBinding {
    pub address: PciAddress,
    pub interface: String,
    pub mode: BindingMode,
}

/// Probes one device at a time through a [`CommandRunner`].
pub struct Resolver<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    sysfs_root: String,
}

impl<'a, R: CommandRunner + ?Sized> Resolver<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self::with_sysfs_root(runner, DEFAULT_SYSFS_ROOT)
    }

    pub fn with_sysfs_root(runner: &'a R, root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        let sysfs_root = if trimmed.is_empty() { root } else { trimmed.to_string() };
        Self { runner, sysfs_root }
    }

    /// Interface name bound to `address`, if any.
    pub fn resolve_interface(&self, address: &PciAddress) -> Option<String> {
        self.resolve(address).map(|b| b.interface)
    }

    /// Try every binding mode in order and stop at the first hit.
    pub fn resolve(&self, address: &PciAddress) -> Option<InterfaceBinding> {
        for mode in BindingMode::ALL {
            if let Some(interface) = self.probe_mode(address, mode) {
                debug!(
                    address = %address,
                    interface = %interface,
                    mode = %mode,
                    "Resolved binding"
                );
                return Some(InterfaceBinding {
                    address: address.clone(),
                    interface,
                    mode,
                });
            }
            trace!(address = %address, mode = %mode, "Binding mode does not apply");
        }
        debug!(address = %address, "No interface bound");
        None
    }

    /// Run a single strategy. `None` means it does not apply.
    pub fn probe_mode(&self, address: &PciAddress, mode: BindingMode) -> Option<String> {
        let device_dir = self.device_dir(address);
        let target_dir = if mode.is_virtio() {
            let child = self.find_virtio_child(&device_dir)?;
            format!("{}/{}/{}/", device_dir, child, mode.subdir())
        } else {
            format!("{}/{}/", device_dir, mode.subdir())
        };
        self.list(&target_dir).map(|listing| {
            if listing.split_whitespace().nth(1).is_some() {
                warn!(
                    address = %address,
                    mode = %mode,
                    listing = %listing,
                    "Multiple entries bound to one device"
                );
            }
            listing
        })
    }

    fn device_dir(&self, address: &PciAddress) -> String {
        format!("{}/{}", self.sysfs_root, address)
    }

    fn find_virtio_child(&self, device_dir: &str) -> Option<String> {
        let listing = self.list(&format!("{}/", device_dir))?;
        listing
            .split_whitespace()
            .find(|entry| entry.starts_with(VIRTIO_PREFIX))
            .map(str::to_string)
    }

    /// Trimmed directory listing, `None` when absent or empty.
    fn list(&self, dir: &str) -> Option<String> {
        let args = vec![LIST_PROGRAM.to_string(), dir.to_string()];
        self.runner
            .probe(&args)
            .map(|out| out.trim().to_string())
            .filter(|out| !out.is_empty())
    }
}
