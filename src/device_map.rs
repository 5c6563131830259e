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

use serde_json::json;
use tracing::{info, warn};

use crate::error::Result;
use crate::executor::CommandRunner;
use crate::logger;
use crate::lspci::{self, PciAddress, DEFAULT_LSPCI_PROGRAM};
use crate::resolver::{InterfaceBinding, Resolver, DEFAULT_SYSFS_ROOT};

/// Interface name to PCI address, in the order devices were enumerated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMap {
    bindings: Vec<InterfaceBinding>,
}

impl DeviceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a binding. An interface name already present keeps its
    /// position but takes the new address; the old binding is returned.
    pub fn insert(&mut self, binding: InterfaceBinding) -> Option<InterfaceBinding> {
        match self.bindings.iter_mut().find(|b| b.interface == binding.interface) {
            Some(existing) => Some(std::mem::replace(existing, binding)),
            None => {
                self.bindings.push(binding);
                None
            }
        }
    }

    pub fn get(&self, interface: &str) -> Option<&PciAddress> {
        self.binding(interface).map(|b| &b.address)
    }

    pub fn binding(&self, interface: &str) -> Option<&InterfaceBinding> {
        self.bindings.iter().find(|b| b.interface == interface)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Bindings for the requested names, in request order. Names that are
    /// not in the map are skipped. `None` selects everything.
    pub fn select(&self, requested: Option<&[String]>) -> Vec<&InterfaceBinding> {
        match requested {
            None => self.bindings.iter().collect(),
            Some(names) => names.iter().filter_map(|n| self.binding(n.trim())).collect(),
        }
    }
}

/// Enumerates Ethernet devices and resolves each one to its interface.
pub struct DeviceMapBuilder<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    lspci_command: Vec<String>,
    sysfs_root: String,
}

impl<'a, R: CommandRunner + ?Sized> DeviceMapBuilder<'a, R> {
    pub fn new(runner: &'a R) -> Self {
        Self {
            runner,
            lspci_command: vec![DEFAULT_LSPCI_PROGRAM.to_string()],
            sysfs_root: DEFAULT_SYSFS_ROOT.to_string(),
        }
    }

    pub fn with_lspci_program(mut self, program: impl Into<String>) -> Self {
        self.lspci_command = vec![program.into()];
        self
    }

    /// Program plus leading arguments; the listing flags are appended.
    pub fn with_lspci_command(mut self, command: Vec<String>) -> Self {
        self.lspci_command = command;
        self
    }

    pub fn with_sysfs_root(mut self, root: impl Into<String>) -> Self {
        self.sysfs_root = root.into();
        self
    }

    /// Addresses of Ethernet devices, in enumeration order.
    pub fn enumerate(&self) -> Result<Vec<PciAddress>> {
        let report = self.runner.run(&lspci::enumeration_command(&self.lspci_command))?;
        let addresses = lspci::parse_ethernet_devices(&report);
        info!(count = addresses.len(), "Enumerated Ethernet devices");
        logger::log_event(
            "enumeration",
            json!({
                "command": self.lspci_command,
                "addresses": addresses,
            }),
        );
        Ok(addresses)
    }

    /// Build the map, treating a failed enumeration as "no devices".
    pub fn build(&self) -> DeviceMap {
        match self.try_build() {
            Ok(map) => map,
            Err(e) if e.is_remote_unreachable() => {
                warn!(error = %e, "Remote host unreachable; no devices reported");
                DeviceMap::new()
            }
            Err(e) => {
                warn!(error = %e, "Device enumeration failed; no devices reported");
                DeviceMap::new()
            }
        }
    }

    /// Build the map, surfacing enumeration failures. Individual devices
    /// that cannot be resolved are still skipped silently.
    pub fn try_build(&self) -> Result<DeviceMap> {
        let addresses = self.enumerate()?;
        Ok(self.resolve_all(&addresses))
    }

    pub fn resolve_all(&self, addresses: &[PciAddress]) -> DeviceMap {
        let resolver = Resolver::with_sysfs_root(self.runner, self.sysfs_root.as_str());
        let mut map = DeviceMap::new();

        for address in addresses {
            if address.is_empty() {
                warn!("Skipping Ethernet device with an empty slot");
                continue;
            }
            match resolver.resolve(address) {
                Some(binding) => {
                    logger::log_event(
                        "binding_resolved",
                        json!({
                            "address": binding.address,
                            "interface": binding.interface,
                            "mode": binding.mode,
                        }),
                    );
                    if let Some(previous) = map.insert(binding) {
                        warn!(
                            interface = %previous.interface,
                            replaced = %previous.address,
                            by = %address,
                            "Interface name resolved for two devices; keeping the later one"
                        );
                    }
                }
                None => {
                    logger::log_event("binding_unresolved", json!({ "address": address }));
                }
            }
        }
        info!(
            enumerated = addresses.len(),
            resolved = map.len(),
            "Resolved interface bindings"
        );
        map
    }
}
