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

//! ethpci - map Ethernet interfaces to PCI addresses
//!
//! Lists Ethernet-class PCI devices with `lspci` and recovers the interface
//! bound to each one from sysfs, locally or on a remote host over ssh. Kernel
//! network drivers, userspace I/O (uio, as used by DPDK) and virtio devices
//! inside virtual machines are all handled.

pub mod cli;
pub mod config;
pub mod device_map;
pub mod error;
pub mod executor;
pub mod logger;
pub mod lspci;
pub mod resolver;

pub use device_map::{DeviceMap, DeviceMapBuilder};
pub use error::{EthPciError, Result};
pub use executor::{CommandRunner, Executor, HostKeyPolicy, RemoteHost, Target};
pub use lspci::{parse_ethernet_devices, PciAddress};
pub use resolver::{BindingMode, InterfaceBinding, Resolver};

#[cfg(test)]
pub mod test_utils;
