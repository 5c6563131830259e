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

//! Parser for `lspci -Dvmmn` reports.
//!
//! The machine-readable verbose format is one record per device, records
//! separated by a blank line, each line `Field:\tValue`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// PCI class code of Ethernet controllers
pub const ETHERNET_CLASS: &str = "0200";

/// Arguments for a verbose, machine-readable, numeric listing with domains
pub const LSPCI_ARGS: &[&str] = &["-Dvmmn"];
pub const DEFAULT_LSPCI_PROGRAM: &str = "lspci";

const FIELD_SEPARATOR: &str = ":\t";
const RECORD_SEPARATOR: &str = "\n\n";

/// A PCI slot address such as `0000:42:00.1`. Not validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PciAddress(String);

impl PciAddress {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields of one device record, in report order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    fields: Vec<(String, String)>,
}

impl DeviceRecord {
    /// Set a field. A repeated name replaces the earlier value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn slot(&self) -> Option<&str> {
        self.get("Slot")
    }

    pub fn class(&self) -> Option<&str> {
        self.get("Class")
    }

    pub fn is_ethernet(&self) -> bool {
        self.class() == Some(ETHERNET_CLASS)
    }
}

fn parse_record(group: &str) -> DeviceRecord {
    let mut record = DeviceRecord::default();
    for line in group.lines() {
        let (name, value) = line.split_once(FIELD_SEPARATOR).unwrap_or((line, ""));
        record.insert(name, value);
    }
    record
}

/// Split a report into device records.
pub fn parse_records(report: &str) -> Vec<DeviceRecord> {
    let report = report.trim();
    if report.is_empty() {
        return Vec::new();
    }
    report.split(RECORD_SEPARATOR).map(parse_record).collect()
}

/// Addresses of all Ethernet-class devices in `report`, in report order.
///
/// Records without a `Class` field are skipped, as are Ethernet records with
/// no `Slot` line at all. A present but empty `Slot` is returned as an empty
/// address.
pub fn parse_ethernet_devices(report: &str) -> Vec<PciAddress> {
    parse_records(report)
        .iter()
        .filter(|r| r.is_ethernet())
        .filter_map(|r| r.slot().map(PciAddress::new))
        .collect()
}

/// Enumeration command line: `prefix` (program plus any leading
/// arguments) followed by [`LSPCI_ARGS`].
pub fn enumeration_command(prefix: &[String]) -> Vec<String> {
    prefix
        .iter()
        .cloned()
        .chain(LSPCI_ARGS.iter().map(|a| a.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::test_utils::{lspci_record, sample_lspci_report};

    #[test]
    fn test_single_ethernet_device_selected() {
        let report = "Slot:\t0000:01:00.0\nClass:\t0200\n\nSlot:\t0000:02:00.0\nClass:\t0300\n";
        assert_eq!(
            parse_ethernet_devices(report),
            vec![PciAddress::new("0000:01:00.0")]
        );
    }

    #[test]
    fn test_sample_report_order_preserved() {
        let addrs = parse_ethernet_devices(&sample_lspci_report());
        let addrs: Vec<&str> = addrs.iter().map(PciAddress::as_str).collect();
        assert_eq!(addrs, vec!["0000:01:00.0", "0000:01:00.1", "0000:00:03.0"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_ethernet_devices("").is_empty());
        assert!(parse_ethernet_devices("\n\n\n").is_empty());
        assert!(parse_records("   ").is_empty());
    }

    #[test]
    fn test_missing_class_is_excluded() {
        let report = format!(
            "{}\n\nSlot:\t0000:05:00.0\nVendor:\t8086\n",
            lspci_record("0000:04:00.0", "0200")
        );
        assert_eq!(
            parse_ethernet_devices(&report),
            vec![PciAddress::new("0000:04:00.0")]
        );
    }

    #[test]
    fn test_missing_slot_is_excluded() {
        assert!(parse_ethernet_devices("Class:\t0200\nVendor:\t8086").is_empty());
    }

    #[test]
    fn test_empty_slot_is_kept() {
        assert_eq!(
            parse_ethernet_devices("Slot:\t\nClass:\t0200"),
            vec![PciAddress::new("")]
        );
    }

    #[test]
    fn test_class_must_match_exactly() {
        let report = "Slot:\t0000:01:00.0\nClass:\t02000\n\nSlot:\t0000:01:00.1\nClass:\t0280";
        assert!(parse_ethernet_devices(report).is_empty());
    }

    #[test]
    fn test_duplicate_field_last_wins() {
        let rec = parse_record("Slot:\t0000:01:00.0\nClass:\t0300\nClass:\t0200");
        assert_eq!(rec.class(), Some("0200"));
        let names: Vec<&str> = rec.fields.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["Slot", "Class"]);
    }

    #[test]
    fn test_split_on_first_separator_only() {
        let rec = parse_record("SDevice:\tPort:\t1");
        assert_eq!(rec.get("SDevice"), Some("Port:\t1"));
    }

    #[test]
    fn test_line_without_separator() {
        let rec = parse_record("garbage\nSlot:\t0000:01:00.0");
        assert_eq!(rec.get("garbage"), Some(""));
        assert_eq!(rec.slot(), Some("0000:01:00.0"));
    }

    #[test]
    fn test_record_accessors() {
        let records = parse_records(&sample_lspci_report());
        let nic = &records[1];
        assert_eq!(nic.slot(), Some("0000:01:00.0"));
        assert_eq!(nic.get("Vendor"), Some("8086"));
        assert_eq!(nic.get("Device"), Some("1572"));
        assert_eq!(nic.get("Driver"), None);
        assert!(nic.is_ethernet());
        assert!(!records[0].is_ethernet());
    }

    #[test]
    fn test_parse_is_deterministic() {
        let report = sample_lspci_report();
        assert_eq!(parse_ethernet_devices(&report), parse_ethernet_devices(&report));
    }

    #[test]
    fn test_enumeration_command() {
        let cmd = enumeration_command(&["lspci".to_string()]);
        assert_eq!(cmd, vec!["lspci".to_string(), "-Dvmmn".to_string()]);

        let wrapped = enumeration_command(&["sudo".to_string(), "/sbin/lspci".to_string()]);
        assert_eq!(wrapped, vec!["sudo", "/sbin/lspci", "-Dvmmn"]);
    }

    #[test]
    fn test_pci_address_display_and_serde() {
        let addr = PciAddress::new("0000:42:00.1");
        assert_eq!(addr.to_string(), "0000:42:00.1");
        assert_eq!(serde_json::to_string(&addr).unwrap(), "\"0000:42:00.1\"");
        assert!(!addr.is_empty());
    }
}
