/*
 * Test utilities and mock helpers for ethpci
 *
 * Canned lspci reports, a canned-response command runner that records
 * every invocation, and a throwaway sysfs tree for tests that run real
 * commands.
 */

#[cfg(test)]
pub mod test_utils {
    use crate::error::{EthPciError, Result};
    use crate::executor::CommandRunner;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Convenience for building argv vectors from string literals
    pub fn argv<I, S>(parts: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        parts.into_iter().map(Into::into).collect()
    }

    fn record(fields: &[(&str, &str)]) -> String {
        fields
            .iter()
            .map(|(name, value)| format!("{}:\t{}", name, value))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// One `lspci -vmmn` record with the fields a real report carries
    pub fn lspci_record(slot: &str, class: &str) -> String {
        record(&[
            ("Slot", slot),
            ("Class", class),
            ("Vendor", "8086"),
            ("Device", "1572"),
            ("SVendor", "8086"),
            ("SDevice", "0006"),
            ("Rev", "01"),
        ])
    }

    /// Host bridge, two ports of an X710, a VGA controller and a virtio NIC
    pub fn sample_lspci_report() -> String {
        let records = [
            record(&[
                ("Slot", "0000:00:00.0"),
                ("Class", "0600"),
                ("Vendor", "8086"),
                ("Device", "1237"),
                ("SVendor", "1af4"),
                ("SDevice", "1100"),
                ("Rev", "02"),
            ]),
            lspci_record("0000:01:00.0", "0200"),
            record(&[
                ("Slot", "0000:01:00.1"),
                ("Class", "0200"),
                ("Vendor", "8086"),
                ("Device", "1572"),
                ("SVendor", "8086"),
                ("SDevice", "0000"),
                ("Rev", "01"),
            ]),
            record(&[
                ("Slot", "0000:00:02.0"),
                ("Class", "0300"),
                ("Vendor", "1234"),
                ("Device", "1111"),
                ("SVendor", "1af4"),
                ("SDevice", "1100"),
                ("Rev", "02"),
            ]),
            record(&[
                ("Slot", "0000:00:03.0"),
                ("Class", "0200"),
                ("Vendor", "1af4"),
                ("Device", "1000"),
                ("SVendor", "1af4"),
                ("SDevice", "0001"),
            ]),
        ];
        records.join("\n\n") + "\n"
    }

    enum Canned {
        Output(String),
        Unreachable(String),
    }

    /// Command runner answering from a table keyed by the space-joined argv.
    /// Unknown commands fail like `ls` on a missing directory.
    #[derive(Default)]
    pub struct CannedRunner {
        responses: HashMap<String, Canned>,
        calls: RefCell<Vec<String>>,
    }

    impl CannedRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_response(mut self, command: &str, output: &str) -> Self {
            self.responses
                .insert(command.to_string(), Canned::Output(output.to_string()));
            self
        }

        pub fn with_unreachable(mut self, command: &str, host: &str) -> Self {
            self.responses
                .insert(command.to_string(), Canned::Unreachable(host.to_string()));
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl CommandRunner for CannedRunner {
        fn run(&self, args: &[String]) -> Result<String> {
            let key = args.join(" ");
            self.calls.borrow_mut().push(key.clone());
            match self.responses.get(&key) {
                Some(Canned::Output(out)) => Ok(out.clone()),
                Some(Canned::Unreachable(host)) => {
                    Err(EthPciError::RemoteUnreachable { host: host.clone() })
                }
                None => Err(EthPciError::CommandFailed {
                    program: args.first().cloned().unwrap_or_default(),
                    code: Some(2),
                }),
            }
        }
    }

    /// A PCI device tree under a temporary directory, shaped like
    /// `/sys/bus/pci/devices`.
    pub struct FakeSysfs {
        dir: TempDir,
    }

    impl FakeSysfs {
        pub fn new() -> Self {
            Self {
                dir: TempDir::new().expect("create temp sysfs"),
            }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        pub fn root_str(&self) -> String {
            self.root().to_string_lossy().into_owned()
        }

        /// Create `<root>/<addr>/<rel>` as a directory
        pub fn mkdir(&self, addr: &str, rel: &str) -> PathBuf {
            let path = self.root().join(addr).join(rel);
            fs::create_dir_all(&path).expect("create sysfs dir");
            path
        }

        /// Create `<root>/<addr>/<rel>/<name>` (the bound interface entry)
        pub fn bind(&self, addr: &str, rel: &str, name: &str) {
            let dir = self.mkdir(addr, rel);
            fs::create_dir_all(dir.join(name)).expect("create interface entry");
        }

        /// A device node with the usual attribute files and nothing bound
        pub fn device(&self, addr: &str) {
            let dir = self.mkdir(addr, "");
            for attr in ["class", "vendor", "device", "config"] {
                fs::write(dir.join(attr), "").expect("write attribute");
            }
        }

        /// Write an lspci report next to the tree and return its path
        pub fn write_report(&self, report: &str) -> PathBuf {
            let path = self.root().join("lspci.txt");
            fs::write(&path, report).expect("write report");
            path
        }

        /// Enumeration command that prints `report` and ignores the
        /// listing flags appended after it
        pub fn lspci_command(&self, report: &Path) -> Vec<String> {
            vec![
                "sh".to_string(),
                "-c".to_string(),
                format!("cat '{}'", report.display()),
                "lspci".to_string(),
            ]
        }
    }
}
