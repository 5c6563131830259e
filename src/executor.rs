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

//! Command execution, locally or on a remote host over ssh.
//!
//! Every call spawns exactly one process. stdout is captured and decoded as
//! UTF-8, stderr is discarded. The target host is fixed when the
//! [`Executor`] is built and cannot change afterwards.

use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EthPciError, Result};

pub const DEFAULT_SSH_PROGRAM: &str = "/usr/bin/ssh";
pub const DEFAULT_REMOTE_USER: &str = "root";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// ssh reserves this exit status for its own failures (connection, auth)
const SSH_FAILURE_STATUS: i32 = 255;
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How the remote session treats unknown or changed host keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// Refuse hosts whose key is not already in known_hosts
    #[default]
    Strict,
    /// Record keys of new hosts, refuse changed keys
    AcceptNew,
    /// Accept any key. Only for disposable lab machines.
    Disabled,
}

impl HostKeyPolicy {
    pub fn ssh_option(self) -> &'static str {
        match self {
            HostKeyPolicy::Strict => "StrictHostKeyChecking=yes",
            HostKeyPolicy::AcceptNew => "StrictHostKeyChecking=accept-new",
            HostKeyPolicy::Disabled => "StrictHostKeyChecking=no",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHost {
    pub host: String,
    pub user: String,
    pub ssh_program: String,
    pub host_key_policy: HostKeyPolicy,
}

impl RemoteHost {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: DEFAULT_REMOTE_USER.to_string(),
            ssh_program: DEFAULT_SSH_PROGRAM.to_string(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_ssh_program(mut self, program: impl Into<String>) -> Self {
        self.ssh_program = program.into();
        self
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    /// `user@host` as handed to ssh
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    fn ssh_prefix(&self) -> Vec<String> {
        vec![
            self.ssh_program.clone(),
            "-o".to_string(),
            self.host_key_policy.ssh_option().to_string(),
            self.destination(),
        ]
    }
}

/// Where commands run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Local,
    Remote(RemoteHost),
}

/// Runs one external command and returns its stdout.
///
/// `args[0]` is the program. Implementations return the output verbatim,
/// without trimming.
#[cfg_attr(test, mockall::automock)]
pub trait CommandRunner {
    fn run(&self, args: &[String]) -> Result<String>;
}

/// Lenient view of a [`CommandRunner`] used by probing code: any failure and
/// any blank output both mean "nothing here".
pub trait ProbeExt {
    fn probe(&self, args: &[String]) -> Option<String>;
}

impl<T: CommandRunner + ?Sized> ProbeExt for T {
    fn probe(&self, args: &[String]) -> Option<String> {
        match self.run(args) {
            Ok(out) if out.trim().is_empty() => None,
            Ok(out) => Some(out),
            Err(e) => {
                debug!(command = %args.join(" "), error = %e, "Probe failed");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Executor {
    target: Target,
    timeout: Option<Duration>,
}

impl Executor {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// `None` waits forever
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Final argv for `args`, including the ssh wrapper for remote targets.
    pub fn command_line(&self, args: &[String]) -> Vec<String> {
        match &self.target {
            Target::Local => args.to_vec(),
            Target::Remote(remote) => {
                let mut argv = remote.ssh_prefix();
                argv.extend(args.iter().cloned());
                argv
            }
        }
    }

    fn spawn(&self, argv: &[String]) -> Result<Child> {
        let (program, rest) = argv.split_first().ok_or(EthPciError::EmptyCommand)?;
        Command::new(program)
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EthPciError::Spawn {
                program: program.clone(),
                source,
            })
    }

    fn classify_failure(&self, program: &str, status: ExitStatus) -> EthPciError {
        if let Target::Remote(remote) = &self.target {
            if status.code() == Some(SSH_FAILURE_STATUS) {
                return EthPciError::RemoteUnreachable {
                    host: remote.host.clone(),
                };
            }
        }
        EthPciError::CommandFailed {
            program: program.to_string(),
            code: status.code(),
        }
    }
}

impl CommandRunner for Executor {
    fn run(&self, args: &[String]) -> Result<String> {
        if args.is_empty() {
            return Err(EthPciError::EmptyCommand);
        }
        let argv = self.command_line(args);
        debug!(command = %argv.join(" "), "Running command");

        let mut child = self.spawn(&argv)?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "child stdout was not captured"))?;

        // Drain stdout on a separate thread so a chatty child cannot block on
        // a full pipe while we wait on it.
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let status = match self.timeout {
            Some(limit) => match wait_with_deadline(&mut child, limit)? {
                Some(status) => status,
                None => {
                    // Reader is left detached; a grandchild may still hold the pipe.
                    return Err(EthPciError::Timeout {
                        program: argv[0].clone(),
                        after: limit,
                    });
                }
            },
            None => child.wait()?,
        };

        let bytes = reader
            .join()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stdout reader panicked"))??;
        trace!(status = ?status.code(), bytes = bytes.len(), "Command finished");

        if !status.success() {
            return Err(self.classify_failure(&argv[0], status));
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Wait for `child` up to `limit`. On expiry the child is killed and reaped
/// and `None` is returned. The child is also reaped when polling it fails.
fn wait_with_deadline(child: &mut Child, limit: Duration) -> io::Result<Option<ExitStatus>> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(Some(status)),
            Ok(None) => {}
            Err(e) => {
                terminate(child);
                return Err(e);
            }
        }
        if start.elapsed() >= limit {
            terminate(child);
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kill and reap `child`. Both steps are best effort; the child may already
/// have exited.
fn terminate(child: &mut Child) {
    if let Err(e) = child.kill() {
        trace!(pid = child.id(), error = %e, "Kill failed");
    }
    if let Err(e) = child.wait() {
        debug!(pid = child.id(), error = %e, "Could not reap child");
    }
}
