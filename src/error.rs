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

//! Error type shared by the executor, the configuration layer and the
//! device map builder.
//!
//! Probing never surfaces these to the resolver: a failed listing is just a
//! strategy that does not apply. They exist so callers that care can tell
//! "no Ethernet devices" apart from "the remote host never answered".

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Result type alias using EthPciError
pub type Result<T> = std::result::Result<T, EthPciError>;

#[derive(thiserror::Error, Debug)]
pub enum EthPciError {
    // ============================================================================
    // Command Execution Errors
    // ============================================================================
    #[error("Empty command line")]
    EmptyCommand,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: io::Error,
    },

    #[error("{program} exited with {}", exit_code_display(.code))]
    CommandFailed {
        program: String,
        code: Option<i32>,
    },

    #[error("Remote host {host} is unreachable over ssh")]
    RemoteUnreachable {
        host: String,
    },

    #[error("{program} timed out after {after:?}")]
    Timeout {
        program: String,
        after: Duration,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },
}

fn exit_code_display(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {}", c),
        None => "no status (killed by signal)".to_string(),
    }
}

impl EthPciError {
    /// Create an invalid-config error for a named field
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True when the failure means the remote session never came up
    pub fn is_remote_unreachable(&self) -> bool {
        matches!(self, Self::RemoteUnreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_failed_display() {
        let err = EthPciError::CommandFailed {
            program: "ls".into(),
            code: Some(2),
        };
        assert_eq!(err.to_string(), "ls exited with status 2");

        let err = EthPciError::CommandFailed {
            program: "ls".into(),
            code: None,
        };
        assert_eq!(err.to_string(), "ls exited with no status (killed by signal)");
    }

    #[test]
    fn test_error_classification() {
        let unreachable = EthPciError::RemoteUnreachable {
            host: "dut1".into(),
        };
        assert!(unreachable.is_remote_unreachable());
        assert_eq!(unreachable.to_string(), "Remote host dut1 is unreachable over ssh");

        let cfg = EthPciError::invalid_config("user", "must not be empty");
        assert!(!cfg.is_remote_unreachable());
        assert_eq!(
            cfg.to_string(),
            "Invalid configuration value for user: must not be empty"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: EthPciError = io_err.into();
        assert!(matches!(err, EthPciError::Io(_)));
    }
}
