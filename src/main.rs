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

use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ethpci::cli::{self, Cli};
use ethpci::logger;

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Cli::parse();

    // Optional JSON event log
    if let Some(path) = &args.log_file {
        if let Err(e) = logger::init_logging(path) {
            eprintln!("Warning: cannot open log file {}: {}", path.display(), e);
        }
    }
    logger::log_event(
        "startup",
        serde_json::json!({
            "host": args.host,
            "interfaces": args.interfaces,
            "strict": args.strict,
        }),
    );

    match cli::run(&args) {
        Ok(output) => {
            let mut stdout = io::stdout().lock();
            // A closed pipe (e.g. `| head`) is not an error worth reporting.
            let _ = stdout.write_all(output.as_bytes());
            let _ = stdout.flush();
            logger::shutdown_logging();
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            logger::log_event(
                "fatal_error",
                serde_json::json!({ "error": format!("{:#}", err) }),
            );
            logger::shutdown_logging();
            std::process::exit(1);
        }
    }
}
