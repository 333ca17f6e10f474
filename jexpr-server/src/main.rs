//! jexpr Server
//!
//! JSON-RPC server that evaluates Java expressions against an attached frame.
//! Communicates via stdin/stdout for easy subprocess management.

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::Result;
use jexpr_core::protocol::RpcMessage;
use jexpr_core::{EvalConfig, Request, Response};
use tracing::{debug, error, info};

mod handler;

fn load_config() -> Result<EvalConfig> {
    match std::env::var_os("JEXPR_CONFIG") {
        Some(path) => {
            let config = EvalConfig::load(Path::new(&path))?;
            info!("Loaded config from {}", Path::new(&path).display());
            Ok(config)
        }
        None => Ok(EvalConfig::default()),
    }
}

fn main() -> Result<()> {
    // stdout carries JSON-RPC
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    info!("jexpr-server starting...");

    let config = load_config()?;
    let mut handler = handler::Handler::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read line: {}", e);
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        debug!("Received: {}", line);

        let (response, shutdown) = match serde_json::from_str::<RpcMessage<Request>>(&line) {
            Ok(msg) => {
                let shutdown = matches!(msg.content, Request::Shutdown);
                let result = handler.handle(msg.content);
                (RpcMessage::new(msg.id.unwrap_or(0), result), shutdown)
            }
            Err(e) => (
                RpcMessage::new(0, Response::error(format!("Parse error: {}", e))),
                false,
            ),
        };

        let response_json = serde_json::to_string(&response)?;
        debug!("Sending: {}", response_json);
        writeln!(stdout, "{}", response_json)?;
        stdout.flush()?;

        if shutdown {
            break;
        }
    }

    info!("jexpr-server shutting down");
    Ok(())
}
