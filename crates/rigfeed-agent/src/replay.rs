//! Stdin replay producer.
//!
//! The real producer is a simulator SDK plugin host, which is out of scope
//! here. In its place the binary accepts newline-delimited JSON commands on
//! stdin and drives the dispatcher with them, which is enough to exercise
//! the full relay path end to end (`echo '{"cmd":"frame"}' | rigfeed-agent`).

use rigfeed_core::{NamedEvent, TelemetryValue};
use rigfeed_dispatch::TelemetryDispatcher;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tracing::{debug, info, warn};

/// One line of replay input.
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum ProducerCommand {
    /// A channel update: `{"cmd":"set","channel":"truck.speed","value":22.5}`.
    Set {
        /// Channel name, e.g. `truck.speed`.
        channel: String,
        /// Optional channel index for indexed channels.
        #[serde(default)]
        index: Option<u32>,
        /// New value.
        value: TelemetryValue,
    },
    /// A named event: `{"cmd":"event","id":"job.delivered","class":"gameplay"}`.
    Event(NamedEvent),
    /// A frame boundary: `{"cmd":"frame"}`.
    Frame,
}

/// Apply one parsed command to the dispatcher.
pub fn apply(dispatcher: &TelemetryDispatcher, command: ProducerCommand) {
    match command {
        ProducerCommand::Set {
            channel,
            index,
            value,
        } => dispatcher.report_scalar(&channel, index, value),
        ProducerCommand::Event(event) => dispatcher.report_event(&event),
        ProducerCommand::Frame => dispatcher.report_frame_boundary(),
    }
}

/// Drain `lines` until EOF, feeding each parsed command to the dispatcher.
///
/// Malformed lines are logged and skipped; blank lines are ignored.
pub async fn run<R>(mut lines: Lines<R>, dispatcher: &TelemetryDispatcher) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut applied: u64 = 0;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<ProducerCommand>(line) {
            Ok(command) => {
                debug!(?command, "replay command");
                apply(dispatcher, command);
                applied += 1;
            }
            Err(e) => warn!(error = %e, line, "skipping malformed replay line"),
        }
    }
    info!(applied, "replay input exhausted");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
