// src/mcp/transport.rs

//! Newline-delimited JSON-RPC over a byte stream (stdin/stdout in production).

use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, FramedRead};
use tracing::{debug, error, info, warn};

use crate::mcp::handler::handle_value;
use crate::mcp::protocol::{error_codes, Response};
use crate::AppState;

pub const MAX_LINE_BYTES: usize = 4 * 1024 * 1024;

/// Serves stdin/stdout until EOF.
pub async fn run_stdio(state: AppState) -> Result<()> {
    run_loop(tokio::io::stdin(), tokio::io::stdout(), state).await
}

/// Reads one request per line and answers on `writer`. Each request runs on
/// its own task; responses are written in completion order, one per line.
pub async fn run_loop<R, W>(reader: R, writer: W, state: AppState) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<String>(64);
    let writer_task = tokio::spawn(write_frames(writer, rx));

    let mut frames = FramedRead::new(
        reader,
        AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), Vec::new(), MAX_LINE_BYTES),
    );
    let mut in_flight = JoinSet::new();
    let mut outcome = Ok(());

    while let Some(frame) = frames.next().await {
        let bytes = match frame {
            Ok(bytes) => bytes,
            Err(AnyDelimiterCodecError::MaxChunkLengthExceeded) => {
                error!("Inbound frame exceeds {} bytes; closing session", MAX_LINE_BYTES);
                outcome = Err(anyhow::anyhow!("frame too large"));
                break;
            }
            Err(AnyDelimiterCodecError::Io(e)) => {
                outcome = Err(anyhow::Error::new(e).context("failed to read from stdin"));
                break;
            }
        };
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line.trim().to_string(),
            Err(e) => {
                warn!("Discarding frame that is not UTF-8: {}", e);
                if let Some(frame) = encode(&parse_error(format!("Parse error: {}", e))) {
                    let _ = tx.send(frame).await;
                }
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let tx = tx.clone();
        let state = state.clone();
        in_flight.spawn(async move {
            if let Some(frame) = process_line(&line, &state).await {
                // The writer only goes away once the loop is shutting down.
                let _ = tx.send(frame).await;
            }
        });

        // Reap finished tasks so the set does not grow with the session.
        while in_flight.try_join_next().is_some() {}
    }

    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer_task.await.context("stdout writer task failed")??;
    info!("stdio session ended");
    outcome
}

fn parse_error(message: String) -> Response {
    Response::error(Value::Null, error_codes::PARSE_ERROR, message)
}

fn encode(response: &Response) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(frame) => Some(frame),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            None
        }
    }
}

async fn process_line(line: &str, state: &AppState) -> Option<String> {
    let response = match serde_json::from_str::<Value>(line) {
        Ok(message) => handle_value(message, state).await?,
        Err(e) => {
            warn!("Discarding unparsable frame: {}", e);
            parse_error(format!("Parse error: {}", e))
        }
    };
    encode(&response)
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        debug!(bytes = frame.len(), "writing response frame");
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
