use std::convert::Infallible;

use bytes::Bytes;
use futures::StreamExt;
use log::{debug, warn};
use serde_json::Value;
use tokio_stream::wrappers::ReceiverStream;

/// Text fragments of an in-flight summary, forwarded as they arrive.
pub type SummaryStream = ReceiverStream<Result<Bytes, Infallible>>;

/// Failure opening the completion stream.
#[derive(Debug)]
pub enum RelayError {
    /// The provider rejected the request; carries its raw error object so
    /// the caller can surface it verbatim.
    Provider(Value),
    /// The request never produced a usable response.
    Transport(eyre::Report),
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Transport(err.into())
    }
}

/// Open a streaming chat completion for `prompt` and forward its text
/// deltas, in arrival order, one chunk at a time.
///
/// If the upstream stream fails mid-way the output simply ends: partial
/// text the client already received stays as delivered, and the cause goes
/// to the logs. A disconnected client stops the forwarding task.
pub async fn open_summary_stream(
    client: &reqwest::Client,
    base_url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<SummaryStream, RelayError> {
    let url = format!("{}/v1/chat/completions", base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": model,
        "messages": [{ "role": "system", "content": prompt }],
        "stream": true,
    });

    let resp = client.post(&url).bearer_auth(api_key).json(&body).send().await?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        debug!("provider returned {status}: {text}");
        let error = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| {
            serde_json::json!({ "error": { "message": format!("provider returned {status}") } })
        });
        return Err(RelayError::Provider(error));
    }

    let mut byte_stream = resp.bytes_stream();
    let (tx, rx) = tokio::sync::mpsc::channel::<Result<Bytes, Infallible>>(16);

    tokio::spawn(async move {
        // Lines never split a UTF-8 character, so buffer bytes and only
        // decode complete lines.
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    warn!("summary stream aborted: {e}");
                    return;
                }
            };
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                let Ok(line) = std::str::from_utf8(&line) else {
                    continue;
                };
                let Some(data) = line.trim().strip_prefix("data:") else {
                    continue;
                };
                let data = data.trim();

                if data == "[DONE]" {
                    return;
                }
                if let Some(delta) = delta_content(data) {
                    if tx.send(Ok(Bytes::from(delta))).await.is_err() {
                        // client went away
                        return;
                    }
                }
            }
        }
    });

    Ok(ReceiverStream::new(rx))
}

/// Extract `choices[0].delta.content` from one SSE data payload. Empty
/// deltas (role announcements, finish chunks) and unparseable lines yield
/// `None` and are skipped.
fn delta_content(data: &str) -> Option<String> {
    let json: Value = serde_json::from_str(data).ok()?;
    let content = json
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;

    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}
