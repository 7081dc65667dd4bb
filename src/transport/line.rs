//! Newline-delimited JSON framing over any async byte stream

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::sync::Mutex;

use super::{MessageReceiver, MessageSender};
use crate::protocol::Message;
use crate::Result;

/// Writes one JSON message per line
pub struct LineSender<W> {
    writer: Mutex<W>,
}

impl<W> LineSender<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

#[async_trait]
impl<W> MessageSender for LineSender<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, message: &Message) -> Result<()> {
        let mut json = serde_json::to_string(message)?;
        json.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;

        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await?;
        Ok(())
    }
}

/// Reads one JSON message per line, skipping lines that do not parse
pub struct LineReceiver<R> {
    lines: Lines<BufReader<R>>,
}

impl<R> LineReceiver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            lines: BufReader::new(reader).lines(),
        }
    }
}

#[async_trait]
impl<R> MessageReceiver for LineReceiver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn recv(&mut self) -> Result<Option<Message>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(None);
            };

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(message) => return Ok(Some(message)),
                Err(e) => {
                    tracing::warn!("Failed to parse bridge message: {} - {}", e, line);
                }
            }
        }
    }
}
