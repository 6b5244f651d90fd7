use crate::common::SOCKET_PATH;
use crate::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

pub struct IpcClient {
    socket_path: String,
}

impl IpcClient {
    pub fn new() -> Self {
        Self::with_path(SOCKET_PATH)
    }

    pub fn with_path(socket_path: impl Into<String>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    async fn connect(&self) -> Result<BufReader<UnixStream>> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .context("Failed to connect to daemon. Is it running?")?;
        let mut reader = BufReader::new(stream);

        let mut greeting = String::new();
        reader.read_line(&mut greeting).await?;
        if !greeting.starts_with("OK") {
            anyhow::bail!("Unexpected greeting: {}", greeting.trim());
        }
        Ok(reader)
    }

    /// Sends one command followed by QUIT and returns everything the
    /// daemon wrote before its BYE.
    pub async fn send(&self, command: &str) -> Result<String> {
        let mut reader = self.connect().await?;

        reader
            .get_mut()
            .write_all(format!("{}\nQUIT\n", command).as_bytes())
            .await?;

        let mut response = String::new();
        reader.read_to_string(&mut response).await?;

        let body = response.trim_end();
        let body = body.strip_suffix("BYE").unwrap_or(body);
        Ok(body.trim().to_string())
    }

    /// Streams event lines to `on_line` until the daemon closes the socket.
    pub async fn subscribe(&self, mut on_line: impl FnMut(&str)) -> Result<()> {
        let mut reader = self.connect().await?;
        reader.get_mut().write_all(b"SUBSCRIBE\n").await?;

        let mut line = String::new();
        while reader.read_line(&mut line).await? > 0 {
            on_line(line.trim_end());
            line.clear();
        }
        Ok(())
    }

    pub async fn is_alive(&self) -> bool {
        UnixStream::connect(&self.socket_path).await.is_ok()
    }

    pub async fn ping(&self) -> Result<bool> {
        match self.send("PING").await {
            Ok(resp) => Ok(resp.contains("PONG")),
            Err(_) => Ok(false),
        }
    }
}

impl Default for IpcClient {
    fn default() -> Self {
        Self::new()
    }
}
