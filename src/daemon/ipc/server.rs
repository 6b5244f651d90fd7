use super::handlers::handle_client;
use crate::common::types::LogLevel;
use crate::daemon::controller::BoostController;
use anyhow::{Context, Result};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::UnixListener;

/// Everything a client connection needs, cloned per connection.
#[derive(Clone)]
pub struct IpcHandles {
    pub controller: Arc<BoostController>,
    pub reload_fn: Arc<dyn Fn() -> Result<usize> + Send + Sync>,
    pub set_log_level: Arc<dyn Fn(LogLevel) + Send + Sync>,
    /// User gamelist that ADD_GAME/REMOVE_GAME persist to.
    pub gamelist_path: PathBuf,
}

pub async fn start<P: AsRef<Path>>(path: P, h: IpcHandles) -> Result<()> {
    let path_ref = path.as_ref();
    let _ = std::fs::remove_file(path_ref);
    let listener =
        UnixListener::bind(path_ref).with_context(|| format!("Failed to bind {}", path_ref.display()))?;
    let _ = std::fs::set_permissions(path_ref, std::fs::Permissions::from_mode(0o660));
    tracing::info!(target: "gameboost::ipc", "IPC listening at {:?}", path_ref);

    loop {
        let (stream, _) = listener.accept().await?;
        let hc = h.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_client(stream, hc).await {
                tracing::warn!(target: "gameboost::ipc", "client error: {:?}", e);
            }
        });
    }
}
