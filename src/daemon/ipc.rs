mod commands;
mod handlers;
mod server;

pub use commands::Command;
pub use handlers::handle_client;
pub use server::{IpcHandles, start};
