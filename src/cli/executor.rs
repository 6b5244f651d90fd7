use super::{app::*, client::IpcClient, output};
use crate::Result;
use crate::common::SOCKET_PATH;
use anyhow::bail;

pub async fn execute(cli: Cli) -> Result<()> {
    let socket = cli.socket.as_deref().unwrap_or(SOCKET_PATH);
    let client = IpcClient::with_path(socket);

    if !matches!(cli.command, Commands::Status) && !client.is_alive().await {
        bail!("Daemon is not running");
    }

    let line = cli.command.to_ipc();

    match &cli.command {
        Commands::Status => {
            if !client.is_alive().await {
                output::print_daemon_stopped();
                return Ok(());
            }
            let resp = client.send(&line).await?;
            if cli.raw {
                println!("{}", resp);
            } else {
                output::print_status(&resp);
            }
        }

        Commands::Watch => {
            client
                .subscribe(|event| {
                    if !event.starts_with("OK") {
                        println!("{}", event);
                    }
                })
                .await?;
        }

        Commands::Ping => {
            if client.ping().await? {
                output::print_success("Daemon is alive (PONG)");
            } else {
                output::print_error("Daemon not responding");
            }
        }

        Commands::ScanWifi | Commands::SuggestQos { .. } | Commands::SuggestGraphics => {
            let resp = client.send(&line).await?;
            check_reply(&resp)?;
            if cli.raw {
                println!("{}", resp);
            } else {
                output::print_json(&resp);
            }
        }

        _ => {
            let resp = client.send(&line).await?;
            check_reply(&resp)?;
            match resp.strip_prefix("OK ") {
                Some(msg) if !cli.raw => output::print_success(msg),
                _ => println!("{}", resp),
            }
        }
    }

    Ok(())
}

/// `ERR <TAG> <message>` replies become a non-zero exit.
fn check_reply(resp: &str) -> Result<()> {
    if let Some(rest) = resp.strip_prefix("ERR ") {
        let (tag, message) = rest.split_once(' ').unwrap_or((rest, ""));
        output::print_error(message);
        bail!("daemon rejected the command ({})", tag);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_replies_fail() {
        assert!(check_reply("OK BoostMode enabled (Normal)").is_ok());
        assert!(check_reply("{\"state\":\"inactive\"}").is_ok());
        let err = check_reply("ERR PERMISSION_DENIED PERMISSION_DENIED: Overlay permission required").unwrap_err();
        assert!(err.to_string().contains("PERMISSION_DENIED"));
    }
}
