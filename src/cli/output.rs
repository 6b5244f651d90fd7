use crate::common::types::DaemonStatus;

pub fn print_status(response: &str) {
    println!("      GameBoost Daemon Status     ");

    if response.is_empty() {
        println!("No response from daemon\n");
        return;
    }

    let status: DaemonStatus = match serde_json::from_str(response) {
        Ok(s) => s,
        Err(_) => {
            println!("{}\n", response);
            return;
        }
    };

    println!("Daemon: Running\n");
    let icon = if status.mode.is_some() { "✓" } else { "✗" };
    println!("  {} Session:  {}", icon, status.state);
    if let Some(mode) = status.mode {
        println!("    Mode:     {}", mode);
    }
    if let Some(game) = &status.current_game {
        println!("    Game:     {}", game);
    }
    if let Some(ping) = status.target_ping_ms {
        println!("    Ping:     {} ms target", ping);
    }
    println!("    Games:    {} catalogued", status.games);
    println!("    Log:      {}", status.log_level);
    println!();
}

/// Pretty-prints a JSON reply; anything else is printed as is.
pub fn print_json(response: &str) {
    match serde_json::from_str::<serde_json::Value>(response)
        .and_then(|v| serde_json::to_string_pretty(&v))
    {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", response),
    }
}

pub fn print_daemon_stopped() {
    println!("      GameBoost Daemon Status     ");
    println!(" Daemon: Not running\n");
}

pub fn print_success(message: &str) {
    println!(" {}", message);
}

pub fn print_error(message: &str) {
    eprintln!(" Error: {}", message);
}
