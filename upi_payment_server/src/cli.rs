use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty
pub fn handle_command_line_args() -> bool {
    let has_cli_args = env::args().count() > 1;
    if has_cli_args {
        display_readme();
        display_envs();
    }
    has_cli_args
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

fn display_envs() {
    // Secrets are deliberately absent from this list
    const DISPLAY_ENVS: [&str; 15] = [
        "RUST_LOG",
        "UPG_HOST",
        "UPG_PORT",
        "UPG_DATABASE_URL",
        "UPG_PUBLIC_DOMAIN",
        "UPG_WPAY_HOST",
        "UPG_WPAY_MCH_ID",
        "UPG_GATEWAY_TIMEOUT",
        "UPG_CALLBACK_MAX_AGE",
        "UPG_CALLBACK_IP_WHITELIST",
        "UPG_USE_X_FORWARDED_FOR",
        "UPG_USE_FORWARDED",
        "UPG_ORDER_ID_PREFIX",
        "UPG_CURRENCY",
        "UPG_ORDER_SUBJECT",
    ];

    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    })
}
