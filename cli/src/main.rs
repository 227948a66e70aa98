//! stackwatch CLI — follow the platform event stream from the terminal.
//!
//! Usage:
//! ```bash
//! # Print every event as it arrives
//! stackwatch watch --url https://rancher.example.com/v2-beta/projects/1a5/subscribe --token $TOKEN
//!
//! # Follow one stack's deployment progress
//! stackwatch narrate --url https://rancher.example.com/v2-beta/projects/1a5/subscribe --stack web
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use stackwatch_core::MonitorConfig;
use stackwatch_observability::{init_tracing, LogConfig};
use stackwatch_stream::{Monitor, StackNarrator};
use stackwatch_ws::{StaticSession, WsConnector, SUBSCRIBE_CAPABILITY};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let rest = &args[2..];
    let log = LogConfig::default()
        .with_level(parse_flag(rest, "--log-level").unwrap_or_else(|| "warn".into()));
    let log = LogConfig {
        json: has_flag(rest, "--json-logs"),
        ..log
    };
    init_tracing(&log);

    let result = match args[1].as_str() {
        "watch" => cmd_watch(rest).await,
        "narrate" => cmd_narrate(rest).await,
        "version" | "--version" | "-V" => {
            println!("stackwatch {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("stackwatch {}", env!("CARGO_PKG_VERSION"));
    println!("Follow platform resource events and stack deployments\n");
    println!("USAGE:");
    println!("    stackwatch <COMMAND> [FLAGS]\n");
    println!("COMMANDS:");
    println!("    watch      Print every resource event");
    println!("    narrate    Print progress lines for one stack");
    println!("    version    Print version");
    println!("    help       Print this help\n");
    println!("FLAGS:");
    println!("    --url <URL>          Subscribe collection link  [required]");
    println!("    --token <TOKEN>      Bearer token for the upgrade request");
    println!("    --stack <NAME>       Stack to follow  [narrate]");
    println!("    --log-level <LEVEL>  Log level (default: warn)");
    println!("    --json-logs          Emit logs as JSON");
}

fn connector(args: &[String]) -> Result<Arc<WsConnector>, String> {
    let url = parse_flag(args, "--url").ok_or("--url is required")?;
    let mut session = StaticSession::new().with_capability(SUBSCRIBE_CAPABILITY, url);
    if let Some(token) = parse_flag(args, "--token") {
        session = session.with_bearer_token(token);
    }
    Ok(Arc::new(WsConnector::new(Arc::new(session))))
}

async fn cmd_watch(args: &[String]) -> Result<(), String> {
    let monitor = Arc::new(Monitor::new(connector(args)?, MonitorConfig::default()));
    let mut sub = monitor.subscribe().await;

    let printer = tokio::spawn(async move {
        while let Some(event) = sub.recv().await {
            println!(
                "{:<24} {:<16} {}",
                event.name, event.resource_type, event.resource_id
            );
        }
    });

    let err = monitor.start().await;
    printer.abort();
    Err(err.to_string())
}

async fn cmd_narrate(args: &[String]) -> Result<(), String> {
    let stack = parse_flag(args, "--stack").ok_or("--stack is required")?;
    let mut narrator = StackNarrator::new(connector(args)?, stack);
    let err = narrator.run(|line| println!("{line}")).await;
    Err(err.to_string())
}

fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
