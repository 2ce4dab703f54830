//! Inventory sync example
//!
//! Opens (or creates) a SQLite inventory, optionally adds one session by
//! hand, then syncs every device in the inventory and prints the result.
//!
//! # Prerequisites
//!
//! - Reachable Cisco IOS-XR or Nokia SR OS devices
//! - `BGP_PASSWORD` set (and `BGP_USERNAME` unless the login is `admin`)
//!
//! # Usage
//!
//! Seed the inventory with a session so the device gets synced:
//! ```bash
//! cargo run --example sync_inventory -- --db bgp.db \
//!     --add 10.1.1.1 65001 r1.example.com
//! ```
//!
//! Sync all devices and dump the inventory as JSON:
//! ```bash
//! cargo run --example sync_inventory -- --db bgp.db --json
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use bgpsync::inventory::add_manual_session;
use bgpsync::{
    Credentials, HostKeyVerification, Inventory, ManualEntry, SqliteInventory, SshConnector,
    SyncConfig, SyncOrchestrator,
};
use chrono::Utc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let inventory = Arc::new(SqliteInventory::open(&args.db).await?);

    if let Some(entry) = &args.add {
        let id = add_manual_session(&*inventory, entry, Utc::now()).await?;
        println!("Added session {} for {}", id, entry.neighbor_address);
    }

    let mut config = SyncConfig::default()
        .port(args.port)
        .concurrency(args.concurrency);
    if args.insecure {
        config = config.host_key_verification(HostKeyVerification::Disabled);
    }

    let credentials = Credentials::from_env()?;
    let orchestrator = SyncOrchestrator::new(SshConnector, Arc::clone(&inventory), config);
    let report = orchestrator.sync_all(&credentials).await?;
    let sessions = inventory.list_all().await?;

    if args.json {
        let devices: Vec<_> = report
            .devices
            .iter()
            .map(|d| match &d.result {
                Ok((vendor, outcome)) => serde_json::json!({
                    "device": d.device,
                    "vendor": vendor,
                    "inserted": outcome.inserted,
                    "updated": outcome.updated,
                }),
                Err(e) => serde_json::json!({
                    "device": d.device,
                    "error": e.to_string(),
                }),
            })
            .collect();
        let output = serde_json::json!({ "devices": devices, "sessions": sessions });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("=== Sync report ===\n");
    for device in &report.devices {
        match &device.result {
            Ok((vendor, outcome)) => println!(
                "  {:<30} {:<12} {} new, {} updated",
                device.device, vendor, outcome.inserted, outcome.updated
            ),
            Err(e) => println!("  {:<30} FAILED: {}", device.device, e),
        }
    }
    println!(
        "\n{} device(s) ok, {} failed\n",
        report.succeeded(),
        report.failed()
    );

    println!("=== Sessions ===\n");
    println!(
        "  {:<16} {:>10} {:<16} {:<30} {:<8} {:<12}",
        "NEIGHBOR", "REMOTE AS", "LOCAL ADDRESS", "DEVICE", "STATUS", "STATE"
    );
    for s in &sessions {
        println!(
            "  {:<16} {:>10} {:<16} {:<30} {:<8} {:<12}",
            s.neighbor_address,
            s.remote_as,
            s.local_address,
            s.device_identifier,
            s.connectivity,
            s.session_state
        );
    }

    Ok(())
}

struct Args {
    db: PathBuf,
    port: u16,
    concurrency: usize,
    add: Option<ManualEntry>,
    insecure: bool,
    json: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut db = PathBuf::from("bgp_sessions.db");
        let mut port = 22u16;
        let mut concurrency = 1usize;
        let mut add = None;
        let mut insecure = false;
        let mut json = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--db" | "-d" => {
                    i += 1;
                    if i < args.len() {
                        db = PathBuf::from(&args[i]);
                    }
                }
                "--port" | "-p" => {
                    i += 1;
                    if i < args.len() {
                        port = args[i].parse().unwrap_or(22);
                    }
                }
                "--concurrency" | "-j" => {
                    i += 1;
                    if i < args.len() {
                        concurrency = args[i].parse().unwrap_or(1);
                    }
                }
                "--add" | "-a" => {
                    if i + 3 < args.len() {
                        add = Some(ManualEntry {
                            neighbor_address: args[i + 1].clone(),
                            remote_as: args[i + 2].clone(),
                            device_identifier: args[i + 3].clone(),
                            ..Default::default()
                        });
                    }
                    i += 3;
                }
                "--insecure" | "-k" => {
                    insecure = true;
                }
                "--json" => {
                    json = true;
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            db,
            port,
            concurrency,
            add,
            insecure,
            json,
        }
    }
}

fn print_help() {
    println!(
        r#"Inventory sync example

USAGE:
    cargo run --example sync_inventory -- [OPTIONS]

OPTIONS:
    -d, --db <PATH>              Inventory database [default: bgp_sessions.db]
    -p, --port <PORT>            SSH port [default: 22]
    -j, --concurrency <N>        Devices synced at once [default: 1]
    -a, --add <ADDR> <AS> <DEV>  Add a session before syncing
    -k, --insecure               Skip host key verification
        --json                   Print report and inventory as JSON
        --help                   Print help

ENVIRONMENT:
    BGP_USERNAME                 Device login [default: admin]
    BGP_PASSWORD                 Device password (required)"#
    );
}
