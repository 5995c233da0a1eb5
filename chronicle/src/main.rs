//! Chronicle headless driver.
//!
//! Feeds JSON AI actions from stdin into an event ledger and answers
//! `#` commands about events, plans and relationships.
//!
//! ```bash
//! cargo run -p chronicle -- --as alice --data chronicle.json
//! ```

mod headless;

use chronicle_core::LedgerConfig;
use headless::{HeadlessSession, parse_options_from_args};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays a clean protocol stream.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let options = parse_options_from_args(&args);
    let mut config = LedgerConfig::from_env();
    if let Some(self_id) = options.self_id.clone() {
        config = config.with_self_id(self_id);
    }

    let session = match &options.data {
        Some(path) if path.exists() => {
            let session = HeadlessSession::load(path, config, options.character.clone()).await?;
            tracing::info!(path = %path.display(), "resumed from snapshot");
            session
        }
        _ => HeadlessSession::new(config, options.character.clone()),
    };

    let session = headless::run_headless(session).await?;

    if let Some(path) = &options.data {
        session.save(path).await?;
        eprintln!("Saved ledger to {}", path.display());
    }

    Ok(())
}

fn print_help() {
    println!("Chronicle - shared event ledger with per-observer rumors");
    println!();
    println!("USAGE:");
    println!("    chronicle [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --as <id>         Character that authors incoming actions (default: narrator)");
    println!("    --data <path>     Snapshot to resume from and save to on exit");
    println!("    --self-id <id>    Override the user's own identity");
    println!("    -h, --help        Print this help");
    println!();
    println!("ENVIRONMENT:");
    println!("    CHRONICLE_SELF_ID        User identity (default: USER_SELF)");
    println!("    CHRONICLE_MAX_AGE_DAYS   Compaction age limit (default: 30)");
    println!("    CHRONICLE_MAX_EVENTS     Compaction count limit (default: 100)");
    println!("    RUST_LOG                 Log filter (default: warn)");
}
