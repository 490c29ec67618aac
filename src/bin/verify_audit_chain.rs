use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use clap::{Arg, ArgAction, Command};
use tracing::info;

use casetrail_audit::{verify_chain_from, AuditConfig, AuditReader, SqliteAuditStore};

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("verify-audit-chain")
        .version("0.1.0")
        .about("Verify CaseTrail audit chain integrity")
        .arg(
            Arg::new("database-url")
                .short('d')
                .long("database-url")
                .value_name("URL")
                .help("SQLite database URL (defaults to AUDIT_DATABASE_URL)"),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("RFC3339")
                .help("Start of the verification window"),
        )
        .arg(
            Arg::new("to")
                .long("to")
                .value_name("RFC3339")
                .help("End of the verification window"),
        )
        .arg(
            Arg::new("limit")
                .short('n')
                .long("limit")
                .value_name("COUNT")
                .help("Maximum number of entries to verify"),
        )
        .arg(
            Arg::new("anchor")
                .long("anchor")
                .value_name("HASH")
                .help("Content hash of the entry immediately preceding the window (for sub-range verification)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Print every detected anomaly"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress output except errors"),
        )
        .get_matches();

    let verbose = matches.get_flag("verbose");
    let quiet = matches.get_flag("quiet");

    let level = if quiet {
        tracing::Level::ERROR
    } else if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = AuditConfig::load()?;
    let database_url = matches
        .get_one::<String>("database-url")
        .cloned()
        .unwrap_or(config.database_url);

    let from = parse_timestamp(matches.get_one::<String>("from"))?;
    let to = parse_timestamp(matches.get_one::<String>("to"))?;
    let limit: i64 = match matches.get_one::<String>("limit") {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("invalid --limit value '{}': {}", raw, e))?,
        None => config.verify_batch_size,
    };
    let anchor = matches.get_one::<String>("anchor").map(String::as_str);

    // Verification must not create an empty database and call it valid.
    if let Some(path) = database_url
        .strip_prefix("sqlite://")
        .filter(|p| !p.starts_with(':'))
    {
        if !std::path::Path::new(path).exists() {
            return Err(anyhow!("audit database not found: {}", path));
        }
    }

    info!(%database_url, "verifying audit chain");

    let store = SqliteAuditStore::connect(&database_url).await?;
    let reader = AuditReader::new(store);

    let entries = reader.chain_window(from, to, limit).await?;
    if verbose && !quiet {
        println!("Loaded {} audit entries", entries.len());
    }

    let report = verify_chain_from(&entries, anchor);

    if !quiet {
        println!("{}", report.summary());

        if verbose {
            if let (Some(first), Some(last)) = (entries.first(), entries.last()) {
                println!("\nWindow:");
                println!("  First entry: {}", first.created_at);
                println!("  Last entry: {}", last.created_at);
                println!("  Head hash: {}", last.content_hash);
            }
            for anomaly in &report.anomalies {
                println!(
                    "  {:?} in entry {}: expected {}, got {}",
                    anomaly.kind,
                    anomaly.entry_id,
                    anomaly.expected.as_deref().unwrap_or("(genesis)"),
                    anomaly.actual.as_deref().unwrap_or("(genesis)"),
                );
            }
        }
    }

    if !report.is_valid() {
        std::process::exit(1);
    }

    Ok(())
}

fn parse_timestamp(raw: Option<&String>) -> Result<Option<DateTime<Utc>>> {
    match raw {
        Some(s) => {
            let parsed = DateTime::parse_from_rfc3339(s)
                .map_err(|e| anyhow!("invalid timestamp '{}': {}", s, e))?;
            Ok(Some(parsed.with_timezone(&Utc)))
        }
        None => Ok(None),
    }
}
