//! Downtime Report CLI
//!
//! Checks one or more subgraphs for gaps in clearing activity over a
//! trailing window and reports them to the console and/or Telegram.
//!
//! Usage:
//!   cargo run --bin downtime-report -- -s polygon=https://example/polygon -d 7 -t 60
//!
//! Author: AI-Generated
//! Created: 2026-02-14

use clap::Parser;
use tracing::{error, info, Level};

use obarb_solver::downtime::{downtime_for_subgraph, parse_subgraph_args, TelegramNotifier};
use obarb_solver::indexer::SubgraphClient;

#[derive(Debug, Parser)]
#[command(name = "downtime-report", about = "Report subgraph clearing-activity downtime")]
struct Args {
    /// One or more `chain=url` subgraph endpoints to check, repeatable.
    #[arg(short = 's', long = "subgraphs", env = "SUBGRAPHS", value_delimiter = ',')]
    subgraphs: Vec<String>,

    /// Trailing window length, in days.
    #[arg(short = 'd', long = "duration", env = "DURATION", default_value_t = 7)]
    duration: u64,

    /// Downtime cycle length, in minutes.
    #[arg(short = 't', long = "threshold", env = "THRESHOLD", default_value_t = 60)]
    threshold: u64,

    #[arg(long = "telegram-chat-id", env = "TG_CHAT_ID")]
    telegram_chat_id: Option<String>,

    #[arg(long = "telegram-api-token", env = "TG_TOKEN")]
    telegram_api_token: Option<String>,

    #[arg(long = "no-console", default_value_t = false)]
    no_console: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).with_target(false).init();
    dotenv::dotenv().ok();

    let args = Args::parse();
    let subgraphs = parse_subgraph_args(&args.subgraphs);
    if subgraphs.is_empty() {
        anyhow::bail!("no subgraphs configured, expected --subgraphs chain=url[,chain=url...]");
    }

    let telegram = match (&args.telegram_api_token, &args.telegram_chat_id) {
        (Some(token), Some(chat_id)) => Some(TelegramNotifier::new(token.clone(), chat_id.clone())),
        _ => None,
    };

    let now_unix = current_unix_time();

    for (url, chain) in &subgraphs {
        let client = SubgraphClient::new(url.clone());
        let report = match downtime_for_subgraph(&client, now_unix, args.duration, args.threshold).await {
            Ok(report) => report,
            Err(e) => {
                error!(chain = %chain, error = %e, "failed to fetch subgraph transactions");
                continue;
            }
        };

        let message = format!(
            "<b>{chain}</b> downtime over last {days}d: {hours:.1}h across {occurrences} occurrence(s)",
            chain = chain,
            days = args.duration,
            hours = report.total_downtime_secs as f64 / 3600.0,
            occurrences = report.downtime_occurrences,
        );

        if !args.no_console {
            info!(chain = %chain, total_downtime_secs = report.total_downtime_secs, occurrences = report.downtime_occurrences, "downtime report");
        }

        if let Some(notifier) = &telegram {
            if report.downtime_occurrences > 0 {
                if let Err(e) = notifier.send(message).await {
                    error!(chain = %chain, error = %e, "failed to send telegram notification");
                }
            }
        }
    }

    Ok(())
}

fn current_unix_time() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
