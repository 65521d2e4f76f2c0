// Dump stored per-application history as JSON.
//
// Usage: cargo run --example dump_history -- [DB_PATH] [APP]
//   DB_PATH  default: ./data/appusage.db
//   APP      default: every stored application

use appusage::history_repo::{HistoryRepo, HistoryStore};
use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    let path = args.get(1).map(String::as_str).unwrap_or("./data/appusage.db");

    let repo = HistoryRepo::connect(path, 1).await?;
    let names = match args.get(2) {
        Some(app) => vec![app.clone()],
        None => repo.list_applications().await?,
    };

    let mut histories = Vec::with_capacity(names.len());
    for name in &names {
        if let Some(history) = repo.get_history(name).await? {
            histories.push(history);
        }
    }

    println!("{}", serde_json::to_string_pretty(&histories)?);
    Ok(())
}
