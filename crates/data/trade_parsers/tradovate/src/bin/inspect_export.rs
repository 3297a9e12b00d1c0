use anyhow::{Context, Result};
use models::RawRow;
use std::env;
use tradovate::{missing_columns, read_rows, to_trades, FileFormat};

fn main() -> Result<()> {
    // Usage:
    //   inspect_export Performance.csv|Performance.xlsx [rows]
    //
    // Prints the detected columns, which expected columns are missing and the
    // first rows as they would be stored. Nothing is written.
    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| "Performance.xlsx".to_string());
    let limit: usize = env::args()
        .nth(2)
        .and_then(|n| n.parse().ok())
        .unwrap_or(10);

    let rows = read_rows(&path).with_context(|| format!("Cannot read {}", path))?;
    println!("{} ({:?}): {} data row(s)", path, FileFormat::from_path(&path), rows.len());

    let mut columns: Vec<&String> = rows.iter().flat_map(RawRow::keys).collect();
    columns.sort();
    columns.dedup();
    println!("columns: {}", join(columns.iter().map(|c| c.as_str())));

    let missing = missing_columns(&rows);
    if missing.is_empty() {
        println!("all expected columns present");
    } else {
        println!("missing columns: {}", join(missing.into_iter()));
    }

    for (idx, trade) in to_trades(&rows).iter().take(limit).enumerate() {
        println!(
            "  row {:>4}: {} qty={} pnl={} bought={} sold={}",
            idx + 1,
            trade.symbol,
            trade.qty,
            trade.pnl,
            trade.bought_timestamp,
            trade.sold_timestamp
        );
    }

    Ok(())
}

fn join<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}
