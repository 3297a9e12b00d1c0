//! Ingestion of Tradovate "Performance" exports into an account's trade collection.

pub mod cells;
pub mod error;
pub mod reader;

use models::{field, RawRow, Trade};
use std::path::Path;
use store::{AccountStore, KeyValueStore};
use uuid::Uuid;

pub use crate::cells::{normalize_timestamp, parse_signed_currency, parse_signed_currency_str};
pub use crate::error::{IngestError, Result};
pub use crate::reader::{load_rows, read_rows, FileFormat};

pub const PARSER_NAME: &str = "tradovate";

/// Header names the export is expected to carry. Nothing is validated against this
/// list before ingestion; missing columns just produce NaN or empty fields.
pub const EXPECTED_COLUMNS: [&str; 13] = [
    "symbol",
    "priceFormat",
    "_priceFormatTyp",
    "_tickSize",
    "buyFillId",
    "sellFillId",
    "qty",
    "buyPrice",
    "sellPrice",
    "pnl",
    "boughtTimestamp",
    "soldTimestamp",
    "duration",
];

/// Expected columns that appear in none of the rows.
pub fn missing_columns(rows: &[RawRow]) -> Vec<&'static str> {
    EXPECTED_COLUMNS
        .iter()
        .copied()
        .filter(|col| rows.iter().all(|row| !row.contains_key(*col)))
        .collect()
}

/// Maps one export row to a trade with a fresh id.
pub fn to_trade(row: &RawRow) -> Trade {
    Trade {
        id: Uuid::new_v4().to_string(),
        symbol: field(row, "symbol").to_text(),
        price_format: field(row, "priceFormat").to_number(),
        price_format_type: field(row, "_priceFormatTyp").to_number(),
        tick_size: field(row, "_tickSize").to_number(),
        buy_fill_id: field(row, "buyFillId").to_text(),
        sell_fill_id: field(row, "sellFillId").to_text(),
        qty: field(row, "qty").to_number(),
        buy_price: field(row, "buyPrice").to_number(),
        sell_price: field(row, "sellPrice").to_number(),
        pnl: parse_signed_currency(field(row, "pnl")),
        bought_timestamp: cells::timestamp_cell(field(row, "boughtTimestamp")),
        sold_timestamp: cells::timestamp_cell(field(row, "soldTimestamp")),
        duration: field(row, "duration").to_text(),
    }
}

pub fn to_trades(rows: &[RawRow]) -> Vec<Trade> {
    rows.iter().map(to_trade).collect()
}

fn has_malformed_numbers(trade: &Trade) -> bool {
    [
        trade.price_format,
        trade.price_format_type,
        trade.tick_size,
        trade.qty,
        trade.buy_price,
        trade.sell_price,
        trade.pnl,
    ]
    .iter()
    .any(|v| v.is_nan())
}

/// Resolves the active account id, which must name an existing account.
fn require_active<S: KeyValueStore>(
    accounts: &AccountStore<S>,
    active: Option<&str>,
) -> Result<String> {
    let id = active
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or(IngestError::NoActiveAccount)?;

    if accounts.find_account(id)?.is_none() {
        return Err(store::StoreError::AccountNotFound(id.to_string()).into());
    }
    Ok(id.to_string())
}

/// Converts `rows` and replaces the active account's stored trades with them.
///
/// Previously stored trades for the account are discarded. Returns the number of
/// trades written; an empty input stores an empty collection.
pub fn ingest<S: KeyValueStore>(
    accounts: &mut AccountStore<S>,
    active: Option<&str>,
    rows: &[RawRow],
) -> Result<usize> {
    let account_id = require_active(accounts, active)?;

    let trades = to_trades(rows);
    let malformed = trades.iter().filter(|t| has_malformed_numbers(t)).count();
    if malformed > 0 {
        tracing::warn!(
            account_id = %account_id,
            malformed,
            "Rows with non-numeric fields were kept with NaN values"
        );
    }

    accounts.replace_trades(&account_id, &trades)?;
    tracing::info!(account_id = %account_id, count = trades.len(), "Imported trades");
    Ok(trades.len())
}

/// Reads an export file and ingests it for the active account.
///
/// The account is checked before the file is read, and nothing is written if the
/// file cannot be parsed.
pub async fn import_file<S, P>(
    accounts: &mut AccountStore<S>,
    active: Option<&str>,
    path: P,
) -> Result<usize>
where
    S: KeyValueStore,
    P: AsRef<Path>,
{
    let account_id = require_active(accounts, active)?;
    let rows = load_rows(path).await?;
    ingest(accounts, Some(account_id.as_str()), &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::CellValue;
    use store::{trades_key, MemoryStore, StoreError};

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn row(symbol: &str, pnl: &str, bought: &str) -> RawRow {
        let mut r = RawRow::new();
        r.insert("symbol".to_string(), text(symbol));
        r.insert("priceFormat".to_string(), CellValue::Number(-2.0));
        r.insert("_priceFormatTyp".to_string(), CellValue::Number(0.0));
        r.insert("_tickSize".to_string(), CellValue::Number(0.25));
        r.insert("buyFillId".to_string(), CellValue::Number(123456789.0));
        r.insert("sellFillId".to_string(), text("123456790"));
        r.insert("qty".to_string(), CellValue::Number(2.0));
        r.insert("buyPrice".to_string(), CellValue::Number(5100.25));
        r.insert("sellPrice".to_string(), text("5101"));
        r.insert("pnl".to_string(), text(pnl));
        r.insert("boughtTimestamp".to_string(), text(bought));
        r.insert("soldTimestamp".to_string(), text("3/1/2024 09:31:00"));
        r.insert("duration".to_string(), text("1min"));
        r
    }

    fn store_with_account() -> (AccountStore<MemoryStore>, String) {
        let mut accounts = AccountStore::new(MemoryStore::new());
        let id = accounts.create_account("Main").unwrap().id;
        (accounts, id)
    }

    #[test]
    fn test_to_trade_maps_every_field() {
        let trade = to_trade(&row("MESM4", "$(12.50)", "3/1/2024 09:30:00"));

        assert_eq!(trade.symbol, "MESM4");
        assert_eq!(trade.price_format, -2.0);
        assert_eq!(trade.price_format_type, 0.0);
        assert_eq!(trade.tick_size, 0.25);
        assert_eq!(trade.buy_fill_id, "123456789");
        assert_eq!(trade.sell_fill_id, "123456790");
        assert_eq!(trade.qty, 2.0);
        assert_eq!(trade.buy_price, 5100.25);
        assert_eq!(trade.sell_price, 5101.0);
        assert_eq!(trade.pnl, -12.5);
        assert_eq!(trade.bought_timestamp, "2024/03/01 09:30:00");
        assert_eq!(trade.sold_timestamp, "2024/03/01 09:31:00");
        assert_eq!(trade.duration, "1min");
        assert!(Uuid::parse_str(&trade.id).is_ok());
    }

    #[test]
    fn test_missing_and_bad_fields_propagate() {
        let mut r = RawRow::new();
        r.insert("symbol".to_string(), text("NQ"));
        r.insert("qty".to_string(), text("two"));

        let trade = to_trade(&r);
        assert!(trade.qty.is_nan());
        assert!(trade.buy_price.is_nan());
        assert_eq!(trade.pnl, 0.0);
        assert_eq!(trade.buy_fill_id, "");
        assert_eq!(trade.bought_timestamp, "");
        assert!(has_malformed_numbers(&trade));
    }

    #[test]
    fn test_ids_are_unique() {
        let rows = vec![row("A", "$1", "3/1/2024 09:30:00"); 50];
        let trades = to_trades(&rows);
        let ids: std::collections::HashSet<_> = trades.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 50);
    }

    #[test]
    fn test_missing_columns() {
        let rows = vec![row("A", "$1", "3/1/2024 09:30:00")];
        assert!(missing_columns(&rows).is_empty());

        let mut partial = RawRow::new();
        partial.insert("symbol".to_string(), text("A"));
        let missing = missing_columns(&[partial]);
        assert_eq!(missing.len(), EXPECTED_COLUMNS.len() - 1);
        assert!(missing.contains(&"pnl"));
        assert_eq!(missing_columns(&[]).len(), EXPECTED_COLUMNS.len());
    }

    #[test]
    fn test_ingest_requires_active_account() {
        let (mut accounts, _) = store_with_account();
        let before = accounts.backend().len();

        let err = ingest(&mut accounts, None, &[row("A", "$1", "3/1/2024 09:30:00")]).unwrap_err();
        assert!(matches!(err, IngestError::NoActiveAccount));

        let err = ingest(&mut accounts, Some("  "), &[]).unwrap_err();
        assert!(matches!(err, IngestError::NoActiveAccount));
        assert_eq!(accounts.backend().len(), before);
    }

    #[test]
    fn test_ingest_unknown_account() {
        let (mut accounts, _) = store_with_account();
        let err = ingest(&mut accounts, Some("ghost"), &[]).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Store(StoreError::AccountNotFound(_))
        ));
        assert!(!accounts.backend().contains_key(&trades_key("ghost")));
    }

    #[test]
    fn test_ingest_zero_rows_stores_empty_collection() {
        let (mut accounts, id) = store_with_account();

        let count = ingest(&mut accounts, Some(id.as_str()), &[]).unwrap();
        assert_eq!(count, 0);
        assert_eq!(
            accounts.backend().get(&trades_key(&id)).unwrap().as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn test_ingest_replaces_previous_upload() {
        let (mut accounts, id) = store_with_account();
        let first: Vec<RawRow> = (0..5)
            .map(|_| row("A", "$1", "3/1/2024 09:30:00"))
            .collect();
        let second: Vec<RawRow> = (0..3)
            .map(|_| row("B", "$2", "3/2/2024 09:30:00"))
            .collect();

        assert_eq!(ingest(&mut accounts, Some(id.as_str()), &first).unwrap(), 5);
        assert_eq!(ingest(&mut accounts, Some(id.as_str()), &second).unwrap(), 3);

        let stored = accounts.trades(&id).unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|t| t.symbol == "B"));
    }

    #[test]
    fn test_ingest_keeps_malformed_rows() {
        let (mut accounts, id) = store_with_account();
        let rows = vec![
            row("A", "oops", "3/1/2024 09:30:00"),
            row("B", "$4", "not a date"),
        ];

        assert_eq!(ingest(&mut accounts, Some(id.as_str()), &rows).unwrap(), 2);
        let stored = accounts.trades(&id).unwrap();
        assert!(stored[0].pnl.is_nan());
        assert_eq!(stored[1].bought_timestamp, "not a date");
    }

    #[tokio::test]
    async fn test_import_file_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Performance.csv");
        std::fs::write(
            &path,
            "symbol,pnl,boughtTimestamp,qty\nMNQM4,$5.00,3/1/2024 09:30:00,1\nMNQM4,$(2.00),3/1/2024 10:30:00,1\n",
        )
        .unwrap();

        let (mut accounts, id) = store_with_account();
        let count = import_file(&mut accounts, Some(id.as_str()), &path).await.unwrap();
        assert_eq!(count, 2);

        let stored = accounts.trades(&id).unwrap();
        assert_eq!(stored[1].pnl, -2.0);
        assert_eq!(stored[0].bought_timestamp, "2024/03/01 09:30:00");
    }

    #[tokio::test]
    async fn test_import_invalid_file_keeps_existing_trades() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a workbook").unwrap();

        let (mut accounts, id) = store_with_account();
        ingest(&mut accounts, Some(id.as_str()), &[row("A", "$1", "3/1/2024 09:30:00")]).unwrap();

        let err = import_file(&mut accounts, Some(id.as_str()), &path).await.unwrap_err();
        assert!(matches!(err, IngestError::InvalidFile(_)));
        assert_eq!(accounts.trades(&id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_import_checks_account_before_reading() {
        let (mut accounts, _) = store_with_account();
        let err = import_file(&mut accounts, None, "does-not-exist.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::NoActiveAccount));
    }
}
