use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// Settings models
fn default_store_path() -> PathBuf {
	PathBuf::from("data")
}

fn default_log_filter() -> String {
	"info".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
	#[serde(default = "default_store_path")]
	pub store_path: PathBuf,
	#[serde(default = "default_log_filter")]
	pub log_filter: String,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			store_path: default_store_path(),
			log_filter: default_log_filter(),
		}
	}
}

// Raw spreadsheet input

/// One untyped spreadsheet cell, as read from the first sheet of an upload.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
	Empty,
	Text(String),
	Number(f64),
	Bool(bool),
	DateTime(NaiveDateTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

/// A data row keyed by header name. Columns missing from the sheet are simply absent.
pub type RawRow = HashMap<String, CellValue>;

/// Looks up a column, treating a missing column like an empty cell.
pub fn field<'a>(row: &'a RawRow, name: &str) -> &'a CellValue {
	row.get(name).unwrap_or(&EMPTY_CELL)
}

impl CellValue {
	pub fn is_empty(&self) -> bool {
		match self {
			CellValue::Empty => true,
			CellValue::Text(s) => s.trim().is_empty(),
			_ => false,
		}
	}

	/// Absent, empty text, zero, NaN and `false` are all falsy.
	pub fn is_falsy(&self) -> bool {
		match self {
			CellValue::Empty => true,
			CellValue::Text(s) => s.is_empty(),
			CellValue::Number(n) => *n == 0.0 || n.is_nan(),
			CellValue::Bool(b) => !*b,
			CellValue::DateTime(_) => false,
		}
	}

	/// Numeric coercion. Anything that is not a number yields NaN so bad data stays visible.
	pub fn to_number(&self) -> f64 {
		match self {
			CellValue::Empty => f64::NAN,
			CellValue::Text(s) => {
				let t = s.trim();
				if t.is_empty() {
					0.0
				} else {
					t.parse::<f64>().unwrap_or(f64::NAN)
				}
			}
			CellValue::Number(n) => *n,
			CellValue::Bool(b) => {
				if *b {
					1.0
				} else {
					0.0
				}
			}
			CellValue::DateTime(_) => f64::NAN,
		}
	}

	pub fn to_text(&self) -> String {
		match self {
			CellValue::Empty => String::new(),
			CellValue::Text(s) => s.clone(),
			CellValue::Number(n) => n.to_string(),
			CellValue::Bool(b) => b.to_string(),
			CellValue::DateTime(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
		}
	}
}

/// Stores non-finite numbers as `null` and reads `null` back as NaN.
pub mod nan_as_null {
	use serde::{Deserialize, Deserializer, Serializer};

	pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
		if value.is_finite() {
			serializer.serialize_f64(*value)
		} else {
			serializer.serialize_none()
		}
	}

	pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
		Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
	}
}

// Journal models

/// One matched buy/sell execution pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
	pub id: String,
	pub symbol: String,
	#[serde(with = "nan_as_null")]
	pub price_format: f64,
	#[serde(with = "nan_as_null")]
	pub price_format_type: f64,
	#[serde(with = "nan_as_null")]
	pub tick_size: f64,
	pub buy_fill_id: String,
	pub sell_fill_id: String,
	#[serde(with = "nan_as_null")]
	pub qty: f64,
	#[serde(with = "nan_as_null")]
	pub buy_price: f64,
	#[serde(with = "nan_as_null")]
	pub sell_price: f64,
	#[serde(with = "nan_as_null")]
	pub pnl: f64,
	pub bought_timestamp: String,
	pub sold_timestamp: String,
	pub duration: String,
}

impl Trade {
	/// Text before the first space of the bought timestamp.
	pub fn bought_day(&self) -> &str {
		self.bought_timestamp
			.split(' ')
			.next()
			.unwrap_or_default()
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
	pub id: String,
	pub name: String,
	pub created_at: String,
}

/// Derived calendar cell: the trades bought on `date` and their net P&L.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDay {
	pub date: NaiveDate,
	pub trades: Vec<Trade>,
	pub total_pnl: f64,
}

// Presentation preference persisted next to the journal data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
	#[default]
	Default,
	Light,
	Midnight,
	Emerald,
	Rose,
	Amber,
	Purple,
	Teal,
	Orange,
	Crimson,
	Mint,
	Indigo,
}

impl Theme {
	pub const ALL: [Theme; 12] = [
		Theme::Default,
		Theme::Light,
		Theme::Midnight,
		Theme::Emerald,
		Theme::Rose,
		Theme::Amber,
		Theme::Purple,
		Theme::Teal,
		Theme::Orange,
		Theme::Crimson,
		Theme::Mint,
		Theme::Indigo,
	];

	pub fn id(&self) -> &'static str {
		match self {
			Theme::Default => "default",
			Theme::Light => "light",
			Theme::Midnight => "midnight",
			Theme::Emerald => "emerald",
			Theme::Rose => "rose",
			Theme::Amber => "amber",
			Theme::Purple => "purple",
			Theme::Teal => "teal",
			Theme::Orange => "orange",
			Theme::Crimson => "crimson",
			Theme::Mint => "mint",
			Theme::Indigo => "indigo",
		}
	}

	pub fn display_name(&self) -> &'static str {
		match self {
			Theme::Default => "Default Dark",
			Theme::Light => "Light",
			Theme::Midnight => "Midnight Blue",
			Theme::Emerald => "Emerald",
			Theme::Rose => "Rose",
			Theme::Amber => "Amber",
			Theme::Purple => "Royal Purple",
			Theme::Teal => "Ocean Teal",
			Theme::Orange => "Sunset Orange",
			Theme::Crimson => "Deep Crimson",
			Theme::Mint => "Cool Mint",
			Theme::Indigo => "Deep Indigo",
		}
	}
}

impl fmt::Display for Theme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.id())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTheme(pub String);

impl fmt::Display for UnknownTheme {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "unknown theme: {}", self.0)
	}
}

impl std::error::Error for UnknownTheme {}

impl FromStr for Theme {
	type Err = UnknownTheme;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let wanted = s.trim();
		Theme::ALL
			.iter()
			.copied()
			.find(|t| t.id().eq_ignore_ascii_case(wanted))
			.ok_or_else(|| UnknownTheme(s.to_string()))
	}
}
