use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use models::{Trade, TradeDay};
use serde::Serialize;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    fs,
    path::Path,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DailyStat {
    pub pnl: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_trades: usize,
    pub total_pnl: f64,
    pub win_count: usize,
    pub loss_count: usize,
    /// Fraction in `[0, 1]`.
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInsights {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub total_pnl: f64,
    pub symbols: Vec<String>,
    pub hour_distribution: BTreeMap<u32, usize>,
    pub most_active_hours: Vec<(u32, usize)>,
    pub average_win: Option<f64>,
    pub average_loss: Option<f64>,
    pub risk_reward: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: String,
    pub scope: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: String,
    pub label: String,
    pub pnl: f64,
    pub count: usize,
    pub profitable: bool,
}

#[derive(Debug, Serialize)]
pub struct SymbolCount {
    pub symbol: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub metadata: ReportMetadata,
    pub summary: Summary,
    pub daily: Vec<DailyPoint>,
    pub symbols: Vec<SymbolCount>,
    pub insights: TradeInsights,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
fn round4(v: f64) -> f64 {
    (v * 10000.0).round() / 10000.0
}

// Totals shown to the user count an unparseable P&L as zero.
fn pnl_or_zero(trade: &Trade) -> f64 {
    if trade.pnl.is_nan() {
        0.0
    } else {
        trade.pnl
    }
}

/// P&L and trade count per bought-date string (`YYYY/MM/DD`), sorted by date.
pub fn by_day(trades: &[Trade]) -> BTreeMap<String, DailyStat> {
    let mut days: BTreeMap<String, DailyStat> = BTreeMap::new();
    for t in trades {
        let stat = days.entry(t.bought_day().to_string()).or_default();
        stat.pnl += t.pnl;
        stat.count += 1;
    }
    days
}

pub fn summary(trades: &[Trade]) -> Summary {
    let total_trades = trades.len();
    let total_pnl: f64 = trades.iter().map(pnl_or_zero).sum();
    let win_count = trades.iter().filter(|t| t.pnl > 0.0).count();
    let loss_count = trades.iter().filter(|t| t.pnl < 0.0).count();
    let win_rate = if total_trades > 0 {
        win_count as f64 / total_trades as f64
    } else {
        0.0
    };

    Summary {
        total_trades,
        total_pnl,
        win_count,
        loss_count,
        win_rate,
    }
}

pub fn by_symbol(trades: &[Trade]) -> HashMap<String, usize> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in trades {
        *counts.entry(t.symbol.clone()).or_insert(0) += 1;
    }
    counts
}

/// Symbol counts, most traded first (ties by symbol).
pub fn symbol_distribution(trades: &[Trade]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = by_symbol(trades).into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

/// First and last calendar date of a month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, next.pred_opt()?))
}

/// Parses a `YYYY/MM/DD` or `YYYY-MM-DD` day.
pub fn parse_day(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y/%m/%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

pub fn bought_date(trade: &Trade) -> Option<NaiveDate> {
    parse_day(trade.bought_day())
}

fn bought_datetime(trade: &Trade) -> Option<NaiveDateTime> {
    let s = trade.bought_timestamp.trim();
    [
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%Y/%m/%d %I:%M:%S %p",
        "%Y/%m/%d %I:%M %p",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// One [`TradeDay`] per date in `[start, end]`, holding the trades bought that day.
///
/// Trades whose bought date cannot be parsed are logged and left out of every day.
pub fn for_month(trades: &[Trade], start: NaiveDate, end: NaiveDate) -> Vec<TradeDay> {
    let dated: Vec<(NaiveDate, &Trade)> = trades
        .iter()
        .filter_map(|t| match bought_date(t) {
            Some(d) => Some((d, t)),
            None => {
                tracing::warn!(
                    trade_id = %t.id,
                    bought = %t.bought_timestamp,
                    "Cannot parse bought date, trade left out of calendar"
                );
                None
            }
        })
        .collect();

    start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let day_trades: Vec<Trade> = dated
                .iter()
                .filter(|(d, _)| *d == date)
                .map(|(_, t)| (*t).clone())
                .collect();
            let total_pnl = day_trades.iter().map(pnl_or_zero).sum();
            TradeDay {
                date,
                trades: day_trades,
                total_pnl,
            }
        })
        .collect()
}

/// Calendar days for a whole month.
pub fn for_calendar_month(trades: &[Trade], year: i32, month: u32) -> Option<Vec<TradeDay>> {
    let (start, end) = month_bounds(year, month)?;
    Some(for_month(trades, start, end))
}

pub fn insights(trades: &[Trade]) -> TradeInsights {
    let stats = summary(trades);

    let mut seen = HashSet::new();
    let symbols: Vec<String> = trades
        .iter()
        .filter(|t| seen.insert(t.symbol.as_str()))
        .map(|t| t.symbol.clone())
        .collect();

    let mut hour_distribution: BTreeMap<u32, usize> = BTreeMap::new();
    for t in trades {
        match bought_datetime(t) {
            Some(dt) => *hour_distribution.entry(dt.hour()).or_insert(0) += 1,
            None => tracing::warn!(
                trade_id = %t.id,
                bought = %t.bought_timestamp,
                "Cannot parse bought time, trade left out of hour distribution"
            ),
        }
    }
    let mut most_active_hours: Vec<(u32, usize)> =
        hour_distribution.iter().map(|(h, c)| (*h, *c)).collect();
    most_active_hours.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_active_hours.truncate(3);

    let average = |values: Vec<f64>| -> Option<f64> {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };
    let average_win = average(trades.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect());
    let average_loss = average(trades.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect());
    let risk_reward = match (average_win, average_loss) {
        (Some(win), Some(loss)) if loss != 0.0 => Some((win / loss).abs()),
        _ => None,
    };

    TradeInsights {
        total_trades: stats.total_trades,
        winning_trades: stats.win_count,
        losing_trades: stats.loss_count,
        total_pnl: stats.total_pnl,
        symbols,
        hour_distribution,
        most_active_hours,
        average_win,
        average_loss,
        risk_reward,
    }
}

/// Everything the analytics view shows, for one account or all of them (`scope`).
pub fn build_report(scope: &str, trades: &[Trade]) -> AnalyticsReport {
    let mut stats = summary(trades);
    stats.total_pnl = round2(stats.total_pnl);
    stats.win_rate = round4(stats.win_rate);

    let daily = by_day(trades)
        .into_iter()
        .map(|(date, stat)| {
            let label = parse_day(&date)
                .map(|d| d.format("%b %d").to_string())
                .unwrap_or_else(|| date.clone());
            DailyPoint {
                label,
                pnl: round2(stat.pnl),
                count: stat.count,
                profitable: stat.pnl >= 0.0,
                date,
            }
        })
        .collect();

    let symbols = symbol_distribution(trades)
        .into_iter()
        .map(|(symbol, count)| SymbolCount { symbol, count })
        .collect();

    let mut insights = insights(trades);
    insights.total_pnl = round2(insights.total_pnl);
    insights.average_win = insights.average_win.map(round2);
    insights.average_loss = insights.average_loss.map(round2);
    insights.risk_reward = insights.risk_reward.map(round2);

    AnalyticsReport {
        metadata: ReportMetadata {
            generated_at: Local::now().to_rfc3339(),
            scope: scope.to_string(),
        },
        summary: stats,
        daily,
        symbols,
        insights,
    }
}

pub fn write_report_json(report: &AnalyticsReport, out_path: &Path) -> Result<()> {
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(report)?;
    fs::write(out_path, json).with_context(|| format!("Writing {}", out_path.display()))?;
    Ok(())
}
