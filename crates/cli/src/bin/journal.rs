use anyhow::{Context, Result, anyhow};
use chrono::Datelike;
use clap::{Parser, Subcommand};
use dashboard_engine::{build_report, for_calendar_month, insights, summary, symbol_distribution, write_report_json};
use models::{Theme, Trade, TradeDay};
use std::path::PathBuf;
use store::{AccountStore, JsonFileStore, KeyValueStore};

const ALL_ACCOUNTS: &str = "all";

#[derive(Parser, Debug)]
#[command(name = "journal", about = "Import broker trade exports and review them by day, symbol and account.")]
struct Args {
    /// Path to settings.json (defaults to ./settings.json when present)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage trading accounts
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },
    /// Replace an account's trades with the content of an export file (.xlsx, .xls, .ods, .csv)
    Import {
        file: PathBuf,
        /// Account id the trades belong to
        #[arg(short, long)]
        account: Option<String>,
    },
    /// Totals, win rate and symbol distribution
    Stats {
        /// Account id, or "all" to merge every account
        #[arg(short, long, default_value = ALL_ACCOUNTS)]
        account: String,
    },
    /// Month calendar with daily P&L
    Calendar {
        /// Month as YYYY-MM
        #[arg(short, long)]
        month: String,
        #[arg(short, long, default_value = ALL_ACCOUNTS)]
        account: String,
    },
    /// Write the full analytics report as JSON
    Report {
        #[arg(short, long, default_value = "reports/analytics.json")]
        out: PathBuf,
        #[arg(short, long, default_value = ALL_ACCOUNTS)]
        account: String,
    },
    /// Show or change the selected theme
    Theme { id: Option<String> },
}

#[derive(Subcommand, Debug)]
enum AccountAction {
    List,
    Add { name: String },
    /// Delete an account and all of its trades
    Delete {
        id: String,
        /// Confirm the deletion; it cannot be undone
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let settings = settings_loader::load_settings_or_default(args.settings.as_ref())?;
    logger::init(&settings.log_filter);

    let backend = JsonFileStore::open(&settings.store_path)
        .with_context(|| format!("Opening journal store at {}", settings.store_path.display()))?;
    tracing::debug!(path = %backend.path().display(), "Using journal store");
    let mut accounts = AccountStore::new(backend);

    match args.command {
        Command::Accounts { action } => run_accounts(&mut accounts, action),
        Command::Import { file, account } => {
            let count = tradovate::import_file(&mut accounts, account.as_deref(), &file)
                .await
                .with_context(|| format!("Failed importing {}", file.display()))?;
            println!("✓ Imported {} trade(s) from {}", count, file.display());
            Ok(())
        }
        Command::Stats { account } => {
            let trades = load_scope(&accounts, &account)?;
            print_stats(&trades);
            Ok(())
        }
        Command::Calendar { month, account } => {
            let (year, month) = parse_month(&month)?;
            let trades = load_scope(&accounts, &account)?;
            let days = for_calendar_month(&trades, year, month)
                .ok_or_else(|| anyhow!("invalid month {}-{:02}", year, month))?;
            print_calendar(&days);
            Ok(())
        }
        Command::Report { out, account } => {
            let trades = load_scope(&accounts, &account)?;
            let report = build_report(&account, &trades);
            write_report_json(&report, &out)?;
            println!("✅ Report written to: {}", out.display());
            Ok(())
        }
        Command::Theme { id } => {
            if let Some(id) = id {
                let theme: Theme = id.parse()?;
                accounts.set_theme(theme)?;
            }
            let current = accounts.theme()?;
            println!("Theme: {} ({})", current.display_name(), current.id());
            Ok(())
        }
    }
}

fn run_accounts<S: KeyValueStore>(accounts: &mut AccountStore<S>, action: AccountAction) -> Result<()> {
    match action {
        AccountAction::List => {
            let list = accounts.list_accounts()?;
            if list.is_empty() {
                println!("No accounts yet. Create one with `journal accounts add <name>`.");
            }
            for a in list {
                let count = accounts.trades(&a.id)?.len();
                println!("{}  {:<24} {:>5} trade(s)  created {}", a.id, a.name, count, a.created_at);
            }
        }
        AccountAction::Add { name } => {
            let account = accounts.create_account(&name)?;
            println!("✓ Created account {} ({})", account.name, account.id);
        }
        AccountAction::Delete { id, yes } => {
            if !yes {
                println!("⚠ Deleting an account removes all of its trades. Re-run with --yes to confirm.");
                return Ok(());
            }
            let removed = accounts.delete_account(&id)?;
            println!("✓ Deleted account {} and its trades", removed.name);
        }
    }
    Ok(())
}

fn load_scope<S: KeyValueStore>(accounts: &AccountStore<S>, scope: &str) -> Result<Vec<Trade>> {
    if scope.eq_ignore_ascii_case(ALL_ACCOUNTS) {
        return Ok(accounts.all_trades()?);
    }
    if accounts.find_account(scope)?.is_none() {
        return Err(anyhow!("account not found: {}", scope));
    }
    Ok(accounts.trades(scope)?)
}

/// Parses "YYYY-MM" (or "YYYY/MM").
fn parse_month(raw: &str) -> Result<(i32, u32)> {
    let (y, m) = raw
        .trim()
        .split_once(['-', '/'])
        .ok_or_else(|| anyhow!("invalid month format: {} (expected YYYY-MM)", raw))?;
    let year: i32 = y.parse().map_err(|_| anyhow!("invalid year in month: {}", raw))?;
    let month: u32 = m.parse().map_err(|_| anyhow!("invalid month in month: {}", raw))?;
    if !(1..=12).contains(&month) {
        return Err(anyhow!("month out of range: {}", raw));
    }
    Ok((year, month))
}

fn print_stats(trades: &[Trade]) {
    let s = summary(trades);
    println!("Total P&L : {:.2}", s.total_pnl);
    println!("Trades    : {}", s.total_trades);
    println!("Win rate  : {:.1}% ({} won, {} lost)", s.win_rate * 100.0, s.win_count, s.loss_count);

    let i = insights(trades);
    if let Some(w) = i.average_win {
        println!("Avg win   : {:.2}", w);
    }
    if let Some(l) = i.average_loss {
        println!("Avg loss  : {:.2}", l);
    }
    if let Some(rr) = i.risk_reward {
        println!("Risk/reward: {:.2}", rr);
    }
    if !i.most_active_hours.is_empty() {
        let hours: Vec<String> = i
            .most_active_hours
            .iter()
            .map(|(h, c)| format!("{}:00 ({} trades)", h, c))
            .collect();
        println!("Most active hours: {}", hours.join(", "));
    }

    println!("\nSymbols:");
    for (symbol, count) in symbol_distribution(trades) {
        println!("  {:<12} {}", symbol, count);
    }
}

fn print_calendar(days: &[TradeDay]) {
    let Some(first) = days.first() else {
        return;
    };
    println!("{}", first.date.format("%B %Y"));
    println!("{}", ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"].map(|d| format!("{:<12}", d)).concat());

    let lead = first.date.weekday().num_days_from_sunday() as usize;
    let mut cells: Vec<String> = vec![String::new(); lead];
    cells.extend(days.iter().map(calendar_cell));

    for week in cells.chunks(7) {
        let line: String = week.iter().map(|c| format!("{:<12}", c)).collect();
        println!("{}", line.trim_end());
    }

    let month_total: f64 = days.iter().map(|d| d.total_pnl).sum();
    let month_trades: usize = days.iter().map(|d| d.trades.len()).sum();
    println!("\nMonth: {:.2} over {} trade(s)", month_total, month_trades);
}

fn calendar_cell(day: &TradeDay) -> String {
    if day.trades.is_empty() {
        format!("{:>2}", day.date.day())
    } else {
        format!("{:>2} {:+.2}", day.date.day(), day.total_pnl)
    }
}
