use anyhow::{Result, bail};
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use bite_core::LedgerService;
use bite_core::export::write_history_csv;
use bite_core::history::{DEFAULT_WINDOW_DAYS, MAX_RANGE_DAYS, window_start};

use super::helpers::{no_neg_zero, parse_date, truncate};

pub(crate) fn cmd_day(
    svc: &LedgerService,
    user_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "P")]
        protein: String,
        #[tabled(rename = "C")]
        carbs: String,
        #[tabled(rename = "F")]
        fat: String,
    }

    let date = parse_date(date)?;
    let entries = svc.get_daily_events(user_id, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        eprintln!("No entries for {date}");
        process::exit(2);
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id,
            time: e.consumed_at.format("%H:%M").to_string(),
            name: truncate(&e.name, 35),
            quantity: format!("{:.0}g", e.quantity_g),
            calories: format!("{:.0}", e.calories),
            protein: format!("{:.1}g", e.protein),
            carbs: format!("{:.1}g", e.carbs),
            fat: format!("{:.1}g", e.fat),
        })
        .collect();

    println!("=== {date} ===\n");
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_totals(
    svc: &LedgerService,
    user_id: i64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let totals = svc.get_daily_totals(user_id, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    let goals = svc.get_goals(user_id)?;
    let cal = no_neg_zero(totals.calories);
    let (p, c, f) = (totals.protein, totals.carbs, totals.fat);
    println!("=== {date} ===\n");
    println!("  TOTAL: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g");

    let tcal = goals.target_calories;
    let (tp, tc, tf) = (goals.target_protein_g, goals.target_carbs_g, goals.target_fat_g);
    println!("  TARGET: {tcal} kcal | P:{tp:.0}g C:{tc:.0}g F:{tf:.0}g");
    #[allow(clippy::cast_precision_loss)]
    let rcal = tcal as f64 - totals.calories;
    let (rp, rc, rf) = (tp - p, tc - c, tf - f);
    println!("  REMAINING: {rcal:.0} kcal | P:{rp:.0}g C:{rc:.0}g F:{rf:.0}g");
    Ok(())
}

pub(crate) struct HistoryRange {
    pub start: Option<String>,
    pub end: Option<String>,
    pub days: Option<u32>,
}

pub(crate) fn cmd_history(
    svc: &LedgerService,
    user_id: i64,
    range: HistoryRange,
    csv: bool,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Calories")]
        calories: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Carbs")]
        carbs: String,
        #[tabled(rename = "Fat")]
        fat: String,
    }

    let (start, end) = match (range.start, range.end, range.days) {
        (None, None, days) => {
            let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
            if days == 0 || i64::from(days) > MAX_RANGE_DAYS + 1 {
                bail!("--days must be between 1 and {}", MAX_RANGE_DAYS + 1);
            }
            let end = LedgerService::today();
            (window_start(end, days)?, end)
        }
        (start, end, None) => {
            let end = parse_date(end)?;
            let start = match start {
                Some(s) => parse_date(Some(s))?,
                None => window_start(end, DEFAULT_WINDOW_DAYS)?,
            };
            (start, end)
        }
        (_, _, Some(_)) => bail!("Use either --days or --start/--end, not both"),
    };

    let history = svc.get_history(user_id, start, end)?;

    if csv {
        write_history_csv(std::io::stdout().lock(), &history)?;
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&history)?);
        return Ok(());
    }

    let rows: Vec<HistoryRow> = history
        .iter()
        .map(|d| {
            let cal = no_neg_zero(d.calories);
            let p = no_neg_zero(d.protein);
            let c = no_neg_zero(d.carbs);
            let f = no_neg_zero(d.fat);
            HistoryRow {
                date: d.date.to_string(),
                calories: format!("{cal:.0}"),
                protein: format!("{p:.0}g"),
                carbs: format!("{c:.0}g"),
                fat: format!("{f:.0}g"),
            }
        })
        .collect();

    if history.iter().all(bite_core::models::DailyAggregate::is_zero) {
        eprintln!("No entries between {start} and {end}");
        process::exit(2);
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
