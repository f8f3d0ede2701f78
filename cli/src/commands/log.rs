use anyhow::Result;
use std::process;

use bite_core::LedgerService;
use bite_core::models::NewConsumptionEvent;

use super::helpers::{consumed_at, json_error, parse_date, parse_serving};

/// Nutrition values for one logged entry, as eaten (not per 100 g).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Nutrients {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_log(
    svc: &LedgerService,
    user_id: i64,
    name: &str,
    quantity: &str,
    food_ref: Option<String>,
    nutrients: Nutrients,
    date: Option<String>,
    time: Option<&str>,
    json: bool,
) -> Result<()> {
    let quantity_g = parse_serving(quantity)?;
    let date = parse_date(date)?;

    let entry = svc.add_consumption_event(&NewConsumptionEvent {
        user_id,
        food_ref: food_ref.unwrap_or_else(|| name.trim().to_lowercase()),
        name: name.to_string(),
        quantity_g,
        calories: nutrients.calories,
        protein: nutrients.protein,
        carbs: nutrients.carbs,
        fat: nutrients.fat,
        consumed_at: consumed_at(date, time)?,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let id = entry.id;
        let name = &entry.name;
        let cal = entry.calories;
        let (p, c, f) = (entry.protein, entry.carbs, entry.fat);
        let date = entry.date();
        println!(
            "Logged [{id}] {name} ({quantity_g:.0}g) on {date}: {cal:.0} kcal | P:{p:.0}g C:{c:.0}g F:{f:.0}g"
        );
    }
    Ok(())
}

pub(crate) fn cmd_delete(svc: &LedgerService, entry_id: i64, json: bool) -> Result<()> {
    let entry = match svc.get_consumption_event(entry_id) {
        Ok(entry) => entry,
        Err(e) if json && e.is_not_found() => {
            println!("{}", json_error(&e.to_string()));
            process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    svc.delete_consumption_event(entry_id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": entry_id }));
    } else {
        let name = &entry.name;
        let date = entry.date();
        println!("Deleted [{entry_id}] {name} from {date}");
    }
    Ok(())
}
