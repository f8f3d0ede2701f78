use std::io::Write;

use crate::models::{DATE_FORMAT, DailyAggregate};

/// Write a history series as CSV, one row per day, with a header row.
pub fn write_history_csv<W: Write>(writer: W, history: &[DailyAggregate]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["Date", "Calories", "Protein (g)", "Carbohydrates (g)", "Fat (g)"])?;
    for day in history {
        wtr.write_record([
            day.date.format(DATE_FORMAT).to_string(),
            format!("{:.0}", day.calories),
            format!("{:.2}", day.protein),
            format!("{:.2}", day.carbs),
            format!("{:.2}", day.fat),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
