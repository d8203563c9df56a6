//! Collapse 3-hour forecast steps into one row per calendar date.
//!
//! The first step seen for a date supplies that row's min/max, description
//! and icon. Later steps of the same date are skipped, not merged, so the
//! "daily" min/max is a single 3-hour sample.

use std::collections::HashSet;

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use tracing::debug;

use crate::{
    icon::icon_url,
    model::{DailyAggregate, Forecast, ForecastEntry},
    units::kelvin_to_celsius,
};

const DATE_LABEL_FORMAT: &str = "%A, %B %d";

/// Aggregate using the machine's local time zone for date boundaries.
pub fn aggregate(forecast: &Forecast) -> Vec<DailyAggregate> {
    aggregate_in(forecast, &Local)
}

pub fn aggregate_in<Tz: TimeZone>(forecast: &Forecast, tz: &Tz) -> Vec<DailyAggregate> {
    let mut days = DailyRows::default();

    for entry in &forecast.entries {
        let Some(local) = DateTime::from_timestamp(entry.dt, 0).map(|utc| utc.with_timezone(tz))
        else {
            debug!(dt = entry.dt, "Skipping forecast entry with out-of-range timestamp");
            continue;
        };

        let date = local.date_naive();
        if days.contains(date) {
            continue;
        }
        days.insert(date, daily_row(date, entry));
    }

    days.into_rows()
}

fn daily_row(date: NaiveDate, entry: &ForecastEntry) -> DailyAggregate {
    DailyAggregate {
        date,
        label: date.format(DATE_LABEL_FORMAT).to_string(),
        temp_min_c: kelvin_to_celsius(entry.temp_min_k),
        temp_max_c: kelvin_to_celsius(entry.temp_max_k),
        description: entry.description.clone(),
        icon_url: icon_url(&entry.icon),
    }
}

/// Rows in first-seen order, one per date.
#[derive(Default)]
struct DailyRows {
    rows: Vec<DailyAggregate>,
    seen: HashSet<NaiveDate>,
}

impl DailyRows {
    fn contains(&self, date: NaiveDate) -> bool {
        self.seen.contains(&date)
    }

    fn insert(&mut self, date: NaiveDate, row: DailyAggregate) {
        if self.seen.insert(date) {
            self.rows.push(row);
        }
    }

    fn into_rows(self) -> Vec<DailyAggregate> {
        self.rows
    }
}
