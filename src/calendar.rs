use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};

use crate::models::{parse_calendar_date, Event};

/// Day numbers of `year`/`month` that carry at least one event.
pub fn event_days_in_month(events: &[Event], year: i32, month: u32) -> BTreeSet<u32> {
    events
        .iter()
        .filter_map(|event| parse_calendar_date(&event.date))
        .filter(|date| date.year() == year && date.month() == month)
        .map(|date| date.day())
        .collect()
}

/// New events can be placed today or later.
pub fn is_selectable(day: NaiveDate, today: NaiveDate) -> bool {
    day >= today
}
