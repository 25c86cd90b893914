// libs/appointment-cell/src/services/recurrence.rs
use chrono::{Datelike, Days, Months, NaiveDate, TimeZone, Utc};

use crate::error::AppointmentError;
use crate::models::{Frequency, Recurrence, SeriesPattern, TimeRange, MAX_SESSION_MINUTES};

/// The `n`-th date of a series anchored at `anchor`. Monthly steps are taken
/// from the anchor so a 31st clamps per month instead of drifting.
fn nth_date(anchor: NaiveDate, frequency: Frequency, n: u32) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => anchor.checked_add_days(Days::new(u64::from(n))),
        Frequency::Weekly => anchor.checked_add_days(Days::new(7 * u64::from(n))),
        Frequency::Monthly => anchor.checked_add_months(Months::new(n)),
    }
}

fn occurrence_at(range: &TimeRange, date: NaiveDate) -> TimeRange {
    let start = Utc.from_utc_datetime(&date.and_time(range.start.time()));
    TimeRange {
        start,
        end: start + range.duration(),
    }
}

/// Materialises a blocked range into one range per occurrence, the first
/// being `range` itself. Occurrences run while their start date is on or
/// before `until`.
pub fn expand_block_occurrences(
    range: &TimeRange,
    recurrence: Option<&Recurrence>,
    max_occurrences: u32,
) -> Result<Vec<TimeRange>, AppointmentError> {
    range.validate()?;

    let recurrence = match recurrence {
        Some(recurrence) => recurrence,
        None => return Ok(vec![*range]),
    };

    let anchor = range.start.date_naive();
    if recurrence.until < anchor {
        return Err(AppointmentError::ValidationError(format!(
            "Recurrence end date {} is before the first occurrence on {}",
            recurrence.until, anchor
        )));
    }

    let mut occurrences = Vec::new();
    for n in 0.. {
        let date = match nth_date(anchor, recurrence.frequency, n) {
            Some(date) if date <= recurrence.until => date,
            _ => break,
        };
        if occurrences.len() as u32 >= max_occurrences {
            return Err(AppointmentError::ValidationError(format!(
                "Recurrence would generate more than {} occurrences",
                max_occurrences
            )));
        }
        occurrences.push(occurrence_at(range, date));
    }

    Ok(occurrences)
}

/// First date on or after `start_date` falling on the pattern's weekday.
fn series_anchor(start_date: NaiveDate, pattern: &SeriesPattern) -> NaiveDate {
    match pattern.day_of_week {
        Some(weekday) => {
            let offset = (7 + weekday.num_days_from_monday() - start_date.weekday().num_days_from_monday()) % 7;
            start_date + Days::new(u64::from(offset))
        }
        None => start_date,
    }
}

/// Candidate ranges for a recurring series, one per session in order.
pub fn series_ranges(
    start_date: NaiveDate,
    pattern: &SeriesPattern,
    max_occurrences: u32,
) -> Result<Vec<TimeRange>, AppointmentError> {
    if pattern.total_sessions == 0 || pattern.total_sessions > max_occurrences {
        return Err(AppointmentError::ValidationError(format!(
            "total_sessions must be between 1 and {}",
            max_occurrences
        )));
    }
    if pattern.duration_minutes <= 0 || pattern.duration_minutes > MAX_SESSION_MINUTES {
        return Err(AppointmentError::ValidationError(format!(
            "duration_minutes must be between 1 and {}",
            MAX_SESSION_MINUTES
        )));
    }

    let anchor = series_anchor(start_date, pattern);
    (0..pattern.total_sessions)
        .map(|n| {
            let date = nth_date(anchor, pattern.frequency, n).ok_or_else(|| {
                AppointmentError::ValidationError(format!("Session {} falls outside the calendar", n + 1))
            })?;
            let start = Utc.from_utc_datetime(&date.and_time(pattern.time_of_day));
            TimeRange::from_duration(start, pattern.duration_minutes)
        })
        .collect()
}
