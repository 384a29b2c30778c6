use chrono::{Datelike, Local, Month, NaiveDate};
use log::debug;

use crate::error::{BillError, Result};

const MONTHS: [Month; 12] = [
    Month::January,
    Month::February,
    Month::March,
    Month::April,
    Month::May,
    Month::June,
    Month::July,
    Month::August,
    Month::September,
    Month::October,
    Month::November,
    Month::December,
];

const MIN_YEAR: i32 = 1;
const MAX_YEAR: i32 = 9999;

/// Years Gmail's `YYYY/MM/DD` date filters can express.
pub fn validate_year(year: i32) -> Result<i32> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(year)
    } else {
        Err(BillError::InvalidYear(year))
    }
}

/// First day of the given month.
pub fn start_of_month(year: i32, month: Month) -> Result<NaiveDate> {
    validate_year(year)?;
    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1).ok_or(BillError::InvalidYear(year))
}

/// Last day of the given month, i.e. the first day of the next month minus one day.
pub fn end_of_month(year: i32, month: Month) -> Result<NaiveDate> {
    validate_year(year)?;
    let (next_year, next_month) = match month {
        Month::December => (year + 1, Month::January),
        _ => (year, month.succ()),
    };
    NaiveDate::from_ymd_opt(next_year, next_month.number_from_month(), 1)
        .and_then(|first| first.pred_opt())
        .ok_or(BillError::InvalidYear(year))
}

/// Parse a case-insensitive full month name or its three letter abbreviation.
pub fn parse_month_name(name: &str) -> Result<Month> {
    if name.chars().count() < 3 {
        return Err(BillError::InvalidMonthName {
            name: name.to_string(),
            reason: "month name has less than 3 characters",
        });
    }

    for month in MONTHS {
        let full = month.name();
        if name.eq_ignore_ascii_case(full)
            || (name.len() == 3 && name.eq_ignore_ascii_case(&full[..3]))
        {
            debug!("Month identified: {}", full);
            return Ok(month);
        }
    }

    Err(BillError::InvalidMonthName {
        name: name.to_string(),
        reason: "unable to understand month",
    })
}

/// Year and month of today in the local timezone.
pub fn current_year_month() -> (i32, Month) {
    let today = Local::now().date_naive();
    let month = MONTHS[today.month0() as usize];
    (today.year(), month)
}
