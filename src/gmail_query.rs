use chrono::Month;

use crate::calendar::{end_of_month, start_of_month};
use crate::error::Result;

const QUERY_DATE_FORMAT: &str = "%Y/%m/%d";

/// `(label:"A" OR label:"B")` in input order.
///
/// An empty input yields `()`, which callers must read as "nothing to search".
pub fn build_label_filter<S: AsRef<str>>(label_names: &[S]) -> String {
    let terms: Vec<String> = label_names
        .iter()
        .map(|name| format!("label:\"{}\"", name.as_ref()))
        .collect();
    format!("({})", terms.join(" OR "))
}

pub fn build_date_range_filter(year: i32, month: Month) -> Result<String> {
    Ok(format!(
        "after:{} before:{}",
        start_of_month(year, month)?.format(QUERY_DATE_FORMAT),
        end_of_month(year, month)?.format(QUERY_DATE_FORMAT)
    ))
}

/// Label filter and date filter joined by a space, which Gmail reads as AND.
pub fn build_query<S: AsRef<str>>(label_names: &[S], year: i32, month: Month) -> Result<String> {
    Ok(format!(
        "{} {}",
        build_label_filter(label_names),
        build_date_range_filter(year, month)?
    ))
}
