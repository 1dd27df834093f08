//! Date parsing and Portuguese date formatting.

use chrono::{Datelike, NaiveDate};

const MONTHS_PT: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto", "Setembro",
    "Outubro", "Novembro", "Dezembro",
];

/// Portuguese name of a month (1-12).
pub fn month_name(month: u32) -> Option<&'static str> {
    MONTHS_PT.get(month.checked_sub(1)? as usize).copied()
}

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Month name of a parsed date. chrono keeps months within 1-12.
fn date_month(date: NaiveDate) -> &'static str {
    month_name(date.month()).unwrap_or_default()
}

/// Format as "5 de Março de 2024".
pub fn format_long_date(date: NaiveDate) -> String {
    format!("{} de {} de {}", date.day(), date_month(date), date.year())
}

/// Format as "Março 2024".
pub fn format_competency(date: NaiveDate) -> String {
    format!("{} {}", date_month(date), date.year())
}
