//! Formatting and path helpers shared by the store, sink and renderer.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// User-facing date format (DD/MM/YYYY).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

static INVALID_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid filename regex"));

/// Format a date as DD/MM/YYYY.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a DD/MM/YYYY date.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Create `path` and its parents if needed.
pub fn ensure_directory(path: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(path)?;
    Ok(path.to_path_buf())
}

/// Filesystem-safe version of `name`.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = INVALID_FILENAME_CHARS.replace_all(name.trim(), "_");
    let trimmed = cleaned.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        "record".to_string()
    } else {
        trimmed.to_string()
    }
}

/// True if `stem` can be used inside a file name without leaving its folder.
pub fn is_plain_file_stem(stem: &str) -> bool {
    let stem = stem.trim();
    !stem.is_empty() && !stem.contains(['/', '\\']) && !stem.contains("..")
}

/// Monthly workbook file name, e.g. `ClinicData_November2025.xlsx`.
pub fn monthly_filename(prefix: &str, date: NaiveDate) -> String {
    format!("{}_{}.xlsx", prefix, date.format("%B%Y"))
}

/// Sheet title for a monthly workbook, e.g. `November 2025`.
pub fn month_title(date: NaiveDate) -> String {
    date.format("%B %Y").to_string()
}

/// `<base>/<YYYY_MM>`, created if missing.
pub fn month_subdirectory(base: &Path, date: NaiveDate) -> io::Result<PathBuf> {
    let folder = base.join(format!("{:04}_{:02}", date.year(), date.month()));
    ensure_directory(&folder)
}

/// First and last day of a calendar month, or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next.pred_opt()?))
}

/// The user's Documents folder.
pub fn documents_folder() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .unwrap_or_else(|| PathBuf::from("Documents"))
}

/// Default folder for workbooks and the database: `<Documents>/OPD Data`.
pub fn clinic_data_folder() -> PathBuf {
    documents_folder().join("OPD Data")
}
