//! Visit record database operations.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::helpers::month_bounds;
use crate::models::{FeeCategory, Gender, Record};

const SELECT_RECORD: &str = r#"
    SELECT id, date, opd_no, name, father_name, age, gender, cnic, address,
           temperature, bp, weight, diabetic, fees_type
    FROM patients
"#;

const INSERT_RECORD: &str = r#"
    INSERT INTO patients (
        date, opd_no, name, father_name, age, gender, cnic, address,
        temperature, bp, weight, diabetic, fees_type
    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

// Legacy rows store a full ISO datetime, so dates compare on their first ten
// characters.
const ORDER_BY_DATE: &str = "ORDER BY substr(date, 1, 10) DESC, id DESC";

impl Database {
    /// Insert a new visit and assign its identity.
    ///
    /// The record keeps `None` as its identity if the write fails.
    pub fn insert(&self, record: &mut Record) -> DbResult<i64> {
        ensure_unpersisted(record)?;
        self.conn.execute(
            INSERT_RECORD,
            params![
                record.date.format("%Y-%m-%d").to_string(),
                record.opd_no,
                record.name,
                record.father_name,
                record.age,
                record.gender.as_str(),
                record.cnic,
                record.address,
                record.temperature,
                record.bp,
                record.weight,
                record.diabetic,
                record.fees_type.as_str(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        record.id = Some(id);
        tracing::info!(id, opd_no = %record.opd_no, "inserted visit record");
        Ok(id)
    }

    /// Insert many visits in one transaction. Either every record gets an
    /// identity or none does.
    pub fn bulk_insert(&mut self, records: &mut [Record]) -> DbResult<Vec<i64>> {
        for record in records.iter() {
            ensure_unpersisted(record)?;
        }

        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(records.len());
        {
            let mut stmt = tx.prepare_cached(INSERT_RECORD)?;
            for record in records.iter() {
                stmt.execute(params![
                    record.date.format("%Y-%m-%d").to_string(),
                    record.opd_no,
                    record.name,
                    record.father_name,
                    record.age,
                    record.gender.as_str(),
                    record.cnic,
                    record.address,
                    record.temperature,
                    record.bp,
                    record.weight,
                    record.diabetic,
                    record.fees_type.as_str(),
                ])?;
                ids.push(tx.last_insert_rowid());
            }
        }
        tx.commit()?;

        for (record, id) in records.iter_mut().zip(&ids) {
            record.id = Some(*id);
        }
        tracing::info!(count = ids.len(), "bulk inserted visit records");
        Ok(ids)
    }

    /// Every visit, newest first.
    pub fn fetch_all(&self) -> DbResult<Vec<Record>> {
        let sql = format!("{} {}", SELECT_RECORD, ORDER_BY_DATE);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], RecordRow::from_row)?;
        collect_records(rows)
    }

    /// Visits dated within `[start, end]` (both inclusive), newest first.
    pub fn fetch_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<Record>> {
        let sql = format!(
            "{} WHERE substr(date, 1, 10) BETWEEN ?1 AND ?2 {}",
            SELECT_RECORD, ORDER_BY_DATE
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            RecordRow::from_row,
        )?;
        collect_records(rows)
    }

    /// Visits in one calendar month, from the 1st to the last day inclusive.
    pub fn fetch_by_month(&self, year: i32, month: u32) -> DbResult<Vec<Record>> {
        let (first, last) = month_bounds(year, month)
            .ok_or_else(|| DbError::Constraint(format!("Invalid month: {}-{}", year, month)))?;
        self.fetch_between(first, last)
    }

    /// Get a visit by identity.
    pub fn get(&self, id: i64) -> DbResult<Option<Record>> {
        let sql = format!("{} WHERE id = ?", SELECT_RECORD);
        let row = self
            .conn
            .query_row(&sql, [id], RecordRow::from_row)
            .optional()?;
        row.map(Record::try_from).transpose()
    }

    /// Number of stored visits.
    pub fn count(&self) -> DbResult<usize> {
        let total: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(total as usize)
    }

    /// Delete a visit. Returns `false` if no such identity exists.
    pub fn delete(&self, id: i64) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}

fn ensure_unpersisted(record: &Record) -> DbResult<()> {
    match record.id {
        Some(id) => Err(DbError::Constraint(format!(
            "Record already persisted with id {}",
            id
        ))),
        None => Ok(()),
    }
}

// A row whose values cannot form a record is skipped so one bad legacy row
// does not hide the rest. Lookups by id still report it.
fn collect_records<I>(rows: I) -> DbResult<Vec<Record>>
where
    I: Iterator<Item = rusqlite::Result<RecordRow>>,
{
    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let id = row.id;
        match Record::try_from(row) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(id, error = %err, "skipping unreadable visit row"),
        }
    }
    Ok(records)
}

/// Intermediate row struct for database mapping.
///
/// Text columns added by later migrations are nullable on old databases.
struct RecordRow {
    id: i64,
    date: String,
    opd_no: Option<String>,
    name: String,
    father_name: Option<String>,
    // Legacy rows may hold fractional ages
    age: f64,
    gender: String,
    cnic: Option<String>,
    address: Option<String>,
    temperature: f64,
    bp: String,
    weight: Option<f64>,
    diabetic: Option<f64>,
    fees_type: Option<String>,
}

impl RecordRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            date: row.get(1)?,
            opd_no: row.get(2)?,
            name: row.get(3)?,
            father_name: row.get(4)?,
            age: row.get(5)?,
            gender: row.get(6)?,
            cnic: row.get(7)?,
            address: row.get(8)?,
            temperature: row.get(9)?,
            bp: row.get(10)?,
            weight: row.get(11)?,
            diabetic: row.get(12)?,
            fees_type: row.get(13)?,
        })
    }
}

impl TryFrom<RecordRow> for Record {
    type Error = DbError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let date = row
            .date
            .get(..10)
            .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            .ok_or_else(|| DbError::Constraint(format!("Invalid visit date: {}", row.date)))?;
        if !row.age.is_finite() || row.age < 0.0 || row.age > f64::from(u32::MAX) {
            return Err(DbError::Constraint(format!("Invalid age: {}", row.age)));
        }
        let age = row.age.trunc() as u32;
        let gender = Gender::parse(&row.gender)
            .ok_or_else(|| DbError::Constraint(format!("Unknown gender: {}", row.gender)))?;
        let fees_type = match row.fees_type.as_deref() {
            None | Some("") => FeeCategory::Normal,
            Some(value) => FeeCategory::parse(value)
                .ok_or_else(|| DbError::Constraint(format!("Unknown fees type: {}", value)))?,
        };

        Ok(Record {
            id: Some(row.id),
            date,
            opd_no: row.opd_no.unwrap_or_default(),
            name: row.name,
            father_name: row.father_name.unwrap_or_default(),
            age,
            gender,
            cnic: row.cnic.filter(|cnic| !cnic.is_empty()),
            address: row.address.unwrap_or_default(),
            temperature: row.temperature,
            bp: row.bp,
            weight: row.weight,
            diabetic: row.diabetic,
            fees_type,
        })
    }
}
