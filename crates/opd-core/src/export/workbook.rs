//! Monthly xlsx workbooks, one flat append-only sheet per calendar month.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use umya_spreadsheet::{Spreadsheet, Worksheet};

use super::{xlsx_error, ExportError, ExportResult, RecordSink};
use crate::helpers::{
    ensure_directory, format_date, is_plain_file_stem, month_title, monthly_filename,
};
use crate::models::Record;

/// Default workbook file prefix.
pub const DEFAULT_WORKBOOK_PREFIX: &str = "ClinicData";

/// Header row, in column order.
pub const HEADERS: [&str; 13] = [
    "OPD No",
    "Visit Date",
    "Patient Name",
    "Father/Husband Name",
    "Age",
    "Gender",
    "CNIC",
    "Address",
    "Temperature (°F)",
    "Blood Pressure",
    "Weight (kg)",
    "Diabetic (mg/dl)",
    "Fees Type",
];

const MAX_COLUMN_WIDTH: usize = 40;

/// A single cell of a visit row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Empty,
}

/// Cells for one visit, in [`HEADERS`] order.
pub fn record_row(record: &Record) -> Vec<CellValue> {
    vec![
        CellValue::Text(record.opd_no.clone()),
        CellValue::Text(format_date(record.date)),
        CellValue::Text(record.name.clone()),
        CellValue::Text(record.father_name.clone()),
        CellValue::Number(f64::from(record.age)),
        CellValue::Text(record.gender.as_str().to_string()),
        CellValue::Text(record.cnic.clone().unwrap_or_default()),
        CellValue::Text(record.flat_address()),
        CellValue::Number(record.temperature),
        CellValue::Text(record.bp.clone()),
        record.weight.map_or(CellValue::Empty, CellValue::Number),
        record.diabetic.map_or(CellValue::Empty, CellValue::Number),
        CellValue::Text(record.fees_type.label().to_string()),
    ]
}

/// Writes visits into `<data_dir>/<prefix>_<MonthName><Year>.xlsx`.
#[derive(Debug, Clone)]
pub struct WorkbookSink {
    data_dir: PathBuf,
    prefix: String,
}

impl WorkbookSink {
    /// Create a sink writing into `data_dir`, creating the folder if needed.
    pub fn new<P: AsRef<Path>>(data_dir: P) -> ExportResult<Self> {
        Self::with_prefix(data_dir, DEFAULT_WORKBOOK_PREFIX)
    }

    /// Create a sink with a custom file prefix.
    ///
    /// The prefix must not contain path separators or `..`.
    pub fn with_prefix<P: AsRef<Path>>(data_dir: P, prefix: &str) -> ExportResult<Self> {
        if !is_plain_file_stem(prefix) {
            return Err(ExportError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("workbook prefix {:?} is not a plain file name", prefix),
            )));
        }
        Ok(Self {
            data_dir: ensure_directory(data_dir.as_ref())?,
            prefix: prefix.to_string(),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Workbook that holds visits dated `date`.
    pub fn workbook_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir.join(monthly_filename(&self.prefix, date))
    }

    /// Regenerate every workbook from `records`.
    ///
    /// Existing `<prefix>_*.xlsx` files are first moved into a timestamped
    /// `backup_YYYYMMDD_HHMMSS` folder, which is returned.
    pub fn rebuild_from(&self, records: &[Record]) -> ExportResult<PathBuf> {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let backup_dir = ensure_directory(&self.data_dir.join(format!("backup_{}", stamp)))?;

        let own_prefix = format!("{}_", self.prefix);
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if entry.file_type()?.is_file()
                && name.starts_with(&own_prefix)
                && name.ends_with(".xlsx")
            {
                fs::rename(entry.path(), backup_dir.join(name))?;
                tracing::info!(file = name, "backed up workbook");
            }
        }

        self.append_records(records)?;
        Ok(backup_dir)
    }
}

impl RecordSink for WorkbookSink {
    fn append_record(&self, record: &Record) -> ExportResult<PathBuf> {
        let path = self.workbook_path(record.date);
        let mut book = open_or_create(&path, record.date)?;
        let sheet = book.get_active_sheet_mut();
        append_row(sheet, record);
        autosize_columns(sheet);
        umya_spreadsheet::writer::xlsx::write(&book, &path).map_err(xlsx_error)?;
        tracing::info!(path = %path.display(), "appended visit to workbook");
        Ok(path)
    }

    /// Append many visits with one open/append/save cycle per workbook.
    ///
    /// Every workbook is opened and filled in memory before any is saved, so
    /// an unreadable workbook writes nothing. A save failure part way reports
    /// the records already saved through [`ExportError::appended`].
    fn append_records(&self, records: &[Record]) -> ExportResult<Vec<PathBuf>> {
        let mut groups: Vec<(PathBuf, Vec<usize>)> = Vec::new();
        let mut index: HashMap<PathBuf, usize> = HashMap::new();

        for (position, record) in records.iter().enumerate() {
            let path = self.workbook_path(record.date);
            let slot = *index.entry(path.clone()).or_insert_with(|| {
                groups.push((path, Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(position);
        }

        let mut staged = Vec::with_capacity(groups.len());
        for (path, positions) in groups {
            let Some(&first) = positions.first() else {
                continue;
            };
            let mut book = open_or_create(&path, records[first].date)?;
            let sheet = book.get_active_sheet_mut();
            for &position in &positions {
                append_row(sheet, &records[position]);
            }
            autosize_columns(sheet);
            staged.push((path, book, positions));
        }

        let mut appended = Vec::with_capacity(records.len());
        let mut written = Vec::with_capacity(staged.len());
        for (path, book, positions) in staged {
            if let Err(err) = umya_spreadsheet::writer::xlsx::write(&book, &path) {
                return Err(ExportError::after_partial(appended, xlsx_error(err)));
            }
            tracing::info!(path = %path.display(), rows = positions.len(), "appended visits to workbook");
            appended.extend(positions);
            written.push(path);
        }
        Ok(written)
    }
}

fn open_or_create(path: &Path, date: NaiveDate) -> ExportResult<Spreadsheet> {
    if path.exists() {
        return umya_spreadsheet::reader::xlsx::read(path).map_err(xlsx_error);
    }

    let mut book = umya_spreadsheet::new_file();
    let sheet = book.get_active_sheet_mut();
    sheet.set_name(month_title(date));
    for (col, header) in HEADERS.iter().enumerate() {
        sheet.get_cell_mut((col as u32 + 1, 1)).set_value_string(*header);
    }
    Ok(book)
}

fn append_row(sheet: &mut Worksheet, record: &Record) {
    let row = sheet.get_highest_row() + 1;
    for (col, value) in record_row(record).into_iter().enumerate() {
        let coordinate = (col as u32 + 1, row);
        match value {
            CellValue::Text(text) => {
                sheet.get_cell_mut(coordinate).set_value_string(text);
            }
            CellValue::Number(number) => {
                sheet.get_cell_mut(coordinate).set_value_number(number);
            }
            CellValue::Empty => {}
        }
    }
}

fn autosize_columns(sheet: &mut Worksheet) {
    let last_row = sheet.get_highest_row();
    for col in 1..=HEADERS.len() as u32 {
        let longest = (1..=last_row)
            .map(|row| sheet.get_value((col, row)).chars().count())
            .max()
            .unwrap_or(0);
        sheet
            .get_column_dimension_by_number_mut(&col)
            .set_width(column_width(longest));
    }
}

/// Column width for a column whose longest value has `longest` characters.
fn column_width(longest: usize) -> f64 {
    (longest + 2).min(MAX_COLUMN_WIDTH) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawForm;
    use crate::validation::Validator;

    fn visit(date: &str) -> Record {
        let form = RawForm {
            date: date.into(),
            opd_no: "OPD-1".into(),
            name: "Test".into(),
            father_name: "F".into(),
            age: "30".into(),
            gender: "Male".into(),
            cnic: "".into(),
            address: "A\nB".into(),
            temperature: "98.6".into(),
            bp: "120/80".into(),
            weight: "70".into(),
            diabetic: "".into(),
            fees_type: "Urgent".into(),
        };
        Validator::new().validate(&form).unwrap()
    }

    #[test]
    fn test_record_row_layout() {
        let row = record_row(&visit("18/11/2025"));

        assert_eq!(row.len(), HEADERS.len());
        assert_eq!(row[1], CellValue::Text("18/11/2025".into()));
        assert_eq!(row[4], CellValue::Number(30.0));
        assert_eq!(row[6], CellValue::Text(String::new()));
        assert_eq!(row[7], CellValue::Text("A, B".into()));
        assert_eq!(row[10], CellValue::Number(70.0));
        assert_eq!(row[11], CellValue::Empty);
        assert_eq!(row[12], CellValue::Text("Urgent - Rs. 200".into()));
    }

    #[test]
    fn test_workbook_path() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::with_prefix(dir.path(), "Opd").unwrap();
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();

        assert_eq!(
            sink.workbook_path(date),
            dir.path().join("Opd_February2026.xlsx")
        );
    }

    #[test]
    fn test_append_creates_header_and_sheet_title() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();

        let path = sink.append_record(&visit("18/11/2025")).unwrap();
        assert!(path.ends_with("ClinicData_November2025.xlsx"));

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet_by_name("November 2025").unwrap();
        assert_eq!(sheet.get_highest_row(), 2);
        for (col, header) in HEADERS.iter().enumerate() {
            assert_eq!(sheet.get_value((col as u32 + 1, 1)), *header);
        }
        assert_eq!(sheet.get_value((3, 2)), "Test");
    }

    #[test]
    fn test_text_cells_keep_exact_text() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();

        let mut record = visit("18/11/2025");
        record.opd_no = "007".into();
        record.name = "TRUE".into();
        record.cnic = Some("0123451234567".into());
        record.address = "12".into();
        let path = sink.append_record(&record).unwrap();

        let book = umya_spreadsheet::reader::xlsx::read(&path).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_value((1, 2)), "007");
        assert_eq!(sheet.get_value((3, 2)), "TRUE");
        assert_eq!(sheet.get_value((7, 2)), "0123451234567");
        assert_eq!(sheet.get_value((8, 2)), "12");
        for col in [1u32, 3, 7, 8] {
            assert_eq!(sheet.get_cell((col, 2)).unwrap().get_data_type(), "s");
        }
        // Age stays numeric
        assert_eq!(sheet.get_cell((5, 2)).unwrap().get_data_type(), "n");
    }

    #[test]
    fn test_unreadable_workbook_is_an_xlsx_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();
        let record = visit("18/11/2025");
        fs::write(sink.workbook_path(record.date), b"not a workbook").unwrap();

        let result = sink.append_record(&record);
        assert!(matches!(result, Err(ExportError::Xlsx(_))));
    }

    #[test]
    fn test_append_records_writes_nothing_when_a_workbook_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();
        let records = vec![visit("01/11/2025"), visit("01/12/2025")];
        fs::create_dir_all(sink.workbook_path(records[1].date)).unwrap();

        let err = sink.append_records(&records).unwrap_err();

        assert!(err.appended().is_empty());
        assert!(!sink.workbook_path(records[0].date).exists());
    }

    #[test]
    fn test_prefix_must_be_plain_file_name() {
        let dir = tempfile::tempdir().unwrap();
        assert!(WorkbookSink::with_prefix(dir.path(), "../Clinic").is_err());
        assert!(WorkbookSink::with_prefix(dir.path(), "a/b").is_err());
        assert!(WorkbookSink::with_prefix(dir.path(), "Clinic-Data").is_ok());
    }

    #[test]
    fn test_column_width() {
        assert_eq!(column_width(0), 2.0);
        assert_eq!(column_width("Father/Husband Name".len()), 21.0);
        assert_eq!(column_width(80), 40.0);
    }

    #[test]
    fn test_append_records_groups_by_month() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();

        let records = vec![
            visit("01/11/2025"),
            visit("01/12/2025"),
            visit("30/11/2025"),
        ];
        let paths = sink.append_records(&records).unwrap();

        assert_eq!(
            paths,
            vec![
                dir.path().join("ClinicData_November2025.xlsx"),
                dir.path().join("ClinicData_December2025.xlsx"),
            ]
        );

        let book = umya_spreadsheet::reader::xlsx::read(&paths[0]).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_highest_row(), 3);
        assert_eq!(sheet.get_value((2, 2)), "01/11/2025");
        assert_eq!(sheet.get_value((2, 3)), "30/11/2025");
    }

    #[test]
    fn test_rebuild_moves_old_workbooks_to_backup() {
        let dir = tempfile::tempdir().unwrap();
        let sink = WorkbookSink::new(dir.path()).unwrap();

        let records = vec![visit("05/11/2025")];
        let original = sink.append_record(&records[0]).unwrap();
        sink.append_record(&records[0]).unwrap();
        fs::write(dir.path().join("notes.txt"), "keep me").unwrap();

        let backup = sink.rebuild_from(&records).unwrap();

        assert!(backup.join("ClinicData_November2025.xlsx").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!backup.join("notes.txt").exists());

        // Rebuilt workbook holds only the records passed in
        let book = umya_spreadsheet::reader::xlsx::read(&original).unwrap();
        let sheet = book.get_sheet(&0).unwrap();
        assert_eq!(sheet.get_highest_row(), 2);
    }
}
