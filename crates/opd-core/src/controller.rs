//! Save pipeline behind the visit form.
//!
//! ```text
//! RawForm → Validator → Database::insert → RecordSink::append_record
//!                                               │ fails
//!                                               ▼
//!                                    Database::delete (compensate)
//! ```
//!
//! The view layer only hands raw strings in and shows the result.

use std::path::PathBuf;

use crate::db::Database;
use crate::error::{ClinicError, ClinicResult};
use crate::export::RecordSink;
use crate::models::{RawForm, Record};
use crate::report::ReportRenderer;
use crate::validation::Validator;

/// A visit that reached both the store and the workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedVisit {
    pub record: Record,
    pub workbook: PathBuf,
}

/// Validates, persists, mirrors and renders visits.
pub struct FormController<S, R> {
    db: Database,
    sink: S,
    renderer: R,
    validator: Validator,
}

impl<S: RecordSink, R: ReportRenderer> FormController<S, R> {
    pub fn new(db: Database, sink: S, renderer: R) -> Self {
        Self::with_validator(db, sink, renderer, Validator::new())
    }

    pub fn with_validator(db: Database, sink: S, renderer: R, validator: Validator) -> Self {
        Self {
            db,
            sink,
            renderer,
            validator,
        }
    }

    /// Validate and save one visit.
    ///
    /// Validation failures have no side effects. If the workbook append
    /// fails the just-inserted row is deleted again, so the visit exists in
    /// both places or in neither.
    pub fn save(&self, form: &RawForm) -> ClinicResult<SavedVisit> {
        let mut record = self.validator.validate(form)?;
        tracing::debug!(?record, "saving visit record");

        let id = self.db.insert(&mut record)?;
        match self.sink.append_record(&record) {
            Ok(workbook) => Ok(SavedVisit { record, workbook }),
            Err(err) => {
                tracing::warn!(id, error = %err, "workbook append failed, removing inserted visit");
                self.compensate(&[id]);
                Err(err.into())
            }
        }
    }

    /// Save already-typed visits in one transaction and mirror them.
    ///
    /// Every record is checked first; one invalid record rejects the batch.
    /// If mirroring fails, only the visits that never reached a workbook are
    /// removed again; the error lists the ones that did.
    pub fn import(&mut self, mut records: Vec<Record>) -> ClinicResult<Vec<Record>> {
        for record in &records {
            self.validator.check(record)?;
        }

        let ids = self.db.bulk_insert(&mut records)?;
        if let Err(err) = self.sink.append_records(&records) {
            let written = err.appended();
            let unwritten: Vec<i64> = ids
                .iter()
                .enumerate()
                .filter(|(position, _)| !written.contains(position))
                .map(|(_, id)| *id)
                .collect();
            tracing::warn!(
                kept = written.len(),
                removed = unwritten.len(),
                error = %err,
                "workbook append failed, removing unmirrored visits"
            );
            self.compensate(&unwritten);
            return Err(err.into());
        }
        Ok(records)
    }

    /// Render a printable report for a saved visit.
    pub fn generate_report(&self, record: &Record) -> ClinicResult<PathBuf> {
        if !record.is_persisted() {
            return Err(ClinicError::NotPersisted);
        }
        tracing::debug!(id = ?record.id(), "generating visit report");
        Ok(self.renderer.render(record)?)
    }

    pub fn store(&self) -> &Database {
        &self.db
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    // Best effort. A failure here leaves a database-only row behind.
    fn compensate(&self, ids: &[i64]) {
        for &id in ids {
            if let Err(err) = self.db.delete(id) {
                tracing::error!(id, error = %err, "could not remove visit after failed export");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::{ExportError, ExportResult};
    use crate::validation::ValidationError;
    use std::cell::RefCell;
    use std::io;

    /// Sink that remembers appended records, failing once it holds
    /// `capacity` of them.
    #[derive(Default)]
    struct MemorySink {
        rows: RefCell<Vec<Record>>,
        fail: bool,
        capacity: Option<usize>,
    }

    impl RecordSink for MemorySink {
        fn append_record(&self, record: &Record) -> ExportResult<PathBuf> {
            let full = self
                .capacity
                .is_some_and(|capacity| self.rows.borrow().len() >= capacity);
            if self.fail || full {
                return Err(ExportError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "workbook is locked",
                )));
            }
            self.rows.borrow_mut().push(record.clone());
            Ok(PathBuf::from("memory.xlsx"))
        }
    }

    struct NullRenderer;

    impl ReportRenderer for NullRenderer {
        fn render(&self, record: &Record) -> ExportResult<PathBuf> {
            Ok(PathBuf::from(format!("report-{}.txt", record.id().unwrap_or_default())))
        }
    }

    fn controller(fail: bool) -> FormController<MemorySink, NullRenderer> {
        let sink = MemorySink {
            fail,
            ..MemorySink::default()
        };
        FormController::new(Database::open_in_memory().unwrap(), sink, NullRenderer)
    }

    fn form() -> RawForm {
        RawForm {
            date: "18/11/2025".into(),
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
            diabetic: "100".into(),
            fees_type: "Normal".into(),
        }
    }

    #[test]
    fn test_save_persists_and_mirrors() {
        let controller = controller(false);

        let saved = controller.save(&form()).unwrap();

        assert!(saved.record.is_persisted());
        assert_eq!(saved.workbook, PathBuf::from("memory.xlsx"));
        assert_eq!(controller.store().count().unwrap(), 1);
        assert_eq!(controller.sink().rows.borrow().len(), 1);
        assert_eq!(controller.sink().rows.borrow()[0], saved.record);
    }

    #[test]
    fn test_invalid_form_has_no_side_effects() {
        let controller = controller(false);
        let mut bad = form();
        bad.age = "0".into();

        let err = controller.save(&bad).unwrap_err();

        assert!(matches!(
            err,
            ClinicError::Validation(ValidationError::InvalidAge)
        ));
        assert_eq!(controller.store().count().unwrap(), 0);
        assert!(controller.sink().rows.borrow().is_empty());
    }

    #[test]
    fn test_failed_export_removes_inserted_record() {
        let controller = controller(true);

        let err = controller.save(&form()).unwrap_err();

        assert!(matches!(err, ClinicError::Export(ExportError::Io(_))));
        assert_eq!(controller.store().count().unwrap(), 0);
    }

    #[test]
    fn test_import_batch() {
        let mut controller = controller(false);
        let validator = Validator::new();
        let records = vec![
            validator.validate(&form()).unwrap(),
            validator.validate(&form()).unwrap(),
        ];

        let saved = controller.import(records).unwrap();

        assert!(saved.iter().all(Record::is_persisted));
        assert_eq!(controller.store().count().unwrap(), 2);
        assert_eq!(controller.sink().rows.borrow().len(), 2);
    }

    #[test]
    fn test_import_rejects_invalid_record() {
        let mut controller = controller(false);
        let mut record = Validator::new().validate(&form()).unwrap();
        record.bp = "high".into();

        let err = controller.import(vec![record]).unwrap_err();

        assert!(matches!(
            err,
            ClinicError::Validation(ValidationError::InvalidBloodPressure)
        ));
        assert_eq!(controller.store().count().unwrap(), 0);
    }

    #[test]
    fn test_import_compensates_on_export_failure() {
        let mut controller = controller(true);
        let record = Validator::new().validate(&form()).unwrap();

        assert!(controller.import(vec![record]).is_err());
        assert_eq!(controller.store().count().unwrap(), 0);
    }

    #[test]
    fn test_import_keeps_visits_already_mirrored() {
        let sink = MemorySink {
            capacity: Some(1),
            ..MemorySink::default()
        };
        let mut controller =
            FormController::new(Database::open_in_memory().unwrap(), sink, NullRenderer);
        let validator = Validator::new();
        let mut december = form();
        december.date = "01/12/2025".into();
        let records = vec![
            validator.validate(&form()).unwrap(),
            validator.validate(&december).unwrap(),
        ];

        let err = controller.import(records).unwrap_err();

        let ClinicError::Export(export) = &err else {
            panic!("expected export error, got {:?}", err);
        };
        assert_eq!(export.appended(), &[0]);

        let stored = controller.store().fetch_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], controller.sink().rows.borrow()[0]);
    }

    #[test]
    fn test_report_requires_saved_record() {
        let controller = controller(false);
        let unsaved = Validator::new().validate(&form()).unwrap();
        assert!(matches!(
            controller.generate_report(&unsaved),
            Err(ClinicError::NotPersisted)
        ));

        let saved = controller.save(&form()).unwrap();
        let path = controller.generate_report(&saved.record).unwrap();
        assert_eq!(
            path,
            PathBuf::from(format!("report-{}.txt", saved.record.id().unwrap()))
        );
    }
}
