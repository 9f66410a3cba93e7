//! Runtime configuration.
//!
//! Resolved once at startup and passed into the store, sink and renderer.
//! Services never read the environment themselves.

use std::path::{Path, PathBuf};

use crate::error::{ClinicError, ClinicResult};
use crate::export::DEFAULT_WORKBOOK_PREFIX;
use crate::helpers::{clinic_data_folder, is_plain_file_stem};
use crate::report::ClinicProfile;

/// Default clinic name printed on reports.
pub const DEFAULT_CLINIC_NAME: &str = "Welfare Clinic & Maternity Home";

/// Configuration resolved at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicConfig {
    database_path: PathBuf,
    data_dir: PathBuf,
    reports_dir: PathBuf,
    workbook_prefix: String,
    clinic: ClinicProfile,
}

impl ClinicConfig {
    /// Create a new `ClinicConfig`.
    ///
    /// The workbook prefix must be a plain file name and the clinic name must
    /// not be blank.
    pub fn new(
        database_path: PathBuf,
        data_dir: PathBuf,
        reports_dir: PathBuf,
        workbook_prefix: String,
        clinic: ClinicProfile,
    ) -> ClinicResult<Self> {
        if workbook_prefix.trim().is_empty() {
            return Err(ClinicError::Config("workbook prefix cannot be empty".into()));
        }
        if !is_plain_file_stem(&workbook_prefix) {
            return Err(ClinicError::Config(format!(
                "workbook prefix {:?} must not contain path separators or '..'",
                workbook_prefix
            )));
        }
        if clinic.name.trim().is_empty() {
            return Err(ClinicError::Config("clinic name cannot be empty".into()));
        }

        Ok(Self {
            database_path,
            data_dir,
            reports_dir,
            workbook_prefix,
            clinic,
        })
    }

    /// Resolve from `OPD_*` environment variables.
    ///
    /// - `OPD_DATA_DIR`: workbook folder (default `<Documents>/OPD Data`)
    /// - `OPD_DATABASE_PATH`: SQLite file (default `<data dir>/clinic.db`)
    /// - `OPD_REPORTS_DIR`: report folder (default `<data dir>/reports`)
    /// - `OPD_WORKBOOK_PREFIX`: workbook file prefix (default `ClinicData`)
    /// - `OPD_CLINIC_NAME`: clinic name on reports
    pub fn from_env() -> ClinicResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve using `lookup` in place of the process environment.
    pub fn from_lookup<F>(lookup: F) -> ClinicResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let data_dir = var("OPD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(clinic_data_folder);
        let database_path = var("OPD_DATABASE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("clinic.db"));
        let reports_dir = var("OPD_REPORTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("reports"));
        let workbook_prefix =
            var("OPD_WORKBOOK_PREFIX").unwrap_or_else(|| DEFAULT_WORKBOOK_PREFIX.to_string());
        let clinic_name = var("OPD_CLINIC_NAME").unwrap_or_else(|| DEFAULT_CLINIC_NAME.to_string());

        Self::new(
            database_path,
            data_dir,
            reports_dir,
            workbook_prefix,
            ClinicProfile::named(&clinic_name),
        )
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    pub fn workbook_prefix(&self) -> &str {
        &self.workbook_prefix
    }

    pub fn clinic(&self) -> &ClinicProfile {
        &self.clinic
    }
}
