//! OPD Clinic Core Library
//!
//! Validation and persistence pipeline for outpatient visit records.
//!
//! # Architecture
//!
//! ```text
//! Form text → Validator ──rejects──▶ ValidationError (no side effects)
//!                 │
//!                 ▼
//!          Database::insert  (assigns identity)
//!                 │
//!                 ▼
//!     WorkbookSink::append_record ──fails──▶ delete inserted row
//!     (ClinicData_<Month><Year>.xlsx)
//!                 │
//!                 ▼
//!      ReportRenderer::render (on request)
//! ```
//!
//! # Modules
//!
//! - [`models`]: Domain types (Record, RawForm, Gender, FeeCategory)
//! - [`validation`]: Field rules for raw form input
//! - [`db`]: SQLite store with additive schema migration
//! - [`export`]: Monthly xlsx workbooks
//! - [`report`]: Printable visit reports
//! - [`controller`]: Save pipeline with export compensation
//! - [`config`]: Startup configuration

pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod export;
pub mod helpers;
pub mod models;
pub mod report;
pub mod validation;

// Re-export commonly used types
pub use config::ClinicConfig;
pub use controller::{FormController, SavedVisit};
pub use db::{Database, DbError};
pub use error::{ClinicError, ClinicResult};
pub use export::{ExportError, RecordSink, WorkbookSink};
pub use models::{FeeCategory, Gender, RawForm, Record};
pub use report::{ClinicProfile, ReportRenderer, TextReportRenderer};
pub use validation::{ValidationError, Validator};
