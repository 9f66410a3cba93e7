//! Visit record models.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Patient sex as recorded on the visit form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Stored and displayed name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    /// Parse the exact display name. No case folding.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Male" => Some(Gender::Male),
            "Female" => Some(Gender::Female),
            _ => None,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fee category charged for the visit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum FeeCategory {
    #[default]
    Normal,
    Urgent,
}

impl FeeCategory {
    /// Stored name.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeCategory::Normal => "Normal",
            FeeCategory::Urgent => "Urgent",
        }
    }

    /// Label shown on workbooks and reports.
    pub fn label(&self) -> &'static str {
        match self {
            FeeCategory::Normal => "Normal - Rs. 100",
            FeeCategory::Urgent => "Urgent - Rs. 200",
        }
    }

    /// Parse the exact stored name.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Normal" => Some(FeeCategory::Normal),
            "Urgent" => Some(FeeCategory::Urgent),
            _ => None,
        }
    }
}

impl fmt::Display for FeeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outpatient visit.
///
/// Built by [`crate::validation::Validator`] from raw form input. The
/// identity stays `None` until [`crate::db::Database::insert`] accepts the
/// record and is never changed afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Store-assigned identity
    #[serde(default, skip_deserializing)]
    pub(crate) id: Option<i64>,
    /// Visit date
    pub date: NaiveDate,
    /// OPD sequence number (free text, not unique)
    pub opd_no: String,
    /// Patient name
    pub name: String,
    /// Father or husband name
    pub father_name: String,
    /// Age in whole years
    pub age: u32,
    pub gender: Gender,
    /// National ID (CNIC), absent when not given
    pub cnic: Option<String>,
    /// Free-text address, may span lines
    pub address: String,
    /// Body temperature in °F
    pub temperature: f64,
    /// Blood pressure as "systolic/diastolic"
    pub bp: String,
    /// Weight in kg
    pub weight: Option<f64>,
    /// Blood glucose in mg/dl
    pub diabetic: Option<f64>,
    pub fees_type: FeeCategory,
}

impl Record {
    /// Store-assigned identity, if persisted.
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    /// Check if the store has accepted this record.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Address with line breaks flattened to ", ".
    pub fn flat_address(&self) -> String {
        self.address.replace("\r\n", "\n").replace('\n', ", ")
    }
}
