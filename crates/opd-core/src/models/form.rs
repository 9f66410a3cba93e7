//! Raw form input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::helpers::format_date;

/// Untrimmed text of every field on the visit form.
///
/// Nothing here is checked; [`crate::validation::Validator`] turns it into a
/// [`super::Record`] or rejects it with a field-specific reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawForm {
    /// Visit date as DD/MM/YYYY
    pub date: String,
    pub opd_no: String,
    pub name: String,
    pub father_name: String,
    pub age: String,
    pub gender: String,
    pub cnic: String,
    pub address: String,
    pub temperature: String,
    pub bp: String,
    pub weight: String,
    pub diabetic: String,
    pub fees_type: String,
}

impl RawForm {
    /// A freshly reset form dated `today`.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            date: format_date(today),
            gender: "Female".into(),
            temperature: "98.6".into(),
            bp: "120/80".into(),
            fees_type: "Normal".into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_form_defaults() {
        let today = NaiveDate::from_ymd_opt(2025, 10, 25).unwrap();
        let form = RawForm::blank(today);

        assert_eq!(form.date, "25/10/2025");
        assert_eq!(form.gender, "Female");
        assert_eq!(form.temperature, "98.6");
        assert_eq!(form.bp, "120/80");
        assert_eq!(form.fees_type, "Normal");
        assert!(form.name.is_empty());
        assert!(form.weight.is_empty());
    }
}
