//! Visit form validation.
//!
//! Every rule runs on trimmed text and fails with a reason the user can act
//! on. Nothing in here touches the store or the workbooks.

use std::ops::RangeInclusive;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::helpers::parse_date;
use crate::models::{FeeCategory, Gender, RawForm, Record};

static CNIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{5}-\d{7}-\d|\d{13})$").expect("valid CNIC regex"));
static BP_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2,3}/\d{2,3}$").expect("valid blood pressure regex"));

/// Plausible body temperature in °F.
pub const DEFAULT_TEMPERATURE_RANGE: RangeInclusive<f64> = 80.0..=110.0;

/// Field-level validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Date must follow the DD/MM/YYYY format (e.g. 25/10/2025).")]
    InvalidDate,

    #[error("OPD number is required.")]
    MissingOpdNo,

    #[error("Patient name is required.")]
    MissingName,

    #[error("Father / Husband name cannot be left blank.")]
    MissingFatherName,

    #[error("Please enter a valid age (positive whole number).")]
    InvalidAge,

    #[error("Select Male or Female for sex.")]
    InvalidGender,

    #[error("CNIC must be 13 digits (with or without dashes), e.g. 12345-1234567-1.")]
    InvalidCnic,

    #[error("Address is required.")]
    MissingAddress,

    #[error("Temperature must be a numeric value.")]
    TemperatureNotNumeric,

    #[error("Temperature should be between {min}°F and {max}°F.")]
    TemperatureOutOfRange { min: f64, max: f64 },

    #[error("Blood pressure must follow the systolic/diastolic format (e.g. 120/80).")]
    InvalidBloodPressure,

    #[error("Weight must be a positive number if provided.")]
    InvalidWeight,

    #[error("Diabetic reading must be a positive number if provided.")]
    InvalidDiabetic,

    #[error("Select a fees type (Normal or Urgent).")]
    InvalidFeesType,
}

impl ValidationError {
    /// Name of the offending form field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::InvalidDate => "date",
            ValidationError::MissingOpdNo => "opd_no",
            ValidationError::MissingName => "name",
            ValidationError::MissingFatherName => "father_name",
            ValidationError::InvalidAge => "age",
            ValidationError::InvalidGender => "gender",
            ValidationError::InvalidCnic => "cnic",
            ValidationError::MissingAddress => "address",
            ValidationError::TemperatureNotNumeric
            | ValidationError::TemperatureOutOfRange { .. } => "temperature",
            ValidationError::InvalidBloodPressure => "bp",
            ValidationError::InvalidWeight => "weight",
            ValidationError::InvalidDiabetic => "diabetic",
            ValidationError::InvalidFeesType => "fees_type",
        }
    }
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validator for visit forms.
#[derive(Debug, Clone)]
pub struct Validator {
    temperature_range: RangeInclusive<f64>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Create a validator with the default temperature range.
    pub fn new() -> Self {
        Self {
            temperature_range: DEFAULT_TEMPERATURE_RANGE,
        }
    }

    /// Create a validator with a custom temperature range (°F).
    pub fn with_temperature_range(range: RangeInclusive<f64>) -> Self {
        Self {
            temperature_range: range,
        }
    }

    /// Validate raw form text and build an unpersisted [`Record`].
    ///
    /// Stops at the first failing field, in form order.
    pub fn validate(&self, form: &RawForm) -> ValidationResult<Record> {
        let date = parse_date(form.date.trim()).ok_or(ValidationError::InvalidDate)?;
        let opd_no = required(&form.opd_no, ValidationError::MissingOpdNo)?;
        let name = required(&form.name, ValidationError::MissingName)?;
        let father_name = required(&form.father_name, ValidationError::MissingFatherName)?;
        let age = parse_age(&form.age)?;
        let gender = Gender::parse(form.gender.trim()).ok_or(ValidationError::InvalidGender)?;
        let cnic = parse_cnic(&form.cnic)?;
        let address = required(&form.address, ValidationError::MissingAddress)?;
        let temperature = self.parse_temperature(&form.temperature)?;
        let bp = parse_bp(&form.bp)?;
        let weight = optional_positive(&form.weight, ValidationError::InvalidWeight)?;
        let diabetic = optional_positive(&form.diabetic, ValidationError::InvalidDiabetic)?;
        let fees_type =
            FeeCategory::parse(form.fees_type.trim()).ok_or(ValidationError::InvalidFeesType)?;

        Ok(Record {
            id: None,
            date,
            opd_no,
            name,
            father_name,
            age,
            gender,
            cnic,
            address,
            temperature,
            bp,
            weight,
            diabetic,
            fees_type,
        })
    }

    /// Check the invariants of an already-typed record (e.g. one imported
    /// from JSON).
    pub fn check(&self, record: &Record) -> ValidationResult<()> {
        if record.opd_no.trim().is_empty() {
            return Err(ValidationError::MissingOpdNo);
        }
        if record.name.trim().is_empty() {
            return Err(ValidationError::MissingName);
        }
        if record.father_name.trim().is_empty() {
            return Err(ValidationError::MissingFatherName);
        }
        if record.age == 0 {
            return Err(ValidationError::InvalidAge);
        }
        if let Some(cnic) = &record.cnic {
            if !CNIC_PATTERN.is_match(cnic) {
                return Err(ValidationError::InvalidCnic);
            }
        }
        if record.address.trim().is_empty() {
            return Err(ValidationError::MissingAddress);
        }
        if !self.temperature_range.contains(&record.temperature) {
            return Err(self.out_of_range());
        }
        if !BP_PATTERN.is_match(&record.bp) {
            return Err(ValidationError::InvalidBloodPressure);
        }
        if !positive_or_absent(record.weight) {
            return Err(ValidationError::InvalidWeight);
        }
        if !positive_or_absent(record.diabetic) {
            return Err(ValidationError::InvalidDiabetic);
        }
        Ok(())
    }

    fn parse_temperature(&self, raw: &str) -> ValidationResult<f64> {
        let value = parse_finite(raw.trim()).ok_or(ValidationError::TemperatureNotNumeric)?;
        if !self.temperature_range.contains(&value) {
            return Err(self.out_of_range());
        }
        Ok(value)
    }

    fn out_of_range(&self) -> ValidationError {
        ValidationError::TemperatureOutOfRange {
            min: *self.temperature_range.start(),
            max: *self.temperature_range.end(),
        }
    }
}

fn required(raw: &str, missing: ValidationError) -> ValidationResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(missing);
    }
    Ok(trimmed.to_string())
}

fn parse_age(raw: &str) -> ValidationResult<u32> {
    match raw.trim().parse::<i64>() {
        Ok(age) if age > 0 => u32::try_from(age).map_err(|_| ValidationError::InvalidAge),
        _ => Err(ValidationError::InvalidAge),
    }
}

fn parse_cnic(raw: &str) -> ValidationResult<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if !CNIC_PATTERN.is_match(trimmed) {
        return Err(ValidationError::InvalidCnic);
    }
    Ok(Some(trimmed.to_string()))
}

fn parse_bp(raw: &str) -> ValidationResult<String> {
    let trimmed = raw.trim();
    if !BP_PATTERN.is_match(trimmed) {
        return Err(ValidationError::InvalidBloodPressure);
    }
    Ok(trimmed.to_string())
}

fn optional_positive(raw: &str, invalid: ValidationError) -> ValidationResult<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match parse_finite(trimmed) {
        Some(value) if value > 0.0 => Ok(Some(value)),
        _ => Err(invalid),
    }
}

// Rejects "NaN" and "inf", which f64::from_str accepts.
fn parse_finite(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn positive_or_absent(value: Option<f64>) -> bool {
    value.map_or(true, |v| v.is_finite() && v > 0.0)
}
