//! Printable single-visit reports.

use std::fs;
use std::path::{Path, PathBuf};

use crate::export::ExportResult;
use crate::helpers::{format_date, month_subdirectory, sanitize_filename};
use crate::models::Record;

/// Clinic details printed on every report.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinicProfile {
    pub name: String,
    pub subtitle: Option<String>,
    /// (doctor name, qualification)
    pub doctors: Vec<(String, String)>,
    pub footer_days: String,
    pub footer_time: String,
}

impl ClinicProfile {
    /// Profile with only a clinic name and the default footer.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subtitle: None,
            doctors: Vec::new(),
            footer_days: "Monday to Saturday".into(),
            footer_time: "Time: 04 P.M to 10 P.M".into(),
        }
    }
}

/// Turns a persisted visit into a printable document.
pub trait ReportRenderer {
    /// Render `record` and return the document path.
    fn render(&self, record: &Record) -> ExportResult<PathBuf>;
}

/// Fixed-layout plain-text report, filed under `<reports_dir>/<YYYY_MM>/`.
#[derive(Debug, Clone)]
pub struct TextReportRenderer {
    reports_dir: PathBuf,
    clinic: ClinicProfile,
}

const WIDTH: usize = 60;

impl TextReportRenderer {
    pub fn new<P: AsRef<Path>>(reports_dir: P, clinic: ClinicProfile) -> Self {
        Self {
            reports_dir: reports_dir.as_ref().to_path_buf(),
            clinic,
        }
    }

    /// File name for a visit report: `<name>_<YYYYMMDD>_<opd>.txt`.
    pub fn file_name(record: &Record) -> String {
        format!(
            "{}_{}_{}.txt",
            sanitize_filename(&record.name),
            record.date.format("%Y%m%d"),
            sanitize_filename(&record.opd_no)
        )
    }

    /// Report body.
    pub fn layout(&self, record: &Record) -> String {
        let rule = "=".repeat(WIDTH);
        let mut lines = vec![format!("{:^width$}", self.clinic.name, width = WIDTH)];
        if let Some(subtitle) = &self.clinic.subtitle {
            lines.push(format!("{:^width$}", format!("({})", subtitle), width = WIDTH));
        }
        lines.extend(
            self.clinic
                .doctors
                .iter()
                .map(|(doctor, qualification)| format!("{} ({})", doctor, qualification)),
        );
        lines.push(rule.clone());

        let fields: [(&str, String); 13] = [
            ("OPD No", record.opd_no.clone()),
            ("Date", format_date(record.date)),
            ("Patient Name", record.name.clone()),
            ("Father/Husband Name", record.father_name.clone()),
            ("Age", format!("{} years", record.age)),
            ("Gender", record.gender.to_string()),
            ("CNIC", record.cnic.clone().unwrap_or_else(|| "-".into())),
            ("Address", record.flat_address()),
            ("Temperature", format!("{} °F", record.temperature)),
            ("Blood Pressure", record.bp.clone()),
            ("Weight", optional_reading(record.weight, "kg")),
            ("Diabetic", optional_reading(record.diabetic, "mg/dl")),
            ("Fees", record.fees_type.label().to_string()),
        ];
        lines.extend(
            fields
                .into_iter()
                .map(|(label, value)| format!("{:<20} {}", format!("{}:", label), value)),
        );

        lines.push(rule.clone());
        lines.push("Rx:".into());
        lines.push(String::new());
        lines.push(rule);
        lines.push(format!(
            "{} | {}",
            self.clinic.footer_days, self.clinic.footer_time
        ));

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }
}

fn optional_reading(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{} {}", v, unit))
}

impl ReportRenderer for TextReportRenderer {
    fn render(&self, record: &Record) -> ExportResult<PathBuf> {
        let month_dir = month_subdirectory(&self.reports_dir, record.date)?;
        let path = month_dir.join(Self::file_name(record));
        fs::write(&path, self.layout(record))?;
        tracing::info!(path = %path.display(), id = ?record.id(), "rendered visit report");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawForm;
    use crate::validation::Validator;

    fn visit() -> Record {
        let form = RawForm {
            date: "18/11/2025".into(),
            opd_no: "OPD/7".into(),
            name: "John Doe".into(),
            father_name: "Richard Roe".into(),
            age: "34".into(),
            gender: "Male".into(),
            cnic: "12345-1234567-1".into(),
            address: "123 Demo Street\nSpringfield".into(),
            temperature: "98.6".into(),
            bp: "120/80".into(),
            weight: "72.5".into(),
            diabetic: "".into(),
            fees_type: "Normal".into(),
        };
        Validator::new().validate(&form).unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            TextReportRenderer::file_name(&visit()),
            "John_Doe_20251118_OPD_7.txt"
        );
    }

    #[test]
    fn test_layout_contents() {
        let mut clinic = ClinicProfile::named("Test Clinic");
        clinic.doctors.push(("Dr. A".into(), "M.B.B.S".into()));
        let renderer = TextReportRenderer::new("unused", clinic);

        let text = renderer.layout(&visit());
        assert!(text.contains("Test Clinic"));
        assert!(text.contains("Dr. A (M.B.B.S)"));
        assert!(text.contains("18/11/2025"));
        assert!(text.contains("123 Demo Street, Springfield"));
        assert!(text.contains("72.5 kg"));
        assert!(text.contains("Normal - Rs. 100"));
        assert!(text.contains("Monday to Saturday"));
        assert!(text.ends_with("Time: 04 P.M to 10 P.M\n"));
        assert!(text.lines().any(|line| line.starts_with("Rx:")));
    }

    #[test]
    fn test_render_writes_into_month_folder() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = TextReportRenderer::new(dir.path(), ClinicProfile::named("Test Clinic"));

        let path = renderer.render(&visit()).unwrap();

        assert_eq!(
            path,
            dir.path().join("2025_11").join("John_Doe_20251118_OPD_7.txt")
        );
        let body = fs::read_to_string(&path).unwrap();
        assert!(body.contains("John Doe"));
    }
}
