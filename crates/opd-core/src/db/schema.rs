//! SQLite schema definition.

/// Visit table. `CREATE ... IF NOT EXISTS` keeps this idempotent.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    date TEXT NOT NULL,                          -- YYYY-MM-DD (legacy rows: full ISO datetime)
    opd_no TEXT NOT NULL,
    name TEXT NOT NULL,
    father_name TEXT,
    age INTEGER NOT NULL,
    gender TEXT NOT NULL,                        -- Male, Female
    cnic TEXT,                                   -- NULL when not given
    address TEXT,
    temperature REAL NOT NULL,                   -- °F
    bp TEXT NOT NULL,                            -- systolic/diastolic
    weight REAL,
    diabetic REAL,
    fees_type TEXT NOT NULL DEFAULT 'Normal'     -- Normal, Urgent
);

CREATE INDEX IF NOT EXISTS idx_patients_date ON patients(date);
"#;

/// Columns added after the first release, with the definition used to add
/// them to older databases. Additive only.
pub const EXTRA_COLUMNS: &[(&str, &str)] = &[
    ("opd_no", "opd_no TEXT DEFAULT ''"),
    ("father_name", "father_name TEXT DEFAULT ''"),
    ("cnic", "cnic TEXT"),
    ("address", "address TEXT"),
    ("weight", "weight REAL"),
    ("diabetic", "diabetic REAL"),
    ("fees_type", "fees_type TEXT DEFAULT 'Normal'"),
];
