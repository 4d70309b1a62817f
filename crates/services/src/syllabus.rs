use std::path::Path;

use study_core::model::{Syllabus, SyllabusTopic};

use crate::error::SyllabusLoadError;

/// Read a syllabus from a JSON array of topics.
///
/// # Errors
///
/// Returns `SyllabusLoadError` if the file cannot be read or parsed, or if
/// two topics share an id.
pub fn load_syllabus(path: &Path) -> Result<Syllabus, SyllabusLoadError> {
    let raw = std::fs::read_to_string(path)?;
    parse_syllabus(&raw)
}

/// # Errors
///
/// Same as [`load_syllabus`], minus the I/O.
pub fn parse_syllabus(raw: &str) -> Result<Syllabus, SyllabusLoadError> {
    let topics: Vec<SyllabusTopic> = serde_json::from_str(raw)?;
    Ok(Syllabus::new(topics)?)
}
