//! Import of survey answers exported as `question,answer` CSV.

use serde::Deserialize;
use std::io::Read;
use std::path::Path;

use super::domain::{AnswerSet, DetailValue};

#[derive(Debug)]
pub enum SurveyImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    EmptyQuestion { line: u64 },
}

impl std::fmt::Display for SurveyImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SurveyImportError::Io(err) => write!(f, "failed to read survey export: {}", err),
            SurveyImportError::Csv(err) => write!(f, "invalid survey CSV data: {}", err),
            SurveyImportError::EmptyQuestion { line } => {
                write!(f, "survey row on line {} has no question key", line)
            }
        }
    }
}

impl std::error::Error for SurveyImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SurveyImportError::Io(err) => Some(err),
            SurveyImportError::Csv(err) => Some(err),
            SurveyImportError::EmptyQuestion { .. } => None,
        }
    }
}

impl From<std::io::Error> for SurveyImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for SurveyImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

#[derive(Debug, Deserialize)]
struct SurveyRow {
    question: String,
    #[serde(default)]
    answer: String,
}

pub struct SurveyImporter;

impl SurveyImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<AnswerSet, SurveyImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Later rows win when a question repeats; blank answers are skipped.
    pub fn from_reader<R: Read>(reader: R) -> Result<AnswerSet, SurveyImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut record = csv::StringRecord::new();
        let mut answers = AnswerSet::new();

        while csv_reader.read_record(&mut record)? {
            let row: SurveyRow = record.deserialize(Some(&headers))?;
            if row.question.is_empty() {
                let line = record.position().map_or(0, |position| position.line());
                return Err(SurveyImportError::EmptyQuestion { line });
            }
            if row.answer.is_empty() {
                continue;
            }
            answers.insert(row.question, parse_answer(&row.answer));
        }

        Ok(answers)
    }
}

/// Interpret a raw textual answer: numbers and `true`/`false` become
/// typed values, everything else stays text.
pub fn parse_answer(raw: &str) -> DetailValue {
    let trimmed = raw.trim();
    if let Ok(number) = trimmed.parse::<f64>() {
        if number.is_finite() {
            return DetailValue::Number(number);
        }
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => DetailValue::Flag(true),
        "false" => DetailValue::Flag(false),
        _ => DetailValue::Text(trimmed.to_string()),
    }
}
