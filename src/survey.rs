use std::collections::HashMap;
use std::io;
use std::path::Path;

use anyhow::{bail, Context};
use csv::StringRecord;

use crate::models::{SurveyResponse, LIKERT_QUESTIONS, MAX_POSITIONS};
use crate::schema::{check_export_preamble, SurveySchema};

pub fn load_survey(path: &Path) -> anyhow::Result<Vec<SurveyResponse>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open survey export {}", path.display()))?;
    parse_survey(file).with_context(|| format!("failed to read survey export {}", path.display()))
}

pub fn parse_survey<R: io::Read>(input: R) -> anyhow::Result<Vec<SurveyResponse>> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers = reader.headers()?.clone();
    let schema = SurveySchema::from_headers(&headers)?;

    let mut records = reader.records();
    let Some(label_row) = records.next() else {
        bail!("survey export has no question-label row");
    };
    label_row?;
    let Some(import_row) = records.next() else {
        bail!("survey export has no import-metadata row");
    };
    check_export_preamble(&import_row?)?;

    let mut responses = Vec::new();
    for record in records {
        let record = record?;
        if let Some(response) = parse_response(&record, &schema) {
            responses.push(response);
        }
    }
    Ok(responses)
}

/// Decodes one data row. Rows without a respondent email or team (abandoned
/// or anonymous previews) are dropped; unparseable rating cells become
/// missing values, never errors.
fn parse_response(record: &StringRecord, schema: &SurveySchema) -> Option<SurveyResponse> {
    let respondent_email = cell(record, Some(schema.recipient_email))?;
    let team = cell(record, Some(schema.team))?;

    let mut teammate_positions = HashMap::new();
    for (i, &column) in schema.team_member.iter().enumerate() {
        if let Some(email) = cell(record, Some(column)) {
            // Team Member 1 sits at matrix position 2; position 1 is self.
            teammate_positions.insert(email, i + 2);
        }
    }

    let mut likert = [[None; LIKERT_QUESTIONS]; MAX_POSITIONS];
    let mut allocation = [None; MAX_POSITIONS];
    for position in 0..MAX_POSITIONS {
        for question in 0..LIKERT_QUESTIONS {
            likert[position][question] = numeric_cell(record, schema.likert[position][question]);
        }
        allocation[position] = numeric_cell(record, schema.allocation[position]);
    }

    Some(SurveyResponse {
        respondent_email,
        team,
        teammate_positions,
        likert,
        allocation,
    })
}

fn cell(record: &StringRecord, column: Option<usize>) -> Option<String> {
    let raw = record.get(column?)?.trim();
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

fn numeric_cell(record: &StringRecord, column: Option<usize>) -> Option<f64> {
    cell(record, column)?.parse().ok()
}
