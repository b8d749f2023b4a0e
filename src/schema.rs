use anyhow::{anyhow, bail};
use csv::StringRecord;

use crate::models::{LIKERT_QUESTIONS, MAX_POSITIONS};

/// Column layout of a Qualtrics survey export, resolved once from the header
/// row. Later parsing goes through these indices only, so a misnamed column
/// surfaces here as a schema error instead of silently dropping data.
#[derive(Debug)]
pub struct SurveySchema {
    pub recipient_last_name: usize,
    pub recipient_first_name: usize,
    pub recipient_email: usize,
    pub team: usize,
    /// `team_member[i]` is the column for "Team Member {i + 1}".
    pub team_member: Vec<usize>,
    /// `likert[p - 1][q]` is the column for `Q2_{p}_{q + 1}`, if exported.
    pub likert: [[Option<usize>; LIKERT_QUESTIONS]; MAX_POSITIONS],
    /// `allocation[p - 1]` is the column for `Q3_{p}`, if exported.
    pub allocation: [Option<usize>; MAX_POSITIONS],
}

impl SurveySchema {
    pub fn from_headers(headers: &StringRecord) -> anyhow::Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                anyhow!(
                    "survey export is missing the required column '{name}' (found: {})",
                    headers.iter().collect::<Vec<_>>().join(", ")
                )
            })
        };

        let mut team_member = Vec::new();
        for i in 1.. {
            match find(&format!("Team Member {i}")) {
                Some(idx) => team_member.push(idx),
                None => break,
            }
        }
        if team_member.is_empty() {
            bail!("survey export has no 'Team Member 1' column; is this the peer review survey?");
        }

        let mut likert = [[None; LIKERT_QUESTIONS]; MAX_POSITIONS];
        let mut allocation = [None; MAX_POSITIONS];
        for position in 1..=MAX_POSITIONS {
            for question in 1..=LIKERT_QUESTIONS {
                likert[position - 1][question - 1] = find(&format!("Q2_{position}_{question}"));
            }
            allocation[position - 1] = find(&format!("Q3_{position}"));
        }

        // Position 1 is the respondent's self-rating; teammate ratings live
        // in positions 2 and up.
        let has_teammate_ratings = likert[1..]
            .iter()
            .any(|columns| columns.iter().any(Option::is_some));
        if !has_teammate_ratings {
            bail!("survey export has no teammate rating columns (expected Q2_2_1 and friends)");
        }

        Ok(Self {
            recipient_last_name: require("RecipientLastName")?,
            recipient_first_name: require("RecipientFirstName")?,
            recipient_email: require("RecipientEmail")?,
            team: require("Team")?,
            team_member,
            likert,
            allocation,
        })
    }
}

/// Qualtrics exports carry two preamble rows between the header and the
/// data: a question-label row and an import-metadata row whose cells look
/// like `{"ImportId": ...}`. An export without that exact shape would shift
/// every data row, so it is rejected up front.
pub fn check_export_preamble(import_row: &StringRecord) -> anyhow::Result<()> {
    if !import_row.iter().any(|cell| cell.contains("ImportId")) {
        bail!(
            "survey export does not have the expected Qualtrics preamble \
             (second row should contain ImportId metadata); refusing to guess the layout"
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(columns: &[&str]) -> StringRecord {
        StringRecord::from(columns.to_vec())
    }

    #[test]
    fn resolves_matrix_columns() {
        let schema = SurveySchema::from_headers(&headers(&[
            "RecipientLastName",
            "RecipientFirstName",
            "RecipientEmail",
            "Team",
            "Team Member 1",
            "Team Member 2",
            "Q2_1_1",
            "Q2_2_1",
            "Q2_2_2",
            "Q3_2",
        ]))
        .unwrap();

        assert_eq!(schema.team_member, vec![4, 5]);
        assert_eq!(schema.likert[0][0], Some(6));
        assert_eq!(schema.likert[1][0], Some(7));
        assert_eq!(schema.likert[1][1], Some(8));
        assert_eq!(schema.likert[1][2], None);
        assert_eq!(schema.allocation[1], Some(9));
        assert_eq!(schema.allocation[0], None);
    }

    #[test]
    fn missing_required_column_names_it() {
        let err = SurveySchema::from_headers(&headers(&[
            "RecipientLastName",
            "RecipientFirstName",
            "Team",
            "Team Member 1",
            "Q2_2_1",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("'RecipientEmail'"));
    }

    #[test]
    fn rejects_export_without_teammate_ratings() {
        let err = SurveySchema::from_headers(&headers(&[
            "RecipientLastName",
            "RecipientFirstName",
            "RecipientEmail",
            "Team",
            "Team Member 1",
            "Q2_1_1",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("teammate rating columns"));
    }

    #[test]
    fn preamble_requires_import_metadata() {
        let good = StringRecord::from(vec![r#"{"ImportId":"recipientEmail"}"#]);
        assert!(check_export_preamble(&good).is_ok());

        let bad = StringRecord::from(vec!["jane@example.edu", "alpha"]);
        assert!(check_export_preamble(&bad).is_err());
    }
}
