use std::io;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::StudentScore;
use crate::scoring::{ScoreConfig, NO_SUBMISSION_MARKER};

/// One row of the score table. Field names double as the CSV header, so a
/// written table reads back unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "TeamSize")]
    pub team_size: usize,
    #[serde(rename = "Raters")]
    pub raters: usize,
    #[serde(rename = "QuantityMean")]
    pub quantity_mean: Option<f64>,
    #[serde(rename = "QualityMean")]
    pub quality_mean: Option<f64>,
    #[serde(rename = "AttitudeMean")]
    pub attitude_mean: Option<f64>,
    #[serde(rename = "TechnicalMean")]
    pub technical_mean: Option<f64>,
    #[serde(rename = "WorkAgainMean")]
    pub work_again_mean: Option<f64>,
    #[serde(rename = "Quantity")]
    pub quantity: Option<f64>,
    #[serde(rename = "Quality")]
    pub quality: Option<f64>,
    #[serde(rename = "Attitude")]
    pub attitude: Option<f64>,
    #[serde(rename = "Technical")]
    pub technical: Option<f64>,
    #[serde(rename = "WorkAgain")]
    pub work_again: Option<f64>,
    #[serde(rename = "AllocationMean")]
    pub allocation_mean: Option<f64>,
    #[serde(rename = "AllocationScaled")]
    pub allocation_scaled: Option<f64>,
    #[serde(rename = "AllocationCurved")]
    pub allocation_curved: Option<f64>,
    #[serde(rename = "PeerEvaluationScore")]
    pub score: f64,
    #[serde(rename = "Status")]
    pub status: String,
}

impl ScoreRow {
    /// Non-submitters keep their row: they get the formula's default score
    /// and the no-submission marker instead of being dropped.
    pub fn from_score(score: &StudentScore, config: &ScoreConfig) -> Self {
        let status = if score.score.is_none() {
            NO_SUBMISSION_MARKER.to_string()
        } else {
            String::new()
        };
        Self {
            name: score.name.clone(),
            email: score.email.clone(),
            team: score.team.clone(),
            team_size: score.team_size,
            raters: score.rater_count,
            quantity_mean: score.likert_means[0],
            quality_mean: score.likert_means[1],
            attitude_mean: score.likert_means[2],
            technical_mean: score.likert_means[3],
            work_again_mean: score.likert_means[4],
            quantity: score.likert_normalized[0],
            quality: score.likert_normalized[1],
            attitude: score.likert_normalized[2],
            technical: score.likert_normalized[3],
            work_again: score.likert_normalized[4],
            allocation_mean: score.allocation_mean,
            allocation_scaled: score.allocation_scaled,
            allocation_curved: score.allocation_curved,
            score: score.score.unwrap_or(config.default_score),
            status,
        }
    }

    pub fn submitted(&self) -> bool {
        self.status.is_empty()
    }
}

pub fn write_scores<W: io::Write>(output: W, rows: &[ScoreRow]) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_writer(output);
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_scores<R: io::Read>(input: R) -> anyhow::Result<Vec<ScoreRow>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut rows = Vec::new();
    for result in reader.deserialize::<ScoreRow>() {
        rows.push(result.context("score table has an unexpected layout")?);
    }
    Ok(rows)
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

/// Summary statistics over the graded scores, `None` when nobody was graded.
pub fn summarize(scores: &[f64]) -> Option<ScoreSummary> {
    if scores.is_empty() {
        return None;
    }
    let count = scores.len();
    let mean = scores.iter().sum::<f64>() / count as f64;

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    // Sample standard deviation; zero for a single score.
    let std_dev = if count > 1 {
        let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
        variance.sqrt()
    } else {
        0.0
    };

    Some(ScoreSummary {
        count,
        mean,
        median,
        std_dev,
        min: sorted[0],
        max: sorted[count - 1],
    })
}
