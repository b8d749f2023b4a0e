use std::collections::HashMap;

use anyhow::bail;
use clap::ValueEnum;

use crate::models::{
    RosterStudent, StudentAggregate, StudentScore, SurveyResponse, LIKERT_QUESTIONS,
};

/// Status marker written for roster students whose score could not be
/// computed from the survey.
pub const NO_SUBMISSION_MARKER: &str = "**NO SUBMISSION**";

/// How the composite score is expressed. Two formats are in circulation and
/// they are intentionally kept as separate, named policies:
/// `Scale100` stays on the 0-100 band for direct gradebook entry, while
/// `Multiplier` divides by 100 and adds 0.05, producing the ~0-1 factor that
/// the `apply` subcommand multiplies assignment points by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScoreFormula {
    #[value(name = "scale100")]
    Scale100,
    #[value(name = "multiplier")]
    Multiplier,
}

#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub formula: ScoreFormula,
    pub likert_slope: f64,
    pub likert_offset: f64,
    pub allocation_divisor: f64,
    pub allocation_floor: f64,
    pub allocation_ceiling: f64,
    pub curve_intercept: f64,
    pub curve_linear: f64,
    pub curve_quadratic: f64,
    /// Score assigned to students with no usable peer evaluations.
    pub default_score: f64,
}

impl ScoreConfig {
    pub fn for_formula(formula: ScoreFormula) -> Self {
        Self {
            formula,
            likert_slope: 10.0,
            likert_offset: 50.0,
            allocation_divisor: 5.0,
            allocation_floor: 10.0,
            allocation_ceiling: 40.0,
            // Calibration fitted against past semesters; opaque constants.
            curve_intercept: 0.65,
            curve_linear: 0.0225,
            curve_quadratic: -0.00025,
            default_score: match formula {
                ScoreFormula::Scale100 => 60.0,
                ScoreFormula::Multiplier => 0.6,
            },
        }
    }
}

/// Collects every rating each roster student received from teammates.
/// Roster-driven: students appear in the result even when nobody rated them.
pub fn aggregate(
    roster: &[RosterStudent],
    responses: &[SurveyResponse],
    team_sizes: &HashMap<String, usize>,
) -> anyhow::Result<Vec<StudentAggregate>> {
    let mut aggregates = Vec::with_capacity(roster.len());

    for student in roster {
        let Some(&team_size) = team_sizes.get(&student.team) else {
            bail!(
                "student {} belongs to team '{}' which has no known size",
                student.email,
                student.team
            );
        };

        let mut likert: [Vec<f64>; LIKERT_QUESTIONS] = std::array::from_fn(|_| Vec::new());
        let mut allocations = Vec::new();
        let mut rater_count = 0;

        for response in responses {
            if response.team != student.team || response.respondent_email == student.email {
                continue;
            }
            rater_count += 1;
            let Some((ratings, allocation)) = response.ratings_for(&student.email) else {
                // The respondent never named this student in a slot; their
                // contribution is missing, not zero.
                continue;
            };
            for (question, rating) in ratings.iter().enumerate() {
                if let Some(value) = rating {
                    likert[question].push(*value);
                }
            }
            if let Some(points) = allocation {
                allocations.push(points);
            }
        }

        aggregates.push(StudentAggregate {
            name: student.name.clone(),
            email: student.email.clone(),
            team: student.team.clone(),
            team_size,
            likert,
            allocations,
            rater_count,
        });
    }

    Ok(aggregates)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Maps a 1-5 Likert mean onto the 60-100 band: `m * 10 + 50`. Affine and
/// unclamped.
pub fn normalize_likert(mean: f64, config: &ScoreConfig) -> f64 {
    mean * config.likert_slope + config.likert_offset
}

/// Clamps the scaled-down allocation value into [floor, ceiling] and runs it
/// through the quadratic curve. The curve itself is not bounded: the
/// ceiling maps above 100 on purpose.
pub fn curve_allocation(value: f64, config: &ScoreConfig) -> f64 {
    let clamped = value.clamp(config.allocation_floor, config.allocation_ceiling);
    (config.curve_intercept
        + config.curve_linear * clamped
        + config.curve_quadratic * clamped * clamped)
        * 100.0
}

/// Turns one aggregate into final scores. The composite averages the first
/// four normalized Likert questions with the curved allocation score; the
/// fifth question ("work with this person again") is reported but not
/// graded.
pub fn score_student(aggregate: &StudentAggregate, config: &ScoreConfig) -> StudentScore {
    let likert_means: [Option<f64>; LIKERT_QUESTIONS] =
        std::array::from_fn(|question| mean(&aggregate.likert[question]));
    let likert_normalized = likert_means.map(|m| m.map(|m| normalize_likert(m, config)));

    let allocation_mean = mean(&aggregate.allocations);
    let allocation_scaled = allocation_mean.map(|m| m * aggregate.team_size as f64);
    let allocation_curved =
        allocation_scaled.map(|s| curve_allocation(s / config.allocation_divisor, config));

    let score = composite(&likert_normalized, allocation_curved, config)
        .map(|s| (s * 100.0).round() / 100.0);

    StudentScore {
        name: aggregate.name.clone(),
        email: aggregate.email.clone(),
        team: aggregate.team.clone(),
        team_size: aggregate.team_size,
        rater_count: aggregate.rater_count,
        likert_means,
        likert_normalized,
        allocation_mean,
        allocation_scaled,
        allocation_curved,
        score,
    }
}

fn composite(
    likert_normalized: &[Option<f64>; LIKERT_QUESTIONS],
    allocation_curved: Option<f64>,
    config: &ScoreConfig,
) -> Option<f64> {
    let mut total = 0.0;
    for normalized in &likert_normalized[..4] {
        total += (*normalized)?;
    }
    total += allocation_curved?;
    let averaged = total / 5.0;

    Some(match config.formula {
        ScoreFormula::Scale100 => averaged,
        ScoreFormula::Multiplier => averaged / 100.0 + 0.05,
    })
}
