use std::collections::HashMap;

/// Number of Likert-scale questions asked about each rated person.
pub const LIKERT_QUESTIONS: usize = 5;

/// Rating positions in the survey matrix. Position 1 is the respondent
/// themselves, positions 2..=4 are "Team Member 1" through "Team Member 3".
pub const MAX_POSITIONS: usize = 4;

#[derive(Debug, Clone)]
pub struct RosterStudent {
    pub name: String,
    pub email: String,
    pub team: String,
}

/// One survey row, fully decoded. The teammate-to-position map is built once
/// when the row is parsed so scoring never re-scans raw cells.
#[derive(Debug, Clone)]
pub struct SurveyResponse {
    pub respondent_email: String,
    pub team: String,
    /// Maps a teammate's email to the matrix position the respondent rated
    /// them under (2..=4).
    pub teammate_positions: HashMap<String, usize>,
    /// `likert[p - 1][q]` is the rating given to position `p` on Likert
    /// question `q + 1`. Unparseable or absent cells are `None`.
    pub likert: [[Option<f64>; LIKERT_QUESTIONS]; MAX_POSITIONS],
    /// `allocation[p - 1]` is the points the respondent allocated to
    /// position `p` out of their 100-point budget.
    pub allocation: [Option<f64>; MAX_POSITIONS],
}

impl SurveyResponse {
    /// Ratings this respondent gave to `email`, or `None` if the respondent
    /// never named that student in a teammate slot. Contact lists can carry
    /// more "Team Member" columns than the rating matrix has positions; a
    /// teammate named past the matrix is missing data, same as an unnamed
    /// one.
    pub fn ratings_for(
        &self,
        email: &str,
    ) -> Option<(&[Option<f64>; LIKERT_QUESTIONS], Option<f64>)> {
        let position = *self.teammate_positions.get(email)?;
        let ratings = self.likert.get(position - 1)?;
        let allocation = *self.allocation.get(position - 1)?;
        Some((ratings, allocation))
    }
}

/// Everything one roster student received from teammates, accumulated into a
/// fresh record during the aggregation pass.
#[derive(Debug, Clone)]
pub struct StudentAggregate {
    pub name: String,
    pub email: String,
    pub team: String,
    pub team_size: usize,
    /// One bucket per Likert question holding every non-missing rating
    /// received.
    pub likert: [Vec<f64>; LIKERT_QUESTIONS],
    /// Non-missing allocation points received.
    pub allocations: Vec<f64>,
    /// Teammate survey rows examined, whether or not they named this student.
    pub rater_count: usize,
}

#[derive(Debug, Clone)]
pub struct StudentScore {
    pub name: String,
    pub email: String,
    pub team: String,
    pub team_size: usize,
    /// Teammate survey rows examined for this student.
    pub rater_count: usize,
    pub likert_means: [Option<f64>; LIKERT_QUESTIONS],
    pub likert_normalized: [Option<f64>; LIKERT_QUESTIONS],
    pub allocation_mean: Option<f64>,
    pub allocation_scaled: Option<f64>,
    pub allocation_curved: Option<f64>,
    /// Composite peer evaluation score, `None` when any component is missing.
    pub score: Option<f64>,
}
