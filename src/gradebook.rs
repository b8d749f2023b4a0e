use std::collections::HashMap;
use std::io;

use anyhow::anyhow;

/// Canvas gradebook column holding student emails.
pub const SIS_LOGIN_COLUMN: &str = "SIS Login ID";
/// Substring identifying the peer evaluation column; the Canvas export
/// suffixes it with an assignment id that varies per course.
pub const PEER_EVAL_COLUMN: &str = "Project Peer-Evaluation";
/// Column created when the gradebook has no peer evaluation column yet.
pub const NEW_PEER_EVAL_COLUMN: &str = "Project Peer-Evaluation (10042163)";

/// Copies a Canvas gradebook, filling the peer evaluation column from
/// `scores` (keyed by email) and `default_score` for student rows without a
/// score. Canvas metadata rows ("Points Possible" and friends) have no email
/// in the SIS column and pass through untouched.
pub fn merge_scores<R: io::Read, W: io::Write>(
    input: R,
    output: W,
    scores: &HashMap<String, f64>,
    default_score: f64,
) -> anyhow::Result<()> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let sis_column = find_column(&headers, |h| h == SIS_LOGIN_COLUMN)
        .ok_or_else(|| anyhow!("gradebook has no '{SIS_LOGIN_COLUMN}' column"))?;
    let eval_column = match find_column(&headers, |h| h.contains(PEER_EVAL_COLUMN)) {
        Some(column) => column,
        None => {
            headers.push(NEW_PEER_EVAL_COLUMN.to_string());
            headers.len() - 1
        }
    };

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&headers)?;

    for record in reader.records() {
        let record = record?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(headers.len(), String::new());

        let login = cells[sis_column].trim().to_string();
        if login.contains('@') {
            let value = scores.get(&login).copied().unwrap_or(default_score);
            cells[eval_column] = format!("{value:.2}");
        }
        writer.write_record(&cells)?;
    }

    writer.flush()?;
    Ok(())
}

/// Scales the `CP-Assignment#{assignment_number}` column by each student's
/// peer evaluation multiplier. The first two data rows are Canvas metadata
/// and are copied as-is, as are cells that do not parse as numbers. Returns
/// how many cells were rescaled.
pub fn apply_multiplier<R: io::Read, W: io::Write>(
    input: R,
    output: W,
    multipliers: &HashMap<String, f64>,
    assignment_number: u32,
) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let needle = format!("CP-Assignment#{assignment_number}");
    let assignment_column = find_column(&headers, |h| h.contains(&needle))
        .ok_or_else(|| anyhow!("gradebook has no column matching '{needle}'"))?;
    let sis_column = find_column(&headers, |h| h == SIS_LOGIN_COLUMN)
        .ok_or_else(|| anyhow!("gradebook has no '{SIS_LOGIN_COLUMN}' column"))?;

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&headers)?;

    let mut updated = 0;
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let mut cells: Vec<String> = record.iter().map(str::to_string).collect();
        cells.resize(headers.len(), String::new());

        if index >= 2 {
            let login = cells[sis_column].trim();
            // Students absent from the multiplier table earn nothing, same
            // as submitting no peer evaluation at all in this variant.
            let multiplier = multipliers.get(login).copied().unwrap_or(0.0);
            if let Ok(points) = cells[assignment_column].trim().parse::<f64>() {
                let scaled = points * multiplier;
                cells[assignment_column] = format!("{:.2}", (scaled * 100.0).round() / 100.0);
                updated += 1;
            }
        }

        writer.write_record(&cells)?;
    }

    writer.flush()?;
    Ok(updated)
}

fn find_column(headers: &[String], predicate: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| predicate(h))
}

#[cfg(test)]
mod tests {
    use super::*;

    const GRADEBOOK: &str = "\
Student,ID,SIS Login ID,Section,Assignment 1
Points Possible,,,,100
\"Lee, Avery\",101,avery@example.edu,CS101,95
\"Moreno, Jules\",102,jules@example.edu,CS101,88
";

    fn run_merge(input: &str, scores: &HashMap<String, f64>) -> Vec<Vec<String>> {
        let mut buffer = Vec::new();
        merge_scores(input.as_bytes(), &mut buffer, scores, 60.0).unwrap();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(buffer.as_slice());
        reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn creates_the_peer_eval_column_and_fills_defaults() {
        let mut scores = HashMap::new();
        scores.insert("avery@example.edu".to_string(), 93.97);
        let rows = run_merge(GRADEBOOK, &scores);

        assert_eq!(rows[0].last().unwrap(), NEW_PEER_EVAL_COLUMN);
        // Metadata row is untouched.
        assert_eq!(rows[1].last().unwrap(), "");
        assert_eq!(rows[2].last().unwrap(), "93.97");
        // Jules has no score: the default applies.
        assert_eq!(rows[3].last().unwrap(), "60.00");
    }

    #[test]
    fn reuses_an_existing_peer_eval_column() {
        let gradebook = "\
Student,SIS Login ID,Project Peer-Evaluation (555),Assignment 1
\"Lee, Avery\",avery@example.edu,,95
";
        let mut scores = HashMap::new();
        scores.insert("avery@example.edu".to_string(), 88.5);
        let rows = run_merge(gradebook, &scores);

        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[1][2], "88.50");
    }

    #[test]
    fn missing_sis_column_is_fatal() {
        let gradebook = "Student,Assignment 1\n\"Lee, Avery\",95\n";
        let err = merge_scores(gradebook.as_bytes(), Vec::new(), &HashMap::new(), 60.0)
            .unwrap_err();
        assert!(err.to_string().contains(SIS_LOGIN_COLUMN));
    }

    const ASSIGNMENT_BOOK: &str = "\
Student,SIS Login ID,CP-Assignment#3 (900123)
Points Possible,,100
Test Student,,0
\"Lee, Avery\",avery@example.edu,80
\"Moreno, Jules\",jules@example.edu,not-a-number
\"Patel, Kiara\",kiara@example.edu,90
";

    #[test]
    fn scales_assignment_points_past_the_preamble() {
        let mut multipliers = HashMap::new();
        multipliers.insert("avery@example.edu".to_string(), 1.05);
        multipliers.insert("jules@example.edu".to_string(), 0.9);
        multipliers.insert("kiara@example.edu".to_string(), 0.6);

        let mut buffer = Vec::new();
        let updated = apply_multiplier(
            ASSIGNMENT_BOOK.as_bytes(),
            &mut buffer,
            &multipliers,
            3,
        )
        .unwrap();
        assert_eq!(updated, 2);

        let text = String::from_utf8(buffer).unwrap();
        let rows: Vec<&str> = text.lines().collect();
        // The two Canvas preamble rows pass through unchanged.
        assert!(rows[1].ends_with("100"));
        assert!(rows[2].ends_with("0"));
        assert!(rows[3].ends_with("84.00"));
        // Unparseable points are copied through, not fatal.
        assert!(rows[4].ends_with("not-a-number"));
        assert!(rows[5].ends_with("54.00"));
    }

    #[test]
    fn missing_assignment_column_is_fatal() {
        let err = apply_multiplier(ASSIGNMENT_BOOK.as_bytes(), Vec::new(), &HashMap::new(), 7)
            .unwrap_err();
        assert!(err.to_string().contains("CP-Assignment#7"));
    }
}
