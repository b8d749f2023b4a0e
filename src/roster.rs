use std::collections::HashMap;
use std::io;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::models::RosterStudent;

/// Canvas team export row. Extra export columns (canvas_user_id, sections,
/// group_id, ...) are ignored.
#[derive(Debug, Deserialize)]
struct RosterRow {
    name: String,
    login_id: String,
    group_name: String,
}

pub fn load_roster(path: &Path) -> anyhow::Result<Vec<RosterStudent>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open roster {}", path.display()))?;
    let students = parse_roster(file)
        .with_context(|| format!("failed to read roster {}", path.display()))?;
    if students.is_empty() {
        bail!("roster {} contains no students", path.display());
    }
    Ok(students)
}

pub fn parse_roster<R: io::Read>(input: R) -> anyhow::Result<Vec<RosterStudent>> {
    let mut reader = csv::Reader::from_reader(input);
    let mut students = Vec::new();

    for result in reader.deserialize::<RosterRow>() {
        let row = result.context(
            "roster must be a Canvas team export with 'name', 'login_id' and 'group_name' columns",
        )?;
        let email = row.login_id.trim();
        if email.is_empty() {
            continue;
        }
        let team = row.group_name.trim();
        if team.is_empty() {
            bail!("student {} ({}) has no team assignment", row.name, email);
        }
        students.push(RosterStudent {
            name: row.name.trim().to_string(),
            email: email.to_string(),
            team: team.to_string(),
        });
    }

    Ok(students)
}

pub fn team_sizes(students: &[RosterStudent]) -> HashMap<String, usize> {
    let mut sizes = HashMap::new();
    for student in students {
        *sizes.entry(student.team.clone()).or_insert(0) += 1;
    }
    sizes
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &str = "\
name,canvas_user_id,login_id,sections,group_name
\"Lee, Avery\",101,avery@example.edu,CS101,alpha
\"Moreno, Jules\",102,jules@example.edu,CS101,alpha
\"Patel, Kiara\",103,kiara@example.edu,CS101,beta
";

    #[test]
    fn parses_canvas_export_and_counts_teams() {
        let students = parse_roster(ROSTER.as_bytes()).unwrap();
        assert_eq!(students.len(), 3);
        assert_eq!(students[0].name, "Lee, Avery");
        assert_eq!(students[0].email, "avery@example.edu");
        assert_eq!(students[0].team, "alpha");

        let sizes = team_sizes(&students);
        assert_eq!(sizes["alpha"], 2);
        assert_eq!(sizes["beta"], 1);
    }

    #[test]
    fn skips_rows_without_an_email() {
        let csv = "name,login_id,group_name\n\"Lee, Avery\",,alpha\n\"Moreno, Jules\",jules@example.edu,alpha\n";
        let students = parse_roster(csv.as_bytes()).unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].email, "jules@example.edu");
    }

    #[test]
    fn missing_team_is_fatal() {
        let csv = "name,login_id,group_name\n\"Lee, Avery\",avery@example.edu,\n";
        let err = parse_roster(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("no team assignment"));
    }

    #[test]
    fn missing_columns_report_the_expected_layout() {
        let csv = "full_name,email\n\"Lee, Avery\",avery@example.edu\n";
        let err = parse_roster(csv.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("Canvas team export"));
    }
}
