use std::io;

use crate::models::RosterStudent;

/// One survey contact: the student plus their teammates' emails in roster
/// order, self excluded.
#[derive(Debug, Clone)]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub team: String,
    pub teammates: Vec<String>,
}

/// Splits a Canvas "Last, First" name. A name without a comma yields two
/// empty parts, matching how the original contact lists were built.
pub fn split_name(name: &str) -> (String, String) {
    match name.split_once(',') {
        Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
        None => (String::new(), String::new()),
    }
}

pub fn build_contacts(roster: &[RosterStudent]) -> Vec<Contact> {
    roster
        .iter()
        .map(|student| {
            let (last_name, first_name) = split_name(&student.name);
            let teammates = roster
                .iter()
                .filter(|other| other.team == student.team && other.email != student.email)
                .map(|other| other.email.clone())
                .collect();
            Contact {
                email: student.email.clone(),
                first_name,
                last_name,
                team: student.team.clone(),
                teammates,
            }
        })
        .collect()
}

/// Writes the contact list with one "Team Member {i}" column per possible
/// teammate; smaller teams leave their trailing columns empty.
pub fn write_contacts<W: io::Write>(output: W, contacts: &[Contact]) -> anyhow::Result<()> {
    let max_teammates = contacts.iter().map(|c| c.teammates.len()).max().unwrap_or(0);

    let mut writer = csv::Writer::from_writer(output);
    let mut headers = vec![
        "Email".to_string(),
        "First Name".to_string(),
        "Last Name".to_string(),
        "Team".to_string(),
    ];
    for i in 1..=max_teammates {
        headers.push(format!("Team Member {i}"));
    }
    writer.write_record(&headers)?;

    for contact in contacts {
        let mut record = vec![
            contact.email.clone(),
            contact.first_name.clone(),
            contact.last_name.clone(),
            contact.team.clone(),
        ];
        record.extend(contact.teammates.iter().cloned());
        record.resize(headers.len(), String::new());
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(name: &str, email: &str, team: &str) -> RosterStudent {
        RosterStudent {
            name: name.to_string(),
            email: email.to_string(),
            team: team.to_string(),
        }
    }

    #[test]
    fn splits_canvas_names() {
        assert_eq!(
            split_name("Lee, Avery"),
            ("Lee".to_string(), "Avery".to_string())
        );
        assert_eq!(split_name("Cher"), (String::new(), String::new()));
    }

    #[test]
    fn teammates_exclude_self_and_keep_roster_order() {
        let roster = vec![
            student("Lee, Avery", "avery@example.edu", "alpha"),
            student("Moreno, Jules", "jules@example.edu", "alpha"),
            student("Patel, Kiara", "kiara@example.edu", "alpha"),
            student("Okafor, Sam", "sam@example.edu", "beta"),
        ];
        let contacts = build_contacts(&roster);

        assert_eq!(
            contacts[1].teammates,
            vec!["avery@example.edu", "kiara@example.edu"]
        );
        assert!(contacts[3].teammates.is_empty());
    }

    #[test]
    fn pads_columns_to_the_largest_team() {
        let roster = vec![
            student("Lee, Avery", "avery@example.edu", "alpha"),
            student("Moreno, Jules", "jules@example.edu", "alpha"),
            student("Patel, Kiara", "kiara@example.edu", "alpha"),
            student("Okafor, Sam", "sam@example.edu", "beta"),
        ];
        let contacts = build_contacts(&roster);

        let mut buffer = Vec::new();
        write_contacts(&mut buffer, &contacts).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Email,First Name,Last Name,Team,Team Member 1,Team Member 2"
        );
        assert_eq!(
            lines.next().unwrap(),
            "avery@example.edu,Avery,Lee,alpha,jules@example.edu,kiara@example.edu"
        );
        // Sam's team of one leaves both teammate columns empty.
        assert_eq!(lines.nth(2).unwrap(), "sam@example.edu,Sam,Okafor,beta,,");
    }
}
