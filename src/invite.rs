use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use reqwest::StatusCode;
use serde_json::{json, Value};

/// Canvas export column holding student emails.
pub const EMAIL_COLUMN: &str = "SIS Login ID";

/// Pause between invitation calls so the GitHub rate limiter is never
/// tripped. Sequential pacing only; there is no retry policy.
const PACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteOutcome {
    Invited,
    AlreadyMember,
    Rejected,
}

#[derive(Debug, Default)]
pub struct InviteSummary {
    pub total: usize,
    pub invited: usize,
    pub already_members: usize,
    pub errors: usize,
}

/// Reads a CSV into its header row and records, so the caller can fall back
/// to prompting for the email column when the expected one is missing.
pub fn load_table(path: &Path) -> anyhow::Result<(Vec<String>, Vec<csv::StringRecord>)> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader.headers()?.iter().map(str::to_string).collect();
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?);
    }
    Ok((headers, records))
}

/// Nonempty values of `column` that look like email addresses. Header echoes
/// and stray placeholders never contain '@' and drop out here.
pub fn emails_in_column(
    headers: &[String],
    records: &[csv::StringRecord],
    column: &str,
) -> Vec<String> {
    let Some(index) = headers.iter().position(|h| h == column) else {
        return Vec::new();
    };
    records
        .iter()
        .filter_map(|record| record.get(index))
        .map(str::trim)
        .filter(|value| !value.is_empty() && value.contains('@'))
        .map(str::to_string)
        .collect()
}

/// Checks an authentication response, returning the authenticated login. A
/// bad credential must abort before the invitation loop starts, not fail
/// once per student.
pub fn auth_login(status: StatusCode, body: &Value) -> anyhow::Result<String> {
    if !status.is_success() {
        bail!("GitHub authentication failed (HTTP {status}); check GITHUB_TOKEN");
    }
    Ok(body
        .get("login")
        .and_then(Value::as_str)
        .unwrap_or("unknown")
        .to_string())
}

/// Verifies the token with a single `GET /user` call before any invitations
/// are sent.
pub async fn verify_token(client: &reqwest::Client, token: &str) -> anyhow::Result<String> {
    let response = client
        .get("https://api.github.com/user")
        .header("Authorization", format!("token {token}"))
        .header("Accept", "application/vnd.github.v3+json")
        .header("User-Agent", "course-admin-toolkit")
        .send()
        .await
        .context("failed to reach the GitHub API")?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    auth_login(status, &body)
}

/// Maps one GitHub invitation response to an outcome plus a printable
/// detail. A 422 means the invitation was rejected, which is only benign
/// when GitHub says the user is already invited or a member.
pub fn classify(status: StatusCode, body: &Value) -> (InviteOutcome, String) {
    match status {
        StatusCode::CREATED => (InviteOutcome::Invited, "invited successfully".to_string()),
        StatusCode::UNPROCESSABLE_ENTITY => {
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let errors = body.get("errors").and_then(Value::as_array);
            let already = message.to_lowercase().contains("already")
                || errors.is_some_and(|errs| {
                    errs.iter()
                        .any(|e| e.to_string().to_lowercase().contains("already"))
                });
            if already {
                (
                    InviteOutcome::AlreadyMember,
                    "already invited or a member".to_string(),
                )
            } else {
                let detail = errors
                    .and_then(|errs| errs.first())
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or(message);
                (InviteOutcome::Rejected, detail.to_string())
            }
        }
        StatusCode::NOT_FOUND => (
            InviteOutcome::Rejected,
            "organization not found or insufficient permissions".to_string(),
        ),
        StatusCode::FORBIDDEN => (
            InviteOutcome::Rejected,
            "forbidden: check token permissions".to_string(),
        ),
        other => {
            let detail = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {other}"));
            (InviteOutcome::Rejected, detail)
        }
    }
}

/// Invites every email to the organization, one paced call at a time. A
/// failed call is counted and logged; the loop always proceeds to the next
/// email. In dry-run mode no call is made and each email counts as invited.
pub async fn invite_all(
    client: &reqwest::Client,
    org: &str,
    token: &str,
    emails: &[String],
    dry_run: bool,
) -> anyhow::Result<InviteSummary> {
    let url = format!("https://api.github.com/orgs/{org}/invitations");
    let total = emails.len();
    let mut summary = InviteSummary {
        total,
        ..InviteSummary::default()
    };

    println!(
        "\n{}Inviting {total} users to {org}...\n",
        if dry_run { "[DRY RUN] " } else { "" }
    );

    for (i, email) in emails.iter().enumerate() {
        let ordinal = i + 1;
        if dry_run {
            println!("  [{ordinal}/{total}] {email} - would invite");
            summary.invited += 1;
            continue;
        }

        let response = client
            .post(&url)
            .header("Authorization", format!("token {token}"))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "course-admin-toolkit")
            .json(&json!({ "email": email, "role": "direct_member" }))
            .send()
            .await;

        match response {
            Ok(response) => {
                let status = response.status();
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let (outcome, detail) = classify(status, &body);
                println!("  [{ordinal}/{total}] {email} - {detail}");
                match outcome {
                    InviteOutcome::Invited => summary.invited += 1,
                    InviteOutcome::AlreadyMember => summary.already_members += 1,
                    InviteOutcome::Rejected => summary.errors += 1,
                }
            }
            Err(err) => {
                println!("  [{ordinal}/{total}] {email} - network error: {err}");
                summary.errors += 1;
            }
        }

        tokio::time::sleep(PACE).await;
    }

    Ok(summary)
}

pub fn print_summary(summary: &InviteSummary, dry_run: bool) {
    println!("\n{}", "=".repeat(60));
    println!("{}Summary:", if dry_run { "DRY RUN " } else { "" });
    println!("  Total processed: {}", summary.total);
    println!(
        "  {}: {}",
        if dry_run {
            "Would invite"
        } else {
            "Successfully invited"
        },
        summary.invited
    );
    println!("  Already members/invited: {}", summary.already_members);
    println!("  Errors: {}", summary.errors);
    println!("{}\n", "=".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_accepts_success_and_reports_the_login() {
        let body = json!({ "login": "octocat" });
        assert_eq!(auth_login(StatusCode::OK, &body).unwrap(), "octocat");
    }

    #[test]
    fn auth_rejects_bad_credentials_up_front() {
        let body = json!({ "message": "Bad credentials" });
        let err = auth_login(StatusCode::UNAUTHORIZED, &body).unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert!(err.to_string().contains("GITHUB_TOKEN"));
    }

    #[test]
    fn created_is_invited() {
        let (outcome, _) = classify(StatusCode::CREATED, &Value::Null);
        assert_eq!(outcome, InviteOutcome::Invited);
    }

    #[test]
    fn unprocessable_with_already_is_benign() {
        let body = json!({
            "message": "Validation Failed",
            "errors": [{ "message": "Invitee is already a part of this org" }]
        });
        let (outcome, _) = classify(StatusCode::UNPROCESSABLE_ENTITY, &body);
        assert_eq!(outcome, InviteOutcome::AlreadyMember);
    }

    #[test]
    fn unprocessable_without_already_is_rejected_with_detail() {
        let body = json!({
            "message": "Validation Failed",
            "errors": [{ "message": "email is not a valid email address" }]
        });
        let (outcome, detail) = classify(StatusCode::UNPROCESSABLE_ENTITY, &body);
        assert_eq!(outcome, InviteOutcome::Rejected);
        assert_eq!(detail, "email is not a valid email address");
    }

    #[test]
    fn not_found_and_forbidden_are_rejected() {
        let (outcome, detail) = classify(StatusCode::NOT_FOUND, &Value::Null);
        assert_eq!(outcome, InviteOutcome::Rejected);
        assert!(detail.contains("not found"));

        let (outcome, detail) = classify(StatusCode::FORBIDDEN, &Value::Null);
        assert_eq!(outcome, InviteOutcome::Rejected);
        assert!(detail.contains("token permissions"));
    }

    #[test]
    fn other_statuses_fall_back_to_the_status_code() {
        let (outcome, detail) = classify(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null);
        assert_eq!(outcome, InviteOutcome::Rejected);
        assert!(detail.contains("500"));
    }

    #[test]
    fn extracts_emails_and_drops_noise() {
        let headers = vec!["Student".to_string(), EMAIL_COLUMN.to_string()];
        let records = vec![
            csv::StringRecord::from(vec!["Points Possible", ""]),
            csv::StringRecord::from(vec!["Lee, Avery", " avery@example.edu "]),
            csv::StringRecord::from(vec!["Test Student", "nan"]),
            csv::StringRecord::from(vec!["Moreno, Jules", "jules@example.edu"]),
        ];
        let emails = emails_in_column(&headers, &records, EMAIL_COLUMN);
        assert_eq!(emails, vec!["avery@example.edu", "jules@example.edu"]);
    }

    #[test]
    fn unknown_column_yields_no_emails() {
        let headers = vec!["Student".to_string()];
        assert!(emails_in_column(&headers, &[], "Email").is_empty());
    }
}
