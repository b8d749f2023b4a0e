use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};

mod chart;
mod contacts;
mod gradebook;
mod invite;
mod models;
mod report;
mod roster;
mod schema;
mod scoring;
mod survey;

use report::ScoreRow;
use scoring::{ScoreConfig, ScoreFormula};

#[derive(Parser)]
#[command(name = "course-admin-toolkit")]
#[command(about = "Course administration utilities: peer evaluation grading, survey contacts, GitHub invitations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calculate peer evaluation scores from a survey export
    Score {
        /// Canvas team export (name, login_id, group_name)
        roster: PathBuf,
        /// Qualtrics peer evaluation survey export
        survey: PathBuf,
        /// Canvas gradebook to merge scores into
        gradebook: PathBuf,
        /// Output path for the score table
        output: PathBuf,
        /// Output path for the updated gradebook
        gradebook_output: PathBuf,
        /// Output path for the score distribution chart
        #[arg(long, default_value = "peer_evaluation_distribution.png")]
        plot_output: PathBuf,
        /// Which composite score variant to produce
        #[arg(long, value_enum, default_value = "scale100")]
        formula: ScoreFormula,
    },
    /// Generate a survey contact list from a Canvas team export
    Contacts {
        input: PathBuf,
        output: PathBuf,
    },
    /// Scale an assignment column by peer evaluation multipliers
    Apply {
        /// Gradebook CSV to rescale
        #[arg(long)]
        input: PathBuf,
        /// Score table produced by `score --formula multiplier`
        #[arg(long)]
        multiplier_score: PathBuf,
        /// Assignment number, matched against CP-Assignment#N columns
        #[arg(long)]
        assignment_number: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Invite students from a Canvas export to a GitHub organization
    Invite {
        /// Canvas export with a SIS Login ID column
        csv: PathBuf,
        /// Log what would happen without calling the GitHub API
        #[arg(long, short = 'n')]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Commands::Score {
            roster,
            survey,
            gradebook,
            output,
            gradebook_output,
            plot_output,
            formula,
        } => run_score(
            &roster,
            &survey,
            &gradebook,
            &output,
            &gradebook_output,
            &plot_output,
            formula,
        ),
        Commands::Contacts { input, output } => run_contacts(&input, &output),
        Commands::Apply {
            input,
            multiplier_score,
            assignment_number,
            output,
        } => run_apply(&input, &multiplier_score, assignment_number, &output),
        Commands::Invite { csv, dry_run } => run_invite(&csv, dry_run).await,
    }
}

#[allow(clippy::too_many_arguments)]
fn run_score(
    roster_path: &Path,
    survey_path: &Path,
    gradebook_path: &Path,
    output_path: &Path,
    gradebook_output_path: &Path,
    plot_output_path: &Path,
    formula: ScoreFormula,
) -> anyhow::Result<()> {
    let config = ScoreConfig::for_formula(formula);

    let roster = roster::load_roster(roster_path)?;
    let sizes = roster::team_sizes(&roster);
    let responses = survey::load_survey(survey_path)?;
    println!(
        "Loaded {} students across {} teams and {} survey responses.",
        roster.len(),
        sizes.len(),
        responses.len()
    );

    let aggregates = scoring::aggregate(&roster, &responses, &sizes)?;
    let rows: Vec<ScoreRow> = aggregates
        .iter()
        .map(|aggregate| ScoreRow::from_score(&scoring::score_student(aggregate, &config), &config))
        .collect();

    let output_file = std::fs::File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    report::write_scores(output_file, &rows)?;
    println!("Peer review grades saved to {}.", output_path.display());

    let graded: Vec<f64> = rows
        .iter()
        .filter(|row| row.submitted())
        .map(|row| row.score)
        .collect();
    let summary = report::summarize(&graded);

    if let Some(summary) = &summary {
        chart::render_histogram(plot_output_path, &graded, summary)?;
        println!(
            "Distribution plot saved to {}.",
            plot_output_path.display()
        );
    } else {
        println!("No graded students; skipping the distribution plot.");
    }

    let scores: HashMap<String, f64> = rows
        .iter()
        .map(|row| (row.email.clone(), row.score))
        .collect();
    let gradebook_file = std::fs::File::open(gradebook_path)
        .with_context(|| format!("failed to open gradebook {}", gradebook_path.display()))?;
    let gradebook_output = std::fs::File::create(gradebook_output_path)
        .with_context(|| format!("failed to create {}", gradebook_output_path.display()))?;
    gradebook::merge_scores(gradebook_file, gradebook_output, &scores, config.default_score)?;
    println!(
        "Updated gradebook saved to {}.",
        gradebook_output_path.display()
    );

    if let Some(summary) = summary {
        println!("\n=== Summary Statistics ===");
        println!("Graded students: {} of {}", summary.count, rows.len());
        println!("Mean peer evaluation score: {:.2}", summary.mean);
        println!("Median peer evaluation score: {:.2}", summary.median);
        println!("Std deviation: {:.2}", summary.std_dev);
        println!("Min score: {:.2}", summary.min);
        println!("Max score: {:.2}", summary.max);
    }

    Ok(())
}

fn run_contacts(input_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    let roster = roster::load_roster(input_path)?;
    let contacts = contacts::build_contacts(&roster);

    let output = std::fs::File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    contacts::write_contacts(output, &contacts)?;

    let max_team = roster::team_sizes(&roster).into_values().max().unwrap_or(0);
    println!(
        "Successfully generated contact list with {} students.",
        contacts.len()
    );
    println!("Maximum team size: {max_team} members.");
    println!("Output written to {}.", output_path.display());
    Ok(())
}

fn run_apply(
    input_path: &Path,
    multiplier_path: &Path,
    assignment_number: u32,
    output_path: &Path,
) -> anyhow::Result<()> {
    let multiplier_file = std::fs::File::open(multiplier_path)
        .with_context(|| format!("failed to open {}", multiplier_path.display()))?;
    let score_rows = report::read_scores(multiplier_file)
        .with_context(|| format!("failed to read score table {}", multiplier_path.display()))?;

    // Non-submitters multiply by the multiplier-formula default rather than
    // their stored placeholder score.
    let no_submission = ScoreConfig::for_formula(ScoreFormula::Multiplier).default_score;
    let multipliers: HashMap<String, f64> = score_rows
        .iter()
        .map(|row| {
            let multiplier = if row.submitted() { row.score } else { no_submission };
            (row.email.clone(), multiplier)
        })
        .collect();

    let input = std::fs::File::open(input_path)
        .with_context(|| format!("failed to open gradebook {}", input_path.display()))?;
    let output = std::fs::File::create(output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;
    let updated = gradebook::apply_multiplier(input, output, &multipliers, assignment_number)?;

    println!(
        "Rescaled {updated} assignment scores; written to {}.",
        output_path.display()
    );
    Ok(())
}

async fn run_invite(csv_path: &Path, dry_run: bool) -> anyhow::Result<()> {
    let token = match std::env::var("GITHUB_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => bail!(
            "GITHUB_TOKEN environment variable not set; \
             put a GitHub personal access token in .env (GITHUB_TOKEN=ghp_...)"
        ),
    };
    let org = match std::env::var("GITHUB_ORG") {
        Ok(org) if !org.trim().is_empty() => org,
        _ => {
            let org = prompt("Enter GitHub organization name: ")?;
            if org.is_empty() {
                bail!("organization name is required");
            }
            org
        }
    };

    let (headers, records) = invite::load_table(csv_path)?;
    let column = if headers.iter().any(|h| h == invite::EMAIL_COLUMN) {
        invite::EMAIL_COLUMN.to_string()
    } else {
        println!(
            "Could not find the '{}' column. Available columns: {}",
            invite::EMAIL_COLUMN,
            headers.join(", ")
        );
        let column = prompt("Column name: ")?;
        if !headers.iter().any(|h| h == &column) {
            bail!("column '{column}' not found in {}", csv_path.display());
        }
        column
    };

    let emails = invite::emails_in_column(&headers, &records, &column);
    if emails.is_empty() {
        bail!("no student emails found in {}", csv_path.display());
    }
    println!("Found {} student emails in '{column}'.", emails.len());

    let client = reqwest::Client::new();
    let login = invite::verify_token(&client, &token).await?;
    println!("Authenticated with GitHub as {login}.");

    if !dry_run {
        println!(
            "About to invite {} users to '{org}' by email.",
            emails.len()
        );
        let confirm = prompt("Continue? (yes/no): ")?;
        if !matches!(confirm.to_lowercase().as_str(), "yes" | "y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let summary = invite::invite_all(&client, &org, &token, &emails, dry_run).await?;
    invite::print_summary(&summary, dry_run);

    if dry_run {
        println!("This was a dry run; rerun without --dry-run to send invitations.");
    }
    Ok(())
}

fn prompt(message: &str) -> anyhow::Result<String> {
    print!("{message}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
