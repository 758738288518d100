use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    prediction::{finder_trend_series, insights_series},
    resume::skill_matrix,
    BackendClient, DashboardFilter, FinderQuery, GatewayError, PlacementClient, ReconciledSeries,
    Session, TableStoreClient,
};
use serde::Serialize;
use shared::{
    domain::{Course, Profile},
    protocol::RegisterRequest,
};
use storage::Storage;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

#[derive(Parser, Debug)]
#[command(name = "path2placement", about = "College placement predictions and resume analysis")]
struct Args {
    /// Settings file; defaults to ./path2placement.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        phone: String,
        #[arg(long)]
        password: String,
        /// Defaults to --password.
        #[arg(long)]
        confirm_password: Option<String>,
        #[arg(long)]
        agree: bool,
    },
    Logout,
    Whoami,
    Predict {
        #[arg(long)]
        college: String,
    },
    Finder {
        #[arg(long)]
        location: String,
        #[arg(long, default_value = "OVERALL")]
        course: Course,
        #[arg(long, default_value_t = 10)]
        top_n: u32,
    },
    Insights {
        #[arg(long)]
        college: String,
    },
    Dashboard {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        college: Option<String>,
    },
    #[command(subcommand)]
    Resume(ResumeCommand),
}

#[derive(Subcommand, Debug)]
enum ResumeCommand {
    List,
    Upload { file: PathBuf },
    Analyze {
        #[arg(long)]
        resume: String,
        #[arg(long)]
        role: String,
    },
    History,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", describe(&err));
            ExitCode::FAILURE
        }
    }
}

fn describe(err: &anyhow::Error) -> String {
    match err.downcast_ref::<GatewayError>() {
        Some(gateway) => gateway.user_message(),
        None => format!("{err:#}"),
    }
}

async fn connect(settings: &config::Settings) -> Result<PlacementClient> {
    let storage = Storage::new(&settings.session_db)
        .await
        .context("failed to open session store")?;
    let backend = BackendClient::new(&settings.api_base_url, settings.request_timeout())?;
    let table_store = match settings.table_store() {
        Some((url, key)) => Some(TableStoreClient::new(
            url,
            key,
            &settings.table_name,
            settings.request_timeout(),
        )?),
        None => {
            info!("table store not configured; historical data disabled");
            None
        }
    };
    Ok(PlacementClient::new(backend, table_store, Arc::new(storage)))
}

async fn run(args: Args) -> Result<()> {
    let settings = config::load_settings(args.config.as_deref());
    let client = connect(&settings).await?;
    let json = args.json;

    match args.command {
        Command::Login { email, password } => {
            match client.login(&email, &password).await? {
                Some(profile) => println!("Logged in as {}", profile.display_name()),
                None => println!("Logged in, but the profile could not be loaded."),
            }
        }
        Command::Register {
            full_name,
            email,
            phone,
            password,
            confirm_password,
            agree,
        } => {
            let request = RegisterRequest {
                full_name,
                email,
                phone,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                agreed: agree,
            };
            client.register(&request).await?;
            println!("Registration successful. Please login.");
        }
        Command::Logout => {
            client.logout().await;
            println!("Logged out.");
        }
        Command::Whoami => {
            let session = client.restore().await;
            if json {
                return print_json(&SessionReport::from(&session));
            }
            match (&session.token, &session.profile) {
                (_, Some(profile)) => {
                    println!("{}", profile.display_name());
                    println!("  email: {}", profile.email().unwrap_or("-"));
                    println!("  phone: {}", profile.phone().unwrap_or("-"));
                    println!("  role:  {}", profile.role());
                }
                (Some(_), None) => println!("Logged in, but the profile could not be loaded."),
                (None, None) => println!("Not logged in."),
            }
        }
        Command::Predict { college } => {
            let view = client.predict(&college).await?;
            if json {
                return print_json(&view);
            }
            println!(
                "{} ({} historical rows, {} predicted years)",
                view.college, view.historical_rows, view.predicted_years
            );
            print_series(&view.series);
        }
        Command::Finder {
            location,
            course,
            top_n,
        } => {
            let matches = client
                .find_colleges(&FinderQuery {
                    location,
                    course,
                    top_n,
                })
                .await?;
            if json {
                return print_json(&matches);
            }
            if matches.is_empty() {
                println!("No colleges found.");
            }
            for (rank, college) in matches.iter().enumerate() {
                println!(
                    "{:>2}. {} (NIRF {}): placement {}%, avg {} LPA, highest {} LPA",
                    rank + 1,
                    college.college.as_deref().unwrap_or("Unknown"),
                    college.nirf_rank.as_deref().unwrap_or("-"),
                    cell(college.average_placement),
                    cell(college.average_salary),
                    cell(college.highest_package),
                );
                let trend = finder_trend_series(college);
                if !trend.is_empty() {
                    let points: Vec<String> = trend
                        .iter()
                        .map(|p| format!("{} {}", p.year_label, cell(p.placement_past)))
                        .collect();
                    println!("    trend: {}", points.join(", "));
                }
                if !college.top_recruiters.is_empty() {
                    println!("    recruiters: {}", college.top_recruiters.join(", "));
                }
            }
        }
        Command::Insights { college } => {
            let insights = client.college_insights(&college).await?;
            if json {
                return print_json(&insights);
            }
            println!(
                "{}: average placement {}%",
                insights.college.as_deref().unwrap_or(college.trim()),
                cell(insights.average_placement)
            );
            print_series(&insights_series(&insights));
            if !insights.top_recruiters.is_empty() {
                println!("Top recruiters: {}", insights.top_recruiters.join(", "));
            }
        }
        Command::Dashboard { year, college } => {
            let filter = DashboardFilter::new(year.as_deref(), college.as_deref());
            let summary = client.dashboard(&filter).await?;
            if json {
                return print_json(&summary);
            }
            if summary.is_empty() {
                println!("No placement rows match the filter.");
                return Ok(());
            }
            println!("Rows:               {}", summary.rows);
            println!("Students eligible:  {}", summary.total_eligible);
            println!("Students placed:    {}", summary.total_placed);
            println!("Placement:          {}%", summary.placement_percent);
            println!("Avg median salary:  {} LPA", summary.average_median_salary);
            for department in &summary.departments {
                println!("  {:<4} placed {}", department.department, department.placed);
            }
        }
        Command::Resume(command) => run_resume(&client, command, json).await?,
    }

    Ok(())
}

async fn run_resume(client: &PlacementClient, command: ResumeCommand, json: bool) -> Result<()> {
    let session = client.restore().await;
    if !session.is_authenticated() {
        return Err(GatewayError::NotAuthenticated.into());
    }

    match command {
        ResumeCommand::List => {
            let resumes = client.resumes().await?;
            if json {
                return print_json(&resumes);
            }
            if resumes.is_empty() {
                println!("No resumes uploaded yet.");
            }
            for resume in &resumes {
                println!(
                    "{}  {}",
                    resume.label(),
                    resume.file_path.as_deref().unwrap_or("-")
                );
            }
        }
        ResumeCommand::Upload { file } => {
            let file_name = file
                .file_name()
                .and_then(|name| name.to_str())
                .context("resume path has no file name")?
                .to_string();
            let contents = tokio::fs::read(&file)
                .await
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let uploaded = client.upload_resume(&file_name, contents).await?;
            println!("Uploaded {}", uploaded.label());
        }
        ResumeCommand::Analyze { resume, role } => {
            let outcome = client.analyze_resume(&resume, &role).await?;
            if json {
                return print_json(&outcome.analysis);
            }
            println!("Score: {}", cell(outcome.analysis.score));
            for skill in skill_matrix(&outcome.analysis) {
                let mark = if skill.matched == 1 { "+" } else { "-" };
                println!("  {mark} {}", skill.skill);
            }
            if let Some(url) = outcome.public_url {
                println!("Resume: {url}");
            }
            if outcome.record.is_none() {
                warn!("analysis was not saved to history");
            }
        }
        ResumeCommand::History => {
            let history = client.analysis_history().await?;
            if json {
                return print_json(&history);
            }
            if history.is_empty() {
                println!("No analyses yet.");
                return Ok(());
            }
            println!("{} analyses, average score {}", history.len(), history.average_score());
            for point in history.score_trend() {
                println!("  {}  {}", point.date, point.score);
            }
            for record in history.records() {
                println!(
                    "{}  {:<24} {:>5}  {}",
                    record.created_at.format("%Y-%m-%d"),
                    record.job_role,
                    record.score,
                    record.resume_name()
                );
            }
        }
    }

    Ok(())
}

/// JSON view of the session; the token itself is never printed.
#[derive(Debug, Serialize)]
struct SessionReport<'a> {
    authenticated: bool,
    loading: bool,
    profile: Option<&'a Profile>,
}

impl<'a> From<&'a Session> for SessionReport<'a> {
    fn from(session: &'a Session) -> Self {
        Self {
            authenticated: session.is_authenticated(),
            loading: session.loading,
            profile: session.profile.as_ref(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cell(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_series(series: &ReconciledSeries) {
    if series.is_empty() {
        println!("No data available.");
        return;
    }
    println!(
        "{:<10} {:>10} {:>10} {:>10} {:>10}",
        "year", "placed %", "pred %", "salary", "pred sal"
    );
    for point in series {
        println!(
            "{:<10} {:>10} {:>10} {:>10} {:>10}",
            point.year_label,
            cell(point.placement_past),
            cell(point.placement_predicted),
            cell(point.salary_past),
            cell(point.salary_predicted),
        );
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
