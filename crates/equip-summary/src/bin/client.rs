//! Command-line client for the summary API
//!
//! Run with: cargo run -p equip-summary --features cli --bin equip-summary-client -- <command>

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::{style, Term};
use equip_summary::client::{render, ApiClient, Session, DEFAULT_BASE_URL};
use equip_summary::Error;

#[derive(Parser)]
#[command(name = "equip-summary-client")]
#[command(about = "Upload equipment CSV files and review their summaries")]
#[command(version)]
struct Cli {
    /// API base URL
    #[arg(long, env = "EQUIP_SUMMARY_API", default_value = DEFAULT_BASE_URL)]
    api: String,

    /// Session file (defaults to the user config directory)
    #[arg(long, env = "EQUIP_SUMMARY_SESSION")]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        /// Account name
        username: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "EQUIP_SUMMARY_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Upload a CSV file
    Upload {
        /// Path to the CSV file
        path: PathBuf,
    },

    /// List the retained uploads
    History,

    /// Download the PDF report
    Report {
        /// Output path
        #[arg(short, long, default_value = "report.pdf")]
        output: PathBuf,
    },

    /// Show the latest summary, type chart and trend
    Dashboard,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("error:").red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = &ApiClient::new(&cli.api)?;
    let session_path = cli.session.unwrap_or_else(Session::default_path);

    match cli.command {
        Commands::Login { username, password } => {
            let password = match password {
                Some(p) => p,
                None => {
                    let term = Term::stderr();
                    term.write_str("Password: ")?;
                    term.read_secure_line()?
                }
            };
            let session = client.login(&username, &password).await?;
            session.save(&session_path)?;
            println!("{} Logged in as {}", style("✓").green(), style(&username).bold());
        }
        Commands::Logout => {
            Session::clear(&session_path)?;
            println!("Session cleared");
        }
        Commands::Upload { path } => {
            let mut session = require_session(&session_path)?;
            let path = &path;
            let response = client
                .authorized_call(&mut session, |s| async move { client.upload_csv(&s, path).await })
                .await;
            let response = persist(response, &session, &session_path)?;
            println!(
                "{} Uploaded {} as #{} at {}",
                style("✓").green(),
                style(&response.filename).bold(),
                response.id,
                response.uploaded_at
            );
            if response.evicted > 0 {
                println!("  {} older upload(s) dropped from history", response.evicted);
            }
        }
        Commands::History => {
            let mut session = require_session(&session_path)?;
            let entries = client
                .authorized_call(&mut session, |s| async move { client.history(&s).await })
                .await;
            let entries = persist(entries, &session, &session_path)?;
            println!("{}", style("Upload history").bold().underlined());
            print!("{}", render::render_history(&entries));
        }
        Commands::Report { output } => {
            let mut session = require_session(&session_path)?;
            let output_path = &output;
            let size = client
                .authorized_call(&mut session, |s| async move {
                    client.download_report(&s, output_path).await
                })
                .await;
            let size = persist(size, &session, &session_path)?;
            println!(
                "{} Saved report to {} ({} bytes)",
                style("✓").green(),
                output.display(),
                size
            );
        }
        Commands::Dashboard => {
            let mut session = require_session(&session_path)?;
            let view = client
                .authorized_call(&mut session, |s| async move { client.report_view(&s).await })
                .await;
            let view = persist(view, &session, &session_path)?;

            println!("{}", style("Latest Summary").bold().underlined());
            print!("{}", render::render_summary(&view));
            if !view.is_empty() {
                println!("\n{}", style("Type Distribution").bold().underlined());
                print!("{}", render::render_distribution(&view));
                println!("\n{}", style("Recent Trend").bold().underlined());
                print!("{}", render::render_trend(&view));
            }
        }
    }

    Ok(())
}

/// Save the possibly refreshed session, then surface the call's outcome
fn persist<T>(result: equip_summary::Result<T>, session: &Session, path: &Path) -> anyhow::Result<T> {
    session.save(path)?;
    match result {
        Err(Error::Authentication(reason)) => {
            anyhow::bail!("session expired ({}), run `login` again", reason)
        }
        other => Ok(other?),
    }
}

fn require_session(path: &Path) -> anyhow::Result<Session> {
    Session::load(path)?
        .with_context(|| format!("not logged in (no session at {}), run `login` first", path.display()))
}
