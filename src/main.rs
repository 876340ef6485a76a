mod classify;
mod db;
mod email;
mod extract;
mod loader;
mod login;
mod session;
mod settings;
mod unknown;

use std::time::Instant;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use session::{ChromeSession, Session};
use settings::{Settings, CONNECTIONS_URL};

#[derive(Parser)]
#[command(name = "uk_harvest", about = "Collect UK-based LinkedIn connections and their contact emails")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the full connections list and store the UK-based ones
    Fetch {
        /// Pause after each scroll, in milliseconds
        #[arg(long)]
        pause_ms: Option<u64>,
        /// Consecutive rounds without new cards before stopping
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        max_idle: Option<u64>,
    },
    /// Visit stored profiles that have not been checked for an email yet
    Emails {
        /// Max profiles to visit
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
    },
    /// Fetch + emails in one browser session
    Run {
        /// Max profiles to visit for emails
        #[arg(short = 'n', long, default_value = "100")]
        limit: usize,
    },
    /// Check location strings against the UK matcher
    Classify {
        #[arg(required = true)]
        locations: Vec<String>,
    },
    /// Show stored connection and email counts
    Stats,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Fetch { pause_ms, max_idle } => {
            if let Some(ms) = pause_ms {
                settings.scroll_pause_ms = ms;
            }
            if let Some(n) = max_idle {
                settings.max_idle_loops = usize::try_from(n)?;
            }
            with_browser(&settings, |session| fetch_connections(session, &settings))
        }
        Commands::Emails { limit } => {
            with_browser(&settings, |session| fetch_emails(session, &settings, limit))
        }
        Commands::Run { limit } => with_browser(&settings, |session| {
            fetch_connections(session, &settings)?;
            fetch_emails(session, &settings, limit)
        }),
        Commands::Classify { locations } => {
            for loc in &locations {
                let tag = if classify::is_uk(loc) { "UK" } else { "--" };
                println!("{}  {}", tag, loc);
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Connections:    {}", s.connections);
            println!("Fetched:        {}", s.fetched);
            println!("Unfetched:      {}", s.unfetched);
            println!("Emails found:   {}", s.emails_found);
            println!("Emails missing: {}", s.emails_missing);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

/// Launch the browser, log in, run `work`, and close the browser whatever happens.
fn with_browser<F>(settings: &Settings, work: F) -> Result<()>
where
    F: FnOnce(&mut ChromeSession) -> Result<()>,
{
    let mut session = ChromeSession::launch(settings.headless)?;
    let result = match login::login(&mut session, settings) {
        Ok(true) => work(&mut session),
        Ok(false) => Err(anyhow::anyhow!("Login failed")),
        Err(e) => Err(e),
    };
    session.close();
    result
}

fn fetch_connections<S: Session + ?Sized>(session: &mut S, settings: &Settings) -> Result<()> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let pauses = settings.pauses();

    info!("Opening connections page");
    session.navigate(CONNECTIONS_URL)?;
    session.pause(pauses.settle);

    let loaded = loader::load_all(session, pauses.scroll, settings.max_idle_loops)?;
    session.pause(pauses.settle);
    let records = extract::extract_all(session)?;
    if records.is_empty() && loaded > 0 {
        bail!("{} cards loaded but none could be read; has the page layout changed?", loaded);
    }

    let (uk, other) = classify::partition_uk(records);
    let saved = db::save_uk_connections(&conn, &uk)?;

    let mut log = unknown::LocationLog::open(&settings.unknown_locations_path)?;
    let mut logged = 0;
    for record in &other {
        if log.append(&record.location)? {
            logged += 1;
        }
    }

    println!(
        "Loaded {} cards: {} UK ({} new), {} elsewhere ({} new locations logged).",
        loaded,
        uk.len(),
        saved,
        other.len(),
        logged
    );
    Ok(())
}

fn fetch_emails<S: Session + ?Sized>(session: &mut S, settings: &Settings, limit: usize) -> Result<()> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    let pauses = settings.pauses();

    let pending = db::fetch_unfetched(&conn, limit)?;
    if pending.is_empty() {
        println!("No unfetched connections. Run 'fetch' first.");
        return Ok(());
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut found = 0usize;
    for profile in &pending {
        let email = email::fetch_email(session, &profile.profile_url, &pauses);
        if email.is_some() {
            found += 1;
        }
        db::save_email(&conn, &profile.profile_url, email.as_deref())?;
        db::mark_fetched(&conn, profile.id)?;
        pb.inc(1);
    }
    pb.finish_and_clear();

    println!("Visited {} profiles: {} with email.", pending.len(), found);
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
