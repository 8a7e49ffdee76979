use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use freelance_tracker::analysis::{Analyzer, MockAnalyzer};
use freelance_tracker::views::{self, ActivityLevel};
use freelance_tracker::{
    BackendKind, Config, Entry, EntryPatch, EntryStatus, EntryType, ExportFormat, FileBackend, FilterKey, NewEntry, Saved,
    SqliteBackend, Store, TimeRange,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "freelance-tracker")]
#[command(about = "Track freelance job applications and client leads")]
#[command(version)]
struct Cli {
    /// Path to config.yaml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the tracker data (overrides config)
    #[arg(short, long, global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: file or sqlite (overrides config)
    #[arg(short, long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a job application or client lead
    Add {
        /// Company or client name
        company: Option<String>,

        /// Entry type (job, lead)
        #[arg(short = 't', long = "type", default_value = "job")]
        entry_type: String,

        /// Status (pending, applied, interview, rejected, accepted)
        #[arg(short, long, default_value = "pending")]
        status: String,

        #[arg(short, long)]
        position: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// How to reach the contact (email, linkedin, ...)
        #[arg(long)]
        contact: Option<String>,

        #[arg(short, long)]
        url: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        /// Follow-up date (YYYY-MM-DD)
        #[arg(long)]
        follow_up: Option<String>,

        /// Screenshot path or data URI to attach
        #[arg(long)]
        screenshot: Option<String>,

        /// Prefill fields from the screenshot using the analysis stub
        #[arg(long, requires = "screenshot")]
        analyze: bool,
    },

    /// List entries, most recent first
    List {
        /// Filter by type (all, job, lead)
        #[arg(short = 't', long = "type", default_value = "all")]
        entry_type: String,

        /// Filter by status (all, pending, applied, interview, rejected, accepted)
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Maximum number of entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one entry
    Show {
        /// Entry ID
        id: String,
    },

    /// Update fields of an entry (empty string clears an optional field)
    Update {
        /// Entry ID
        id: String,

        #[arg(short = 't', long = "type")]
        entry_type: Option<String>,

        #[arg(short, long)]
        status: Option<String>,

        #[arg(long)]
        company: Option<String>,

        #[arg(short, long)]
        position: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        #[arg(long)]
        contact: Option<String>,

        #[arg(short, long)]
        url: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        #[arg(long)]
        follow_up: Option<String>,
    },

    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },

    /// Show totals and status counts
    Stats {
        #[arg(short = 't', long = "type", default_value = "all")]
        entry_type: String,

        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Show activity per day for a month
    Calendar {
        /// Month to show (YYYY-MM), defaults to the current month
        #[arg(short, long)]
        month: Option<String>,

        #[arg(short = 't', long = "type", default_value = "all")]
        entry_type: String,

        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Show daily trend and status breakdown for this week or month
    Analytics {
        /// Time range (week, month)
        #[arg(short, long, default_value = "week")]
        range: String,

        #[arg(short = 't', long = "type", default_value = "all")]
        entry_type: String,

        #[arg(short, long, default_value = "all")]
        status: String,
    },

    /// Export all entries to a dated file
    Export {
        /// Export format (json, csv)
        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Permanently delete all entries
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Setup tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut store = match config.backend {
        BackendKind::File => Store::open(FileBackend::in_dir(&config.data_dir)),
        BackendKind::Sqlite => Store::open(SqliteBackend::open_or_recover(SqliteBackend::path_in(&config.data_dir))?),
    };

    match cli.command {
        Commands::Add {
            company,
            entry_type,
            status,
            position,
            location,
            contact,
            url,
            notes,
            follow_up,
            screenshot,
            analyze,
        } => {
            let mut draft = NewEntry {
                entry_type: entry_type.parse()?,
                status: status.parse()?,
                company: company.unwrap_or_default(),
                position,
                location,
                contact_method: contact,
                url,
                notes,
                follow_up_date: follow_up,
                screenshot,
            };

            if analyze {
                if let Some(shot) = draft.screenshot.clone() {
                    println!("Analyzing screenshot...");
                    let analyzer = MockAnalyzer::new(Duration::from_millis(config.analysis_delay_ms));
                    analyzer.analyze(&shot)?.apply_to(&mut draft);
                }
            }

            if draft.company.trim().is_empty() {
                return Err(eyre!("Company name is required"));
            }

            let saved = store.create(draft);
            report_warning(&saved);
            let label = match saved.value.entry_type {
                EntryType::Job => "Job application",
                EntryType::Lead => "Client lead",
            };
            println!("{} added: {}", label, saved.value.id);
        }
        Commands::List {
            entry_type,
            status,
            limit,
        } => {
            apply_filters(&mut store, &entry_type, &status)?;
            let entries = store.filtered_entries();
            if entries.is_empty() {
                println!("No entries found");
            }
            for entry in entries.iter().take(limit.unwrap_or(usize::MAX)) {
                print_summary(entry);
            }
        }
        Commands::Show { id } => {
            let entry = store.get(&id).ok_or_else(|| eyre!("Entry not found: {}", id))?;
            print_detail(entry);
        }
        Commands::Update {
            id,
            entry_type,
            status,
            company,
            position,
            location,
            contact,
            url,
            notes,
            follow_up,
        } => {
            let patch = EntryPatch {
                entry_type: entry_type.map(|t| t.parse()).transpose()?,
                status: status.map(|s| s.parse()).transpose()?,
                company,
                position,
                location,
                contact_method: contact,
                url,
                notes,
                follow_up_date: follow_up,
            };
            let saved = store.update(&id, patch)?;
            report_warning(&saved);
            match saved.value {
                Some(entry) => print_detail(&entry),
                None => println!("No entry with id {}", id),
            }
        }
        Commands::Delete { id } => {
            let saved = store.delete(&id);
            report_warning(&saved);
            if saved.value {
                println!("Deleted {}", id);
            } else {
                println!("No entry with id {}", id);
            }
        }
        Commands::Stats { entry_type, status } => {
            apply_filters(&mut store, &entry_type, &status)?;
            let stats = store.stats();
            println!("Total entries:     {}", stats.total);
            println!("Job applications:  {}", stats.job_applications);
            println!("Client leads:      {}", stats.client_leads);
            for (status, count) in &stats.status_counts {
                println!("  {:<16} {}", paint_status(*status), count);
            }
        }
        Commands::Calendar {
            month,
            entry_type,
            status,
        } => {
            apply_filters(&mut store, &entry_type, &status)?;
            let month = match month {
                Some(m) => NaiveDate::parse_from_str(&format!("{}-01", m), "%Y-%m-%d")
                    .map_err(|e| eyre!("Invalid month {} (expected YYYY-MM): {}", m, e))?,
                None => Local::now().date_naive(),
            };
            let entries = store.filtered_entries();
            println!("{}", month.format("%B %Y").to_string().bold());
            for day in views::month_grid(&entries, month, &Local) {
                let marker = match day.level {
                    ActivityLevel::None => ".".dimmed(),
                    ActivityLevel::Low => "+".blue(),
                    ActivityLevel::Medium => "++".cyan(),
                    ActivityLevel::High => "+++".green(),
                };
                println!("{}  {:>2}  {}", day.date.format("%a %d"), day.count, marker);
            }
        }
        Commands::Analytics {
            range,
            entry_type,
            status,
        } => {
            apply_filters(&mut store, &entry_type, &status)?;
            store.set_filter(FilterKey::TimeRange, &range)?;
            let range: TimeRange = store.filters().time_range;
            let window = views::date_range(range, Local::now().date_naive());
            let entries = store.filtered_entries();

            println!("{} ({} to {})", "Daily activity".bold(), window.start, window.end);
            for row in views::daily_activity(&entries, window, &Local) {
                println!(
                    "{}  jobs {:>3}  leads {:>3}  total {:>3}",
                    row.date.format("%b %d"),
                    row.jobs,
                    row.leads,
                    row.total
                );
            }

            println!("{}", "Status breakdown".bold());
            for (status, count) in views::status_breakdown(&entries, window, &Local) {
                println!("  {:<16} {}", paint_status(status), count);
            }
        }
        Commands::Export { format, out } => {
            if store.entries().is_empty() {
                println!("Nothing to export");
                return Ok(());
            }
            let dir = out.unwrap_or_else(|| config.export_dir.clone());
            let path = store.export_to(&dir, format)?;
            println!("Exported {} entries to {}", store.entries().len(), path.display());
        }
        Commands::Clear { yes } => {
            if !yes {
                return Err(eyre!("Refusing to clear all data without --yes"));
            }
            let saved = store.clear();
            report_warning(&saved);
            println!("Cleared {} entries", saved.value);
        }
    }

    Ok(())
}

fn apply_filters(store: &mut Store, entry_type: &str, status: &str) -> Result<()> {
    store.set_filter(FilterKey::Type, entry_type)?;
    store.set_filter(FilterKey::Status, status)?;
    Ok(())
}

fn report_warning<T>(saved: &Saved<T>) {
    if let Some(warning) = &saved.warning {
        eprintln!("{} changes were not saved: {}", "warning:".yellow().bold(), warning);
    }
}

fn paint_status(status: EntryStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        EntryStatus::Pending => text.yellow(),
        EntryStatus::Applied => text.blue(),
        EntryStatus::Interview => text.magenta(),
        EntryStatus::Rejected => text.red(),
        EntryStatus::Accepted => text.green(),
    }
}

fn print_summary(entry: &Entry) {
    println!(
        "{}  {:<4}  {:<10}  {}{}",
        entry.id.dimmed(),
        entry.entry_type.as_str(),
        paint_status(entry.status),
        entry.company.bold(),
        entry.position.as_deref().map(|p| format!(" - {}", p)).unwrap_or_default()
    );
}

fn print_detail(entry: &Entry) {
    println!("{}", entry.company.bold());
    println!("  id:         {}", entry.id);
    println!("  type:       {}", entry.entry_type);
    println!("  status:     {}", paint_status(entry.status));
    let optional = [
        ("position", &entry.position),
        ("location", &entry.location),
        ("contact", &entry.contact_method),
        ("url", &entry.url),
        ("follow-up", &entry.follow_up_date),
        ("screenshot", &entry.screenshot),
        ("notes", &entry.notes),
    ];
    for (label, value) in optional {
        if let Some(value) = value {
            println!("  {:<11} {}", format!("{}:", label), value);
        }
    }
    println!("  created:    {}", entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    println!("  updated:    {}", entry.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
}
