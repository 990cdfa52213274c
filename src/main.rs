use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use staffing_match::config::{AppConfig, OutreachConfig};
use staffing_match::db::Database;
use staffing_match::outreach::{
    candidate_json_row, CandidateListRun, DirectoryExporter, JsonLinesNotifier, NeedsRequestRun,
    Notifier, OutreachOptions, SendGridNotifier,
};
use staffing_match::source::{AirtableSource, PageOptions};
use staffing_match::{telemetry, Replica};
use std::error::Error;
use std::io;

#[derive(Parser, Debug)]
#[command(
    name = "staffing-match",
    about = "Mirror the staffing base locally and match candidates to facility needs",
    version
)]
struct Cli {
    /// Page size requested from the remote source
    #[arg(long, global = true)]
    page_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pull every collection into the local replica
    Sync,
    /// List facilities whose latest need is still open
    Needs,
    /// Print matching candidates for one facility as JSON lines
    Candidates {
        /// Facility record id
        #[arg(long)]
        facility: String,
    },
    /// Show the run settings from the remote configuration table
    Settings,
    /// Send each approved facility in need its candidate list
    CandidateLists(SendArgs),
    /// Ask every approved facility for its current needs
    NeedsRequests(SendArgs),
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Do everything except send mail and record tracking
    #[arg(long)]
    dry_run: bool,
    /// Print messages as JSON lines instead of sending through SendGrid
    #[arg(long)]
    outbox: bool,
}

fn build_notifier(config: &OutreachConfig, args: &SendArgs) -> Result<Box<dyn Notifier>, Box<dyn Error>> {
    if args.outbox {
        return Ok(Box::new(JsonLinesNotifier::new(io::stdout())));
    }
    match &config.sendgrid_api_key {
        Some(key) => Ok(Box::new(SendGridNotifier::new(key.clone())?)),
        // nothing is sent on a dry run
        None if args.dry_run => Ok(Box::new(JsonLinesNotifier::new(io::stdout()))),
        None => Err("SENDGRID_API_KEY must be set to send mail (or pass --outbox)".into()),
    }
}

fn send_options(config: &OutreachConfig, args: &SendArgs) -> OutreachOptions {
    let options = config.options(args.dry_run, Utc::now());
    if let Some(to) = &options.override_email_destination {
        tracing::warn!(%to, "every message is redirected");
    }
    options
}

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = telemetry::init(&config.telemetry) {
        eprintln!("❌ {e}");
        std::process::exit(2);
    }

    if let Err(e) = run(cli, &config) {
        tracing::error!(error = %e, "run failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let source = AirtableSource::new(
        config.airtable.api_key.clone(),
        config.airtable.base_id.clone(),
        config.airtable.tables.clone(),
    )?
    .with_page_delay(config.airtable.page_delay);

    let replica = Replica::new(source, Database::new(config.replica.db_path.clone()))
        .with_batch_size(config.replica.batch_size)
        .with_page_options(PageOptions {
            page_size: cli.page_size,
            view: None,
        });

    match cli.command {
        Command::Sync => {
            let report = replica.fill()?;
            print!("{report}");
        }
        Command::Needs => {
            for facility in replica.facilities_in_need()? {
                let need = replica.current_need(facility.id())?;
                let requested = need
                    .as_ref()
                    .and_then(|n| n.time_requested())
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("{}\t{}\t{}", facility.id(), facility.name(), requested);
            }
        }
        Command::Candidates { facility } => {
            let Some(facility) = replica.facility(&facility)? else {
                return Err(format!("facility '{facility}' not found in replica").into());
            };

            for candidate in replica.candidates_for_facility(&facility)? {
                println!("{}", candidate_json_row(&candidate));
            }
        }
        Command::Settings => {
            let settings = replica.settings()?;
            println!("{settings:#?}");
        }
        Command::CandidateLists(args) => {
            let settings = replica.settings()?;
            let notifier = build_notifier(&config.outreach, &args)?;
            let options = send_options(&config.outreach, &args);
            let exporter = DirectoryExporter::new(
                config.outreach.export_dir.clone(),
                config.outreach.export_base_url.clone(),
                options.today,
            );

            let summary =
                CandidateListRun::new(&replica, &settings, notifier.as_ref(), &exporter, options).run()?;
            tracing::info!(?summary, "candidate lists done");
            println!("{summary:?}");
        }
        Command::NeedsRequests(args) => {
            let settings = replica.settings()?;
            let notifier = build_notifier(&config.outreach, &args)?;
            let options = send_options(&config.outreach, &args);

            let summary = NeedsRequestRun::new(&replica, &settings, notifier.as_ref(), options).run()?;
            tracing::info!(?summary, "needs requests done");
            println!("{summary:?}");
        }
    }

    Ok(())
}
