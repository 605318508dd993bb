use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use fleet_compliance_reporter::config::Settings;
use fleet_compliance_reporter::dates::{MonthSelection, YearFilter};
use fleet_compliance_reporter::db::DocumentStore;
use fleet_compliance_reporter::models::{
    Document, Driver, Equipment, Infraction, Invariant, Objective, Partner, Report, SanctionRule,
    Vehicle, WorkTimeAnalysis,
};
use fleet_compliance_reporter::paginate::{PartnerScope, Pager};
use fleet_compliance_reporter::{logging, metrics, paginate, report};

#[derive(Parser)]
#[command(name = "fleet-compliance")]
#[command(about = "Fleet and driver compliance reporting", long_about = None)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// More output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportKind {
    Infractions,
    Reports,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollectionKind {
    Partners,
    Drivers,
    Vehicles,
    Equipment,
    Invariants,
    Infractions,
    Sanctions,
    Reports,
    Analyses,
    Objectives,
}

impl CollectionKind {
    fn collection(self) -> &'static str {
        match self {
            Self::Partners => Partner::COLLECTION,
            Self::Drivers => Driver::COLLECTION,
            Self::Vehicles => Vehicle::COLLECTION,
            Self::Equipment => Equipment::COLLECTION,
            Self::Invariants => Invariant::COLLECTION,
            Self::Infractions => Infraction::COLLECTION,
            Self::Sanctions => SanctionRule::COLLECTION,
            Self::Reports => Report::COLLECTION,
            Self::Analyses => WorkTimeAnalysis::COLLECTION,
            Self::Objectives => Objective::COLLECTION,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import infractions or reports from a CSV file for the active partner
    Import {
        #[arg(long, value_enum)]
        collection: ImportKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Make one partner the only active partner
    ActivatePartner { id: String },
    /// Print the dashboard for the active partner
    Dashboard {
        #[arg(long, default_value = "all")]
        year: YearFilter,
    },
    /// Points lost per driver under the SCP rules
    Points {
        #[arg(long, default_value = "all")]
        year: YearFilter,
    },
    /// Weekly work-time sheet for one driver and month
    Timesheet {
        #[arg(long)]
        driver: String,
        #[arg(long, default_value = "all")]
        year: YearFilter,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List drivers of the active partner, or of --partner when none is active
    Drivers {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long)]
        partner: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// List the active partner's SCP rules
    Sanctions {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// List the active partner's on-board equipment
    Equipment {
        #[arg(long, default_value = "all")]
        year: YearFilter,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Save the cause analysis for a report
    Analyse {
        #[arg(long)]
        report: String,
        #[arg(long)]
        cause: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        follow_up: String,
    },
    /// Delete one document
    Delete {
        #[arg(long, value_enum)]
        collection: CollectionKind,
        #[arg(long)]
        id: String,
    },
    /// Write the dashboard as a markdown report
    Report {
        #[arg(long, default_value = "all")]
        year: YearFilter,
        #[arg(long, default_value = "dashboard.md")]
        out: PathBuf,
    },
}

fn pager(settings: &Settings, page: usize, page_size: Option<usize>) -> Pager {
    let mut pager = Pager::new(settings.page_size);
    if let Some(size) = page_size {
        pager.set_page_size(size);
    }
    pager.go_to(page);
    pager
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(logging::Verbosity::from_flags(cli.quiet, cli.verbose));

    let settings =
        Settings::load_from(cli.config.as_deref()).context("failed to load settings")?;
    let database_url = settings.database_url()?;
    let store = DocumentStore::connect(&settings, database_url)
        .await
        .context("failed to connect to Postgres")?;
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            store.init_db().await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            store.seed().await?;
            println!("Seed data inserted.");
        }
        Commands::Import { collection, csv } => {
            let partner = store.active_partner().await?;
            let inserted = match collection {
                ImportKind::Infractions => {
                    store.import_csv::<Infraction>(&csv, &partner.id).await?
                }
                ImportKind::Reports => store.import_csv::<Report>(&csv, &partner.id).await?,
            };
            println!("Imported {inserted} documents from {}.", csv.display());
        }
        Commands::ActivatePartner { id } => {
            let partner = store.activate_partner(&id).await?;
            println!("{} is now the active partner.", partner.name);
        }
        Commands::Dashboard { year } => {
            let partner = store.active_partner().await?;
            let snapshot = store.load_snapshot(partner).await?;
            let view = snapshot.dashboard(year, today, &settings);
            print!("{}", report::dashboard_report(&view));
        }
        Commands::Points { year } => {
            let partner = store.active_partner().await?;
            let snapshot = store.load_snapshot(partner).await?;
            let mut output = String::new();
            report::points_section(&mut output, &snapshot.points_lost(year));
            print!("{output}");
        }
        Commands::Timesheet {
            driver,
            year,
            month,
            out,
        } => {
            let partner = store.active_partner().await?;
            let snapshot = store.load_snapshot(partner).await?;
            let period = MonthSelection::resolve(year, month, today)
                .context("month must be between 1 and 12")?;
            let name = snapshot
                .driver(&driver)
                .map(Driver::full_name)
                .unwrap_or_else(|| {
                    warn!(driver = %driver, "driver not found");
                    driver.clone()
                });
            let weeks = snapshot.time_sheet(&driver, period);
            let output = report::timesheet_report(&name, period, &weeks);
            match out {
                Some(path) => {
                    std::fs::write(&path, output)?;
                    println!("Time sheet written to {}.", path.display());
                }
                None => print!("{output}"),
            }
        }
        Commands::Drivers {
            search,
            partner,
            page,
            page_size,
        } => {
            let partners: Vec<Partner> = store.fetch_all().await?;
            let drivers: Vec<Driver> = store.fetch_all().await?;
            let active = metrics::active_partner(&partners).map(|p| p.id.as_str());
            let scope = PartnerScope::resolve(active, partner.as_deref());
            let rows = paginate::filter_drivers(&drivers, &partners, scope, &search);
            print!("{}", report::drivers_table(&rows, &pager(&settings, page, page_size)));
        }
        Commands::Sanctions {
            search,
            page,
            page_size,
        } => {
            let partner = store.active_partner().await?;
            let rules: Vec<SanctionRule> = store.fetch_for_partner(&partner.id).await?;
            let invariants: Vec<Invariant> = store.fetch_all().await?;
            let rows = paginate::filter_sanction_rules(&rules, &invariants, &search);
            print!("{}", report::sanctions_table(&rows, &pager(&settings, page, page_size)));
        }
        Commands::Equipment {
            year,
            search,
            page,
            page_size,
        } => {
            let partner = store.active_partner().await?;
            let equipment: Vec<Equipment> = store.fetch_for_partner(&partner.id).await?;
            let vehicles: Vec<Vehicle> = store.fetch_all().await?;
            let rows = paginate::filter_equipment(&equipment, &vehicles, year, &search);
            print!("{}", report::equipment_table(&rows, &pager(&settings, page, page_size)));
        }
        Commands::Analyse {
            report: report_id,
            cause,
            action,
            follow_up,
        } => {
            let partner = store.active_partner().await?;
            let source: Report = store
                .get(&report_id)
                .await
                .with_context(|| format!("report {report_id} not found"))?;
            let mut analysis = WorkTimeAnalysis {
                id: String::new(),
                partner_id: partner.id.clone(),
                report_id: source.id.clone(),
                cause,
                action,
                follow_up,
            };
            let id = store.save_analysis(&mut analysis).await?;
            println!("Analysis {id} saved for report of {}.", source.date);
        }
        Commands::Delete { collection, id } => {
            store.delete(collection.collection(), &id).await?;
            println!("Deleted {}/{id}.", collection.collection());
        }
        Commands::Report { year, out } => {
            let partner = store.active_partner().await?;
            let snapshot = store.load_snapshot(partner).await?;
            let view = snapshot.dashboard(year, today, &settings);
            std::fs::write(&out, report::dashboard_report(&view))?;
            info!(path = %out.display(), "dashboard report written");
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
