use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use class_council::config::CouncilConfig;
use class_council::models::{Gradebook, SubjectKey, TermId};
use class_council::rank::{self, RankScope};
use class_council::{pipeline, report, stats, store, telemetry};

#[derive(Parser)]
#[command(name = "class-council")]
#[command(about = "Class council grade engine: averages, decisions, ranks and reports", long_about = None)]
struct Cli {
    /// JSON file with thresholds, coefficients and school details
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a demo gradebook
    Seed {
        #[arg(long, default_value = "gradebook.json")]
        out: PathBuf,
    },
    /// Import raw marks from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
    },
    /// Print class standings for a term (1, 2, 3) or the annual scope
    Rank {
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "annual")]
        scope: RankScope,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Mean, extremes and pass rate of one subject in one term
    Subject {
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
        #[arg(long)]
        class: String,
        #[arg(long, default_value_t = 1)]
        term: u8,
        /// Subject code such as math, fr or pe
        #[arg(long)]
        subject: String,
    },
    /// Recompute annual averages, decisions and ranks
    Annual {
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
        #[arg(long)]
        class: Option<String>,
    },
    /// Re-derive every average, decision and rank with the current configuration
    Recompute {
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
        /// Apply the plan; without this flag only the overwrites are listed
        #[arg(long)]
        yes: bool,
    },
    /// Generate a markdown council report
    Report {
        #[arg(long, default_value = "gradebook.json")]
        book: PathBuf,
        #[arg(long)]
        class: String,
        #[arg(long, default_value = "annual")]
        scope: RankScope,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = CouncilConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    telemetry::init(&config.log_level)?;

    match cli.command {
        Commands::Seed { out } => {
            let gradebook = store::seed(&config)?;
            store::save_gradebook(&out, &gradebook)?;
            println!(
                "Seeded {} students into {}.",
                gradebook.student_count(),
                out.display()
            );
        }
        Commands::Import { csv, book } => {
            let mut gradebook = if book.exists() {
                store::load_gradebook(&book, &config)?
            } else {
                Gradebook::default()
            };
            let imported = store::import_csv(&mut gradebook, &csv, &config)?;
            store::save_gradebook(&book, &gradebook)?;
            println!("Imported {imported} marks from {}.", csv.display());
        }
        Commands::Rank {
            book,
            class,
            scope,
            limit,
        } => {
            let gradebook = store::load_gradebook(&book, &config)?;
            let group = gradebook
                .class(&class)
                .with_context(|| format!("no class with id {class}"))?;
            let standings = rank::standings(&group.students, scope);

            if standings.is_empty() {
                println!("No students enrolled in {}.", group.name);
                return Ok(());
            }

            println!("{} standings ({scope}):", group.name);
            for entry in standings.iter().take(limit) {
                let position = entry
                    .rank
                    .map(|rank| rank.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{:>3}. {} {:.2}", position, entry.name, entry.average);
            }
        }
        Commands::Subject {
            book,
            class,
            term,
            subject,
        } => {
            let term = TermId::try_from(term).map_err(anyhow::Error::msg)?;
            let subject = SubjectKey::from_code(&subject)
                .with_context(|| format!("unknown subject code {subject}"))?;
            let gradebook = store::load_gradebook(&book, &config)?;
            let group = gradebook
                .class(&class)
                .with_context(|| format!("no class with id {class}"))?;

            match stats::subject_statistics(&group.students, term, subject) {
                Some(entry) => {
                    println!("{} in {} ({term}):", subject.label(), group.name);
                    println!("  average   {:.2}", entry.average);
                    println!("  max / min {:.2} / {:.2}", entry.max, entry.min);
                    println!("  pass rate {:.1}%", entry.pass_rate);
                }
                None => println!("No students enrolled in {}.", group.name),
            }
        }
        Commands::Annual { book, class } => {
            let mut gradebook = store::load_gradebook(&book, &config)?;
            let mut updated = 0usize;
            for group in &mut gradebook.classes {
                if class.as_deref().is_some_and(|id| id != group.id) {
                    continue;
                }
                pipeline::recompute_annual(group, &config);
                updated += group.students.len();
            }
            if updated == 0 {
                anyhow::bail!("no students matched");
            }
            store::save_gradebook(&book, &gradebook)?;
            println!("Annual results updated for {updated} students.");
        }
        Commands::Recompute { book, yes } => {
            let mut gradebook = store::load_gradebook(&book, &config)?;
            let plan = pipeline::plan_bulk_recompute(&gradebook, &config)?;

            println!(
                "Recompute covers {} students; {} council values would be replaced.",
                plan.student_count(),
                plan.changes().len()
            );
            for change in plan.changes() {
                println!(
                    "- {} [{}] {}: {:?} -> {:?}",
                    change.student_name,
                    change.class_id,
                    change.field,
                    change.previous,
                    change.proposed
                );
            }

            if !yes {
                println!("Dry run only. Re-run with --yes to apply.");
                return Ok(());
            }

            plan.commit(&mut gradebook)?;
            store::save_gradebook(&book, &gradebook)?;
            println!("Gradebook {} recomputed.", book.display());
        }
        Commands::Report {
            book,
            class,
            scope,
            out,
        } => {
            let gradebook = store::load_gradebook(&book, &config)?;
            let group = gradebook
                .class(&class)
                .with_context(|| format!("no class with id {class}"))?;
            let report = report::build_report(group, scope, &config);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
