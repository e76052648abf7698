use behavior_pipeline::config::{self, BehaviorConfig};
use behavior_pipeline::{catalog, Database, SessionKey};
use chrono::Local;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "behavior-pipeline")]
#[command(author, version, about = "Manage the behavior experiment database")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// SQLite database file (default: from config, else behavior.db)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Config file (default: behavior.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the schema and seed the lookup tables
    Init,

    /// List tables with their tier and row count
    Tables,

    /// Print the entity relationship diagram as Graphviz DOT
    Erd,

    /// List experiment types
    Types,

    /// List tasks with their stimulus conditions
    Tasks,

    /// List registered movies and their clip counts
    Movies,

    /// List sessions of an animal
    Sessions {
        animal_id: i32,
    },

    /// Show one session with its conditions and event counts
    Show {
        animal_id: i32,
        session_id: i16,
    },

    /// Delete a session and everything recorded under it
    Delete {
        animal_id: i32,
        session_id: i16,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List calibrations of a probe with their curves
    Calibrations {
        setup: String,
        probe: i32,
    },

    /// Show an animal's weight history
    Weights {
        animal_id: i32,
    },

    /// Create a backup of the database
    Backup {
        /// Output path for backup (default: behavior_backup_<timestamp>.db)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool, config: Option<&BehaviorConfig>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Some(level) = config.and_then(|c| c.log_level.as_deref()) {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref())?;
    init_logging(args.verbose, config.as_ref());

    let db_path = config::resolve_database_path(args.database.as_deref(), config.as_ref());

    if let Command::Backup { output } = &args.command {
        return backup(&db_path, output.clone());
    }
    if matches!(args.command, Command::Erd) {
        print!("{}", catalog::to_dot());
        return Ok(());
    }

    config::ensure_db_dir(&db_path)?;
    let db = Database::open_at(&db_path)?;

    match args.command {
        Command::Init => {
            println!("Schema ready at {}", db_path.display());
        }

        Command::Tables => {
            println!("{:<34} {:<8} {:>8}  {}", "TABLE", "TIER", "ROWS", "COMMENT");
            println!("{}", "-".repeat(90));
            for (name, count) in db.table_counts()? {
                let info = catalog::find(name);
                println!(
                    "{:<34} {:<8} {:>8}  {}",
                    name,
                    info.map(|t| t.tier.as_str()).unwrap_or("?"),
                    count,
                    info.map(|t| t.comment).unwrap_or_default()
                );
            }
        }

        Command::Types => {
            for t in db.experiment_types()? {
                println!("{:<16} {}", t.exp_type, t.description);
            }
        }

        Command::Tasks => {
            for (task, exp_type) in db.tasks_with_types()? {
                println!("[{}] {} ({})", task.task_idx, task.description, exp_type.exp_type);
                println!(
                    "    trial {}s, intertrial {}s, timeout {}s, airpuff {}ms, response {}ms, reward {}ul, silence {}min",
                    task.trial_duration,
                    task.intertrial_duration,
                    task.timeout_duration,
                    task.airpuff_duration,
                    task.response_interval,
                    task.reward_amount,
                    task.silence_thr
                );
                match task.stimulus_conditions() {
                    Ok(conditions) => {
                        for c in conditions {
                            println!(
                                "    probes {:?} clips {:?} movies {:?}",
                                c.probe, c.clip_number, c.movie_name
                            );
                        }
                    }
                    Err(e) => eprintln!("    unreadable conditions: {}", e),
                }
            }
        }

        Command::Movies => {
            let movies = db.movies()?;
            if movies.is_empty() {
                println!("No movies registered.");
            }
            for m in movies {
                let clips = db.clips(&m.movie_name)?.len();
                println!(
                    "{:<8} {:<9} {:>4} clips  {:>6.1}s  {}",
                    m.movie_name, m.movie_class, clips, m.file_duration, m.movie_description
                );
            }
        }

        Command::Sessions { animal_id } => {
            let sessions = db.sessions(animal_id)?;
            if sessions.is_empty() {
                println!("No sessions for animal {}.", animal_id);
            } else {
                println!("{:<8} {:<20} {:<12} {}", "SESSION", "STARTED", "SETUP", "NOTES");
                println!("{}", "-".repeat(60));
                for s in sessions {
                    println!("{:<8} {:<20} {:<12} {}", s.session_id, s.session_tmst, s.setup, s.notes);
                }
            }
        }

        Command::Show { animal_id, session_id } => {
            let key = SessionKey::new(animal_id, session_id);
            let Some(session) = db.session(key)? else {
                anyhow::bail!("no {}", key);
            };

            println!("{} on {} at {}", key, session.setup, session.session_tmst);
            println!(
                "  trial {}s, intertrial {}s, timeout {}s, reward {}ul",
                session.trial_duration, session.intertrial_duration, session.timeout_duration, session.reward_amount
            );
            if !session.notes.is_empty() {
                println!("  notes: {}", session.notes);
            }

            let summary = db.session_summary(key)?;
            println!(
                "  {} trials, {} licks, {} liquid deliveries, {} airpuffs",
                summary.trials, summary.licks, summary.liquid_deliveries, summary.airpuffs
            );

            for c in db.conditions(key)? {
                match db.stimulus(c.key())? {
                    Some(stimulus) => println!("  condition {:<4} {}", c.cond_idx, stimulus),
                    None => println!("  condition {:<4} (no stimulus)", c.cond_idx),
                }
            }
        }

        Command::Delete { animal_id, session_id, yes } => {
            let key = SessionKey::new(animal_id, session_id);
            if !yes && !confirm(&format!("Delete {} and all its trials and events?", key))? {
                println!("Aborted.");
                return Ok(());
            }

            let deletion = db.delete_session(key)?;
            println!(
                "Deleted {} ({} conditions, {} trials, {} licks, {} liquid deliveries, {} airpuffs)",
                key,
                deletion.removed.conditions,
                deletion.removed.trials,
                deletion.removed.licks,
                deletion.removed.liquid_deliveries,
                deletion.removed.airpuffs
            );
        }

        Command::Calibrations { setup, probe } => {
            let calibrations = db.calibrations(&setup, probe)?;
            if calibrations.is_empty() {
                println!("No calibrations for {} probe {}.", setup, probe);
            }
            for cal in calibrations {
                println!("{}", cal.date);
                for p in db.pulse_weights(&cal)? {
                    println!("    {:>5}ms x{:<5} {:.4}g", p.pulse_dur, p.pulse_num, p.weight);
                }
            }
        }

        Command::Weights { animal_id } => {
            let weights = db.weights(animal_id)?;
            if weights.is_empty() {
                println!("No weights for animal {}.", animal_id);
            }
            for w in weights {
                println!("{}  {:.1}g", w.timestamp, w.weight);
            }
        }

        // handled before the database is opened
        Command::Backup { .. } | Command::Erd => {}
    }

    Ok(())
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    use std::io::{self, Write};

    eprint!("{} [y/N] ", prompt);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn backup(db_path: &std::path::Path, output: Option<PathBuf>) -> anyhow::Result<()> {
    if !db_path.exists() {
        anyhow::bail!("No database found at {}", db_path.display());
    }

    let backup_path = output.unwrap_or_else(|| {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        PathBuf::from(format!("behavior_backup_{}.db", timestamp))
    });

    let bytes = std::fs::copy(db_path, &backup_path)?;
    println!("Backup created: {} ({} bytes)", backup_path.display(), bytes);
    Ok(())
}
