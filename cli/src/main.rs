mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    FoodInput, ProfileInput, SettingsChange, cmd_backup_export, cmd_backup_restore, cmd_body_add,
    cmd_body_delete, cmd_body_list, cmd_food_delete, cmd_food_edit, cmd_food_list, cmd_food_log,
    cmd_history, cmd_profile_create, cmd_profile_delete, cmd_profile_list, cmd_profile_logout,
    cmd_profile_show, cmd_profile_switch, cmd_profile_update, cmd_saved_add, cmd_saved_delete,
    cmd_saved_list, cmd_settings_set, cmd_settings_show, cmd_stats_delete, cmd_stats_list,
    cmd_stats_set, cmd_stats_show, cmd_summary, cmd_workout_add, cmd_workout_delete,
    cmd_workout_list,
};
use crate::config::Config;
use nutritrack_core::models::Macros;
use nutritrack_core::service::TrackerService;
use nutritrack_core::session::SessionFile;

#[derive(Parser)]
#[command(
    name = "nutritrack",
    version,
    about = "A local-first diet and fitness tracker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user profiles
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Log and review food entries
    Food {
        #[command(subcommand)]
        command: FoodCommands,
    },
    /// Log and review workouts
    Workout {
        #[command(subcommand)]
        command: WorkoutCommands,
    },
    /// Progress photos
    Body {
        #[command(subcommand)]
        command: BodyCommands,
    },
    /// Personal food database, most used first
    Saved {
        #[command(subcommand)]
        command: SavedCommands,
    },
    /// Daily weight, body fat, and notes
    Stats {
        #[command(subcommand)]
        command: StatsCommands,
    },
    /// Show the daily dashboard (defaults to today)
    Summary {
        /// Date to show (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show summaries for the last N days
    History {
        /// Number of days to show
        #[arg(short, long, default_value = "7")]
        days: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export or restore a full backup
    Backup {
        #[command(subcommand)]
        command: BackupCommands,
    },
    /// Theme and reminder preferences
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Create a profile and make it active
    Create {
        /// Display name
        name: String,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Age in years
        #[arg(long)]
        age: u32,
        /// male or female
        #[arg(long)]
        gender: String,
        /// sedentary, light, moderate, active, very-active
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// cut, maintain, bulk
        #[arg(long, default_value = "maintain")]
        goal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change the active profile's body data or goal
    Update {
        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        weight: Option<f64>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        activity: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active profile and its calorie target
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all profiles
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Make a profile active
    Switch {
        /// Profile ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Forget the active profile
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a profile (its logs are kept)
    Delete {
        /// Profile ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum FoodCommands {
    /// Log a food entry
    Log {
        /// Food name
        name: Option<String>,
        #[arg(long)]
        calories: Option<f64>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        /// Log a saved food by ID (or unique prefix)
        #[arg(long, conflicts_with_all = ["name", "calories", "protein", "carbs", "fat"])]
        from_saved: Option<String>,
        /// Also remember this food in the saved list
        #[arg(long)]
        save: bool,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List food entries for a day
    List {
        /// Date (default: today)
        date: Option<String>,
        /// List every entry instead of one day
        #[arg(long, conflicts_with = "date")]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a food entry
    Edit {
        /// Entry ID (or unique prefix)
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        calories: Option<f64>,
        #[arg(long)]
        protein: Option<f64>,
        #[arg(long)]
        carbs: Option<f64>,
        #[arg(long)]
        fat: Option<f64>,
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry
    Delete {
        /// Entry ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum WorkoutCommands {
    /// Log an exercise
    Add {
        /// Exercise name
        exercise: String,
        #[arg(long, default_value = "1")]
        sets: u32,
        #[arg(long, default_value = "1")]
        reps: u32,
        /// Load in kg
        #[arg(long, default_value = "0")]
        weight: f64,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List workouts for a day
    List {
        /// Date (default: today)
        date: Option<String>,
        /// List every workout instead of one day
        #[arg(long, conflicts_with = "date")]
        all: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a workout
    Delete {
        /// Workout ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BodyCommands {
    /// Record a progress photo
    Add {
        /// Image data URL
        image: String,
        #[arg(long)]
        note: Option<String>,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List progress photos
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a progress photo
    Delete {
        /// Body check ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SavedCommands {
    /// List saved foods
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Save a food, or bump its use count if the name exists
    Add {
        /// Food name
        name: String,
        #[arg(long)]
        calories: f64,
        #[arg(long, default_value = "0")]
        protein: f64,
        #[arg(long, default_value = "0")]
        carbs: f64,
        #[arg(long, default_value = "0")]
        fat: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a saved food
    Delete {
        /// Saved food ID (or unique prefix)
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StatsCommands {
    /// Record weight, body fat, or a note for a day
    Set {
        /// Weight value
        #[arg(long)]
        weight: Option<f64>,
        /// Unit: kg or lbs (default: kg)
        #[arg(short, long, default_value = "kg")]
        unit: String,
        /// Body fat percentage
        #[arg(long)]
        body_fat: Option<f64>,
        #[arg(long)]
        note: Option<String>,
        /// Date (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show stats for a day (default: today)
    Show {
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all recorded stats
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete stats for a day (default: today)
    Delete {
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Export every collection as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all data with a backup file
    Restore {
        /// Backup file
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show preferences
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change preferences
    Set {
        #[arg(long)]
        theme: Option<String>,
        /// true for dark, false for light
        #[arg(long)]
        dark_mode: Option<bool>,
        /// Follow the system light/dark preference
        #[arg(long, conflicts_with = "dark_mode")]
        system_theme: bool,
        #[arg(long)]
        notifications: Option<bool>,
        /// Lunch reminder time (HH:MM)
        #[arg(long)]
        lunch: Option<String>,
        /// Dinner reminder time (HH:MM)
        #[arg(long)]
        dinner: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Whether the command changes the entity store. Session and settings
    /// commands write the session file only.
    fn writes_store(&self) -> bool {
        match self {
            Commands::Profile { command } => matches!(
                command,
                ProfileCommands::Create { .. }
                    | ProfileCommands::Update { .. }
                    | ProfileCommands::Delete { .. }
            ),
            Commands::Food { command } => !matches!(command, FoodCommands::List { .. }),
            Commands::Workout { command } => !matches!(command, WorkoutCommands::List { .. }),
            Commands::Body { command } => !matches!(command, BodyCommands::List { .. }),
            Commands::Saved { command } => !matches!(command, SavedCommands::List { .. }),
            Commands::Stats { command } => {
                matches!(command, StatsCommands::Set { .. } | StatsCommands::Delete { .. })
            }
            Commands::Backup { command } => matches!(command, BackupCommands::Restore { .. }),
            Commands::Summary { .. } | Commands::History { .. } | Commands::Settings { .. } => {
                false
            }
        }
    }
}

fn main() {
    set_up_logger();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` overrides
/// the default `warn` level.
fn set_up_logger() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    debug!(db = %config.db_path.display(), session = %config.session_path.display(), "resolved data paths");
    let svc = TrackerService::open_or_degrade(&config.db_path);
    let session_file = SessionFile::new(&config.session_path);
    let session = session_file.load();
    let writes_store = cli.command.writes_store();

    let result = match cli.command {
        Commands::Profile { command } => match command {
            ProfileCommands::Create {
                name,
                height,
                weight,
                age,
                gender,
                activity,
                goal,
                json,
            } => cmd_profile_create(
                &svc,
                &session_file,
                ProfileInput {
                    name,
                    height,
                    weight,
                    age,
                    gender,
                    activity,
                    goal,
                },
                json,
            ),
            ProfileCommands::Update {
                height,
                weight,
                age,
                activity,
                goal,
                json,
            } => cmd_profile_update(&svc, &session, height, weight, age, activity, goal, json),
            ProfileCommands::Show { json } => cmd_profile_show(&svc, &session, json),
            ProfileCommands::List { json } => cmd_profile_list(&svc, &session, json),
            ProfileCommands::Switch { id, json } => {
                cmd_profile_switch(&svc, &session_file, &id, json)
            }
            ProfileCommands::Logout { json } => cmd_profile_logout(&session_file, json),
            ProfileCommands::Delete { id, json } => {
                cmd_profile_delete(&svc, &session_file, &id, json)
            }
        },
        Commands::Food { command } => match command {
            FoodCommands::Log {
                name,
                calories,
                protein,
                carbs,
                fat,
                from_saved,
                save,
                date,
                json,
            } => cmd_food_log(
                &svc,
                &session,
                FoodInput {
                    name,
                    calories,
                    protein,
                    carbs,
                    fat,
                    date,
                },
                from_saved.as_deref(),
                save,
                json,
            ),
            FoodCommands::List { date, all, json } => {
                cmd_food_list(&svc, &session, date, all, json)
            }
            FoodCommands::Edit {
                id,
                name,
                calories,
                protein,
                carbs,
                fat,
                date,
                json,
            } => cmd_food_edit(
                &svc,
                &session,
                &id,
                FoodInput {
                    name,
                    calories,
                    protein,
                    carbs,
                    fat,
                    date,
                },
                json,
            ),
            FoodCommands::Delete { id, json } => cmd_food_delete(&svc, &session, &id, json),
        },
        Commands::Workout { command } => match command {
            WorkoutCommands::Add {
                exercise,
                sets,
                reps,
                weight,
                tags,
                date,
                json,
            } => cmd_workout_add(
                &svc, &session, exercise, sets, reps, weight, tags, date, json,
            ),
            WorkoutCommands::List { date, all, json } => {
                cmd_workout_list(&svc, &session, date, all, json)
            }
            WorkoutCommands::Delete { id, json } => cmd_workout_delete(&svc, &session, &id, json),
        },
        Commands::Body { command } => match command {
            BodyCommands::Add {
                image,
                note,
                date,
                json,
            } => cmd_body_add(&svc, &session, image, note, date, json),
            BodyCommands::List { json } => cmd_body_list(&svc, &session, json),
            BodyCommands::Delete { id, json } => cmd_body_delete(&svc, &session, &id, json),
        },
        Commands::Saved { command } => match command {
            SavedCommands::List { json } => cmd_saved_list(&svc, &session, json),
            SavedCommands::Add {
                name,
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_saved_add(
                &svc,
                &session,
                name,
                Macros {
                    calories,
                    protein,
                    carbs,
                    fat,
                },
                json,
            ),
            SavedCommands::Delete { id, json } => cmd_saved_delete(&svc, &session, &id, json),
        },
        Commands::Stats { command } => match command {
            StatsCommands::Set {
                weight,
                unit,
                body_fat,
                note,
                date,
                json,
            } => cmd_stats_set(&svc, &session, weight, &unit, body_fat, note, date, json),
            StatsCommands::Show { date, json } => cmd_stats_show(&svc, &session, date, json),
            StatsCommands::List { json } => cmd_stats_list(&svc, &session, json),
            StatsCommands::Delete { date, json } => cmd_stats_delete(&svc, &session, date, json),
        },
        Commands::Summary { date, json } => cmd_summary(&svc, &session, date, json),
        Commands::History { days, json } => cmd_history(&svc, &session, days, json),
        Commands::Backup { command } => match command {
            BackupCommands::Export { output } => cmd_backup_export(&svc, output.as_deref()),
            BackupCommands::Restore { file, json } => cmd_backup_restore(&svc, &file, json),
        },
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&session_file, json),
            SettingsCommands::Set {
                theme,
                dark_mode,
                system_theme,
                notifications,
                lunch,
                dinner,
                json,
            } => cmd_settings_set(
                &session_file,
                SettingsChange {
                    theme,
                    dark_mode,
                    system_theme,
                    notifications,
                    lunch,
                    dinner,
                },
                json,
            ),
        },
    };

    if result.is_ok() && writes_store && !svc.is_durable() {
        eprintln!(
            "Warning: storage at {} is unavailable; this change was not saved",
            config.db_path.display()
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(args: &[&str]) -> bool {
        let mut argv = vec!["nutritrack"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap().command.writes_store()
    }

    #[test]
    fn test_writes_store_for_mutating_commands() {
        assert!(writes(&["food", "log", "Oats", "--calories", "150"]));
        assert!(writes(&["food", "delete", "abc"]));
        assert!(writes(&["stats", "set", "--weight", "80"]));
        assert!(writes(&["profile", "delete", "u1"]));
        assert!(writes(&["backup", "restore", "backup.json"]));
    }

    #[test]
    fn test_read_only_commands_do_not_write_store() {
        assert!(!writes(&["food", "list"]));
        assert!(!writes(&["stats", "list"]));
        assert!(!writes(&["summary"]));
        assert!(!writes(&["history", "--days", "3"]));
        assert!(!writes(&["profile", "switch", "u1"]));
        assert!(!writes(&["settings", "show"]));
        assert!(!writes(&["backup", "export"]));
    }
}
