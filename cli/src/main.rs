mod commands;
mod config;
mod logging;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    CreateUserArgs, HistoryRange, Nutrients, cmd_day, cmd_delete, cmd_goals_recalc,
    cmd_goals_set_calories, cmd_goals_set_type, cmd_goals_set_weight, cmd_goals_show,
    cmd_history, cmd_log, cmd_totals, cmd_user_create, cmd_user_delete, cmd_user_metrics,
    cmd_user_show,
};
use crate::config::Config;
use bite_core::LedgerService;

#[derive(Parser)]
#[command(
    name = "bite",
    version,
    about = "A nutrition ledger: food log, daily totals, and calorie goals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage user profiles
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
    /// Log a food entry with its nutrition values
    Log {
        /// User ID
        user: i64,
        /// Food name
        name: String,
        /// Quantity eaten in grams (e.g. "150" or "150g")
        quantity: String,
        /// Calories for this entry
        #[arg(long)]
        calories: f64,
        /// Protein (g) for this entry
        #[arg(long, default_value = "0")]
        protein: f64,
        /// Carbs (g) for this entry
        #[arg(long, default_value = "0")]
        carbs: f64,
        /// Fat (g) for this entry
        #[arg(long, default_value = "0")]
        fat: f64,
        /// External food reference (e.g. a USDA FDC id; defaults to the name)
        #[arg(long)]
        food_ref: Option<String>,
        /// Date to log for (YYYY-MM-DD or today/yesterday, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Time eaten (HH:MM)
        #[arg(long)]
        time: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a food entry by ID
    Delete {
        /// Entry ID to delete
        entry_id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List a day's entries, newest first (defaults to today)
    Day {
        /// User ID
        user: i64,
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a day's totals against the calorie goal
    Totals {
        /// User ID
        user: i64,
        /// Date to show (YYYY-MM-DD or today/yesterday, default: today)
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one row per day over a range of at most 31 days
    History {
        /// User ID
        user: i64,
        /// First day (YYYY-MM-DD, default: six days before --end)
        #[arg(long)]
        start: Option<String>,
        /// Last day (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Number of days ending today (default: 7)
        #[arg(short, long)]
        days: Option<u32>,
        /// Output as CSV
        #[arg(long, conflicts_with = "json")]
        csv: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change calorie and macro goals
    Goals {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Start the JSON API server
    Serve {
        /// Port to listen on (default: from config, else 8080)
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind to (default: from config, else 127.0.0.1)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user profile
    Create {
        /// Unique username
        username: String,
        /// Gender (male/female), used for the calorie estimate
        #[arg(long)]
        gender: String,
        /// Birthdate (YYYY-MM-DD)
        #[arg(long)]
        birthdate: String,
        /// Height in cm
        #[arg(long)]
        height: f64,
        /// Weight in kg
        #[arg(long)]
        weight: f64,
        /// Activity level: sedentary, light, moderate, active, very_active
        #[arg(long, default_value = "sedentary")]
        activity: String,
        /// Goal: lose, maintain, gain
        #[arg(long, default_value = "maintain")]
        goal: String,
        /// Daily calorie goal (default: estimated from body metrics)
        #[arg(long)]
        calories: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show a user profile
    Show {
        /// User ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a user and all of their data
    Delete {
        /// User ID
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update body metrics (calorie goal is not changed)
    Metrics {
        /// User ID
        id: i64,
        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
        /// Height in cm
        #[arg(long)]
        height: Option<f64>,
        /// Activity level: sedentary, light, moderate, active, very_active
        #[arg(long)]
        activity: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Show the goal profile
    Show {
        /// User ID
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the daily calorie goal; macros follow the goal type
    SetCalories {
        /// User ID
        user: i64,
        /// Daily calorie goal
        calories: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the goal type (lose, maintain, gain); calories are kept
    SetType {
        /// User ID
        user: i64,
        /// Goal type
        goal: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set the target weight in kg
    SetWeight {
        /// User ID
        user: i64,
        /// Target weight in kg
        weight: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Re-estimate the calorie goal from current body metrics
    Recalc {
        /// User ID
        user: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    logging::init(&config.log_level);
    let svc = LedgerService::open_with_timeout(&config.db_path, config.busy_timeout)?;

    match cli.command {
        Commands::User { command } => match command {
            UserCommands::Create {
                username,
                gender,
                birthdate,
                height,
                weight,
                activity,
                goal,
                calories,
                json,
            } => cmd_user_create(
                &svc,
                CreateUserArgs {
                    username,
                    gender,
                    birthdate,
                    height_cm: height,
                    weight_kg: weight,
                    activity,
                    goal,
                    calories,
                },
                json,
            ),
            UserCommands::Show { id, json } => cmd_user_show(&svc, id, json),
            UserCommands::Delete { id, json } => cmd_user_delete(&svc, id, json),
            UserCommands::Metrics {
                id,
                weight,
                height,
                activity,
                json,
            } => cmd_user_metrics(&svc, id, weight, height, activity.as_deref(), json),
        },
        Commands::Log {
            user,
            name,
            quantity,
            calories,
            protein,
            carbs,
            fat,
            food_ref,
            date,
            time,
            json,
        } => cmd_log(
            &svc,
            user,
            &name,
            &quantity,
            food_ref,
            Nutrients {
                calories,
                protein,
                carbs,
                fat,
            },
            date,
            time.as_deref(),
            json,
        ),
        Commands::Delete { entry_id, json } => cmd_delete(&svc, entry_id, json),
        Commands::Day { user, date, json } => cmd_day(&svc, user, date, json),
        Commands::Totals { user, date, json } => cmd_totals(&svc, user, date, json),
        Commands::History {
            user,
            start,
            end,
            days,
            csv,
            json,
        } => cmd_history(&svc, user, HistoryRange { start, end, days }, csv, json),
        Commands::Goals { command } => match command {
            GoalCommands::Show { user, json } => cmd_goals_show(&svc, user, json),
            GoalCommands::SetCalories {
                user,
                calories,
                json,
            } => cmd_goals_set_calories(&svc, user, calories, json),
            GoalCommands::SetType { user, goal, json } => {
                cmd_goals_set_type(&svc, user, &goal, json)
            }
            GoalCommands::SetWeight { user, weight, json } => {
                cmd_goals_set_weight(&svc, user, weight, json)
            }
            GoalCommands::Recalc { user, json } => cmd_goals_recalc(&svc, user, json),
        },
        Commands::Serve { port, bind } => {
            let port = port.unwrap_or(config.server.port);
            let bind = bind.unwrap_or(config.server.bind);
            server::start_server(svc, port, &bind).await
        }
    }
}
