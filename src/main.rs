//! HabitForge - Habit and Goal Tracking Engine
//!
//! Main entry point: opens the data directory, runs migrations, seeds the
//! achievement catalog, and prints a short status summary.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use habitforge::actions::ActionContext;
use habitforge::storage::{self, Database};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HabitForge v{}", env!("CARGO_PKG_VERSION"));

    let config = storage::load_config().context("Failed to load configuration")?;
    std::fs::create_dir_all(&config.data_dir).context("Failed to create data directory")?;

    let db =
        Database::open(&config.database_path()).context("Failed to open database")?;
    tracing::info!(
        "Database ready at {} (schema v{})",
        config.database_path().display(),
        db.get_schema_version().unwrap_or(0)
    );

    let ctx = ActionContext::new(db, &config).context("Failed to initialize")?;

    let leaderboard = ctx.leaderboard(10)?;
    if leaderboard.is_empty() {
        println!("No users yet. Use the habitforge library API to create some.");
    } else {
        println!("Top users:");
        for entry in leaderboard {
            println!(
                "  #{:<3} {:<24} {:>6} pts ({} habits, {} goals, {}-day streak)",
                entry.rank,
                entry.user_name,
                entry.stats.total_score,
                entry.stats.total_habits,
                entry.stats.completed_goals,
                entry.stats.current_streak,
            );
        }
    }

    Ok(())
}
