//! Built-in achievement catalog.

use rusqlite::{params, Connection};

use super::{Achievement, AchievementCategory, AchievementError};

/// All built-in achievements.
pub fn all_achievements() -> Vec<Achievement> {
    use AchievementCategory::*;

    vec![
        // Habits
        Achievement::new("First Habit", "Create your first habit", Habits, 1, 50),
        Achievement::new("Habit Collector", "Track 5 habits at once", Habits, 5, 150),
        Achievement::new("Habit Architect", "Track 10 habits at once", Habits, 10, 300),
        Achievement::new("Lifestyle Designer", "Track 25 habits at once", Habits, 25, 750),
        // Goals
        Achievement::new("Goal Getter", "Complete your first goal", Goals, 1, 100),
        Achievement::new("Finisher", "Complete 5 goals", Goals, 5, 250),
        Achievement::new("Overachiever", "Complete 15 goals", Goals, 15, 600),
        Achievement::new("Unstoppable", "Complete 50 goals", Goals, 50, 1500),
        // Streaks
        Achievement::new("Warming Up", "Keep a 3-day streak", Streaks, 3, 100),
        Achievement::new("One Week Strong", "Keep a 7-day streak", Streaks, 7, 250),
        Achievement::new("Habit Machine", "Keep a 14-day streak", Streaks, 14, 500),
        Achievement::new("Iron Will", "Keep a 30-day streak", Streaks, 30, 1000),
        // Social (catalog-only; granted by social features, never auto-evaluated)
        Achievement::new("Friendly Face", "Add your first friend", Social, 1, 50),
        Achievement::new("Motivator", "Cheer on 10 friends", Social, 10, 200),
    ]
}

/// Seed the catalog into the database; rows already present are kept.
pub fn seed_catalog(conn: &Connection) -> Result<usize, AchievementError> {
    let mut inserted = 0usize;
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO achievements
         (id, name, description, category, icon, requirement, xp)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;

    for achievement in all_achievements() {
        inserted += stmt.execute(params![
            achievement.id.to_string(),
            achievement.name,
            achievement.description,
            achievement.category.display_name(),
            achievement.icon,
            achievement.requirement,
            achievement.xp,
        ])?;
    }

    if inserted > 0 {
        tracing::info!("Seeded {} catalog achievements", inserted);
    }

    Ok(inserted)
}
