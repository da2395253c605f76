//! Achievement evaluation engine.
//!
//! Compares derived per-user metrics against catalog requirements and
//! maintains progress/unlock rows. Unlock timestamps are monotonic: once
//! set they never move.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{Achievement, AchievementCategory, AchievementUnlocked, UserAchievement};
use crate::goals::{GoalError, GoalManager, StreakService};
use crate::habits::{HabitError, HabitManager};

/// Achievement engine over the persisted catalog and progress rows.
pub struct AchievementEngine<'a> {
    conn: &'a Connection,
}

impl<'a> AchievementEngine<'a> {
    /// Create a new achievement engine with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Update a user's progress on one achievement.
    ///
    /// Inserts the progress row lazily. Returns the unlock event on a
    /// locked-to-unlocked transition; re-evaluating an already unlocked
    /// achievement only updates progress and returns `None`.
    pub fn evaluate_and_update(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
        progress: u32,
    ) -> Result<Option<AchievementUnlocked>, AchievementError> {
        let achievement = self
            .get_achievement(achievement_id)?
            .ok_or(AchievementError::NotFound(achievement_id))?;

        let existing = self.get_user_achievement(user_id, achievement_id)?;
        let unlocked = progress >= achievement.requirement;
        let now = Utc::now();

        match existing {
            None => {
                let unlocked_at = unlocked.then_some(now);
                self.conn.execute(
                    "INSERT INTO user_achievements
                     (id, user_id, achievement_id, progress, unlocked_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        Uuid::new_v4().to_string(),
                        user_id.to_string(),
                        achievement_id.to_string(),
                        progress,
                        unlocked_at.map(|t| t.to_rfc3339()),
                    ],
                )?;

                Ok(unlocked.then(|| unlock_event(achievement, user_id, now)))
            }
            Some(row) if row.is_unlocked() => {
                // Already unlocked: progress may move, the timestamp never does.
                self.conn.execute(
                    "UPDATE user_achievements SET progress = ?1 WHERE id = ?2",
                    params![progress, row.id.to_string()],
                )?;

                Ok(None)
            }
            Some(row) => {
                let unlocked_at = unlocked.then_some(now);
                self.conn.execute(
                    "UPDATE user_achievements SET progress = ?1, unlocked_at = ?2 WHERE id = ?3",
                    params![
                        progress,
                        unlocked_at.map(|t| t.to_rfc3339()),
                        row.id.to_string(),
                    ],
                )?;

                Ok(unlocked.then(|| unlock_event(achievement, user_id, now)))
            }
        }
    }

    /// Evaluate every measurable category for a user.
    ///
    /// Habits: habit count. Goals: goals whose completed-attempt count
    /// reached their success threshold. Streaks: current streak. Social is
    /// never auto-evaluated. Returns all unlock events in catalog order.
    pub fn evaluate_all_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<AchievementUnlocked>, AchievementError> {
        let habit_count = HabitManager::new(self.conn).count_for_user(user_id)?;
        let goal_count = GoalManager::new(self.conn).count_reached_for_user(user_id)?;
        let streak = StreakService::new(self.conn).current_streak(user_id)?;

        let mut unlocks = Vec::new();
        for category in AchievementCategory::MEASURABLE {
            let metric = match category {
                AchievementCategory::Habits => habit_count,
                AchievementCategory::Goals => goal_count,
                AchievementCategory::Streaks => streak,
                AchievementCategory::Social => unreachable!(),
            };

            for achievement in self.achievements_in_category(category)? {
                if let Some(unlock) =
                    self.evaluate_and_update(user_id, achievement.id, metric)?
                {
                    unlocks.push(unlock);
                }
            }
        }

        Ok(unlocks)
    }

    /// Count a user's unlocked achievements.
    pub fn unlocked_count(&self, user_id: Uuid) -> Result<u32, AchievementError> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM user_achievements
                 WHERE user_id = ?1 AND unlocked_at IS NOT NULL",
                params![user_id.to_string()],
                |row| row.get(0),
            )
            .map_err(AchievementError::from)
    }

    /// Get one achievement definition.
    pub fn get_achievement(&self, id: Uuid) -> Result<Option<Achievement>, AchievementError> {
        self.conn
            .query_row(
                "SELECT id, name, description, category, icon, requirement, xp
                 FROM achievements WHERE id = ?1",
                params![id.to_string()],
                parse_achievement_row,
            )
            .optional()
            .map_err(AchievementError::from)
    }

    /// All catalog achievements in a category.
    pub fn achievements_in_category(
        &self,
        category: AchievementCategory,
    ) -> Result<Vec<Achievement>, AchievementError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, description, category, icon, requirement, xp
             FROM achievements WHERE category = ?1 ORDER BY requirement ASC",
        )?;

        let rows = stmt.query_map(params![category.display_name()], parse_achievement_row)?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(AchievementError::from)
    }

    /// Get a user's progress row for an achievement, if any.
    pub fn get_user_achievement(
        &self,
        user_id: Uuid,
        achievement_id: Uuid,
    ) -> Result<Option<UserAchievement>, AchievementError> {
        self.conn
            .query_row(
                "SELECT id, user_id, achievement_id, progress, unlocked_at
                 FROM user_achievements WHERE user_id = ?1 AND achievement_id = ?2",
                params![user_id.to_string(), achievement_id.to_string()],
                parse_user_achievement_row,
            )
            .optional()
            .map_err(AchievementError::from)
    }
}

fn unlock_event(
    achievement: Achievement,
    user_id: Uuid,
    unlocked_at: DateTime<Utc>,
) -> AchievementUnlocked {
    tracing::info!("User {} unlocked '{}'", user_id, achievement.name);
    AchievementUnlocked {
        achievement,
        user_id,
        unlocked_at,
    }
}

/// Parse a database row into an Achievement.
fn parse_achievement_row(row: &rusqlite::Row) -> rusqlite::Result<Achievement> {
    let id_str: String = row.get(0)?;
    let category_str: String = row.get(3)?;

    Ok(Achievement {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        name: row.get(1)?,
        description: row.get(2)?,
        category: AchievementCategory::from_str(&category_str)
            .unwrap_or(AchievementCategory::Habits),
        icon: row.get(4)?,
        requirement: row.get(5)?,
        xp: row.get(6)?,
    })
}

/// Parse a database row into a UserAchievement.
fn parse_user_achievement_row(row: &rusqlite::Row) -> rusqlite::Result<UserAchievement> {
    let id_str: String = row.get(0)?;
    let user_id_str: String = row.get(1)?;
    let achievement_id_str: String = row.get(2)?;
    let unlocked_at_str: Option<String> = row.get(4)?;

    Ok(UserAchievement {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        achievement_id: Uuid::parse_str(&achievement_id_str).unwrap_or_default(),
        progress: row.get(3)?,
        unlocked_at: unlocked_at_str.and_then(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|t| t.with_timezone(&Utc))
                .ok()
        }),
    })
}

/// Achievement engine errors.
#[derive(Debug, thiserror::Error)]
pub enum AchievementError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Achievement not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    HabitError(#[from] HabitError),

    #[error(transparent)]
    GoalError(#[from] GoalError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::achievements::catalog::seed_catalog;
    use crate::storage::Database;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        seed_catalog(db.connection()).unwrap();
        db
    }

    fn achievement_by_name(conn: &Connection, name: &str) -> Achievement {
        conn.query_row(
            "SELECT id, name, description, category, icon, requirement, xp
             FROM achievements WHERE name = ?1",
            params![name],
            parse_achievement_row,
        )
        .unwrap()
    }

    #[test]
    fn test_progress_row_created_lazily() {
        let db = setup();
        let engine = AchievementEngine::new(db.connection());
        let user_id = Uuid::new_v4();
        let first_habit = achievement_by_name(db.connection(), "First Habit");

        assert!(engine
            .get_user_achievement(user_id, first_habit.id)
            .unwrap()
            .is_none());

        let unlock = engine
            .evaluate_and_update(user_id, first_habit.id, 0)
            .unwrap();
        assert!(unlock.is_none());

        let row = engine
            .get_user_achievement(user_id, first_habit.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.progress, 0);
        assert!(!row.is_unlocked());
    }

    #[test]
    fn test_unlock_transition_reported_once() {
        let db = setup();
        let engine = AchievementEngine::new(db.connection());
        let user_id = Uuid::new_v4();
        let collector = achievement_by_name(db.connection(), "Habit Collector");

        let unlock = engine
            .evaluate_and_update(user_id, collector.id, 5)
            .unwrap();
        assert!(unlock.is_some());

        // Same or higher progress must not re-notify
        assert!(engine
            .evaluate_and_update(user_id, collector.id, 6)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_unlock_timestamp_monotonic() {
        let db = setup();
        let engine = AchievementEngine::new(db.connection());
        let user_id = Uuid::new_v4();
        let warming_up = achievement_by_name(db.connection(), "Warming Up");

        engine
            .evaluate_and_update(user_id, warming_up.id, 3)
            .unwrap();
        let first = engine
            .get_user_achievement(user_id, warming_up.id)
            .unwrap()
            .unwrap();
        let ts = first.unlocked_at.unwrap();

        // Re-evaluations with lower and higher progress leave the timestamp
        for progress in [0, 10] {
            engine
                .evaluate_and_update(user_id, warming_up.id, progress)
                .unwrap();
            let row = engine
                .get_user_achievement(user_id, warming_up.id)
                .unwrap()
                .unwrap();
            assert_eq!(row.unlocked_at, Some(ts));
            assert_eq!(row.progress, progress);
        }
    }

    #[test]
    fn test_evaluate_missing_achievement_errors() {
        let db = setup();
        let engine = AchievementEngine::new(db.connection());

        assert!(matches!(
            engine.evaluate_and_update(Uuid::new_v4(), Uuid::new_v4(), 1),
            Err(AchievementError::NotFound(_))
        ));
    }

    #[test]
    fn test_evaluate_all_unlocks_habit_tiers() {
        use crate::habits::{Habit, HabitManager};

        let db = setup();
        let conn = db.connection();
        let engine = AchievementEngine::new(conn);
        let habits = HabitManager::new(conn);
        let user_id = Uuid::new_v4();

        for i in 0..5 {
            habits
                .create(&Habit::new(user_id, format!("Habit {i}"), true))
                .unwrap();
        }

        let unlocks = engine.evaluate_all_for_user(user_id).unwrap();
        let names: Vec<&str> = unlocks
            .iter()
            .map(|u| u.achievement.name.as_str())
            .collect();

        assert!(names.contains(&"First Habit"));
        assert!(names.contains(&"Habit Collector"));
        assert!(!names.contains(&"Habit Architect"));
        assert_eq!(engine.unlocked_count(user_id).unwrap(), 2);

        // Social achievements must not have progress rows
        let friendly = achievement_by_name(conn, "Friendly Face");
        assert!(engine
            .get_user_achievement(user_id, friendly.id)
            .unwrap()
            .is_none());
    }
}
