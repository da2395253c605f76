//! Denormalized per-user stats and the leaderboard built on them.
//!
//! The stats row is a cache recomputed wholesale from the authoritative
//! tables on every relevant mutation; it is never the source of truth.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use crate::achievements::{AchievementEngine, AchievementError};
use crate::goals::{GoalError, GoalManager, StreakService};
use crate::habits::{HabitError, HabitManager};

/// Score weights: habits, completed goals, achievements, streak days.
const SCORE_HABIT: u32 = 10;
const SCORE_GOAL: u32 = 50;
const SCORE_ACHIEVEMENT: u32 = 100;
const SCORE_STREAK_DAY: u32 = 5;

/// Denormalized per-user stats snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: Uuid,
    pub total_habits: u32,
    pub completed_goals: u32,
    pub achievements_unlocked: u32,
    pub current_streak: u32,
    pub total_score: u32,
}

impl UserStats {
    /// Derive the total score from the component counts.
    pub fn score(
        total_habits: u32,
        completed_goals: u32,
        achievements_unlocked: u32,
        current_streak: u32,
    ) -> u32 {
        total_habits * SCORE_HABIT
            + completed_goals * SCORE_GOAL
            + achievements_unlocked * SCORE_ACHIEVEMENT
            + current_streak * SCORE_STREAK_DAY
    }
}

/// One leaderboard row.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub user_name: String,
    pub stats: UserStats,
}

/// Stats aggregation service.
pub struct StatsAggregator<'a> {
    conn: &'a Connection,
}

impl<'a> StatsAggregator<'a> {
    /// Create a new stats aggregator with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Recompute a user's stats row from the authoritative tables.
    ///
    /// Deterministic and idempotent on the stat fields.
    pub fn recompute(&self, user_id: Uuid) -> Result<UserStats, StatsError> {
        let total_habits = HabitManager::new(self.conn).count_for_user(user_id)?;
        let completed_goals = GoalManager::new(self.conn).count_reached_for_user(user_id)?;
        let achievements_unlocked =
            AchievementEngine::new(self.conn).unlocked_count(user_id)?;
        let current_streak = StreakService::new(self.conn).current_streak(user_id)?;

        let stats = UserStats {
            user_id,
            total_habits,
            completed_goals,
            achievements_unlocked,
            current_streak,
            total_score: UserStats::score(
                total_habits,
                completed_goals,
                achievements_unlocked,
                current_streak,
            ),
        };

        self.conn.execute(
            "INSERT INTO user_stats
             (user_id, total_habits, completed_goals, achievements_unlocked,
              current_streak, total_score, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(user_id) DO UPDATE SET
               total_habits = excluded.total_habits,
               completed_goals = excluded.completed_goals,
               achievements_unlocked = excluded.achievements_unlocked,
               current_streak = excluded.current_streak,
               total_score = excluded.total_score,
               updated_at = excluded.updated_at",
            params![
                user_id.to_string(),
                stats.total_habits,
                stats.completed_goals,
                stats.achievements_unlocked,
                stats.current_streak,
                stats.total_score,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(stats)
    }

    /// Get a user's persisted stats row, if any.
    pub fn get(&self, user_id: Uuid) -> Result<Option<UserStats>, StatsError> {
        self.conn
            .query_row(
                "SELECT user_id, total_habits, completed_goals, achievements_unlocked,
                        current_streak, total_score
                 FROM user_stats WHERE user_id = ?1",
                params![user_id.to_string()],
                parse_stats_row,
            )
            .optional()
            .map_err(StatsError::from)
    }

    /// Top users by score, descending.
    ///
    /// Users without a stats row rank as score 0 on the first pass; any
    /// such user in the result is lazily recomputed and the query re-run,
    /// so every returned row carries a concrete persisted score.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let limit = if limit > 0 { limit } else { 10 };

        let missing = self.query_top_missing(limit)?;
        if !missing.is_empty() {
            for user_id in missing {
                self.recompute(user_id)?;
            }
        }

        self.query_top(limit)
    }

    /// User ids inside the top `limit` that have no stats row yet.
    fn query_top_missing(&self, limit: usize) -> Result<Vec<Uuid>, StatsError> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, s.user_id IS NULL
             FROM users u
             LEFT JOIN user_stats s ON s.user_id = u.id
             ORDER BY COALESCE(s.total_score, 0) DESC, u.created_at ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, bool>(1)?))
        })?;

        Ok(rows
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter(|(_, missing)| *missing)
            .filter_map(|(s, _)| Uuid::parse_str(&s).ok())
            .collect())
    }

    fn query_top(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StatsError> {
        let mut stmt = self.conn.prepare(
            "SELECT u.id, u.name, s.total_habits, s.completed_goals,
                    s.achievements_unlocked, s.current_streak, s.total_score
             FROM users u
             JOIN user_stats s ON s.user_id = u.id
             ORDER BY s.total_score DESC, u.created_at ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let id_str: String = row.get(0)?;
            let user_id = Uuid::parse_str(&id_str).unwrap_or_default();
            Ok((
                user_id,
                row.get::<_, String>(1)?,
                UserStats {
                    user_id,
                    total_habits: row.get(2)?,
                    completed_goals: row.get(3)?,
                    achievements_unlocked: row.get(4)?,
                    current_streak: row.get(5)?,
                    total_score: row.get(6)?,
                },
            ))
        })?;

        let mut entries = Vec::new();
        let mut rank = 0u32;
        for row in rows {
            let (user_id, user_name, stats) = row?;
            rank += 1;
            entries.push(LeaderboardEntry {
                rank,
                user_id,
                user_name,
                stats,
            });
        }

        Ok(entries)
    }
}

/// Parse a database row into UserStats.
fn parse_stats_row(row: &rusqlite::Row) -> rusqlite::Result<UserStats> {
    let user_id_str: String = row.get(0)?;

    Ok(UserStats {
        user_id: Uuid::parse_str(&user_id_str).unwrap_or_default(),
        total_habits: row.get(1)?,
        completed_goals: row.get(2)?,
        achievements_unlocked: row.get(3)?,
        current_streak: row.get(4)?,
        total_score: row.get(5)?,
    })
}

/// Stats aggregation errors.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error(transparent)]
    HabitError(#[from] HabitError),

    #[error(transparent)]
    GoalError(#[from] GoalError),

    #[error(transparent)]
    AchievementError(#[from] AchievementError),
}
