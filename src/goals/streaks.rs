//! Streak and adherence derivation.
//!
//! Read-side scans over completed attempts; nothing here mutates.

use chrono::{Duration, NaiveDate, Utc};
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::manager::GoalError;

/// Lookback window for the current-streak scan, in days.
pub const STREAK_WINDOW_DAYS: i64 = 30;

/// Per-habit streak summary over a date window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitStreak {
    pub habit_id: Uuid,
    pub habit_name: String,
    /// Run of consecutive completed days anchored at the most recent one
    pub current_streak: u32,
    /// Longest run of consecutive completed days in the window
    pub max_streak: u32,
}

/// Completion rate for one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAdherence {
    pub date: NaiveDate,
    pub total: u32,
    pub completed: u32,
    /// `completed / total * 100`, 0 when total is 0
    pub rate: f64,
}

/// Completion rates split by habit classification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdherenceSplit {
    pub good_rate: f64,
    pub bad_rate: f64,
}

/// Streak and adherence queries.
pub struct StreakService<'a> {
    conn: &'a Connection,
}

impl<'a> StreakService<'a> {
    /// Create a new streak service with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Current streak anchored at today.
    ///
    /// Consecutive calendar days, counting backward, with at least one
    /// completed attempt; a gap of more than one day breaks the run. A
    /// streak only counts as current when it was active today or
    /// yesterday.
    pub fn current_streak(&self, user_id: Uuid) -> Result<u32, GoalError> {
        self.current_streak_on(user_id, Utc::now().date_naive())
    }

    /// Current streak anchored at an explicit date.
    pub fn current_streak_on(&self, user_id: Uuid, today: NaiveDate) -> Result<u32, GoalError> {
        let window_start = today - Duration::days(STREAK_WINDOW_DAYS);

        let mut stmt = self.conn.prepare(
            "SELECT DISTINCT a.date
             FROM goal_attempts a
             JOIN goals g ON a.goal_id = g.id
             WHERE g.user_id = ?1 AND a.is_completed = 1
               AND a.date >= ?2 AND a.date <= ?3
             ORDER BY a.date DESC",
        )?;

        let rows = stmt.query_map(
            params![
                user_id.to_string(),
                window_start.to_string(),
                today.to_string()
            ],
            |row| row.get::<_, String>(0),
        )?;

        let dates: Vec<NaiveDate> = rows
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
            .collect();

        let most_recent = match dates.first() {
            Some(d) => *d,
            None => return Ok(0),
        };

        // Not active today or yesterday: the streak has already lapsed.
        if today - most_recent > Duration::days(1) {
            return Ok(0);
        }

        let mut streak = 1u32;
        for pair in dates.windows(2) {
            if pair[0] - pair[1] == Duration::days(1) {
                streak += 1;
            } else {
                break;
            }
        }

        Ok(streak)
    }

    /// Streak and max-streak per habit over `[start, end]`.
    ///
    /// The running counter resets on a gap and the scan continues through
    /// the whole window, so `max_streak` is the true longest run.
    pub fn habit_streaks(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<HabitStreak>, GoalError> {
        let mut habit_stmt = self
            .conn
            .prepare("SELECT id, name FROM habits WHERE user_id = ?1 ORDER BY created_at DESC")?;

        let habits: Vec<(Uuid, String)> = habit_stmt
            .query_map(params![user_id.to_string()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(id, name)| Uuid::parse_str(&id).ok().map(|id| (id, name)))
            .collect();

        let mut date_stmt = self.conn.prepare(
            "SELECT DISTINCT a.date
             FROM goal_attempts a
             JOIN goals g ON a.goal_id = g.id
             WHERE g.habit_id = ?1 AND a.is_completed = 1
               AND a.date >= ?2 AND a.date <= ?3
             ORDER BY a.date DESC",
        )?;

        let mut result = Vec::with_capacity(habits.len());
        for (habit_id, habit_name) in habits {
            let rows = date_stmt.query_map(
                params![habit_id.to_string(), start.to_string(), end.to_string()],
                |row| row.get::<_, String>(0),
            )?;

            let dates: Vec<NaiveDate> = rows
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
                .collect();

            let (current, max) = scan_runs(&dates);
            result.push(HabitStreak {
                habit_id,
                habit_name,
                current_streak: current,
                max_streak: max,
            });
        }

        Ok(result)
    }

    /// Completion rate per date over `[start, end]`, dates with attempts only.
    pub fn daily_adherence(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyAdherence>, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT a.date, COUNT(*), SUM(a.is_completed)
             FROM goal_attempts a
             JOIN goals g ON a.goal_id = g.id
             WHERE g.user_id = ?1 AND a.date >= ?2 AND a.date <= ?3
             GROUP BY a.date
             ORDER BY a.date ASC",
        )?;

        let rows = stmt.query_map(
            params![user_id.to_string(), start.to_string(), end.to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            },
        )?;

        let mut result = Vec::new();
        for row in rows {
            let (date_str, total, completed) = row?;
            let date = match NaiveDate::parse_from_str(&date_str, "%Y-%m-%d") {
                Ok(d) => d,
                Err(_) => continue,
            };
            result.push(DailyAdherence {
                date,
                total,
                completed,
                rate: completion_rate(completed, total),
            });
        }

        Ok(result)
    }

    /// Completion rate split by good/bad habit over `[start, end]`.
    pub fn adherence_split(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AdherenceSplit, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT h.is_good, COUNT(*), SUM(a.is_completed)
             FROM goal_attempts a
             JOIN goals g ON a.goal_id = g.id
             JOIN habits h ON g.habit_id = h.id
             WHERE g.user_id = ?1 AND a.date >= ?2 AND a.date <= ?3
             GROUP BY h.is_good",
        )?;

        let rows = stmt.query_map(
            params![user_id.to_string(), start.to_string(), end.to_string()],
            |row| {
                Ok((
                    row.get::<_, bool>(0)?,
                    row.get::<_, u32>(1)?,
                    row.get::<_, u32>(2)?,
                ))
            },
        )?;

        let mut split = AdherenceSplit::default();
        for row in rows {
            let (is_good, total, completed) = row?;
            let rate = completion_rate(completed, total);
            if is_good {
                split.good_rate = rate;
            } else {
                split.bad_rate = rate;
            }
        }

        Ok(split)
    }

    /// Completion rate for a single goal.
    pub fn goal_completion_rate(&self, goal_id: Uuid) -> Result<f64, GoalError> {
        let (total, completed): (u32, u32) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(is_completed), 0)
             FROM goal_attempts WHERE goal_id = ?1",
            params![goal_id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(completion_rate(completed, total))
    }
}

/// `completed / total * 100`, defaulting to 0 for an empty set.
fn completion_rate(completed: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

/// Walk dates (descending, distinct) and return (run anchored at the most
/// recent date, longest run anywhere).
fn scan_runs(dates: &[NaiveDate]) -> (u32, u32) {
    if dates.is_empty() {
        return (0, 0);
    }

    let mut current = 0u32;
    let mut max = 1u32;
    let mut run = 1u32;
    let mut first_run = true;

    for pair in dates.windows(2) {
        if pair[0] - pair[1] == Duration::days(1) {
            run += 1;
        } else {
            if first_run {
                current = run;
                first_run = false;
            }
            max = max.max(run);
            run = 1;
        }
    }

    if first_run {
        current = run;
    }
    max = max.max(run);

    (current, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::manager::GoalManager;
    use crate::goals::types::{Goal, Weekday};
    use crate::goals::AttemptManager;
    use crate::habits::{Habit, HabitManager};
    use crate::storage::Database;
    use chrono::Datelike;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Create a daily goal covering January 2024 and complete the given days.
    fn seed_daily_goal(conn: &Connection, user_id: Uuid, completed_days: &[u32]) -> Uuid {
        let habit = Habit::new(user_id, "Journal".to_string(), true);
        HabitManager::new(conn).create(&habit).unwrap();

        let goal = Goal::new(
            user_id,
            habit.id,
            "Journal daily".to_string(),
            date(2024, 1, 1),
            date(2024, 1, 31),
            31,
            Weekday::ALL.to_vec(),
        );
        GoalManager::new(conn).create(&goal).unwrap();

        let attempts = AttemptManager::new(conn);
        attempts.create_for_goal(goal.id).unwrap();

        for attempt in attempts.list_for_goal(goal.id).unwrap() {
            if completed_days.contains(&attempt.date.day()) {
                attempts.record_outcome(attempt.id, true, None).unwrap();
            }
        }

        habit.id
    }

    #[test]
    fn test_current_streak_three_days() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        seed_daily_goal(db.connection(), user_id, &[3, 4, 5]);

        let service = StreakService::new(db.connection());
        assert_eq!(
            service.current_streak_on(user_id, date(2024, 1, 5)).unwrap(),
            3
        );
    }

    #[test]
    fn test_current_streak_lapsed_resets_to_zero() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        seed_daily_goal(db.connection(), user_id, &[3]);

        let service = StreakService::new(db.connection());
        // Last completion two days before today
        assert_eq!(
            service.current_streak_on(user_id, date(2024, 1, 5)).unwrap(),
            0
        );
    }

    #[test]
    fn test_current_streak_active_yesterday_counts() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        seed_daily_goal(db.connection(), user_id, &[8, 9, 10]);

        let service = StreakService::new(db.connection());
        assert_eq!(
            service
                .current_streak_on(user_id, date(2024, 1, 11))
                .unwrap(),
            3
        );
    }

    #[test]
    fn test_current_streak_no_completions() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        seed_daily_goal(db.connection(), user_id, &[]);

        let service = StreakService::new(db.connection());
        assert_eq!(
            service.current_streak_on(user_id, date(2024, 1, 5)).unwrap(),
            0
        );
    }

    #[test]
    fn test_habit_streaks_full_window_max() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        // Runs: 2-6 Jan (5 days), then 10-11 Jan (2 days)
        let habit_id = seed_daily_goal(db.connection(), user_id, &[2, 3, 4, 5, 6, 10, 11]);

        let service = StreakService::new(db.connection());
        let streaks = service
            .habit_streaks(user_id, date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(streaks.len(), 1);
        let s = &streaks[0];
        assert_eq!(s.habit_id, habit_id);
        // Current run is the one anchored at the newest date; max is the
        // older five-day run, found despite the gap.
        assert_eq!(s.current_streak, 2);
        assert_eq!(s.max_streak, 5);
    }

    #[test]
    fn test_scan_runs_single_date() {
        assert_eq!(scan_runs(&[date(2024, 1, 5)]), (1, 1));
        assert_eq!(scan_runs(&[]), (0, 0));
    }

    #[test]
    fn test_daily_adherence_rates() {
        let db = Database::open_in_memory().unwrap();
        let user_id = Uuid::new_v4();
        seed_daily_goal(db.connection(), user_id, &[1]);

        let service = StreakService::new(db.connection());
        let rows = service
            .daily_adherence(user_id, date(2024, 1, 1), date(2024, 1, 2))
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rate, 100.0);
        assert_eq!(rows[1].rate, 0.0);
    }

    #[test]
    fn test_goal_completion_rate_empty_goal() {
        let db = Database::open_in_memory().unwrap();
        let service = StreakService::new(db.connection());

        // No attempts at all: rate defaults to 0, not an error
        assert_eq!(service.goal_completion_rate(Uuid::new_v4()).unwrap(), 0.0);
    }
}
