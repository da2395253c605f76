//! Goal-attempt lifecycle: generation, reconciliation, outcome recording.
//!
//! Invariant: a goal has exactly one attempt per date in its inclusive
//! range whose Monday-first weekday is in the goal's recurrence set.
//! Generation establishes it, reconciliation restores it after edits.

use std::collections::HashSet;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::manager::{GoalError, GoalManager};
use super::types::{Goal, GoalAttempt};

/// Result of recording an attempt outcome.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    /// The attempt as updated
    pub attempt: GoalAttempt,
    /// Set when this call transitioned the parent goal to completed
    pub completed_goal: Option<Goal>,
}

/// Manager for goal attempts.
pub struct AttemptManager<'a> {
    conn: &'a Connection,
}

impl<'a> AttemptManager<'a> {
    /// Create a new attempt manager with a database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Generate attempts for a newly created goal.
    ///
    /// One row per qualifying date, inserted in a single transaction.
    /// No-op when zero dates qualify.
    pub fn create_for_goal(&self, goal_id: Uuid) -> Result<usize, GoalError> {
        let goal = GoalManager::new(self.conn).get_required(goal_id)?;
        let dates = goal.scheduled_dates();

        if dates.is_empty() {
            return Ok(0);
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO goal_attempts (id, goal_id, date, is_completed, note)
                 VALUES (?1, ?2, ?3, 0, '')",
            )?;

            for date in &dates {
                stmt.execute(params![
                    Uuid::new_v4().to_string(),
                    goal_id.to_string(),
                    date.to_string(),
                ])?;
            }
        }
        tx.commit()?;

        tracing::debug!("Generated {} attempts for goal {}", dates.len(), goal_id);

        Ok(dates.len())
    }

    /// Reconcile attempts after a goal's range or recurrence changed.
    ///
    /// Inserts attempts for qualifying dates that are missing and deletes
    /// attempts whose date no longer qualifies. Surviving attempts keep
    /// their completion flag and note. The read-diff-write sequence runs in
    /// one transaction so concurrent edits to the same goal serialize.
    pub fn reconcile_for_goal(&self, goal_id: Uuid) -> Result<(), GoalError> {
        let goal = GoalManager::new(self.conn).get_required(goal_id)?;

        let tx = self.conn.unchecked_transaction()?;

        let existing: HashSet<NaiveDate> = {
            let mut stmt =
                tx.prepare("SELECT date FROM goal_attempts WHERE goal_id = ?1")?;
            let rows = stmt.query_map(params![goal_id.to_string()], |row| {
                row.get::<_, String>(0)
            })?;

            rows.collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .filter_map(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
                .collect()
        };

        let desired: HashSet<NaiveDate> = goal.scheduled_dates().into_iter().collect();

        let mut added = 0usize;
        {
            let mut insert = tx.prepare(
                "INSERT INTO goal_attempts (id, goal_id, date, is_completed, note)
                 VALUES (?1, ?2, ?3, 0, '')",
            )?;
            for date in desired.difference(&existing) {
                insert.execute(params![
                    Uuid::new_v4().to_string(),
                    goal_id.to_string(),
                    date.to_string(),
                ])?;
                added += 1;
            }
        }

        let mut removed = 0usize;
        {
            let mut delete =
                tx.prepare("DELETE FROM goal_attempts WHERE goal_id = ?1 AND date = ?2")?;
            for date in existing.difference(&desired) {
                removed += delete.execute(params![goal_id.to_string(), date.to_string()])?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "Reconciled goal {}: +{} / -{} attempts",
            goal_id,
            added,
            removed
        );

        Ok(())
    }

    /// Record an attempt's outcome.
    ///
    /// When the goal's completed-attempt count reaches its success
    /// threshold and the goal is not yet completed, the goal is marked
    /// completed and its remaining incomplete attempts are deleted
    /// (completed ones stay as history). The transition is reported back
    /// exactly once via [`AttemptOutcome::completed_goal`].
    pub fn record_outcome(
        &self,
        attempt_id: Uuid,
        is_completed: bool,
        note: Option<&str>,
    ) -> Result<AttemptOutcome, GoalError> {
        let tx = self.conn.unchecked_transaction()?;

        let updated = match note {
            Some(note) => tx.execute(
                "UPDATE goal_attempts SET is_completed = ?1, note = ?2 WHERE id = ?3",
                params![is_completed, note, attempt_id.to_string()],
            )?,
            None => tx.execute(
                "UPDATE goal_attempts SET is_completed = ?1 WHERE id = ?2",
                params![is_completed, attempt_id.to_string()],
            )?,
        };

        if updated == 0 {
            return Err(GoalError::AttemptNotFound(attempt_id));
        }

        let attempt = query_attempt(&tx, attempt_id)?.ok_or(GoalError::AttemptNotFound(attempt_id))?;

        let goal_manager = GoalManager::new(self.conn);
        let goal = goal_manager.get_required(attempt.goal_id)?;

        let completed_count: u32 = tx.query_row(
            "SELECT COUNT(*) FROM goal_attempts WHERE goal_id = ?1 AND is_completed = 1",
            params![goal.id.to_string()],
            |row| row.get(0),
        )?;

        let mut completed_goal = None;
        if completed_count >= goal.goal_success && !goal.is_completed {
            tx.execute(
                "UPDATE goals SET is_completed = 1 WHERE id = ?1",
                params![goal.id.to_string()],
            )?;
            tx.execute(
                "DELETE FROM goal_attempts WHERE goal_id = ?1 AND is_completed = 0",
                params![goal.id.to_string()],
            )?;

            let mut goal = goal;
            goal.is_completed = true;
            tracing::info!("Goal {} reached its success threshold", goal.id);
            completed_goal = Some(goal);
        }

        tx.commit()?;

        Ok(AttemptOutcome {
            attempt,
            completed_goal,
        })
    }

    /// Get an attempt by ID.
    pub fn get(&self, id: Uuid) -> Result<Option<GoalAttempt>, GoalError> {
        query_attempt(self.conn, id)
    }

    /// All attempts for a goal, ascending by date.
    pub fn list_for_goal(&self, goal_id: Uuid) -> Result<Vec<GoalAttempt>, GoalError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, goal_id, date, is_completed, note, calendar_event_id
             FROM goal_attempts
             WHERE goal_id = ?1
             ORDER BY date ASC",
        )?;

        let rows = stmt.query_map(params![goal_id.to_string()], parse_attempt_row)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(GoalError::from)
    }

    /// Attach or clear an external calendar event reference.
    pub fn set_calendar_event(
        &self,
        attempt_id: Uuid,
        event_id: Option<&str>,
    ) -> Result<(), GoalError> {
        let updated = self.conn.execute(
            "UPDATE goal_attempts SET calendar_event_id = ?1 WHERE id = ?2",
            params![event_id, attempt_id.to_string()],
        )?;

        if updated == 0 {
            return Err(GoalError::AttemptNotFound(attempt_id));
        }

        Ok(())
    }
}

fn query_attempt(conn: &Connection, id: Uuid) -> Result<Option<GoalAttempt>, GoalError> {
    conn.query_row(
        "SELECT id, goal_id, date, is_completed, note, calendar_event_id
         FROM goal_attempts WHERE id = ?1",
        params![id.to_string()],
        parse_attempt_row,
    )
    .optional()
    .map_err(GoalError::from)
}

/// Parse a database row into a GoalAttempt.
fn parse_attempt_row(row: &rusqlite::Row) -> rusqlite::Result<GoalAttempt> {
    let id_str: String = row.get(0)?;
    let goal_id_str: String = row.get(1)?;
    let date_str: String = row.get(2)?;

    Ok(GoalAttempt {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        goal_id: Uuid::parse_str(&goal_id_str).unwrap_or_default(),
        date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
        is_completed: row.get(3)?,
        note: row.get(4)?,
        calendar_event_id: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::types::Weekday;
    use crate::storage::Database;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_goal(
        conn: &Connection,
        start: NaiveDate,
        finish: NaiveDate,
        goal_success: u32,
        week_days: Vec<Weekday>,
    ) -> Goal {
        let goal = Goal::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Test goal".to_string(),
            start,
            finish,
            goal_success,
            week_days,
        );
        GoalManager::new(conn).create(&goal).unwrap();
        goal
    }

    fn attempt_dates(conn: &Connection, goal_id: Uuid) -> BTreeSet<NaiveDate> {
        AttemptManager::new(conn)
            .list_for_goal(goal_id)
            .unwrap()
            .into_iter()
            .map(|a| a.date)
            .collect()
    }

    #[test]
    fn test_generate_matches_schedule() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let attempts = AttemptManager::new(conn);

        // Cases with varied ranges and weekday subsets; the attempt date
        // set must always equal the computed schedule.
        let cases: Vec<(NaiveDate, NaiveDate, Vec<Weekday>)> = vec![
            (date(2024, 3, 1), date(2024, 3, 7), vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday]),
            (date(2024, 1, 1), date(2024, 2, 15), vec![Weekday::Sunday]),
            (date(2024, 2, 28), date(2024, 3, 2), Weekday::ALL.to_vec()),
            (date(2024, 6, 5), date(2024, 6, 5), vec![Weekday::Wednesday]),
            (date(2024, 6, 5), date(2024, 6, 5), vec![Weekday::Thursday]),
        ];

        for (start, finish, week_days) in cases {
            let goal = make_goal(conn, start, finish, 1, week_days);
            attempts.create_for_goal(goal.id).unwrap();

            let expected: BTreeSet<NaiveDate> = goal.scheduled_dates().into_iter().collect();
            assert_eq!(attempt_dates(conn, goal.id), expected);
        }
    }

    #[test]
    fn test_generate_missing_goal_errors() {
        let db = Database::open_in_memory().unwrap();
        let attempts = AttemptManager::new(db.connection());

        assert!(matches!(
            attempts.create_for_goal(Uuid::new_v4()),
            Err(GoalError::NotFound(_))
        ));
    }

    #[test]
    fn test_reconcile_expands_and_shrinks() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let goals = GoalManager::new(conn);
        let attempts = AttemptManager::new(conn);

        let mut goal = make_goal(
            conn,
            date(2024, 3, 1),
            date(2024, 3, 7),
            2,
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        );
        attempts.create_for_goal(goal.id).unwrap();

        // Extend the range and drop Friday
        goal.finish_date = date(2024, 3, 14);
        goal.week_days = vec![Weekday::Monday, Weekday::Wednesday];
        goals.update(&goal).unwrap();
        attempts.reconcile_for_goal(goal.id).unwrap();

        let expected: BTreeSet<NaiveDate> = goal.scheduled_dates().into_iter().collect();
        assert_eq!(attempt_dates(conn, goal.id), expected);
        // Friday 2024-03-01 must be gone, Monday 2024-03-11 must exist
        assert!(!expected.contains(&date(2024, 3, 1)));
        assert!(expected.contains(&date(2024, 3, 11)));
    }

    #[test]
    fn test_reconcile_preserves_completion_and_note() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let goals = GoalManager::new(conn);
        let attempts = AttemptManager::new(conn);

        let mut goal = make_goal(
            conn,
            date(2024, 3, 1),
            date(2024, 3, 7),
            5,
            Weekday::ALL.to_vec(),
        );
        attempts.create_for_goal(goal.id).unwrap();

        let first = attempts.list_for_goal(goal.id).unwrap()[0].clone();
        attempts
            .record_outcome(first.id, true, Some("felt great"))
            .unwrap();

        goal.finish_date = date(2024, 3, 10);
        goals.update(&goal).unwrap();
        attempts.reconcile_for_goal(goal.id).unwrap();

        let survived = attempts.get(first.id).unwrap().unwrap();
        assert!(survived.is_completed);
        assert_eq!(survived.note, "felt great");
        assert_eq!(attempts.list_for_goal(goal.id).unwrap().len(), 10);
    }

    #[test]
    fn test_reconcile_removes_all_when_range_inverts() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let attempts = AttemptManager::new(conn);

        let goal = make_goal(
            conn,
            date(2024, 3, 1),
            date(2024, 3, 7),
            2,
            Weekday::ALL.to_vec(),
        );
        attempts.create_for_goal(goal.id).unwrap();

        // Invert the range behind the manager's back; reconciliation must
        // leave the goal attempt-less rather than fail.
        conn.execute(
            "UPDATE goals SET start_date = '2024-03-07', finish_date = '2024-03-01'
             WHERE id = ?1",
            params![goal.id.to_string()],
        )
        .unwrap();

        attempts.reconcile_for_goal(goal.id).unwrap();
        assert!(attempts.list_for_goal(goal.id).unwrap().is_empty());
    }

    #[test]
    fn test_outcome_auto_completes_goal() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let goals = GoalManager::new(conn);
        let attempts = AttemptManager::new(conn);

        let goal = make_goal(
            conn,
            date(2024, 3, 1),
            date(2024, 3, 7),
            2,
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        );
        attempts.create_for_goal(goal.id).unwrap();

        let rows = attempts.list_for_goal(goal.id).unwrap();
        assert_eq!(rows.len(), 3);

        let first = attempts.record_outcome(rows[0].id, true, None).unwrap();
        assert!(first.completed_goal.is_none());

        let second = attempts.record_outcome(rows[1].id, true, None).unwrap();
        let completed = second.completed_goal.expect("goal should complete");
        assert!(completed.is_completed);

        // Incomplete attempt removed, completed ones retained as history
        let remaining = attempts.list_for_goal(goal.id).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|a| a.is_completed));
        assert!(goals.get(goal.id).unwrap().unwrap().is_completed);
    }

    #[test]
    fn test_outcome_on_completed_goal_is_no_op_for_transition() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.connection();
        let attempts = AttemptManager::new(conn);

        let goal = make_goal(
            conn,
            date(2024, 3, 1),
            date(2024, 3, 7),
            1,
            Weekday::ALL.to_vec(),
        );
        attempts.create_for_goal(goal.id).unwrap();

        let rows = attempts.list_for_goal(goal.id).unwrap();
        let outcome = attempts.record_outcome(rows[0].id, true, None).unwrap();
        assert!(outcome.completed_goal.is_some());

        // Toggling a surviving attempt again must not re-report completion
        let again = attempts.record_outcome(rows[0].id, true, None).unwrap();
        assert!(again.completed_goal.is_none());
    }

    #[test]
    fn test_outcome_missing_attempt_errors() {
        let db = Database::open_in_memory().unwrap();
        let attempts = AttemptManager::new(db.connection());

        assert!(matches!(
            attempts.record_outcome(Uuid::new_v4(), true, None),
            Err(GoalError::AttemptNotFound(_))
        ));
    }
}
