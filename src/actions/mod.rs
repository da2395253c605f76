//! Mutation orchestration.
//!
//! Each user action runs as a sequential chain on the calling thread:
//! persistence mutation, then attempt lifecycle, then achievement
//! evaluation, then stats recompute, then notification dispatch. Business
//! errors propagate; notification delivery never does.

use uuid::Uuid;

use crate::achievements::engine::AchievementError;
use crate::achievements::{catalog, AchievementEngine, AchievementUnlocked};
use crate::goals::{AttemptManager, Goal, GoalError, GoalManager, StreakService};
use crate::habits::{Category, Habit, HabitError, HabitManager};
use crate::integrations::{CalendarClient, CalendarError};
use crate::notifications::{
    EmailClient, EmailError, NotificationDispatcher, NotificationEvent, NotificationKind,
};
use crate::stats::{LeaderboardEntry, StatsAggregator, StatsError};
use crate::storage::{AppConfig, Database};
use crate::users::{User, UserError, UserManager};

/// Application context wiring the engine's components together.
pub struct ActionContext {
    db: Database,
    email: EmailClient,
    calendar: CalendarClient,
    base_url: String,
}

impl ActionContext {
    /// Build a context from an opened database and configuration.
    pub fn new(db: Database, config: &AppConfig) -> Result<Self, ActionError> {
        catalog::seed_catalog(db.connection())?;

        Ok(Self {
            db,
            email: EmailClient::new(&config.email)?,
            calendar: CalendarClient::new(&config.calendar)?,
            base_url: config.base_url.clone(),
        })
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create a user account.
    pub fn create_user(&self, name: &str, email: &str) -> Result<User, ActionError> {
        let user = User::new(name.to_string(), email.to_string());
        UserManager::new(self.db.connection()).create(&user)?;
        Ok(user)
    }

    /// Create a habit category.
    pub fn create_category(&self, user_id: Uuid, name: &str) -> Result<Category, ActionError> {
        let category = Category::new(user_id, name.to_string());
        HabitManager::new(self.db.connection()).create_category(&category)?;
        Ok(category)
    }

    /// Create a habit, then re-evaluate achievements and stats.
    pub fn create_habit(
        &self,
        user_id: Uuid,
        name: &str,
        is_good: bool,
        category_id: Option<Uuid>,
    ) -> Result<Habit, ActionError> {
        let conn = self.db.connection();

        let mut habit = Habit::new(user_id, name.to_string(), is_good);
        if let Some(category_id) = category_id {
            habit = habit.with_category(category_id);
        }
        HabitManager::new(conn).create(&habit)?;

        self.after_mutation(user_id)?;

        Ok(habit)
    }

    /// Delete a habit with its goals and attempts, then refresh stats.
    pub fn delete_habit(&self, habit_id: Uuid) -> Result<bool, ActionError> {
        let conn = self.db.connection();
        let manager = HabitManager::new(conn);

        let habit = match manager.get(habit_id)? {
            Some(habit) => habit,
            None => return Ok(false),
        };

        let deleted = manager.delete(habit_id)?;
        if deleted {
            self.after_mutation(habit.user_id)?;
        }

        Ok(deleted)
    }

    /// Create a goal: validate, insert, generate attempts, re-evaluate.
    pub fn create_goal(&self, goal: &Goal) -> Result<(), ActionError> {
        let conn = self.db.connection();

        GoalManager::new(conn).create(goal)?;
        AttemptManager::new(conn).create_for_goal(goal.id)?;

        self.after_mutation(goal.user_id)?;

        Ok(())
    }

    /// Update a goal: validate, persist, reconcile attempts, re-evaluate.
    pub fn update_goal(&self, goal: &Goal) -> Result<(), ActionError> {
        let conn = self.db.connection();

        GoalManager::new(conn).update(goal)?;
        AttemptManager::new(conn).reconcile_for_goal(goal.id)?;

        self.after_mutation(goal.user_id)?;

        Ok(())
    }

    /// Delete a goal and its attempts, then refresh stats.
    pub fn delete_goal(&self, goal_id: Uuid) -> Result<bool, ActionError> {
        let conn = self.db.connection();
        let manager = GoalManager::new(conn);

        let goal = match manager.get(goal_id)? {
            Some(goal) => goal,
            None => return Ok(false),
        };

        let deleted = manager.delete(goal_id)?;
        if deleted {
            self.after_mutation(goal.user_id)?;
        }

        Ok(deleted)
    }

    /// Record an attempt outcome and run the downstream chain.
    ///
    /// A goal-completion transition dispatches one notification, guarded
    /// by the transition itself; achievement unlocks dispatch one each.
    pub fn record_attempt(
        &self,
        attempt_id: Uuid,
        is_completed: bool,
        note: Option<&str>,
    ) -> Result<(), ActionError> {
        let conn = self.db.connection();

        let outcome = AttemptManager::new(conn).record_outcome(attempt_id, is_completed, note)?;
        let user_id = GoalManager::new(conn)
            .get_required(outcome.attempt.goal_id)?
            .user_id;

        if let Some(goal) = &outcome.completed_goal {
            self.dispatcher().dispatch(&NotificationEvent {
                user_id,
                kind: NotificationKind::GoalCompleted,
                title: format!("Goal completed: {}", goal.name),
                message: format!(
                    "You reached {} successful attempts on \"{}\".",
                    goal.goal_success, goal.name
                ),
                link: Some(format!("goals/{}", goal.id)),
            });
        }

        self.after_mutation(user_id)?;

        Ok(())
    }

    /// Current streak for a user.
    pub fn current_streak(&self, user_id: Uuid) -> Result<u32, ActionError> {
        StreakService::new(self.db.connection())
            .current_streak(user_id)
            .map_err(ActionError::from)
    }

    /// Top users by score.
    pub fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, ActionError> {
        StatsAggregator::new(self.db.connection())
            .leaderboard(limit)
            .map_err(ActionError::from)
    }

    /// Push one attempt into the external calendar and remember the event.
    pub fn sync_attempt_to_calendar(&self, attempt_id: Uuid) -> Result<String, ActionError> {
        let conn = self.db.connection();
        let attempts = AttemptManager::new(conn);

        let attempt = attempts
            .get(attempt_id)?
            .ok_or(GoalError::AttemptNotFound(attempt_id))?;
        let goal = GoalManager::new(conn).get_required(attempt.goal_id)?;

        let event_id = self.calendar.create_event(&goal.name, attempt.date)?;
        attempts.set_calendar_event(attempt_id, Some(&event_id))?;

        Ok(event_id)
    }

    /// Remove an attempt's external calendar event, if it has one.
    pub fn unsync_attempt_from_calendar(&self, attempt_id: Uuid) -> Result<(), ActionError> {
        let conn = self.db.connection();
        let attempts = AttemptManager::new(conn);

        let attempt = attempts
            .get(attempt_id)?
            .ok_or(GoalError::AttemptNotFound(attempt_id))?;

        if let Some(event_id) = attempt.calendar_event_id {
            self.calendar.delete_event(&event_id)?;
            attempts.set_calendar_event(attempt_id, None)?;
        }

        Ok(())
    }

    /// Shared tail of every mutation: achievements, notifications, stats.
    fn after_mutation(&self, user_id: Uuid) -> Result<(), ActionError> {
        let conn = self.db.connection();

        let unlocks = AchievementEngine::new(conn).evaluate_all_for_user(user_id)?;
        for unlock in &unlocks {
            self.notify_unlock(unlock);
        }

        StatsAggregator::new(conn).recompute(user_id)?;

        Ok(())
    }

    fn notify_unlock(&self, unlock: &AchievementUnlocked) {
        self.dispatcher().dispatch(&NotificationEvent {
            user_id: unlock.user_id,
            kind: NotificationKind::AchievementUnlocked,
            title: format!("Achievement unlocked: {}", unlock.achievement.name),
            message: format!(
                "{} (+{} XP)",
                unlock.achievement.description, unlock.achievement.xp
            ),
            link: Some("achievements".to_string()),
        });
    }

    fn dispatcher(&self) -> NotificationDispatcher<'_> {
        NotificationDispatcher::new(self.db.connection(), &self.email, &self.base_url)
    }
}

/// Action layer errors.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    HabitError(#[from] HabitError),

    #[error(transparent)]
    GoalError(#[from] GoalError),

    #[error(transparent)]
    AchievementError(#[from] AchievementError),

    #[error(transparent)]
    StatsError(#[from] StatsError),

    #[error(transparent)]
    EmailError(#[from] EmailError),

    #[error(transparent)]
    CalendarError(#[from] CalendarError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::goals::Weekday;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn context() -> ActionContext {
        let db = Database::open_in_memory().unwrap();
        ActionContext::new(db, &AppConfig::default()).unwrap()
    }

    #[test]
    fn test_create_habit_refreshes_stats_and_achievements() {
        let ctx = context();
        let user = ctx.create_user("Ada", "ada@example.com").unwrap();

        ctx.create_habit(user.id, "Meditate", true, None).unwrap();

        let stats = StatsAggregator::new(ctx.database().connection())
            .get(user.id)
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_habits, 1);
        // "First Habit" unlocked: 1*10 + 1*100
        assert_eq!(stats.total_score, 110);
    }

    #[test]
    fn test_goal_chain_generates_attempts() {
        let ctx = context();
        let user = ctx.create_user("Ada", "ada@example.com").unwrap();
        let habit = ctx.create_habit(user.id, "Run", true, None).unwrap();

        let goal = Goal::new(
            user.id,
            habit.id,
            "Run MWF".to_string(),
            date(2024, 3, 1),
            date(2024, 3, 7),
            2,
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        );
        ctx.create_goal(&goal).unwrap();

        let attempts = AttemptManager::new(ctx.database().connection())
            .list_for_goal(goal.id)
            .unwrap();
        assert_eq!(attempts.len(), 3);
    }

    #[test]
    fn test_validation_failure_short_circuits_chain() {
        let ctx = context();
        let user = ctx.create_user("Ada", "ada@example.com").unwrap();
        let habit = ctx.create_habit(user.id, "Run", true, None).unwrap();

        let goal = Goal::new(
            user.id,
            habit.id,
            "Invalid".to_string(),
            date(2024, 3, 7),
            date(2024, 3, 1),
            2,
            vec![Weekday::Monday],
        );

        assert!(matches!(
            ctx.create_goal(&goal),
            Err(ActionError::GoalError(GoalError::ValidationError(_)))
        ));
        assert!(AttemptManager::new(ctx.database().connection())
            .list_for_goal(goal.id)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_delete_habit_cascade_updates_stats() {
        let ctx = context();
        let user = ctx.create_user("Ada", "ada@example.com").unwrap();
        let habit = ctx.create_habit(user.id, "Run", true, None).unwrap();

        assert!(ctx.delete_habit(habit.id).unwrap());
        assert!(!ctx.delete_habit(habit.id).unwrap());

        let stats = StatsAggregator::new(ctx.database().connection())
            .get(user.id)
            .unwrap()
            .unwrap();
        assert_eq!(stats.total_habits, 0);
    }
}
