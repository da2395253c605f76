//! Database schema definitions for HabitForge.

/// SQL schema for creating all database tables.
pub const SCHEMA: &str = r#"
-- Users table
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- Habit categories table
CREATE TABLE IF NOT EXISTS categories (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_categories_user_id ON categories(user_id);

-- Habits table
CREATE TABLE IF NOT EXISTS habits (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    category_id TEXT REFERENCES categories(id),
    name TEXT NOT NULL,
    is_good INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_habits_user_id ON habits(user_id);

-- Goals table
CREATE TABLE IF NOT EXISTS goals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    habit_id TEXT NOT NULL REFERENCES habits(id),
    name TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'Medium',
    start_date TEXT NOT NULL,
    finish_date TEXT NOT NULL,
    goal_success INTEGER NOT NULL,
    week_days_json TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_goals_user_id ON goals(user_id);
CREATE INDEX IF NOT EXISTS idx_goals_habit_id ON goals(habit_id);

-- Goal attempts table (one row per goal per qualifying calendar date)
CREATE TABLE IF NOT EXISTS goal_attempts (
    id TEXT PRIMARY KEY,
    goal_id TEXT NOT NULL REFERENCES goals(id),
    date TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    note TEXT NOT NULL DEFAULT '',
    calendar_event_id TEXT,
    UNIQUE(goal_id, date)
);

CREATE INDEX IF NOT EXISTS idx_goal_attempts_goal_id ON goal_attempts(goal_id);
CREATE INDEX IF NOT EXISTS idx_goal_attempts_date ON goal_attempts(date);

-- Achievement catalog (global, read-only to users)
CREATE TABLE IF NOT EXISTS achievements (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT NOT NULL,
    category TEXT NOT NULL,
    icon TEXT NOT NULL,
    requirement INTEGER NOT NULL,
    xp INTEGER NOT NULL
);

-- Per-user achievement progress
CREATE TABLE IF NOT EXISTS user_achievements (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    achievement_id TEXT NOT NULL REFERENCES achievements(id),
    progress INTEGER NOT NULL DEFAULT 0,
    unlocked_at TEXT,
    UNIQUE(user_id, achievement_id)
);

CREATE INDEX IF NOT EXISTS idx_user_achievements_user_id ON user_achievements(user_id);

-- Denormalized per-user stats (cache, recomputed wholesale)
CREATE TABLE IF NOT EXISTS user_stats (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    total_habits INTEGER NOT NULL DEFAULT 0,
    completed_goals INTEGER NOT NULL DEFAULT 0,
    achievements_unlocked INTEGER NOT NULL DEFAULT 0,
    current_streak INTEGER NOT NULL DEFAULT 0,
    total_score INTEGER NOT NULL DEFAULT 0,
    updated_at TEXT NOT NULL
);

-- Notification preferences
CREATE TABLE IF NOT EXISTS notification_settings (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    enabled INTEGER NOT NULL DEFAULT 1,
    achievement_alerts INTEGER NOT NULL DEFAULT 1,
    goal_alerts INTEGER NOT NULL DEFAULT 1,
    email_enabled INTEGER NOT NULL DEFAULT 0
);
"#;

/// SQL for schema version tracking (migrations)
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;
