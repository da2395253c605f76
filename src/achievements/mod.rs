//! Achievement catalog and per-user unlock tracking.

pub mod catalog;
pub mod engine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use engine::{AchievementEngine, AchievementError};

/// Achievement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AchievementCategory {
    /// Habit-count achievements
    Habits,
    /// Completed-goal achievements
    Goals,
    /// Streak-length achievements
    Streaks,
    /// Social achievements (catalog-only, never auto-evaluated)
    Social,
}

impl AchievementCategory {
    /// The categories the engine evaluates automatically.
    pub const MEASURABLE: [AchievementCategory; 3] = [
        AchievementCategory::Habits,
        AchievementCategory::Goals,
        AchievementCategory::Streaks,
    ];

    /// Get display name.
    pub fn display_name(&self) -> &'static str {
        match self {
            AchievementCategory::Habits => "Habits",
            AchievementCategory::Goals => "Goals",
            AchievementCategory::Streaks => "Streaks",
            AchievementCategory::Social => "Social",
        }
    }

    /// Parse from the stored string form.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Habits" => Some(AchievementCategory::Habits),
            "Goals" => Some(AchievementCategory::Goals),
            "Streaks" => Some(AchievementCategory::Streaks),
            "Social" => Some(AchievementCategory::Social),
            _ => None,
        }
    }
}

impl std::fmt::Display for AchievementCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Achievement definition (global catalog, read-only to users)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
    /// Unique identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Category
    pub category: AchievementCategory,
    /// Icon name
    pub icon: String,
    /// Metric value required to unlock
    pub requirement: u32,
    /// XP reward
    pub xp: u32,
}

impl Achievement {
    /// Create a new achievement definition.
    pub fn new(
        name: &str,
        description: &str,
        category: AchievementCategory,
        requirement: u32,
        xp: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            category,
            icon: format!(
                "achievement_{}",
                name.to_lowercase().replace(' ', "_")
            ),
            requirement,
            xp,
        }
    }
}

/// A user's progress on an achievement.
///
/// Created lazily on first evaluation. `unlocked_at` is set once and never
/// cleared or moved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAchievement {
    /// Unique identifier
    pub id: Uuid,
    /// User
    pub user_id: Uuid,
    /// Achievement
    pub achievement_id: Uuid,
    /// Current progress toward the requirement
    pub progress: u32,
    /// When unlocked (non-null means unlocked)
    pub unlocked_at: Option<DateTime<Utc>>,
}

impl UserAchievement {
    /// Whether the achievement is unlocked.
    pub fn is_unlocked(&self) -> bool {
        self.unlocked_at.is_some()
    }
}

/// Achievement unlocked event.
#[derive(Debug, Clone)]
pub struct AchievementUnlocked {
    /// Achievement that was unlocked
    pub achievement: Achievement,
    /// User who unlocked it
    pub user_id: Uuid,
    /// When unlocked
    pub unlocked_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_roundtrip() {
        for category in [
            AchievementCategory::Habits,
            AchievementCategory::Goals,
            AchievementCategory::Streaks,
            AchievementCategory::Social,
        ] {
            assert_eq!(
                AchievementCategory::from_str(category.display_name()),
                Some(category)
            );
        }
        assert_eq!(AchievementCategory::from_str("Nope"), None);
    }

    #[test]
    fn test_social_not_measurable() {
        assert!(!AchievementCategory::MEASURABLE.contains(&AchievementCategory::Social));
    }

    #[test]
    fn test_icon_derived_from_name() {
        let a = Achievement::new("First Habit", "...", AchievementCategory::Habits, 1, 50);
        assert_eq!(a.icon, "achievement_first_habit");
    }
}
