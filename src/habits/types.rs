//! Habit and category type definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A habit the user wants to build or break.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Habit {
    /// Unique identifier
    pub id: Uuid,
    /// User who owns this habit
    pub user_id: Uuid,
    /// Optional category
    pub category_id: Option<Uuid>,
    /// Display name
    pub name: String,
    /// Good habit (build) vs bad habit (break)
    pub is_good: bool,
    /// When the habit was created
    pub created_at: DateTime<Utc>,
}

impl Habit {
    /// Create a new habit.
    pub fn new(user_id: Uuid, name: String, is_good: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category_id: None,
            name,
            is_good,
            created_at: Utc::now(),
        }
    }

    /// Attach a category.
    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}

/// A user-defined habit category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: Uuid,
    /// User who owns this category
    pub user_id: Uuid,
    /// Display name
    pub name: String,
    /// When the category was created
    pub created_at: DateTime<Utc>,
}

impl Category {
    /// Create a new category.
    pub fn new(user_id: Uuid, name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_habit_creation() {
        let user_id = Uuid::new_v4();
        let habit = Habit::new(user_id, "Read 20 pages".to_string(), true);

        assert_eq!(habit.user_id, user_id);
        assert!(habit.is_good);
        assert!(habit.category_id.is_none());
    }

    #[test]
    fn test_habit_with_category() {
        let category = Category::new(Uuid::new_v4(), "Health".to_string());
        let habit =
            Habit::new(category.user_id, "No soda".to_string(), false).with_category(category.id);

        assert_eq!(habit.category_id, Some(category.id));
        assert!(!habit.is_good);
    }
}
