use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Like,
    Comment,
    Follow,
    Unfollow,
    Post,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Follow => "follow",
            Self::Unfollow => "unfollow",
            Self::Post => "post",
        }
    }

    /// Types that may be recorded at most once per (bot, target).
    pub fn is_at_most_once(&self) -> bool {
        matches!(self, Self::Like | Self::Follow)
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Self::Like),
            "comment" => Ok(Self::Comment),
            "follow" => Ok(Self::Follow),
            "unfollow" => Ok(Self::Unfollow),
            "post" => Ok(Self::Post),
            _ => Err(format!("Unknown activity type: {s}")),
        }
    }
}

/// Immutable ledger entry for one bot action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Activity {
    pub id: i64,
    pub bot_id: i64,
    pub activity_type: ActivityType,
    /// Post id or user id, depending on the type.
    pub target_id: String,
    pub content: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewActivity {
    pub bot_id: i64,
    pub activity_type: ActivityType,
    pub target_id: String,
    pub content: Option<String>,
}

impl NewActivity {
    pub fn new(bot_id: i64, activity_type: ActivityType, target_id: impl Into<String>) -> Self {
        Self {
            bot_id,
            activity_type,
            target_id: target_id.into(),
            content: None,
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_parse() {
        assert_eq!("LIKE".parse::<ActivityType>().unwrap(), ActivityType::Like);
        assert_eq!("post".parse::<ActivityType>().unwrap(), ActivityType::Post);
        assert!("share".parse::<ActivityType>().is_err());
    }

    #[test]
    fn test_at_most_once_types() {
        assert!(ActivityType::Like.is_at_most_once());
        assert!(ActivityType::Follow.is_at_most_once());
        assert!(!ActivityType::Comment.is_at_most_once());
        assert!(!ActivityType::Post.is_at_most_once());
    }
}
