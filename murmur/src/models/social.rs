use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

const POST_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Number of calendar days before today that still count as recent.
pub const RECENT_WINDOW_DAYS: i64 = 2;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PostAuthor {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub reactions_count: u64,
    #[serde(default)]
    pub comments_count: u64,
    #[serde(default)]
    pub user: PostAuthor,
}

impl Post {
    /// Creation timestamp, read from the first 19 characters of `date`.
    pub fn parsed_date(&self) -> Option<NaiveDateTime> {
        let raw = self.date.as_deref()?;
        let head = raw.get(..19)?;
        NaiveDateTime::parse_from_str(head, POST_DATE_FORMAT).ok()
    }

    /// Whether the post falls in `[now - 2 days, now]` by calendar date.
    pub fn is_recent(&self, now: DateTime<Utc>) -> bool {
        let Some(posted) = self.parsed_date() else {
            return false;
        };
        let today = now.date_naive();
        let earliest = (now - Duration::days(RECENT_WINDOW_DAYS)).date_naive();
        let day = posted.date();
        earliest <= day && day <= today
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub post: Option<i64>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub user: PostAuthor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewComment {
    pub content: String,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewPost {
    pub user_id: i64,
    pub content: String,
}

/// Account registration payload for a bot user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRequest {
    pub username: String,
    pub password: String,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: String,
    pub category: String,
    pub gender: String,
    pub prompt: String,
    pub like_probability: f64,
    pub comment_probability: f64,
    pub follow_probability: f64,
    pub unfollow_probability: f64,
    pub repost_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileRequest {
    pub user_id: i64,
    pub name: String,
    pub image: Option<String>,
    pub dob: String,
    pub bio: String,
}

/// Server reply carrying the id of a created resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedResource {
    pub id: i64,
}

/// A bot as listed by the social network's profile roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RemoteBotProfile {
    /// Remote user id.
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub like_probability: Option<f64>,
    #[serde(default)]
    pub comment_probability: Option<f64>,
    #[serde(default)]
    pub follow_probability: Option<f64>,
    #[serde(default)]
    pub unfollow_probability: Option<f64>,
    #[serde(default)]
    pub repost_probability: Option<f64>,
}

impl RemoteBotProfile {
    /// Age in whole years from the birth year only, 0 when `dob` is missing or malformed.
    pub fn age_in(&self, current_year: i32) -> u32 {
        self.dob
            .as_deref()
            .and_then(|dob| dob.split('-').next())
            .and_then(|year| year.trim().parse::<i32>().ok())
            .map(|year| (current_year - year).max(0) as u32)
            .unwrap_or(0)
    }
}

/// Split a full name on its first space into (first, last).
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(' ') {
        Some((first, last)) => (first.to_string(), last.trim().to_string()),
        None if trimmed.is_empty() => ("Unknown".to_string(), String::new()),
        None => (trimmed.to_string(), String::new()),
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// A birth date for someone `age` years old in `today`'s year.
/// `month` and `day_seed` are caller-supplied draws; the day is folded into the month.
pub fn birth_date_for_age(today: NaiveDate, age: u32, month: u32, day_seed: u32) -> NaiveDate {
    let year = today.year() - age as i32;
    let month = month.clamp(1, 12);
    let max_day = days_in_month(year, month);
    let day = (day_seed.max(1) - 1) % max_day + 1;
    NaiveDate::from_ymd_opt(year, month, day)
        .or_else(|| NaiveDate::from_ymd_opt(year, 1, 1))
        .unwrap_or(today)
}
