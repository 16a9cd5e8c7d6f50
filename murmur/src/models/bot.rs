use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const LIKE_BAND: (f64, f64) = (0.1, 0.9);
pub const POST_BAND: (f64, f64) = (0.0, 0.3);

const ACTION_JITTER: f64 = 0.1;
const POST_JITTER: f64 = 0.05;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BotCategory {
    Fan,
    Hater,
    Silent,
    Random,
    Neutral,
    Humorous,
    Provocative,
    RolePlayer,
}

/// Base behaviour of a category before per-bot jitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryProfile {
    pub probabilities: ActionProbabilities,
    pub description: &'static str,
}

impl BotCategory {
    pub const ALL: [BotCategory; 8] = [
        BotCategory::Fan,
        BotCategory::Hater,
        BotCategory::Silent,
        BotCategory::Random,
        BotCategory::Neutral,
        BotCategory::Humorous,
        BotCategory::Provocative,
        BotCategory::RolePlayer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Hater => "hater",
            Self::Silent => "silent",
            Self::Random => "random",
            Self::Neutral => "neutral",
            Self::Humorous => "humorous",
            Self::Provocative => "provocative",
            Self::RolePlayer => "role_player",
        }
    }

    pub fn profile(&self) -> CategoryProfile {
        let (like, comment, follow, unfollow, post, description) = match self {
            Self::Fan => (0.85, 0.40, 0.75, 0.05, 0.05, "Supportive, enthusiastic, positive"),
            Self::Hater => (0.08, 0.60, 0.15, 0.70, 0.08, "Critical, negative, provocative"),
            Self::Silent => (
                0.35,
                0.10,
                0.20,
                0.15,
                0.01,
                "Observant, rarely comments, occasional likes",
            ),
            Self::Random => (0.45, 0.35, 0.35, 0.30, 0.03, "Unpredictable, varied behavior"),
            Self::Neutral => (0.40, 0.30, 0.30, 0.20, 0.02, "Balanced, rational, thoughtful"),
            Self::Humorous => (0.60, 0.50, 0.45, 0.25, 0.10, "Funny, sarcastic, meme-oriented"),
            Self::Provocative => (
                0.25,
                0.70,
                0.35,
                0.40,
                0.10,
                "Challenging, questioning, debate-oriented",
            ),
            Self::RolePlayer => (0.50, 0.45, 0.40, 0.25, 0.05, "In-character, consistent persona"),
        };

        CategoryProfile {
            probabilities: ActionProbabilities {
                like,
                comment,
                follow,
                unfollow,
                post,
            },
            description,
        }
    }

    /// Behavioural prompt prepended to every generation for this category.
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::Fan => "You are an enthusiastic fan who loves the content. Your comments are supportive and positive.",
            Self::Hater => "You are critical of the content. Your comments point out flaws and are sometimes negative.",
            Self::Silent => "You rarely comment, but when you do, it's thoughtful and concise.",
            Self::Random => "Your behavior is unpredictable. Sometimes supportive, sometimes critical, sometimes off-topic.",
            Self::Neutral => "You are balanced and rational. Your comments are thoughtful and objective.",
            Self::Humorous => "You love humor and memes. Your comments are funny, sometimes sarcastic.",
            Self::Provocative => "You like to challenge ideas. Your comments ask difficult questions and provoke thought.",
            Self::RolePlayer => "You stay in character as {role}. Your comments reflect this persona consistently.",
        }
    }
}

impl std::fmt::Display for BotCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BotCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fan" => Ok(Self::Fan),
            "hater" => Ok(Self::Hater),
            "silent" => Ok(Self::Silent),
            "random" => Ok(Self::Random),
            "neutral" => Ok(Self::Neutral),
            "humorous" => Ok(Self::Humorous),
            "provocative" => Ok(Self::Provocative),
            "role_player" | "roleplayer" | "role-player" => Ok(Self::RolePlayer),
            _ => Err(format!("Unknown bot category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

impl Gender {
    pub const CHOICES: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unspecified => "",
        }
    }

    /// Lenient parse for values coming from the remote roster.
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            _ => Self::Unspecified,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-bot action probabilities, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ActionProbabilities {
    pub like: f64,
    pub comment: f64,
    pub follow: f64,
    pub unfollow: f64,
    pub post: f64,
}

impl ActionProbabilities {
    /// Clamp like/comment/follow/unfollow into `[0.1, 0.9]` and post into `[0.0, 0.3]`.
    /// NaN values collapse to the lower bound.
    pub fn clamped(self) -> Self {
        Self {
            like: clamp_band(self.like, LIKE_BAND),
            comment: clamp_band(self.comment, LIKE_BAND),
            follow: clamp_band(self.follow, LIKE_BAND),
            unfollow: clamp_band(self.unfollow, LIKE_BAND),
            post: clamp_band(self.post, POST_BAND),
        }
    }

    pub fn is_within_bands(&self) -> bool {
        let in_band = |v: f64, (lo, hi): (f64, f64)| v >= lo && v <= hi;
        in_band(self.like, LIKE_BAND)
            && in_band(self.comment, LIKE_BAND)
            && in_band(self.follow, LIKE_BAND)
            && in_band(self.unfollow, LIKE_BAND)
            && in_band(self.post, POST_BAND)
    }

    /// Category base table plus independent uniform jitter, clamped.
    pub fn jittered<R: Rng + ?Sized>(category: BotCategory, rng: &mut R) -> Self {
        let base = category.profile().probabilities;
        Self {
            like: base.like + rng.gen_range(-ACTION_JITTER..=ACTION_JITTER),
            comment: base.comment + rng.gen_range(-ACTION_JITTER..=ACTION_JITTER),
            follow: base.follow + rng.gen_range(-ACTION_JITTER..=ACTION_JITTER),
            unfollow: base.unfollow + rng.gen_range(-ACTION_JITTER..=ACTION_JITTER),
            post: base.post + rng.gen_range(-POST_JITTER..=POST_JITTER),
        }
        .clamped()
    }
}

fn clamp_band(value: f64, (lo, hi): (f64, f64)) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.clamp(lo, hi)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bot {
    pub id: i64,
    /// Unique username, also the key against the remote roster.
    pub name: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub age: u32,
    pub gender: Gender,
    pub prompt_template: String,
    pub category: BotCategory,
    pub description: String,
    pub probabilities: ActionProbabilities,
    /// User id on the social network. `None` while the bot is unlinked.
    pub remote_id: Option<i64>,
    /// Next time this bot is eligible to act.
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Bot {
    pub fn is_linked(&self) -> bool {
        self.remote_id.is_some()
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.last_active <= now
    }
}

/// Persona fields written on create and on roster sync.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBot {
    pub name: String,
    pub full_name: String,
    pub avatar: Option<String>,
    pub age: u32,
    pub gender: Gender,
    pub prompt_template: String,
    pub category: BotCategory,
    pub description: String,
    pub probabilities: ActionProbabilities,
    pub remote_id: Option<i64>,
}
