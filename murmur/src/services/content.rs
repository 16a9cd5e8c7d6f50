use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::ContentConfig;
use crate::error::Result;
use crate::llm::{prompts, TextGenerator};
use crate::models::{BotCategory, Comment, Gender, Post};

const BIO_MAX_TOKENS: u32 = 100;
const BIO_TEMPERATURE: f32 = 0.7;
const FULL_NAME_MAX_TOKENS: u32 = 20;
const FULL_NAME_TEMPERATURE: f32 = 0.8;
const COMMENT_MAX_TOKENS: u32 = 150;
const POST_MAX_TOKENS: u32 = 200;
const MEMORY_MAX_TOKENS: u32 = 100;

pub const NO_COMMENTS: &str = "No comments available";

/// Persona text generation: bios, names, comments, posts and private memories.
#[derive(Clone)]
pub struct ContentGenerator {
    llm: Arc<dyn TextGenerator>,
    content: ContentConfig,
    temperature: f32,
}

impl ContentGenerator {
    pub fn new(llm: Arc<dyn TextGenerator>, content: ContentConfig, temperature: f32) -> Self {
        Self {
            llm,
            content,
            temperature,
        }
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_available()
    }

    pub async fn bio(&self, category: BotCategory, age: u32, gender: Gender) -> Result<String> {
        let prompt = prompts::bio_prompt(category.profile().description, age, gender.as_str());
        self.llm
            .generate(&prompt, BIO_MAX_TOKENS, BIO_TEMPERATURE)
            .await
    }

    /// First non-empty line of the model's answer.
    pub async fn full_name(&self, gender: Gender, age: u32) -> Result<String> {
        let prompt = prompts::full_name_prompt(gender.as_str(), age);
        let raw = self
            .llm
            .generate(&prompt, FULL_NAME_MAX_TOKENS, FULL_NAME_TEMPERATURE)
            .await?;
        Ok(raw
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or(raw.trim())
            .to_string())
    }

    pub async fn comment(
        &self,
        category: BotCategory,
        post_info: &str,
        memories: &[String],
    ) -> Result<String> {
        let prompt = prompts::comment_prompt(category.prompt(), post_info, memories);
        self.llm
            .generate(&prompt, COMMENT_MAX_TOKENS, self.temperature)
            .await
    }

    pub async fn post(&self, category: BotCategory, now: DateTime<Utc>) -> Result<String> {
        let prompt = prompts::post_prompt(
            category.prompt(),
            &self.content.main_theme_focus,
            &self.content.themes,
            self.content.diversity_level,
            &now.format("%Y-%m-%d").to_string(),
            &now.format("%H:%M").to_string(),
        );
        self.llm
            .generate(&prompt, POST_MAX_TOKENS, self.temperature)
            .await
    }

    pub async fn memory(
        &self,
        category: BotCategory,
        content: &str,
        context_type: &str,
    ) -> Result<String> {
        let prompt = prompts::memory_prompt(category.prompt(), content, context_type);
        self.llm
            .generate(&prompt, MEMORY_MAX_TOKENS, self.temperature)
            .await
    }
}

/// ` - name: text` per comment, newline-joined.
pub fn render_comments(comments: &[Comment]) -> String {
    if comments.is_empty() {
        return NO_COMMENTS.to_string();
    }
    comments
        .iter()
        .map(|c| format!(" - {}: {}", c.user.name, c.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Context block handed to the model when reacting to a post.
pub fn render_post_info(post: &Post, comments: &[Comment]) -> String {
    format!(
        "Author: {}\nDate: {}\nText: {}\nComments:\n{}\nLikes: {}",
        post.user.name,
        post.date.as_deref().unwrap_or_default(),
        post.content,
        render_comments(comments),
        post.reactions_count
    )
}
