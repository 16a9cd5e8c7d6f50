//! Prompt templates for persona content.
//!
//! Templates use plain `format!()` interpolation. Each asks for the bare text
//! only, so the generated output can be published without post-processing.

/// Prompt for a short profile bio.
///
/// # Example
/// ```
/// use murmur::llm::prompts::bio_prompt;
///
/// let prompt = bio_prompt("Supportive, enthusiastic, positive", 30, "Female");
/// assert!(prompt.contains("30 years old, Female"));
/// ```
pub fn bio_prompt(category_description: &str, age: u32, gender: &str) -> String {
    format!(
        r#"
You are a social media user. Your profile: {age} years old, {gender}, {category_description}.

You are about to write your social media bio.

Write ONLY a short, authentic bio (1-3 sentences) that reflects your personality. Do not write anything else. Do not use hashtags, emojis, or extra words. Only output the bio itself.
"#
    )
}

/// Prompt for a realistic first and last name.
pub fn full_name_prompt(gender: &str, age: u32) -> String {
    format!(
        r#"
You are a social media user. Your profile: {age} years old, {gender}.

You need a realistic full name (first and last) for your profile. The name should be natural and common for your gender and age. Only output the name.
Examples:
Emily Carter
James Lee
Ava Johnson
"#
    )
}

/// Prompt for a comment on a post, conditioned on up to three recalled memories.
///
/// `post_info` is the rendered post block (author, date, text, comments, likes).
pub fn comment_prompt(persona_prompt: &str, post_info: &str, memories: &[String]) -> String {
    let mut memory_context = String::new();
    if !memories.is_empty() {
        memory_context
            .push_str("Here are some of your past thoughts and experiences related to this topic:\n");
        for memory in memories.iter().take(3) {
            memory_context.push_str(&format!("- {memory}\n"));
        }
    }

    format!(
        r#"
{persona_prompt}

You are about to comment on a social media post.

{memory_context}
This is the post you see:
"{post_info}"

Based on your memories and your personality, write ONLY a short, authentic comment (1-2 sentences) as your reaction. Do not write anything else. Do not include explanations, greetings, or extra words. Your comment should reflect your character and your past experiences. Only output the comment itself.
"#
    )
}

/// Prompt for a new post in the platform's themes.
pub fn post_prompt(
    persona_prompt: &str,
    main_theme: &str,
    themes: &[String],
    diversity_level: f32,
    current_date: &str,
    current_time: &str,
) -> String {
    let themes = themes.join(", ");
    format!(
        r#"
{persona_prompt}

You are a social media user about to write a new post for your followers.
The platform's main theme is "{main_theme}", with a focus on "{themes}".
You may vary your post topics according to the theme diversity level ({diversity_level}/1.0).

Current date: {current_date}
Current time: {current_time}

Consider your mood, recent experiences, or anything meaningful you want to share. Let your post reflect your personality and current feelings.

Write ONLY a concise, authentic social media post (1-3 sentences) that fits your character and the platform's themes. Do not include hashtags, emojis, greetings, explanations, or extra words. Output only the post text.
"#
    )
}

/// Prompt for a private reflection on something the bot just saw.
///
/// # Example
/// ```
/// use murmur::llm::prompts::memory_prompt;
///
/// let prompt = memory_prompt("You are balanced.", "Sunset at the pier", "post");
/// assert!(prompt.contains("You just saw this post"));
/// ```
pub fn memory_prompt(persona_prompt: &str, content: &str, context_type: &str) -> String {
    format!(
        r#"
{persona_prompt}

You are a social media user. You just saw this {context_type}:
"{content}"

Write ONLY a short, private memory (1-3 sentences) about how you feel about this {context_type}. This is your internal thought, not something you would say publicly. Do not write anything else. Do not include explanations, greetings, or extra words. Only output the memory itself.
"#
    )
}
