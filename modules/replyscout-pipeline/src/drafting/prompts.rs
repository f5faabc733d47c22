use replyscout_common::file_config::{BrandConfig, VoiceConfig};
use replyscout_common::{Platform, Post, PriorityTier, ReplyExample};

/// Characters of the original post shown for each learning example.
const EXAMPLE_EXCERPT_CHARS: usize = 100;

fn bullets(items: &[String]) -> String {
    items.iter().map(|i| format!("- {i}\n")).collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

pub fn system_prompt(brand: &BrandConfig, voice: &VoiceConfig, platform: Platform) -> String {
    let (preferred, absolute) = voice.limits_for(Some(platform));
    let length_guidance = if platform.is_long_form() {
        "- AIM FOR DEPTH: Write 3-5 sentences or short paragraphs. Be thorough and helpful.".to_string()
    } else {
        format!("- KEEP IT SHORT: Aim for {preferred} characters or less.")
    };

    let mut prompt = format!(
        r#"You are a thoughtful assistant helping {name} engage with entrepreneurs.

# Brand Context
{context}

# Voice Guidelines (CRITICAL - MUST FOLLOW)

## Tone
{tone}

## Language
{language}

## Character Limits
- Preferred maximum: {preferred} characters
- Absolute maximum: {absolute} characters
{length_guidance}

## Required Patterns
{required}
## STRICT AVOIDANCE (NEVER USE)
{avoid}
# Reply Guidelines
"#,
        name = brand.name,
        context = brand.context,
        tone = voice.tone,
        language = voice.language,
        required = bullets(&voice.required_patterns),
        avoid = bullets(&voice.strict_avoidance),
    );

    for (i, guideline) in brand.guidelines.iter().enumerate() {
        prompt.push_str(&format!("{}. {guideline}\n", i + 1));
    }

    if platform.is_long_form() {
        prompt.push_str(
            "\n# Forum Specifics\n\
             - You are replying to a forum post, not a short status update.\n\
             - Use formatting (bullet points, bold) if it helps clarity.\n\
             - Don't use hashtags.\n",
        );
    }

    if !brand.example_replies.is_empty() {
        prompt.push_str("\n# Examples of Good Replies\n");
        for example in &brand.example_replies {
            prompt.push_str(&format!("- \"{example}\"\n"));
        }
    }

    prompt.push_str("\nRemember:\n");
    prompt.push_str(&bullets(&brand.reminders));
    if !platform.is_long_form() {
        prompt.push_str(&format!("- Under {preferred} characters\n"));
    }

    prompt
}

pub fn user_prompt(post: &Post, preferred_max: usize, examples: &[ReplyExample]) -> String {
    let mut prompt = format!(
        "# Post to Reply To\n\nAuthor: @{author}\nPost: \"{text}\"\n\n# Context\n",
        author = post.author.username,
        text = post.text,
    );

    if let Some(priority) = post.priority.as_ref().filter(|p| p.tier != PriorityTier::Baseline) {
        prompt.push_str(&format!(
            "Priority: {}\n",
            priority.tier.as_str().to_uppercase()
        ));
        if !priority.matched_keywords.is_empty() {
            prompt.push_str(&format!(
                "Keywords detected: {}\n",
                priority.matched_keywords.join(", ")
            ));
        }
    }

    prompt.push_str(&format!(
        "\n# Your Task\n\
         Write a thoughtful, authentic reply that:\n\
         1. Acknowledges their specific challenge\n\
         2. Offers a relatable insight or gentle question\n\
         3. Invites continued conversation\n\
         4. Stays under {preferred_max} characters if possible\n\n"
    ));

    if !examples.is_empty() {
        prompt.push_str("# Examples of Successful Past Replies\n\n");
        for (i, example) in examples.iter().enumerate() {
            prompt.push_str(&format!(
                "Example {n}:\nOriginal post: \"{original}...\"\nOur reply: \"{reply}\"\n(Engagement rate: {rate:.1}%)\n\n",
                n = i + 1,
                original = excerpt(&example.original_text, EXAMPLE_EXCERPT_CHARS),
                reply = example.reply_text,
                rate = example.engagement_rate * 100.0,
            ));
        }
    }

    prompt.push_str("Now write your reply (NO explanations, just the reply text):");
    prompt
}

/// The user prompt again, followed by the rejected draft and what was
/// wrong with it.
pub fn feedback_prompt(
    base: &str,
    previous: &str,
    violations: &[String],
    brand: &BrandConfig,
    preferred_max: usize,
) -> String {
    format!(
        "{base}\n\n# Previous Attempt Failed Validation\n\n\
         Previous reply: \"{previous}\"\n\n\
         Violations:\n{violations}\n\
         Please generate a new reply that fixes these violations. Remember:\n\
         {reminders}- Under {preferred_max} characters if possible\n\
         - No corporate jargon or salesy language\n\n\
         New reply:",
        violations = bullets(violations),
        reminders = bullets(&brand.reminders),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use replyscout_common::{Author, PriorityResult};

    fn post(platform: Platform) -> Post {
        Post::builder()
            .id("1")
            .platform(platform)
            .text("Does anyone else feel like a fraud when pitching?")
            .author(Author::builder().username("sarah_builds").build())
            .created_at(Utc::now())
            .build()
    }

    #[test]
    fn system_prompt_carries_brand_and_voice() {
        let brand = BrandConfig::default();
        let voice = VoiceConfig::default();
        let prompt = system_prompt(&brand, &voice, Platform::Twitter);

        assert!(prompt.contains(&brand.context));
        assert!(prompt.contains("## Language\nBritish English"));
        assert!(prompt.contains("KEEP IT SHORT: Aim for 100 characters"));
        assert!(prompt.contains("1. Be genuinely helpful, not promotional"));
        assert!(prompt.contains("- NO exclamation marks"));
        assert!(prompt.trim_end().ends_with("- Under 100 characters"));
        assert!(!prompt.contains("Forum Specifics"));
    }

    #[test]
    fn long_form_prompt_asks_for_depth() {
        let prompt = system_prompt(&BrandConfig::default(), &VoiceConfig::default(), Platform::Reddit);
        assert!(prompt.contains("AIM FOR DEPTH"));
        assert!(prompt.contains("Absolute maximum: 5000 characters"));
        assert!(prompt.contains("# Forum Specifics"));
        assert!(!prompt.contains("- Under 1000 characters"));
    }

    #[test]
    fn user_prompt_includes_priority_and_examples() {
        let mut p = post(Platform::Twitter);
        p.priority = Some(PriorityResult {
            tier: PriorityTier::Critical,
            multiplier: 3.0,
            matched_keywords: vec!["feel like a fraud".into()],
            profile_indicators: vec![],
            commercial_score: 65.0,
        });
        let examples = vec![ReplyExample {
            original_text: "x".repeat(150),
            reply_text: "Perhaps start with one customer?".into(),
            engagement_rate: 0.045,
            posted_at: Utc::now(),
        }];

        let prompt = user_prompt(&p, 100, &examples);
        assert!(prompt.starts_with("# Post to Reply To\n\nAuthor: @sarah_builds\n"));
        assert!(prompt.contains("Priority: CRITICAL\nKeywords detected: feel like a fraud\n"));
        assert!(prompt.contains(&format!("Original post: \"{}...\"", "x".repeat(100))));
        assert!(prompt.contains("(Engagement rate: 4.5%)"));
        assert!(prompt.ends_with("just the reply text):"));
    }

    #[test]
    fn baseline_posts_get_no_priority_line() {
        let prompt = user_prompt(&post(Platform::Twitter), 100, &[]);
        assert!(!prompt.contains("Priority:"));
        assert!(!prompt.contains("Examples of Successful Past Replies"));
    }

    #[test]
    fn feedback_lists_violations() {
        let prompt = feedback_prompt(
            "BASE",
            "Amazing!",
            &["Contains forbidden punctuation '!'".to_string()],
            &BrandConfig::default(),
            100,
        );
        assert!(prompt.starts_with("BASE\n\n# Previous Attempt Failed Validation"));
        assert!(prompt.contains("Previous reply: \"Amazing!\""));
        assert!(prompt.contains("- Contains forbidden punctuation '!'\n"));
        assert!(prompt.ends_with("New reply:"));
    }
}
