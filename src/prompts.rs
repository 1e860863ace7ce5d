use crate::models::GenerationOptions;

pub const CAPTION_SYSTEM: &str = include_str!("../data/prompts/caption_system.txt");
pub const CAPTION_USER: &str = include_str!("../data/prompts/caption_user.txt");

/// Captions requested for each category.
pub const CAPTIONS_PER_CATEGORY: usize = 2;

/// Replace `{{key}}` placeholders in a template string.
///
/// Substitution is a single left-to-right pass over the template: inserted
/// values are never scanned again, and unknown placeholders are kept as-is.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            rest = &rest[start..];
            break;
        };

        let key = &after[..end];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => {
                result.push_str(value);
                rest = &after[end + 2..];
            }
            None => {
                // Keep the braces and resume right after them so a nested
                // `{{key}}` inside an unknown one is still found.
                result.push_str("{{");
                rest = after;
            }
        }
    }

    result.push_str(rest);
    result
}

/// Build the user instruction for one generation request.
pub fn caption_user_prompt(options: &GenerationOptions, image_count: usize) -> String {
    let hashtag_rule = if options.include_hashtags {
        "Give each caption 3 to 5 relevant hashtags, each starting with #."
    } else {
        "Do not use hashtags; return an empty hashtags array."
    };
    let emoji_rule = if options.include_emojis {
        "Give each caption 1 to 3 fitting emojis in the emojis array."
    } else {
        "Do not use emojis anywhere; return an empty emojis array."
    };

    let per_category = CAPTIONS_PER_CATEGORY.to_string();
    let image_count = image_count.to_string();
    let categories = options.categories.join(", ");

    render(
        CAPTION_USER,
        &[
            ("per_category", &per_category),
            ("categories", &categories),
            ("tone", &options.tone),
            ("image_count", &image_count),
            ("hashtag_rule", hashtag_rule),
            ("emoji_rule", emoji_rule),
        ],
    )
}

/// Schema for providers that support strict structured output.
pub fn caption_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "captions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "text": { "type": "string" },
                        "category": { "type": "string" },
                        "hashtags": { "type": "array", "items": { "type": "string" } },
                        "emojis": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["text", "category", "hashtags", "emojis"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["captions"],
        "additionalProperties": false
    })
}
