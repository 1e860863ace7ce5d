//! Turns a vision model's free-form reply into caption records.
//!
//! Models are asked for a `{"captions": [...]}` object but routinely wrap it
//! in prose or Markdown fences, drop fields, or answer in plain text. Nothing
//! here fails: the worst case is a single caption holding the raw reply.

use crate::models::{Caption, GenerationOptions, DEFAULT_CATEGORY};
use serde_json::{Map, Value};

/// Normalize `raw` into at most `max_captions` captions.
pub fn normalize_reply(raw: &str, options: &GenerationOptions, max_captions: usize) -> Vec<Caption> {
    let mut captions = match extract_json(raw).and_then(|value| caption_records(&value)) {
        Some(records) => records.iter().map(caption_from_record).collect(),
        None => {
            tracing::warn!(
                "Model reply was not caption JSON, using raw text ({} chars)",
                raw.len()
            );
            vec![Caption::from_raw_text(raw)]
        }
    };

    if captions.len() > max_captions {
        tracing::debug!(
            "Truncating {} captions to {}",
            captions.len(),
            max_captions
        );
        captions.truncate(max_captions);
    }

    for caption in &mut captions {
        if !options.include_hashtags {
            caption.hashtags.clear();
        }
        if !options.include_emojis {
            caption.emojis.clear();
        }
    }

    captions
}

/// Find the JSON document inside a model reply.
///
/// Tries the whole reply, then the body of a Markdown code fence, then the
/// first complete JSON object starting at any `{`.
pub fn extract_json(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    if let Some(fenced) = fenced_block(trimmed) {
        if let Ok(value) = serde_json::from_str::<Value>(fenced) {
            return Some(value);
        }
    }

    first_embedded_object(trimmed)
}

fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip an info string such as `json`.
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Stream-parse from each `{` until one yields a complete object.
fn first_embedded_object(text: &str) -> Option<Value> {
    text.match_indices('{').find_map(|(offset, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[offset..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(value @ Value::Object(_))) => Some(value),
            _ => None,
        }
    })
}

/// Pick the list of caption records out of a parsed reply.
fn caption_records(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(map) => match map.get("captions") {
            Some(Value::Array(items)) => Some(items.clone()),
            Some(single @ Value::Object(_)) => Some(vec![single.clone()]),
            _ if map.contains_key("text") => Some(vec![value.clone()]),
            _ => None,
        },
        _ => None,
    }
}

fn caption_from_record(record: &Value) -> Caption {
    let empty = Map::new();
    let fields = match record {
        Value::Object(map) => map,
        Value::String(text) => return Caption::from_raw_text(text),
        _ => &empty,
    };

    let text = fields
        .get("text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let category = fields
        .get("category")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    Caption {
        text,
        category,
        hashtags: string_list(fields.get("hashtags")),
        emojis: string_list(fields.get("emojis")),
    }
}

/// Accept either a JSON string array or a whitespace-separated string.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined.split_whitespace().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}
