//! Parsing of LLM output into validated question drafts.
//!
//! Models are asked for `{"questions": [...]}` but in practice return bare
//! arrays, single objects, fenced blocks and assorted field spellings. Each
//! candidate is validated on its own so one malformed entry never discards
//! the rest of the batch.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Difficulty, QuestionDraft, QuestionType};
use crate::traits::extract_json_from_markdown;

/// Topic assigned when the model omits one.
pub const DEFAULT_TOPIC: &str = "General";

/// Result of parsing one LLM response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedQuestions {
    /// Candidates that passed validation, in response order.
    pub questions: Vec<QuestionDraft>,
    /// Candidates that failed validation.
    pub rejected: Vec<RejectedQuestion>,
}

/// A candidate dropped during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedQuestion {
    /// Position of the candidate in the response.
    pub index: usize,
    pub reason: String,
}

/// Parse a raw LLM response into question drafts.
///
/// Fails only when the payload is not JSON at all or has an unusable shape.
pub fn parse_generated_questions(raw: &str) -> Result<ParsedQuestions> {
    let payload = extract_json_from_markdown(raw);
    let value: Value =
        serde_json::from_str(&payload).context("LLM response is not valid JSON")?;

    let candidates = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            Some(_) => bail!("`questions` field is not an array"),
            None => vec![Value::Object(map)],
        },
        other => bail!("expected a JSON object or array, got {}", value_kind(&other)),
    };

    let mut parsed = ParsedQuestions::default();
    for (index, candidate) in candidates.iter().enumerate() {
        match validate_candidate(candidate) {
            Ok(draft) => parsed.questions.push(draft),
            Err(reason) => parsed.rejected.push(RejectedQuestion { index, reason }),
        }
    }
    Ok(parsed)
}

fn validate_candidate(value: &Value) -> Result<QuestionDraft, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected an object, got {}", value_kind(value)))?;

    let question = string_field(obj, &["question", "text", "prompt"])
        .ok_or_else(|| "missing question text".to_string())?;

    let options: Vec<String> = match obj.get("options").or_else(|| obj.get("choices")) {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_to_string).collect(),
        _ => Vec::new(),
    };

    let kind = match string_field(obj, &["type", "kind", "questionType"]) {
        Some(raw) => raw.parse::<QuestionType>()?,
        None if !options.is_empty() => QuestionType::Mcq,
        None => QuestionType::Theory,
    };

    if kind == QuestionType::Mcq && options.len() < 2 {
        return Err("multiple-choice question needs at least two options".into());
    }

    let answer = match first_field(obj, &["answer", "correct_answer", "correctAnswer"]) {
        Some(Value::Number(n)) if kind == QuestionType::Mcq => {
            let idx = n
                .as_u64()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| format!("invalid answer index {n}"))?;
            options
                .get(idx)
                .cloned()
                .ok_or_else(|| format!("answer index {idx} is out of range"))?
        }
        Some(v) => scalar_to_string(v).ok_or_else(|| "missing answer".to_string())?,
        None => return Err("missing answer".into()),
    };

    let options = match kind {
        QuestionType::Mcq => options,
        QuestionType::Theory => Vec::new(),
    };

    let difficulty = string_field(obj, &["difficulty", "level"])
        .and_then(|d| d.parse::<Difficulty>().ok())
        .unwrap_or_default();

    Ok(QuestionDraft {
        kind,
        question,
        options,
        answer,
        explanation: string_field(obj, &["explanation", "rationale"]),
        topic: string_field(obj, &["topic", "subject"]).unwrap_or_else(|| DEFAULT_TOPIC.into()),
        difficulty,
    })
}

fn first_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First non-empty string (after trimming) among `keys`.
fn string_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
