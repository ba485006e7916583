use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One normalized field outcome. `value: None` means the model could not
/// normalize the field, which is distinct from an empty string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResult {
    pub field: String,
    pub value: Option<String>,
    pub confidence: f64,
    pub notes: String,
}

/// Outcome of cleaning one source row. Index correspondence with the source
/// table is preserved even on failure: a failed row carries an echo of every
/// original header/cell pair so downstream consumers keep their positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedRow {
    pub success: bool,
    pub cleaned_data: Vec<FieldResult>,
    pub analysis: String,
    pub error: Option<String>,
}

impl CleanedRow {
    pub fn succeeded(cleaned_data: Vec<FieldResult>, analysis: String) -> Self {
        Self {
            success: true,
            cleaned_data,
            analysis,
            error: None,
        }
    }

    pub fn failed(error: String, cleaned_data: Vec<FieldResult>) -> Self {
        Self {
            success: false,
            cleaned_data,
            analysis: String::new(),
            error: Some(error),
        }
    }
}

static BARE_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,]\s*)([A-Za-z_][A-Za-z0-9_]*)\s*:").unwrap());
static SINGLE_QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([{\[,:]\s*)'([^']*)'"#).unwrap());
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*([}\]])").unwrap());
static ANALYSIS_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<analys[ei]s?>(.*?)</analys[ei]s?>").unwrap());

/// Best-effort extraction of structured field results from the model's
/// free-text answer.
///
/// Tolerated shapes: a bare JSON array, an array inside a fenced code block,
/// an array preceded by free-form analysis text, and malformed JSON with
/// smart quotes, unquoted keys or trailing commas. Entries that cannot be
/// coerced into a well-typed result are dropped; only failure to recover the
/// array itself fails the row.
pub struct ResponseParser;

impl ResponseParser {
    pub fn parse(raw_text: &str) -> CleanedRow {
        let (candidate, analysis) = extract_candidate(raw_text);

        let Some(candidate) = candidate else {
            return CleanedRow::failed(
                "No JSON array found in model response".to_string(),
                Vec::new(),
            );
        };

        let cleaned = normalize_quotes(&strip_control_chars(&candidate));

        let parsed = match serde_json::from_str::<Value>(&cleaned) {
            Ok(value) => value,
            Err(first_err) => {
                let repaired = repair(&cleaned);
                match serde_json::from_str::<Value>(&repaired) {
                    Ok(value) => value,
                    Err(second_err) => {
                        debug!(
                            "Response unrecoverable: {} (after repair: {})",
                            first_err, second_err
                        );
                        return CleanedRow::failed(
                            format!("Unrecoverable model response: {}", second_err),
                            Vec::new(),
                        );
                    }
                }
            }
        };

        let Some(entries) = parsed.as_array() else {
            return CleanedRow::failed(
                "Model response is not a JSON array".to_string(),
                Vec::new(),
            );
        };

        let cleaned_data: Vec<FieldResult> =
            entries.iter().filter_map(coerce_entry).collect();

        CleanedRow::succeeded(cleaned_data, analysis)
    }
}

/// Locates the JSON-array candidate and the analysis text preceding it.
/// A fenced code block wins over a bare array found elsewhere in the text.
fn extract_candidate(raw_text: &str) -> (Option<String>, String) {
    let text = raw_text.trim();

    if let Some((fenced, before)) = extract_fenced_block(text) {
        let candidate = match last_array_span(&fenced) {
            Some((start, end)) => fenced[start..end].to_string(),
            None => fenced,
        };
        return (Some(candidate), extract_analysis(&before));
    }

    match last_array_span(text) {
        Some((start, end)) => (
            Some(text[start..end].to_string()),
            extract_analysis(&text[..start]),
        ),
        None => (None, String::new()),
    }
}

fn extract_fenced_block(text: &str) -> Option<(String, String)> {
    let open = text.find("```")?;
    let after_open = &text[open + 3..];
    let close = after_open.find("```")?;
    let mut block = &after_open[..close];

    // Drop a language tag such as "json" on the fence line
    if let Some(newline) = block.find('\n') {
        let tag = block[..newline].trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            block = &block[newline + 1..];
        }
    }

    Some((block.trim().to_string(), text[..open].to_string()))
}

/// Finds the last complete JSON-array-shaped substring by matching the final
/// closing bracket backwards to its opener. Bracket characters inside string
/// values can fool this; the repair pass and reparse absorb what they can.
fn last_array_span(text: &str) -> Option<(usize, usize)> {
    let close = text.rfind(']')?;
    let mut depth = 0usize;
    for (index, c) in text[..=close].char_indices().rev() {
        match c {
            ']' => depth += 1,
            '[' => {
                depth -= 1;
                if depth == 0 {
                    return Some((index, close + 1));
                }
            }
            _ => {}
        }
    }
    None
}

fn extract_analysis(before: &str) -> String {
    if let Some(captures) = ANALYSIS_TAG_RE.captures(before) {
        return captures[1].trim().to_string();
    }
    before.trim().to_string()
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

fn normalize_quotes(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}', '\u{201e}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

/// Ordered repair rules for almost-JSON: quote bare keys, requote
/// single-quoted strings, drop trailing commas.
fn repair(text: &str) -> String {
    let quoted_keys = BARE_KEY_RE.replace_all(text, "${1}\"${2}\":");
    let requoted = SINGLE_QUOTED_RE.replace_all(&quoted_keys, "${1}\"${2}\"");
    TRAILING_COMMA_RE.replace_all(&requoted, "${1}").into_owned()
}

fn coerce_entry(entry: &Value) -> Option<FieldResult> {
    let object = entry.as_object()?;

    let field = object.get("field")?.as_str()?.trim().to_string();
    if field.is_empty() {
        return None;
    }

    let value = match object.get("value") {
        None | Some(Value::Null) => None,
        // The literal string "null" is the null sentinel, not a value
        Some(Value::String(s)) if s == "null" => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    let confidence = normalize_confidence(object.get("confidence"));

    let notes = object
        .get("notes")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Some(FieldResult {
        field,
        value,
        confidence,
        notes,
    })
}

/// Confidence arrives as a fraction, a percentage number (> 1 implies /100)
/// or a percent-suffixed string. Everything is clamped into [0, 1];
/// missing or unparseable values default to 0.
pub fn normalize_confidence(raw: Option<&Value>) -> f64 {
    // Percent-derived values are already scaled; only bare numbers above 1
    // get the implicit /100.
    let numeric = match raw {
        Some(Value::Number(n)) => n.as_f64().map(scale_bare_number),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if let Some(percent) = trimmed.strip_suffix('%') {
                percent.trim().parse::<f64>().ok().map(|v| v / 100.0)
            } else {
                trimmed.parse::<f64>().ok().map(scale_bare_number)
            }
        }
        _ => None,
    };

    numeric.unwrap_or(0.0).clamp(0.0, 1.0)
}

fn scale_bare_number(value: f64) -> f64 {
    if value > 1.0 {
        value / 100.0
    } else {
        value
    }
}
