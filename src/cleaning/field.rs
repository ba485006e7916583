use once_cell::sync::Lazy;
use regex::Regex;

use crate::cleaning::constants::PHONE_DIGIT_COUNT;
use crate::cleaning::parser::FieldResult;

/// Fixed correspondence between the accent-bearing source headers and the
/// canonical field keys the model answers with. Static for the process
/// lifetime; lookup is by lower-cased display header.
pub const FIELD_MAPPING: &[(&str, &str)] = &[
    ("civilité", "civility"),
    ("prénom", "firstname"),
    ("nom", "lastname"),
    ("nom complet", "fullname"),
    ("fonction", "jobtitle"),
    ("e-mail", "email"),
    ("organisation", "organization"),
    ("numéro de téléphone", "phonenumber"),
];

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

/// Canonical key for a display header, if the header is a known contact field.
pub fn canonical_field(header: &str) -> Option<&'static str> {
    let lowered = header.trim().to_lowercase();
    FIELD_MAPPING
        .iter()
        .find(|(display, _)| *display == lowered)
        .map(|(_, canonical)| *canonical)
}

/// Finds the result for a canonical field in a cleaned row. The model is free
/// to answer with display casing ("Email"), so comparison is case-insensitive.
pub fn find_field<'a>(results: &'a [FieldResult], canonical: &str) -> Option<&'a FieldResult> {
    results
        .iter()
        .find(|item| item.field.to_lowercase() == canonical)
}

/// Normalizes a header into a context key: lower-cased, accents folded to
/// ASCII, every other non-alphanumeric character replaced by an underscore.
/// "Numéro de téléphone" becomes "numero_de_telephone".
pub fn normalize_header_key(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' | 'ã' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' | 'õ' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ç' => 'c',
        'ÿ' => 'y',
        'ñ' => 'n',
        _ => c,
    }
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Formats a phone value into five space-separated digit pairs. Anything that
/// does not carry exactly ten digits is unformattable.
pub fn format_phone(value: &str) -> Option<String> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != PHONE_DIGIT_COUNT {
        return None;
    }

    let pairs: Vec<&str> = digits
        .as_bytes()
        .chunks(2)
        .map(|pair| std::str::from_utf8(pair).unwrap_or_default())
        .collect();

    Some(pairs.join(" "))
}

/// Confidence band for the rendering collaborator. Thresholds follow the
/// highlighting scale of the original viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceBand {
    Certain,
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceBand {
    pub fn from_confidence(confidence: f64) -> Self {
        let percent = confidence * 100.0;
        if percent >= 90.0 {
            ConfidenceBand::Certain
        } else if percent >= 85.0 {
            ConfidenceBand::High
        } else if percent >= 50.0 {
            ConfidenceBand::Medium
        } else if percent >= 25.0 {
            ConfidenceBand::Low
        } else {
            ConfidenceBand::VeryLow
        }
    }
}
