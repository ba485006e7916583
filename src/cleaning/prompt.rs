use serde_json::{Map, Value};

use crate::cleaning::field::normalize_header_key;

/// Normalization policy sent with every row. The model is instructed to apply
/// these rules field by field and to answer with structured records only.
const FIELD_RULES: &str = r#"- civility: infer "Madame" or "Monsieur" from first name gender cues and job title cues ("Directrice" means Madame), cross-checked against the email and full name; always resolve to one of the two values.
- firstname: capitalize the first letter, lower-case the rest, trim whitespace; if blank, reconstruct it from the full name or the email local part.
- lastname: same casing rule; if blank or equal to the first name, reconstruct it from the full name.
- fullname: must equal "Firstname Lastname"; reconstruct from the parts or the email if blank.
- jobtitle: title-case each word; keep the acronyms DSI, PDG, DRH and RSSI upper-cased; strip parenthetical content and anything after "/".
- email: lower-case, strip whitespace; it must match a standard local@domain.tld pattern, otherwise the value is null.
- organization: title-case the words, keep the legal-form acronyms SA, SARL and SAS upper-cased, standardize "&" and "et".
- phonenumber: strip non-digits; the number is valid only with exactly 10 digits, formatted as five space-separated digit pairs, otherwise the value is null."#;

pub struct PromptBuilder;

impl PromptBuilder {
    /// Zips normalized header keys with the row's cells. Missing cells map to
    /// empty strings so the context always covers every column.
    pub fn build_context(row: &[String], headers: &[String]) -> Map<String, Value> {
        let mut context = Map::new();
        for (index, header) in headers.iter().enumerate() {
            let value = row.get(index).cloned().unwrap_or_default();
            context.insert(normalize_header_key(header), Value::String(value));
        }
        context
    }

    pub fn build_prompt(context: &Map<String, Value>) -> String {
        let serialized = serde_json::to_string_pretty(&Value::Object(context.clone()))
            .unwrap_or_else(|_| "{}".to_string());

        format!(
            "OBJECTIVE: Clean and normalize this contact record.\n\
             INPUT: {serialized}\n\
             RULES:\n{FIELD_RULES}\n\
             EXPECTED OUTPUT: respond with only a JSON array of \
             {{\"field\", \"value\", \"confidence\", \"notes\"}} records, \
             one per recognized field, no surrounding prose.\n\
             CONSTRAINT: \"confidence\" is a number between 0 and 1; use a \
             null \"value\" when a field cannot be normalized."
        )
    }
}
