pub const DEFAULT_BASE_URL: &str = "https://ai.dragonflygroup.fr/api/v1";
pub const DEFAULT_ASSISTANT_ID: &str = "asst_1f1UeJGMURpenLfrj4Aaykyp";
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;

pub const COMPLETIONS_PATH: &str = "chat/completions";
pub const ASSISTANTS_PATH: &str = "user/assistants";
pub const STREAM_DATA_PREFIX: &str = "data:";
pub const STREAM_DONE_MARKER: &str = "[DONE]";

pub const EXPORT_SEPARATOR: char = ';';
pub const UTF8_BOM: &str = "\u{feff}";

pub const PROCESSING_ERROR_NOTE: &str = "processing error";
pub const PHONE_DIGIT_COUNT: usize = 10;

pub const MIN_TEMPERATURE: f64 = 0.0;
pub const MAX_TEMPERATURE: f64 = 2.0;
pub const MIN_REQUEST_TIMEOUT_SECONDS: u64 = 1;
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 600;
