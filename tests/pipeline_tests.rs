use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use contact_sift::cleaning::client::Completion;
use contact_sift::cleaning::error::{CleanError, Result as CleanResult};
use contact_sift::cleaning::table;
use contact_sift::{
    CleanConfig, CleaningSession, CsvTable, Deduplicator, RowCleaner,
};

/// Completion stand-in that replays a scripted sequence of responses.
struct ScriptedCompletion {
    responses: Mutex<VecDeque<CleanResult<String>>>,
}

impl ScriptedCompletion {
    fn new(responses: Vec<CleanResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl Completion for ScriptedCompletion {
    async fn complete(&self, _prompt: &str) -> CleanResult<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(CleanError::Parse("script exhausted".to_string())))
    }
}

fn person_response(first: &str, last: &str, email: &str) -> CleanResult<String> {
    Ok(format!(
        r#"[{{"field":"firstname","value":"{first}","confidence":0.95,"notes":""}},
            {{"field":"lastname","value":"{last}","confidence":0.95,"notes":""}},
            {{"field":"email","value":"{email}","confidence":0.9,"notes":""}}]"#
    ))
}

fn contact_table(rows: usize) -> CsvTable {
    let mut text = String::from("Prénom;Nom;E-mail");
    for i in 0..rows {
        text.push_str(&format!("\np{i};n{i};p{i}@test.fr"));
    }
    CsvTable::parse(&text).unwrap()
}

#[tokio::test]
async fn test_failed_row_keeps_positional_correspondence() {
    let table = contact_table(5);
    let client = ScriptedCompletion::new(vec![
        person_response("P0", "N0", "p0@test.fr"),
        person_response("P1", "N1", "p1@test.fr"),
        Err(CleanError::Http {
            status: 500,
            message: "upstream".to_string(),
        }),
        person_response("P3", "N3", "p3@test.fr"),
        person_response("P4", "N4", "p4@test.fr"),
    ]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    let stats = cleaner.clean(&mut session).await;

    assert_eq!(session.cleaned_rows.len(), 5);
    assert_eq!(stats.rows_cleaned, 4);
    assert_eq!(stats.rows_failed, 1);

    let failed = &session.cleaned_rows[2];
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap().contains("500"));

    // The placeholder echoes every original cell at confidence 0
    assert_eq!(failed.cleaned_data.len(), 3);
    assert_eq!(failed.cleaned_data[0].value.as_deref(), Some("p2"));
    assert_eq!(failed.cleaned_data[0].confidence, 0.0);
    assert_eq!(failed.cleaned_data[0].notes, "processing error");

    for index in [0usize, 1, 3, 4] {
        assert!(session.cleaned_rows[index].success, "row {} failed", index);
    }
}

#[tokio::test]
async fn test_email_contract_enforced_locally() {
    let table = contact_table(1);
    let client = ScriptedCompletion::new(vec![person_response("Jean", "Dupont", "JEAN@Test.FR")]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    let email = session.cleaned_rows[0]
        .cleaned_data
        .iter()
        .find(|item| item.field == "email")
        .unwrap();
    assert_eq!(email.value.as_deref(), Some("jean@test.fr"));
}

#[tokio::test]
async fn test_invalid_email_from_model_is_nulled() {
    let table = contact_table(1);
    let client = ScriptedCompletion::new(vec![Ok(
        r#"[{"field":"email","value":"jean.dupont","confidence":0.8,"notes":""}]"#.to_string(),
    )]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    let email = session.cleaned_rows[0]
        .cleaned_data
        .iter()
        .find(|item| item.field == "email")
        .unwrap();
    assert_eq!(email.value, None);
}

#[tokio::test]
async fn test_phone_from_model_is_reformatted_or_nulled() {
    let table = contact_table(2);
    let client = ScriptedCompletion::new(vec![
        Ok(r#"[{"field":"phonenumber","value":"06.12.34.56.78","confidence":0.8,"notes":""}]"#
            .to_string()),
        Ok(r#"[{"field":"phonenumber","value":"12345","confidence":0.8,"notes":""}]"#
            .to_string()),
    ]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    let phone = |index: usize| {
        session.cleaned_rows[index]
            .cleaned_data
            .iter()
            .find(|item| item.field == "phonenumber")
            .unwrap()
            .value
            .clone()
    };

    assert_eq!(phone(0).as_deref(), Some("06 12 34 56 78"));
    assert_eq!(phone(1), None);
}

#[tokio::test]
async fn test_parse_failure_degrades_to_placeholder_row() {
    let table = contact_table(2);
    let client = ScriptedCompletion::new(vec![
        Ok("no structured data here".to_string()),
        person_response("P1", "N1", "p1@test.fr"),
    ]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    assert_eq!(session.cleaned_rows.len(), 2);
    assert!(!session.cleaned_rows[0].success);
    assert!(session.cleaned_rows[1].success);
}

#[tokio::test]
async fn test_progress_reported_after_each_row() {
    let table = contact_table(3);
    let client = ScriptedCompletion::new(vec![
        person_response("A", "B", "a@test.fr"),
        person_response("C", "D", "c@test.fr"),
        person_response("E", "F", "e@test.fr"),
    ]);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let cleaner = RowCleaner::new(client, false)
        .with_progress(move |processed, total| sink.lock().unwrap().push((processed, total)));

    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    assert_eq!(*seen.lock().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
}

#[tokio::test]
async fn test_shutdown_leaves_completed_prefix() {
    let table = contact_table(3);
    let client = ScriptedCompletion::new(vec![
        person_response("A", "B", "a@test.fr"),
        person_response("C", "D", "c@test.fr"),
        person_response("E", "F", "e@test.fr"),
    ]);

    let flag = Arc::new(AtomicBool::new(false));
    let stop = flag.clone();
    let cleaner = RowCleaner::new(client, false)
        .with_shutdown_signal(flag)
        .with_progress(move |processed, _| {
            if processed == 2 {
                stop.store(true, Ordering::Relaxed);
            }
        });

    let mut session = CleaningSession::new(table);
    let stats = cleaner.clean(&mut session).await;

    assert_eq!(stats.rows_processed, 2);
    assert_eq!(session.cleaned_rows.len(), 2);
}

#[tokio::test]
async fn test_clean_then_dedupe_then_export() {
    let text = "Prénom;Nom;E-mail\njean;dupont;j@d.fr\nJEAN;DUPONT;j2@d.fr\nmarie;curie;m@c.fr";
    let table = CsvTable::parse(text).unwrap();
    table.validate().unwrap();

    let client = ScriptedCompletion::new(vec![
        person_response("Jean", "Dupont", "j@d.fr"),
        person_response("Jean", "Dupont", "j2@d.fr"),
        person_response("Marie", "Curie", "m@c.fr"),
    ]);

    let cleaner = RowCleaner::new(client, false);
    let mut session = CleaningSession::new(table);
    cleaner.clean(&mut session).await;

    let groups = Deduplicator::find_groups(&session.cleaned_rows);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].indices, vec![0, 1]);

    let keep: HashSet<usize> = groups.iter().map(|g| g.indices[0]).collect();
    let kept = Deduplicator::apply(session.cleaned_rows, &groups, &keep);
    assert_eq!(kept.len(), 2);

    let exported = table::export_cleaned(&session.table.headers, &kept);
    let body = exported.trim_start_matches('\u{feff}');
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "\"Jean\";\"Dupont\";\"j@d.fr\"");
    assert_eq!(lines[2], "\"Marie\";\"Curie\";\"m@c.fr\"");
}

#[test]
fn test_config_file_round_trip() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.json");

    let mut config = CleanConfig::default();
    config.temperature = 0.5;
    config.verbose = true;
    config.to_file(&path).unwrap();

    let loaded = CleanConfig::from_file(&path).unwrap();
    assert_eq!(loaded.temperature, 0.5);
    assert!(loaded.verbose);
    assert_eq!(loaded.assistant_id, config.assistant_id);
}

#[test]
fn test_config_file_rejects_invalid_values() {
    let temp_dir = tempdir().unwrap();
    let path = temp_dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"base_url":"","assistant_id":"a","temperature":1.0,
            "request_timeout_seconds":120,"output_file":"out.csv","verbose":false}"#,
    )
    .unwrap();

    assert!(CleanConfig::from_file(&path).is_err());
}
