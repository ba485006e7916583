use std::collections::{HashMap, HashSet};

use crate::cleaning::field::find_field;
use crate::cleaning::parser::CleanedRow;

/// Indices of cleaned rows sharing the same normalized name key.
/// Only groups with at least two members are surfaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub key: String,
    pub indices: Vec<usize>,
}

/// Pure, idempotent duplicate detection and filtering over the cleaned-row
/// collection. Never re-invokes the remote completion service.
pub struct Deduplicator;

impl Deduplicator {
    /// Groups successfully-cleaned rows by their lower-cased
    /// (firstname, lastname) pair. A missing field or null value contributes
    /// an empty key component. Failed rows never participate.
    pub fn find_groups(cleaned_rows: &[CleanedRow]) -> Vec<DuplicateGroup> {
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();

        for (index, row) in cleaned_rows.iter().enumerate() {
            if !row.success {
                continue;
            }
            let key = dedup_key(row);
            groups.entry(key).or_default().push(index);
        }

        let mut duplicates: Vec<DuplicateGroup> = groups
            .into_iter()
            .filter(|(_, indices)| indices.len() >= 2)
            .map(|(key, indices)| DuplicateGroup { key, indices })
            .collect();

        // Stable presentation order regardless of hash iteration
        duplicates.sort_by_key(|group| group.indices[0]);
        duplicates
    }

    /// Removes grouped rows whose index is not in the keep set. Rows outside
    /// every group are always retained; relative order is preserved.
    pub fn apply(
        cleaned_rows: Vec<CleanedRow>,
        groups: &[DuplicateGroup],
        keep_set: &HashSet<usize>,
    ) -> Vec<CleanedRow> {
        let affected: HashSet<usize> = groups
            .iter()
            .flat_map(|group| group.indices.iter().copied())
            .collect();

        cleaned_rows
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !affected.contains(index) || keep_set.contains(index))
            .map(|(_, row)| row)
            .collect()
    }
}

fn dedup_key(row: &CleanedRow) -> String {
    let component = |canonical: &str| {
        find_field(&row.cleaned_data, canonical)
            .and_then(|item| item.value.as_deref())
            .unwrap_or_default()
            .to_lowercase()
    };

    format!("{}|{}", component("firstname"), component("lastname"))
}
