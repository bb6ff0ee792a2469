//! Per-run aggregation of plugin outputs.

use crate::core::{
    Bundle, ExecResult, JudgeReport, LibraryInfo, Operation, RenderTuple, ResultCategory,
    ResultEntry,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Append-only store of results, keyed by operation then category.
///
/// Entries keep the order they were registered in.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultsRegistry {
    entries: BTreeMap<Operation, BTreeMap<ResultCategory, Vec<ResultEntry>>>,
}

impl ResultsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry` under its own category.
    pub fn register(&mut self, operation: Operation, entry: ResultEntry) {
        self.entries
            .entry(operation)
            .or_default()
            .entry(entry.category())
            .or_default()
            .push(entry);
    }

    pub fn extend(&mut self, operation: Operation, entries: impl IntoIterator<Item = ResultEntry>) {
        for entry in entries {
            self.register(operation, entry);
        }
    }

    /// Splits a bundle and appends its four parts.
    pub fn register_bundle(&mut self, operation: Operation, bundle: Bundle) {
        self.extend(operation, bundle.into_entries());
    }

    /// Everything registered under `category`, empty when nothing was.
    pub fn get(&self, operation: Operation, category: ResultCategory) -> &[ResultEntry] {
        self.entries
            .get(&operation)
            .and_then(|categories| categories.get(&category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self, operation: Operation, category: ResultCategory) -> usize {
        self.get(operation, category).len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries
            .values()
            .all(|categories| categories.values().all(Vec::is_empty))
    }

    pub fn wrapped(&self, operation: Operation) -> Vec<&ExecResult<Value>> {
        self.get(operation, ResultCategory::Wrapped)
            .iter()
            .filter_map(|entry| match entry {
                ResultEntry::Wrapped(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn reports(&self, operation: Operation) -> Vec<&ExecResult<JudgeReport>> {
        self.get(operation, ResultCategory::Report)
            .iter()
            .filter_map(|entry| match entry {
                ResultEntry::Report(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn rendered(&self, operation: Operation) -> Vec<&ExecResult<Vec<RenderTuple>>> {
        self.get(operation, ResultCategory::Rendered)
            .iter()
            .filter_map(|entry| match entry {
                ResultEntry::Rendered(result) => Some(result),
                _ => None,
            })
            .collect()
    }

    pub fn libraries(&self, operation: Operation) -> Vec<&LibraryInfo> {
        self.get(operation, ResultCategory::Library)
            .iter()
            .filter_map(|entry| match entry {
                ResultEntry::Library(info) => Some(info),
                _ => None,
            })
            .collect()
    }
}
