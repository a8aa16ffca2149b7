use std::collections::BTreeMap;

use serde::Serialize;

use crate::transform::{Mutation, Mutations};

/// Totals for one jar pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JarReport {
    pub entries: usize,
    pub classes_seen: usize,
    pub classes_modified: usize,
    /// Classes that failed to transform and were copied as they were.
    pub classes_failed: usize,
    pub mutations: BTreeMap<Mutation, usize>,
    /// Entry names of the rewritten classes, in jar order.
    pub modified: Vec<String>,
}

impl JarReport {
    pub fn record(&mut self, entry_name: &str, mutations: &Mutations) {
        self.classes_modified += 1;
        self.modified.push(entry_name.to_owned());
        for (mutation, count) in mutations.iter() {
            *self.mutations.entry(mutation).or_default() += count;
        }
    }

    pub fn total_mutations(&self) -> usize {
        self.mutations.values().sum()
    }
}
