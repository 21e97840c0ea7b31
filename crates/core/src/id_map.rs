use std::collections::HashMap;

use crate::records::Record;

/// Rows keyed by id for O(1) reconciliation lookups.
/// A duplicate id keeps the last row seen.
#[derive(Debug, Clone)]
pub struct IdMap<R: Record> {
    rows: HashMap<R::Id, R>,
}

impl<R: Record> IdMap<R> {
    pub fn new() -> Self {
        Self { rows: HashMap::new() }
    }

    pub fn get(&self, id: &R::Id) -> Option<&R> {
        self.rows.get(id)
    }

    pub fn contains(&self, id: &R::Id) -> bool {
        self.rows.contains_key(id)
    }

    /// Insert or replace the row under its own id.
    pub fn upsert(&mut self, row: R) -> Option<R> {
        self.rows.insert(row.id().clone(), row)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &R> {
        self.rows.values()
    }
}

impl<R: Record> Default for IdMap<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> FromIterator<R> for IdMap<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        let mut map = Self::new();
        for row in iter {
            map.upsert(row);
        }
        map
    }
}

impl<'a, R: Record> FromIterator<&'a R> for IdMap<R> {
    fn from_iter<I: IntoIterator<Item = &'a R>>(iter: I) -> Self {
        iter.into_iter().cloned().collect()
    }
}
