//! In-memory historical store

use super::poison_err;
use crate::adapters::database::traits::HistoricalStore;
use crate::core::backfill::cursor::{Cursor, CursorKey, HistoricalRow, LegacyDocument};
use crate::domain::errors::StorageError;
use crate::domain::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug)]
enum Stored<R> {
    Record(R),
    // Decoded on every fetch, like a `data` column
    Document(Value),
}

/// Historical dataset held in memory, sorted by `(mills, id)`
///
/// Records every cursor it was asked to fetch after, so tests can check the
/// pagination sequence.
#[derive(Debug)]
pub struct InMemoryHistoricalStore<R> {
    rows: Vec<(Cursor, Stored<R>)>,
    fetches: Mutex<Vec<Option<Cursor>>>,
    fail_reads: AtomicBool,
}

impl<R: LegacyDocument + Clone> InMemoryHistoricalStore<R> {
    #[must_use]
    pub fn new(rows: Vec<R>) -> Self {
        let mut store = Self {
            rows: rows
                .into_iter()
                .map(|r| (r.cursor(), Stored::Record(r)))
                .collect(),
            fetches: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
        };
        store.sort();
        store
    }

    /// Empty store
    #[must_use]
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Adds a raw `(id, mills, data)` row, decoded only when fetched
    #[must_use]
    pub fn with_document(mut self, id: impl Into<String>, mills: i64, data: Value) -> Self {
        self.rows
            .push((Cursor::new(mills, id), Stored::Document(data)));
        self.sort();
        self
    }

    /// Makes every subsequent `count` and `fetch_after` fail
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Cursors passed to `fetch_after`, in call order
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn fetch_log(&self) -> Result<Vec<Option<Cursor>>> {
        Ok(self.fetches.lock().map_err(poison_err)?.clone())
    }

    fn sort(&mut self) {
        self.rows.sort_by(|a, b| a.0.cmp(&b.0));
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::QueryFailed("historical store unavailable".to_string()).into());
        }
        Ok(())
    }

    fn load(cursor: &Cursor, stored: &Stored<R>) -> HistoricalRow<R> {
        let record = match stored {
            Stored::Record(r) => Ok(r.clone()),
            Stored::Document(data) => R::from_document(cursor.id.clone(), cursor.mills, data.clone()),
        };
        HistoricalRow {
            cursor: cursor.clone(),
            record,
        }
    }
}

#[async_trait]
impl<R: LegacyDocument + Clone> HistoricalStore<R> for InMemoryHistoricalStore<R> {
    async fn count(&self) -> Result<u64> {
        self.check_reads()?;
        Ok(self.rows.len() as u64)
    }

    async fn fetch_after(
        &self,
        cursor: Option<&Cursor>,
        limit: usize,
    ) -> Result<Vec<HistoricalRow<R>>> {
        self.check_reads()?;
        self.fetches
            .lock()
            .map_err(poison_err)?
            .push(cursor.cloned());

        let start = match cursor {
            Some(after) => self.rows.partition_point(|(key, _)| key <= after),
            None => 0,
        };
        Ok(self
            .rows
            .iter()
            .skip(start)
            .take(limit)
            .map(|(key, stored)| Self::load(key, stored))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::treatment::Treatment;
    use serde_json::json;

    fn rows() -> Vec<Treatment> {
        vec![
            Treatment::new(Some("c"), 2, None),
            Treatment::new(Some("b"), 1, None),
            Treatment::new(Some("a"), 1, None),
            Treatment::new(Some("d"), 3, None),
        ]
    }

    fn ids(page: &[HistoricalRow<Treatment>]) -> Vec<String> {
        page.iter().map(|row| row.cursor.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_fetch_after_pages_in_key_order() {
        let store = InMemoryHistoricalStore::new(rows());
        assert_eq!(store.count().await.unwrap(), 4);

        let first = store.fetch_after(None, 2).await.unwrap();
        assert_eq!(ids(&first), vec!["a", "b"]);

        let cursor = first.last().unwrap().cursor.clone();
        let second = store.fetch_after(Some(&cursor), 2).await.unwrap();
        assert_eq!(ids(&second), vec!["c", "d"]);

        let cursor = second.last().unwrap().cursor.clone();
        assert!(store.fetch_after(Some(&cursor), 2).await.unwrap().is_empty());
        assert_eq!(store.fetch_log().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_same_mills_rows_are_not_skipped() {
        let store = InMemoryHistoricalStore::new(rows());
        let page = store
            .fetch_after(Some(&Cursor::new(1, "a")), 10)
            .await
            .unwrap();
        assert_eq!(page[0].record.as_ref().unwrap().id.as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_bad_document_stays_in_its_row() {
        let store = InMemoryHistoricalStore::new(rows())
            .with_document("bb", 1, json!({"eventType": "Note", "utcOffset": "60"}));

        let page = store.fetch_after(None, 10).await.unwrap();
        assert_eq!(ids(&page), vec!["a", "b", "bb", "c", "d"]);
        assert!(page[2].record.is_err());
        assert_eq!(page.iter().filter(|row| row.record.is_ok()).count(), 4);
    }

    #[tokio::test]
    async fn test_raw_document_takes_row_key() {
        let store = InMemoryHistoricalStore::<Treatment>::empty()
            .with_document("x", 10, json!({"eventType": "Note", "mills": 1}));

        let page = store.fetch_after(None, 1).await.unwrap();
        let treatment = page[0].record.as_ref().unwrap();
        assert_eq!(treatment.id.as_deref(), Some("x"));
        assert_eq!(treatment.mills, 10);
    }

    #[tokio::test]
    async fn test_failing_reads() {
        let store = InMemoryHistoricalStore::new(rows());
        store.fail_reads();
        assert!(store.count().await.is_err());
        assert!(store.fetch_after(None, 1).await.is_err());
    }
}
