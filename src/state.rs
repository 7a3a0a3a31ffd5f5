use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use crate::db::{Storage, DARK_MODE_KEY, RUNNING_KEY, URLS_KEY};
use crate::record::{Status, UrlRecord};

/// Shared `running` flag. Cloning hands out another handle to the same flag.
#[derive(Debug, Clone, Default)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    pub fn start(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Stats {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errors: usize,
}

impl Stats {
    /// Share of records that reached a terminal state, 0..=100.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.completed + self.errors) as f64 / self.total as f64 * 100.0
        }
    }
}

/// Application state: the record collection, preferences and the run flag,
/// persisted to storage after every change.
///
/// Several `ccmeta` invocations may share one store, so every change to the
/// collection re-reads the stored array and patches it in one transaction.
/// `records` is the latest view this process has seen.
pub struct AppState {
    storage: Storage,
    records: Vec<UrlRecord>,
    dark_mode: bool,
    run: RunFlag,
}

impl AppState {
    pub fn load(storage: Storage) -> Result<Self> {
        let records = match storage.get_item(URLS_KEY)? {
            Some(raw) => decode_records(&raw),
            None => Vec::new(),
        };
        let dark_mode = storage.get_item(DARK_MODE_KEY)?.as_deref() == Some("true");
        info!("Loaded {} records", records.len());
        let mut state = Self {
            storage,
            records,
            dark_mode,
            run: RunFlag::default(),
        };
        if !state.run_in_progress()? {
            state.requeue_interrupted()?;
        }
        Ok(state)
    }

    pub fn records(&self) -> &[UrlRecord] {
        &self.records
    }

    pub fn run_flag(&self) -> RunFlag {
        self.run.clone()
    }

    /// Whether this process is running a batch.
    pub fn is_running(&self) -> bool {
        self.run.is_running()
    }

    /// Whether this or any other process sharing the store is running a batch.
    pub fn run_in_progress(&self) -> Result<bool> {
        Ok(self.is_running() || self.storage.get_item(RUNNING_KEY)?.is_some())
    }

    /// Claim the store for a run. Returns false when another run holds it.
    pub fn begin_run(&mut self) -> Result<bool> {
        let now = Utc::now().to_rfc3339();
        let claimed = self.storage.update_item(RUNNING_KEY, |current| match current {
            Some(held) => Ok((Some(held), false)),
            None => Ok((Some(now), true)),
        })?;
        if claimed {
            self.run.start();
        }
        Ok(claimed)
    }

    pub fn end_run(&mut self) -> Result<()> {
        self.run.pause();
        self.storage.remove_item(RUNNING_KEY)
    }

    /// Drop a run marker left by a process that died mid-run and requeue
    /// the records it had picked up. Returns whether a marker was present.
    pub fn unlock(&mut self) -> Result<bool> {
        let held = self.storage.get_item(RUNNING_KEY)?.is_some();
        self.end_run()?;
        self.requeue_interrupted()?;
        Ok(held)
    }

    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    pub fn set_dark_mode(&mut self, on: bool) -> Result<()> {
        self.storage
            .set_item(DARK_MODE_KEY, if on { "true" } else { "false" })?;
        self.dark_mode = on;
        Ok(())
    }

    /// Apply `f` to the freshly stored collection and write it back in one
    /// transaction.
    fn update<T>(&mut self, f: impl FnOnce(&mut Vec<UrlRecord>) -> T) -> Result<T> {
        let (records, out) = self.storage.update_item(URLS_KEY, |raw| {
            let mut records = raw.as_deref().map(decode_records).unwrap_or_default();
            let out = f(&mut records);
            let json = serde_json::to_string(&records)?;
            Ok((Some(json), (records, out)))
        })?;
        self.records = records;
        Ok(out)
    }

    /// Stored `processing` records with no live run are traces of an
    /// interrupted one; put them back to `pending`.
    fn requeue_interrupted(&mut self) -> Result<()> {
        if !self.records.iter().any(|r| r.status == Status::Processing) {
            return Ok(());
        }
        let n = self.update(|records| {
            let mut n = 0;
            for r in records.iter_mut().filter(|r| r.status == Status::Processing) {
                r.status = Status::Pending;
                n += 1;
            }
            n
        })?;
        info!("Requeued {} interrupted records", n);
        Ok(())
    }

    /// Append already-validated URLs as pending records.
    pub fn add_urls(&mut self, urls: &[String]) -> Result<Vec<String>> {
        let new: Vec<UrlRecord> = urls.iter().map(UrlRecord::pending).collect();
        let ids = new.iter().map(|r| r.id.clone()).collect();
        self.update(|records| records.extend(new))?;
        Ok(ids)
    }

    /// Resolve a full id or a unique id prefix.
    pub fn find(&self, id: &str) -> Option<&UrlRecord> {
        if let Some(exact) = self.records.iter().find(|r| r.id == id) {
            return Some(exact);
        }
        let mut hits = self.records.iter().filter(|r| r.id.starts_with(id));
        match (hits.next(), hits.next()) {
            (Some(one), None) if !id.is_empty() => Some(one),
            _ => None,
        }
    }

    pub fn delete(&mut self, id: &str) -> Result<Option<UrlRecord>> {
        let Some(full_id) = self.find(id).map(|r| r.id.clone()) else {
            return Ok(None);
        };
        self.update(|records| {
            let pos = records.iter().position(|r| r.id == full_id);
            pos.map(|i| records.remove(i))
        })
    }

    /// Clear everything. Refused (returns false) while a run is active in
    /// any process sharing the store.
    pub fn reset(&mut self) -> Result<bool> {
        if self.run_in_progress()? {
            warn!("Reset ignored: processing is running");
            return Ok(false);
        }
        self.storage.remove_item(URLS_KEY)?;
        self.records.clear();
        Ok(true)
    }

    pub fn pending(&self) -> Vec<UrlRecord> {
        self.records
            .iter()
            .filter(|r| r.status == Status::Pending)
            .cloned()
            .collect()
    }

    /// Replace records by identity in the stored collection. Ids no longer
    /// in the store (deleted meanwhile) are ignored; records added meanwhile
    /// are kept.
    pub fn merge(&mut self, updated: Vec<UrlRecord>) -> Result<()> {
        self.update(|records| {
            for rec in updated {
                if let Some(slot) = records.iter_mut().find(|r| r.id == rec.id) {
                    *slot = rec;
                }
            }
        })
    }

    pub fn stats(&self) -> Stats {
        let count = |s: Status| self.records.iter().filter(|r| r.status == s).count();
        Stats {
            total: self.records.len(),
            pending: count(Status::Pending),
            processing: count(Status::Processing),
            completed: count(Status::Completed),
            errors: count(Status::Error),
        }
    }
}

/// Decode the persisted collection. Anything that is not a JSON array yields
/// nothing; elements that fail to decode or break the status invariant are
/// dropped.
fn decode_records(raw: &str) -> Vec<UrlRecord> {
    let items = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items,
        Ok(_) => {
            warn!("Stored records are not an array, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!("Stored records are malformed ({}), starting empty", e);
            return Vec::new();
        }
    };

    let total = items.len();
    let records: Vec<UrlRecord> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value::<UrlRecord>(item).ok())
        .filter(UrlRecord::is_consistent)
        .collect();

    if records.len() < total {
        warn!("Dropped {} malformed stored records", total - records.len());
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::frameworks::{Framework, FrameworkCode};

    fn state() -> AppState {
        AppState::load(Storage::open_in_memory().unwrap()).unwrap()
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn add_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        {
            let mut s = AppState::load(Storage::open(&path).unwrap()).unwrap();
            s.add_urls(&urls(&["https://a.com", "https://b.com"])).unwrap();
            s.set_dark_mode(true).unwrap();
        }
        let s = AppState::load(Storage::open(&path).unwrap()).unwrap();
        assert_eq!(s.records().len(), 2);
        assert_eq!(s.records()[0].url, "https://a.com");
        assert!(s.records().iter().all(|r| r.status == Status::Pending));
        assert!(s.dark_mode());
    }

    #[test]
    fn completed_records_round_trip() {
        let storage = Storage::open_in_memory().unwrap();
        let rec = UrlRecord::pending("https://a.com").into_completed(
            Framework::new(FrameworkCode::Bab, "before/after structure identified"),
            ["t1".into(), "t2".into(), "t3".into()],
            ["d1".into(), "d2".into(), "d3".into()],
            "before and after".into(),
        );
        storage
            .set_item(URLS_KEY, &serde_json::to_string(&vec![rec.clone()]).unwrap())
            .unwrap();
        let s = AppState::load(storage).unwrap();
        assert_eq!(s.records(), &[rec]);
    }

    #[test]
    fn garbage_storage_yields_empty() {
        for raw in ["not json", "{\"id\":\"x\"}", "42", "null"] {
            let storage = Storage::open_in_memory().unwrap();
            storage.set_item(URLS_KEY, raw).unwrap();
            assert!(AppState::load(storage).unwrap().records().is_empty(), "{}", raw);
        }
    }

    #[test]
    fn incomplete_elements_are_dropped() {
        let storage = Storage::open_in_memory().unwrap();
        let raw = r#"[
            {"id":"1","url":"https://a.com","status":"pending","createdAt":"2024-01-01T00:00:00Z"},
            {"id":"2","url":"https://b.com"},
            {"url":"https://c.com","status":"pending"},
            {"id":3,"url":"https://d.com","status":"pending"},
            {"id":"5","url":"https://e.com","status":"exploded"},
            {"id":"6","url":"https://f.com","status":"completed"},
            {"id":"7","url":"https://g.com","status":"error","error":"Failed to fetch URL content"},
            null
        ]"#;
        storage.set_item(URLS_KEY, raw).unwrap();
        let s = AppState::load(storage).unwrap();
        let ids: Vec<&str> = s.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "7"]);
    }

    #[test]
    fn missing_timestamp_defaults_to_now() {
        let before = chrono::Utc::now();
        let storage = Storage::open_in_memory().unwrap();
        storage
            .set_item(URLS_KEY, r#"[{"id":"1","url":"https://a.com","status":"pending","createdAt":"garbage"}]"#)
            .unwrap();
        let s = AppState::load(storage).unwrap();
        assert!(s.records()[0].created_at >= before);
    }

    #[test]
    fn interrupted_processing_is_requeued() {
        let storage = Storage::open_in_memory().unwrap();
        storage
            .set_item(URLS_KEY, r#"[{"id":"1","url":"https://a.com","status":"processing"}]"#)
            .unwrap();
        let s = AppState::load(storage).unwrap();
        assert_eq!(s.records()[0].status, Status::Pending);
    }

    #[test]
    fn delete_by_prefix() {
        let mut s = state();
        let ids = s.add_urls(&urls(&["https://a.com", "https://b.com"])).unwrap();
        let removed = s.delete(&ids[0][..8]).unwrap().unwrap();
        assert_eq!(removed.url, "https://a.com");
        assert_eq!(s.records().len(), 1);
        assert!(s.delete("no-such-id").unwrap().is_none());
    }

    #[test]
    fn ambiguous_or_empty_prefix_finds_nothing() {
        let mut s = state();
        s.add_urls(&urls(&["https://a.com", "https://b.com"])).unwrap();
        assert!(s.find("").is_none());
    }

    #[test]
    fn reset_refused_while_running() {
        let mut s = state();
        s.add_urls(&urls(&["https://a.com"])).unwrap();
        s.run_flag().start();
        assert!(!s.reset().unwrap());
        assert_eq!(s.records().len(), 1);
        s.run_flag().pause();
        assert!(s.reset().unwrap());
        assert!(s.records().is_empty());
    }

    #[test]
    fn stored_run_marker_blocks_reset_from_other_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let mut runner = AppState::load(Storage::open(&path).unwrap()).unwrap();
        runner.add_urls(&urls(&["https://a.com"])).unwrap();
        assert!(runner.begin_run().unwrap());

        let mut other = AppState::load(Storage::open(&path).unwrap()).unwrap();
        assert!(other.run_in_progress().unwrap());
        assert!(!other.is_running());
        assert!(!other.begin_run().unwrap());
        assert!(!other.reset().unwrap());
        assert_eq!(other.records().len(), 1);

        runner.end_run().unwrap();
        assert!(!other.run_in_progress().unwrap());
        assert!(other.reset().unwrap());
        assert!(AppState::load(Storage::open(&path).unwrap()).unwrap().records().is_empty());
    }

    #[test]
    fn merge_keeps_records_added_by_other_invocation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let mut runner = AppState::load(Storage::open(&path).unwrap()).unwrap();
        runner.add_urls(&urls(&["https://a.com", "https://b.com"])).unwrap();
        let picked = runner.records()[0].clone().into_processing();

        let mut other = AppState::load(Storage::open(&path).unwrap()).unwrap();
        other.add_urls(&urls(&["https://c.com"])).unwrap();
        let b_id = runner.records()[1].id.clone();
        other.delete(&b_id).unwrap().unwrap();

        runner.merge(vec![picked.into_failed("x")]).unwrap();
        let got: Vec<(&str, Status)> = runner
            .records()
            .iter()
            .map(|r| (r.url.as_str(), r.status))
            .collect();
        assert_eq!(got, vec![("https://a.com", Status::Error), ("https://c.com", Status::Pending)]);
    }

    #[test]
    fn processing_is_kept_while_a_run_holds_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let mut runner = AppState::load(Storage::open(&path).unwrap()).unwrap();
        runner.add_urls(&urls(&["https://a.com"])).unwrap();
        assert!(runner.begin_run().unwrap());
        let picked = runner.records()[0].clone().into_processing();
        runner.merge(vec![picked]).unwrap();

        let other = AppState::load(Storage::open(&path).unwrap()).unwrap();
        assert_eq!(other.records()[0].status, Status::Processing);
    }

    #[test]
    fn unlock_clears_stale_marker_and_requeues() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        {
            let mut crashed = AppState::load(Storage::open(&path).unwrap()).unwrap();
            crashed.add_urls(&urls(&["https://a.com"])).unwrap();
            assert!(crashed.begin_run().unwrap());
            let picked = crashed.records()[0].clone().into_processing();
            crashed.merge(vec![picked]).unwrap();
        }
        let mut s = AppState::load(Storage::open(&path).unwrap()).unwrap();
        assert!(!s.reset().unwrap());
        assert!(s.unlock().unwrap());
        assert!(!s.run_in_progress().unwrap());
        assert_eq!(s.records()[0].status, Status::Pending);
        assert!(!s.unlock().unwrap());
    }

    #[test]
    fn failed_writes_leave_memory_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.sqlite");
        let mut s = AppState::load(Storage::open(&path).unwrap()).unwrap();
        s.add_urls(&urls(&["https://a.com"])).unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute_batch("DROP TABLE kv")
            .unwrap();

        assert!(s.set_dark_mode(true).is_err());
        assert!(!s.dark_mode());
        assert!(s.reset().is_err());
        assert_eq!(s.records().len(), 1);
    }

    #[test]
    fn merge_ignores_deleted_ids() {
        let mut s = state();
        let ids = s.add_urls(&urls(&["https://a.com"])).unwrap();
        let ghost = UrlRecord::pending("https://ghost.com").into_failed("boom");
        let done = s.records()[0].clone().into_failed("Failed to fetch URL content");
        s.merge(vec![ghost, done]).unwrap();
        assert_eq!(s.records().len(), 1);
        assert_eq!(s.records()[0].id, ids[0]);
        assert_eq!(s.records()[0].status, Status::Error);
    }

    #[test]
    fn stats_and_progress() {
        let mut s = state();
        assert_eq!(s.stats().progress(), 0.0);
        s.add_urls(&urls(&["https://a.com", "https://b.com", "https://c.com", "https://d.com"]))
            .unwrap();
        let first = s.records()[0].clone().into_failed("x");
        s.merge(vec![first]).unwrap();
        let st = s.stats();
        assert_eq!((st.total, st.pending, st.errors), (4, 3, 1));
        assert_eq!(st.progress(), 25.0);
    }
}
