//! Keeps the reading position in step with the local cache and remote store
//!
//! Reads prefer the remote record and fall back to the local cache, then to
//! the start of the curriculum. Writes are debounced; each settled position
//! is upserted remotely and then mirrored locally whether or not the remote
//! write succeeded. Nothing here ever fails the caller.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::config::session::SessionContext;
use crate::curriculum::Curriculum;
use crate::reader::progress;
use crate::reader::{Position, RestorePolicy};

use super::debounce::Debouncer;
use super::local::LocalCache;
use super::record::{LocalSnapshot, ProgressRecord, StoreOutcome};
use super::remote::RemoteStore;

/// Tunables for a [`ProgressSync`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    /// Quiet period before writing
    pub debounce: Duration,
    /// Policy for stored positions that no longer fit
    pub restore_policy: RestorePolicy,
    /// Write the pending position on shutdown instead of dropping it
    pub flush_on_exit: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1000),
            restore_policy: RestorePolicy::Clamp,
            flush_on_exit: false,
        }
    }
}

impl From<&Config> for SyncSettings {
    fn from(config: &Config) -> Self {
        Self {
            debounce: config.debounce(),
            restore_policy: config.restore_policy,
            flush_on_exit: config.flush_on_exit,
        }
    }
}

/// Where the starting position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    /// The remote progress record
    Remote,
    /// The local cache
    Local,
    /// Nothing stored; starting from the beginning
    Default,
}

/// Starting position for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoredPosition {
    /// Valid position to open at
    pub position: Position,
    /// Which store supplied it
    pub source: RestoreSource,
    /// Whether the stored values had to be fitted to the curriculum
    pub adjusted: bool,
}

/// Performs one settled write: remote upsert, then local mirror
pub struct ProgressSink {
    ctx: SessionContext,
    remote: Option<Arc<dyn RemoteStore>>,
    local: Arc<dyn LocalCache>,
}

impl ProgressSink {
    /// Write a record to both stores
    pub async fn persist(&self, record: ProgressRecord) {
        if let Some(remote) = self.remote_for_user() {
            match remote.upsert_progress(&record).await {
                StoreOutcome::Success(()) => {
                    tracing::debug!(
                        "Synced progress ({}, {}) {}%",
                        record.current_chapter,
                        record.current_section,
                        record.completed_percent
                    );
                }
                StoreOutcome::NotFound => {
                    tracing::warn!("Remote progress upsert reported no target row");
                }
                StoreOutcome::Failure(reason) => {
                    tracing::warn!("Remote progress sync failed, keeping local copy: {}", reason);
                }
            }
        }

        let key = self.ctx.local_cache_key();
        let result = record
            .snapshot()
            .to_json()
            .map_err(super::SyncError::from)
            .and_then(|value| self.local.set(&key, &value));
        if let Err(e) = result {
            tracing::warn!("Failed to write local progress '{}': {}", key, e);
        }
    }

    /// The remote store, unless the session is anonymous
    fn remote_for_user(&self) -> Option<&Arc<dyn RemoteStore>> {
        if self.ctx.is_anonymous() { None } else { self.remote.as_ref() }
    }
}

/// Reading-position synchronizer for one session
pub struct ProgressSync {
    sink: Arc<ProgressSink>,
    debouncer: Debouncer<ProgressRecord>,
    settings: SyncSettings,
}

impl ProgressSync {
    /// Create a synchronizer. `remote` is `None` when no backend is configured.
    pub fn new(
        ctx: SessionContext,
        remote: Option<Arc<dyn RemoteStore>>,
        local: Arc<dyn LocalCache>,
        settings: SyncSettings,
    ) -> Self {
        let sink = Arc::new(ProgressSink { ctx, remote, local });
        let writer = Arc::clone(&sink);
        let debouncer = Debouncer::new(settings.debounce, move |record: ProgressRecord| {
            let writer = Arc::clone(&writer);
            async move { writer.persist(record).await }
        });

        Self { sink, debouncer, settings }
    }

    /// The session this synchronizer writes for
    pub fn context(&self) -> &SessionContext {
        &self.sink.ctx
    }

    /// Determine the starting position: remote record, then local cache,
    /// then the start of the curriculum
    pub async fn restore(&self, doc: &Curriculum) -> RestoredPosition {
        let policy = self.settings.restore_policy;

        if let Some(remote) = self.sink.remote_for_user() {
            let ctx = &self.sink.ctx;
            match remote.fetch_progress(ctx.user_key(), &ctx.course_id).await {
                StoreOutcome::Success(record) => {
                    let restored = Position::restore(
                        doc,
                        record.current_chapter,
                        record.current_section,
                        policy,
                    );
                    tracing::info!(
                        "Resuming from remote progress at ({}, {})",
                        restored.position.chapter_index,
                        restored.position.section_index
                    );
                    return RestoredPosition {
                        position: restored.position,
                        source: RestoreSource::Remote,
                        adjusted: restored.adjusted,
                    };
                }
                StoreOutcome::NotFound => {
                    tracing::debug!("No remote progress for '{}'", ctx.user_key());
                }
                StoreOutcome::Failure(reason) => {
                    tracing::warn!("Remote progress unavailable, using local cache: {}", reason);
                }
            }
        }

        match self.local_snapshot() {
            Some(snapshot) => {
                let restored = Position::restore(doc, snapshot.chapter, snapshot.section, policy);
                tracing::info!(
                    "Resuming from local progress at ({}, {})",
                    restored.position.chapter_index,
                    restored.position.section_index
                );
                RestoredPosition {
                    position: restored.position,
                    source: RestoreSource::Local,
                    adjusted: restored.adjusted,
                }
            }
            None => RestoredPosition {
                position: Position::START,
                source: RestoreSource::Default,
                adjusted: false,
            },
        }
    }

    /// The position stored in the local cache for this session, if readable
    pub fn local_snapshot(&self) -> Option<LocalSnapshot> {
        let key = self.sink.ctx.local_cache_key();
        let value = self.sink.local.get(&key)?;
        match LocalSnapshot::parse(&value) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!("Ignoring unreadable local progress '{}': {}", key, e);
                None
            }
        }
    }

    /// Record a new position; the write happens after the debounce delay
    pub fn record_position(&mut self, position: Position, doc: &Curriculum) {
        let ctx = &self.sink.ctx;
        let record = ProgressRecord::new(
            ctx.user_key(),
            ctx.course_id.clone(),
            position,
            progress::percent(position, doc),
        );
        tracing::debug!(
            "Scheduling progress write for ({}, {})",
            position.chapter_index,
            position.section_index
        );
        self.debouncer.schedule(record);
    }

    /// Whether a write is waiting for its debounce timer
    pub fn has_pending_write(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Write the pending position now and wait for any writes in flight
    pub async fn flush(&mut self) {
        self.debouncer.flush().await;
        self.debouncer.wait_idle().await;
    }

    /// End the session. Without `flush_on_exit` a pending write is dropped.
    pub async fn shutdown(mut self) {
        if self.settings.flush_on_exit {
            self.flush().await;
        } else if self.debouncer.cancel() {
            tracing::debug!("Dropped pending progress write on exit");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::session::User;
    use crate::curriculum::sized;
    use crate::sync::local::MemoryCache;
    use crate::sync::record::ExamResult;

    /// In-memory remote store recording every upsert
    #[derive(Default)]
    struct FakeRemote {
        stored: Mutex<Option<ProgressRecord>>,
        offline: bool,
        upserts: Mutex<Vec<ProgressRecord>>,
        fetches: AtomicUsize,
    }

    impl FakeRemote {
        fn with_record(chapter: i64, section: i64) -> Self {
            let mut record = ProgressRecord::new("u-1", "usool", Position::START, 0);
            record.current_chapter = chapter;
            record.current_section = section;
            Self { stored: Mutex::new(Some(record)), ..Default::default() }
        }

        fn offline() -> Self {
            Self { offline: true, ..Default::default() }
        }

        fn upserts(&self) -> Vec<ProgressRecord> {
            self.upserts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RemoteStore for FakeRemote {
        async fn fetch_progress(&self, _user_id: &str, _course_id: &str) -> StoreOutcome<ProgressRecord> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.offline {
                return StoreOutcome::Failure("network unreachable".into());
            }
            match self.stored.lock().unwrap().clone() {
                Some(record) => StoreOutcome::Success(record),
                None => StoreOutcome::NotFound,
            }
        }

        async fn upsert_progress(&self, record: &ProgressRecord) -> StoreOutcome<()> {
            if self.offline {
                return StoreOutcome::Failure("network unreachable".into());
            }
            self.upserts.lock().unwrap().push(record.clone());
            *self.stored.lock().unwrap() = Some(record.clone());
            StoreOutcome::Success(())
        }

        async fn fetch_exam_results(&self, _user_id: &str) -> StoreOutcome<Vec<ExamResult>> {
            StoreOutcome::Success(Vec::new())
        }
    }

    /// Local cache that counts reads
    #[derive(Default)]
    struct CountingCache {
        inner: MemoryCache,
        reads: AtomicUsize,
    }

    impl LocalCache for CountingCache {
        fn get(&self, key: &str) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), crate::sync::SyncError> {
            self.inner.set(key, value)
        }
    }

    fn user_ctx() -> SessionContext {
        let user = User::new(Some("u-1".into()), "Aisha", "aisha@example.com").unwrap();
        SessionContext::for_user(user, "usool")
    }

    fn sync_with(
        ctx: SessionContext,
        remote: Option<Arc<FakeRemote>>,
        local: Arc<dyn LocalCache>,
        settings: SyncSettings,
    ) -> ProgressSync {
        let remote = remote.map(|r| r as Arc<dyn RemoteStore>);
        ProgressSync::new(ctx, remote, local, settings)
    }

    #[tokio::test]
    async fn restore_prefers_remote_record() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::with_record(1, 1));
        let local = Arc::new(CountingCache::default());
        local.set("progress-u-1", r#"{"chapter":0,"section":1}"#).unwrap();

        let sync = sync_with(
            user_ctx(),
            Some(Arc::clone(&remote)),
            local.clone(),
            SyncSettings::default(),
        );
        let restored = sync.restore(&doc).await;

        assert_eq!(
            restored,
            RestoredPosition {
                position: Position::new(1, 1),
                source: RestoreSource::Remote,
                adjusted: false
            }
        );
        assert_eq!(local.reads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restore_falls_back_to_local_when_remote_fails() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::offline());
        let local = Arc::new(MemoryCache::with_entry("progress-u-1", r#"{"chapter":0,"section":2}"#));

        let sync = sync_with(user_ctx(), Some(remote), local, SyncSettings::default());
        let restored = sync.restore(&doc).await;

        assert_eq!(restored.position, Position::new(0, 2));
        assert_eq!(restored.source, RestoreSource::Local);
    }

    #[tokio::test]
    async fn restore_falls_back_to_local_when_remote_has_nothing() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryCache::with_entry("progress-u-1", r#"{"chapter":1,"section":0}"#));

        let sync = sync_with(user_ctx(), Some(remote), local, SyncSettings::default());
        assert_eq!(sync.restore(&doc).await.position, Position::new(1, 0));
    }

    #[tokio::test]
    async fn restore_defaults_to_start() {
        let doc = sized(&[3, 2]);
        let sync = sync_with(
            user_ctx(),
            Some(Arc::new(FakeRemote::offline())),
            Arc::new(MemoryCache::new()),
            SyncSettings::default(),
        );

        let restored = sync.restore(&doc).await;
        assert_eq!(restored.position, Position::START);
        assert_eq!(restored.source, RestoreSource::Default);
    }

    #[tokio::test]
    async fn restore_ignores_corrupt_local_value() {
        let doc = sized(&[3, 2]);
        let local = Arc::new(MemoryCache::with_entry("progress-guest", "not json"));
        let sync = sync_with(SessionContext::anonymous("usool"), None, local, SyncSettings::default());

        assert_eq!(sync.restore(&doc).await.source, RestoreSource::Default);
    }

    #[tokio::test]
    async fn restore_clamps_out_of_range_remote_position() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::with_record(9, 9));
        let sync = sync_with(user_ctx(), Some(remote), Arc::new(MemoryCache::new()), SyncSettings::default());

        let restored = sync.restore(&doc).await;
        assert_eq!(restored.position, Position::new(1, 1));
        assert!(restored.adjusted);
    }

    #[tokio::test]
    async fn anonymous_restore_never_calls_remote() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::with_record(1, 1));
        let local = Arc::new(MemoryCache::with_entry("progress-guest", r#"{"chapter":0,"section":1}"#));

        let sync = sync_with(
            SessionContext::anonymous("usool"),
            Some(Arc::clone(&remote)),
            local,
            SyncSettings::default(),
        );
        assert_eq!(sync.restore(&doc).await.position, Position::new(0, 1));
        assert_eq!(remote.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_navigation_writes_once_with_final_position() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryCache::new());
        let mut sync = sync_with(
            user_ctx(),
            Some(Arc::clone(&remote)),
            local.clone(),
            SyncSettings::default(),
        );

        // Five steps from the start of [3, 2] end on the last section
        let mut position = Position::START;
        for _ in 0..5 {
            position = position.advance(&doc);
            sync.record_position(position, &doc);
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(sync.has_pending_write());
        assert!(remote.upserts().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;

        let upserts = remote.upserts();
        assert_eq!(upserts.len(), 1);
        assert_eq!((upserts[0].current_chapter, upserts[0].current_section), (1, 1));
        assert_eq!(upserts[0].completed_percent, 100);
        assert_eq!(upserts[0].course_id, "usool");
        assert_eq!(local.get("progress-u-1").as_deref(), Some(r#"{"chapter":1,"section":1}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_write_failure_still_mirrors_locally() {
        let doc = sized(&[3, 2]);
        let local = Arc::new(MemoryCache::new());
        let mut sync = sync_with(
            user_ctx(),
            Some(Arc::new(FakeRemote::offline())),
            local.clone(),
            SyncSettings::default(),
        );

        sync.record_position(Position::new(0, 2), &doc);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(local.get("progress-u-1").as_deref(), Some(r#"{"chapter":0,"section":2}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn anonymous_writes_go_to_guest_key_only() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryCache::new());
        let mut sync = sync_with(
            SessionContext::anonymous("usool"),
            Some(Arc::clone(&remote)),
            local.clone(),
            SyncSettings::default(),
        );

        sync.record_position(Position::new(1, 1), &doc);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(remote.upserts().is_empty());
        assert_eq!(local.get("progress-guest").as_deref(), Some(r#"{"chapter":1,"section":1}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_pending_write_by_default() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryCache::new());
        let mut sync = sync_with(
            user_ctx(),
            Some(Arc::clone(&remote)),
            local.clone(),
            SyncSettings::default(),
        );

        sync.record_position(Position::new(0, 1), &doc);
        sync.shutdown().await;
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert!(remote.upserts().is_empty());
        assert!(local.get("progress-u-1").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_flushes_when_configured() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local = Arc::new(MemoryCache::new());
        let settings = SyncSettings { flush_on_exit: true, ..SyncSettings::default() };
        let mut sync = sync_with(user_ctx(), Some(Arc::clone(&remote)), local.clone(), settings);

        sync.record_position(Position::new(0, 1), &doc);
        sync.shutdown().await;

        assert_eq!(remote.upserts().len(), 1);
        assert_eq!(local.get("progress-u-1").as_deref(), Some(r#"{"chapter":0,"section":1}"#));
    }

    #[tokio::test(start_paused = true)]
    async fn written_progress_is_restored_next_session() {
        let doc = sized(&[3, 2]);
        let remote = Arc::new(FakeRemote::default());
        let local: Arc<dyn LocalCache> = Arc::new(MemoryCache::new());

        let mut first = sync_with(
            user_ctx(),
            Some(Arc::clone(&remote)),
            Arc::clone(&local),
            SyncSettings::default(),
        );
        first.record_position(Position::new(1, 0), &doc);
        first.flush().await;

        let second = sync_with(user_ctx(), Some(remote), local, SyncSettings::default());
        let restored = second.restore(&doc).await;
        assert_eq!(restored.position, Position::new(1, 0));
        assert_eq!(restored.source, RestoreSource::Remote);
    }
}
