//! Discovery cache.
//!
//! Holds one snapshot of the wrapped CLI's command tree with a time-to-live.
//! A fresh snapshot is served from a short read lock; an expired one is
//! rebuilt synchronously by the first caller that notices, with rebuilds
//! serialized so concurrent callers share a single rebuild.
//!
//! `invalidate` bumps a generation counter; a rebuild that started under an
//! older generation hands its result to its own caller but never publishes it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::help::{CommandInfo, HelpParser};
use crate::runner::{CallResult, CommandRunner};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// One complete discovery cycle. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct DiscoverySnapshot {
    pub commands: BTreeMap<String, CommandInfo>,
    pub created_at: Instant,
}

impl DiscoverySnapshot {
    fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
            created_at: Instant::now(),
        }
    }

    pub fn get(&self, command: &str) -> Option<&CommandInfo> {
        self.commands.get(command)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn age(&self) -> Duration {
        Instant::now().saturating_duration_since(self.created_at)
    }
}

pub struct DiscoveryCache {
    runner: Arc<dyn CommandRunner>,
    parser: HelpParser,
    ttl: Duration,
    current: RwLock<Option<Arc<DiscoverySnapshot>>>,
    generation: AtomicU64,
    rebuild_gate: Mutex<()>,
}

impl DiscoveryCache {
    pub fn new(runner: Arc<dyn CommandRunner>, ttl: Duration) -> Self {
        let parser = HelpParser::new(runner.program());
        Self {
            runner,
            parser,
            ttl,
            current: RwLock::new(None),
            generation: AtomicU64::new(0),
            rebuild_gate: Mutex::new(()),
        }
    }

    /// The current snapshot, rebuilt first if missing or expired.
    pub async fn get_snapshot(&self) -> Arc<DiscoverySnapshot> {
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }

        let _gate = self.rebuild_gate.lock().await;
        // Another caller may have finished a rebuild while we waited.
        if let Some(snapshot) = self.fresh() {
            return snapshot;
        }
        self.rebuild().await
    }

    /// Drop the snapshot; the next `get_snapshot` rebuilds unconditionally,
    /// even when a rebuild is already in flight.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.write_slot() = None;
        debug!("discovery cache invalidated");
    }

    /// Rebuild now, after any rebuild already in flight. A failed top-level
    /// `--help` comes back as `Err` with its result; the previous snapshot
    /// stays in place.
    pub async fn refresh(&self) -> Result<Arc<DiscoverySnapshot>, CallResult> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let _gate = self.rebuild_gate.lock().await;
        self.build().await
    }

    fn fresh(&self) -> Option<Arc<DiscoverySnapshot>> {
        let slot = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref()
            .filter(|s| s.age() < self.ttl)
            .map(Arc::clone)
    }

    fn stale(&self) -> Option<Arc<DiscoverySnapshot>> {
        let slot = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.clone()
    }

    fn write_slot(&self) -> std::sync::RwLockWriteGuard<'_, Option<Arc<DiscoverySnapshot>>> {
        match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Caller holds `rebuild_gate`.
    async fn rebuild(&self) -> Arc<DiscoverySnapshot> {
        match self.build().await {
            Ok(snapshot) => snapshot,
            Err(_) => self
                .stale()
                .unwrap_or_else(|| Arc::new(DiscoverySnapshot::empty())),
        }
    }

    /// Caller holds `rebuild_gate`. Publishes only if no `invalidate`
    /// happened since the build started.
    async fn build(&self) -> Result<Arc<DiscoverySnapshot>, CallResult> {
        let generation = self.generation.load(Ordering::SeqCst);
        info!("Discovering {} commands...", self.runner.program());

        let top = self.runner.execute(&["--help".to_string()], None).await;
        if !top.succeeded {
            warn!(
                exit_code = top.exit_code,
                "top-level help failed; keeping previous command set"
            );
            return Err(top);
        }

        let names = self.parser.parse_top_level(top.text());
        let mut commands = BTreeMap::new();
        for name in names {
            let info = self.describe(&name).await;
            commands.insert(name, info);
        }

        let snapshot = Arc::new(DiscoverySnapshot {
            commands,
            created_at: Instant::now(),
        });
        {
            let mut slot = self.write_slot();
            if self.generation.load(Ordering::SeqCst) == generation {
                *slot = Some(Arc::clone(&snapshot));
            } else {
                debug!("cache invalidated during rebuild; result not published");
            }
        }

        info!("Discovered {} {} commands", snapshot.len(), self.runner.program());
        Ok(snapshot)
    }

    async fn describe(&self, command: &str) -> CommandInfo {
        let result = self
            .runner
            .execute(&[command.to_string(), "--help".to_string()], None)
            .await;
        if result.succeeded {
            self.parser.parse_command_help(command, result.text())
        } else {
            warn!(command, exit_code = result.exit_code, "help unavailable; using fallback");
            CommandInfo::fallback(self.runner.program(), command)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::ScriptedRunner;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::Notify;
    use tokio::task::JoinSet;

    const TOP: &str = "Usage:\n  fake <command>\n\nAvailable Commands:\n  issue    Work with issues\n  repo     Work with repositories\n\nFlags:\n  -h, --help   help\n";
    const ISSUE: &str = "Work with issues\n\nAvailable Commands:\n  list   List issues\n\nFlags:\n  -a, --assignee string   Filter by assignee\n";

    fn scripted() -> Arc<ScriptedRunner> {
        Arc::new(
            ScriptedRunner::new("fake")
                .respond(&["--help"], TOP)
                .respond(&["issue", "--help"], ISSUE)
                .fail(&["repo", "--help"], 1, "boom"),
        )
    }

    #[tokio::test]
    async fn builds_snapshot_with_per_command_fallback() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let snap = cache.get_snapshot().await;

        assert_eq!(snap.len(), 2);
        let issue = snap.get("issue").unwrap();
        assert_eq!(issue.subcommands[0].name, "list");
        assert_eq!(issue.flags[0].name, "--assignee");

        let repo = snap.get("repo").unwrap();
        assert_eq!(repo.description, "Execute fake repo command");
        assert!(repo.flags.is_empty());
    }

    #[tokio::test]
    async fn snapshot_is_reused_within_ttl() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let first = cache.get_snapshot().await;
        let second = cache.get_snapshot().await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(runner.call_count(&["--help"]), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_triggers_rebuild() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let first = cache.get_snapshot().await;

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(Arc::ptr_eq(&first, &cache.get_snapshot().await));

        tokio::time::advance(Duration::from_secs(2)).await;
        let rebuilt = cache.get_snapshot().await;
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_eq!(runner.call_count(&["--help"]), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_rebuild() {
        let runner = scripted();
        let cache = Arc::new(DiscoveryCache::new(runner.clone(), DEFAULT_TTL));
        cache.get_snapshot().await;
        tokio::time::advance(Duration::from_secs(301)).await;

        let mut set = JoinSet::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            set.spawn(async move { cache.get_snapshot().await });
        }
        let mut snapshots = Vec::new();
        while let Some(joined) = set.join_next().await {
            snapshots.push(joined.unwrap());
        }

        assert_eq!(runner.call_count(&["--help"]), 2, "one initial build + one rebuild");
        assert!(snapshots.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[tokio::test]
    async fn invalidate_forces_rebuild() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let first = cache.get_snapshot().await;
        cache.invalidate();
        let second = cache.get_snapshot().await;
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(runner.call_count(&["--help"]), 2);
    }

    #[tokio::test]
    async fn top_level_failure_without_history_is_empty_and_retried() {
        let runner = Arc::new(ScriptedRunner::new("fake").fail(&["--help"], 127, "not found"));
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        assert!(cache.get_snapshot().await.is_empty());
        assert!(cache.get_snapshot().await.is_empty());
        assert_eq!(runner.call_count(&["--help"]), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn top_level_failure_keeps_previous_snapshot() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let first = cache.get_snapshot().await;

        runner.set(
            &["--help"],
            crate::runner::CallResult::from_exit(Some(1), String::new(), "offline".into()),
        );
        tokio::time::advance(Duration::from_secs(301)).await;

        let after = cache.get_snapshot().await;
        assert!(Arc::ptr_eq(&first, &after));
        assert_eq!(after.len(), 2);
    }

    /// Holds the first top-level `--help` until released.
    struct HeldRunner {
        inner: ScriptedRunner,
        hold_next: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    impl HeldRunner {
        fn new(inner: ScriptedRunner) -> Arc<Self> {
            Arc::new(Self {
                inner,
                hold_next: AtomicBool::new(true),
                entered: Notify::new(),
                release: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl CommandRunner for HeldRunner {
        fn program(&self) -> &str {
            self.inner.program()
        }

        async fn execute(&self, argv: &[String], cwd: Option<&str>) -> CallResult {
            if argv == ["--help"] && self.hold_next.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            self.inner.execute(argv, cwd).await
        }
    }

    fn held() -> Arc<HeldRunner> {
        HeldRunner::new(
            ScriptedRunner::new("fake")
                .respond(&["--help"], TOP)
                .respond(&["issue", "--help"], ISSUE)
                .fail(&["repo", "--help"], 1, "boom"),
        )
    }

    #[tokio::test]
    async fn refresh_does_not_reuse_an_in_flight_rebuild() {
        let runner = held();
        let cache = Arc::new(DiscoveryCache::new(runner.clone(), DEFAULT_TTL));

        let early = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get_snapshot().await }
        });
        runner.entered.notified().await;

        let refreshed = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.refresh().await }
        });
        tokio::task::yield_now().await;
        runner.release.notify_one();

        let early = early.await.unwrap();
        let refreshed = refreshed.await.unwrap().unwrap();
        assert!(!Arc::ptr_eq(&early, &refreshed));
        assert_eq!(runner.inner.call_count(&["--help"]), 2);
        assert!(Arc::ptr_eq(&refreshed, &cache.get_snapshot().await));
    }

    #[tokio::test]
    async fn invalidate_during_rebuild_forces_another() {
        let runner = held();
        let cache = Arc::new(DiscoveryCache::new(runner.clone(), DEFAULT_TTL));

        let early = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get_snapshot().await }
        });
        runner.entered.notified().await;
        cache.invalidate();
        let late = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.get_snapshot().await }
        });
        tokio::task::yield_now().await;
        runner.release.notify_one();

        let early = early.await.unwrap();
        let late = late.await.unwrap();
        assert!(!Arc::ptr_eq(&early, &late));
        assert_eq!(runner.inner.call_count(&["--help"]), 2);
    }

    #[tokio::test]
    async fn failed_refresh_reports_and_keeps_previous() {
        let runner = scripted();
        let cache = DiscoveryCache::new(runner.clone(), DEFAULT_TTL);
        let first = cache.get_snapshot().await;

        runner.set(
            &["--help"],
            CallResult::from_exit(Some(1), String::new(), "offline".into()),
        );
        let failed = cache.refresh().await.unwrap_err();
        assert_eq!(failed.stderr, "offline");
        assert!(Arc::ptr_eq(&first, &cache.get_snapshot().await));
    }
}
