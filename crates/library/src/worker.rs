use crate::Snapshot;
use crate::settings::Settings;
use appmeta_appinfo::{AppId, AppInfoCache};
use appmeta_resolve::Resolver;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot, watch};

pub(crate) type Reply = Option<oneshot::Sender<Arc<Snapshot>>>;

pub(crate) enum Request {
    /// Resolve these applications if they aren't already.
    Resolve { appids: Vec<AppId>, reply: Reply },
    /// Resolve every application in the cache.
    ResolveAll { reply: Reply },
    /// Re-read the cache file; re-resolve if it changed.
    Reload { reply: Reply },
    Shutdown,
}

/// Owns the cache and the resolver; lives on its own thread.
pub(crate) struct Worker {
    settings: Settings,
    cache: AppInfoCache,
    resolver: Resolver,
    snapshots: watch::Sender<Arc<Snapshot>>,
    stop: Arc<AtomicBool>,
}
impl Worker {
    /// Must be called on the worker thread; the resolver is bound to it.
    pub(crate) fn new(settings: Settings, snapshots: watch::Sender<Arc<Snapshot>>, stop: Arc<AtomicBool>) -> Self {
        let mut resolver = Resolver::new(settings.resolve.clone());
        if let Some(steam) = &settings.steam {
            resolver = resolver.with_steam(steam.clone());
        }
        let cache = AppInfoCache::load(&settings.appinfo_path);
        let worker = Self {
            settings,
            cache,
            resolver,
            snapshots,
            stop,
        };
        let mut snapshot = worker.current().as_ref().clone();
        worker.describe_cache(&mut snapshot);
        worker.publish(snapshot);
        worker
    }

    pub(crate) fn run(mut self, mut requests: mpsc::UnboundedReceiver<Request>) {
        tracing::debug!(path = %self.settings.appinfo_path.display(), records = self.cache.len(), "Library worker started");
        while let Some(request) = requests.blocking_recv() {
            let (snapshot, reply) = match request {
                Request::Resolve { appids, reply } => (self.resolve(&appids), reply),
                Request::ResolveAll { reply } => (self.resolve_all(), reply),
                Request::Reload { reply } => (self.reload(), reply),
                Request::Shutdown => break,
            };
            if let Some(reply) = reply {
                // The requester may have stopped waiting.
                let _ = reply.send(snapshot);
            }
            if self.stopping() {
                break;
            }
        }
        tracing::debug!("Library worker stopped");
    }

    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn current(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    fn describe_cache(&self, snapshot: &mut Snapshot) {
        snapshot.fingerprint = Some(self.cache.fingerprint());
        snapshot.cache_version = self.cache.version();
        snapshot.records = self.cache.len();
    }

    fn publish(&self, mut snapshot: Snapshot) -> Arc<Snapshot> {
        snapshot.generation += 1;
        let snapshot = Arc::new(snapshot);
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    /// Resolves into `snapshot` every cached application in `wanted` (all
    /// of them for `None`) that it doesn't hold yet, in one pass over the
    /// cache, stopping early on shutdown. Returns how many were resolved.
    fn resolve_into(&mut self, snapshot: &mut Snapshot, wanted: Option<&BTreeSet<AppId>>) -> usize {
        let mut resolved = 0;
        for entry in self.cache.records() {
            let appid = entry.record.appid;
            if wanted.is_some_and(|wanted| !wanted.contains(&appid)) || snapshot.contains(appid) {
                continue;
            }
            if self.stop.load(Ordering::Acquire) {
                tracing::debug!(appid, "Shutdown requested; abandoning resolution");
                break;
            }
            snapshot.insert(self.resolver.resolve_entry(entry));
            resolved += 1;
        }
        resolved
    }

    /// Publishes `snapshot` if anything was added to it, otherwise keeps the
    /// current one.
    fn publish_if(&self, snapshot: Snapshot, resolved: usize, current: Arc<Snapshot>) -> Arc<Snapshot> {
        if resolved == 0 {
            return current;
        }
        self.publish(snapshot)
    }

    fn resolve(&mut self, appids: &[AppId]) -> Arc<Snapshot> {
        let current = self.current();
        let wanted: BTreeSet<AppId> = appids.iter().copied().filter(|appid| !current.contains(*appid)).collect();
        if wanted.is_empty() {
            return current;
        }
        let mut snapshot = current.as_ref().clone();
        let resolved = self.resolve_into(&mut snapshot, Some(&wanted));
        for appid in wanted.iter().filter(|appid| !snapshot.contains(**appid)) {
            tracing::debug!(appid, "Application not in appinfo cache");
        }
        tracing::debug!(requested = appids.len(), resolved, "Resolved applications");
        self.publish_if(snapshot, resolved, current)
    }

    fn resolve_all(&mut self) -> Arc<Snapshot> {
        let current = self.current();
        let mut snapshot = current.as_ref().clone();
        let resolved = self.resolve_into(&mut snapshot, None);
        tracing::debug!(resolved, total = snapshot.len(), "Resolved every application");
        self.publish_if(snapshot, resolved, current)
    }

    fn reload(&mut self) -> Arc<Snapshot> {
        let cache = AppInfoCache::load(&self.settings.appinfo_path);
        if cache.fingerprint() == self.cache.fingerprint() {
            tracing::debug!("Appinfo cache unchanged");
            return self.current();
        }
        tracing::info!(records = cache.len(), "Appinfo cache changed; re-resolving");
        self.cache = cache;

        let current = self.current();
        let mut snapshot = current.as_ref().clone();
        let known: BTreeSet<AppId> = snapshot.appids().collect();
        snapshot.clear();
        self.describe_cache(&mut snapshot);
        self.resolve_into(&mut snapshot, Some(&known));
        self.publish(snapshot)
    }
}
