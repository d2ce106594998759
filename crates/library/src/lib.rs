//! The application library: a background worker that owns the appinfo cache
//! and publishes resolved metadata.
//!
//! Parsing and resolving are synchronous, so they run on one dedicated
//! thread. Requests go in through an unbounded channel; results come out as
//! [`Snapshot`]s through a [`watch`] channel, each publication replacing the
//! previous one whole. Requests can optionally be awaited: the `*_blocking`
//! methods wait for the snapshot that answers them, the async ones await it.
//!
//! ```no_run
//! use appmeta_library::{Library, Settings};
//!
//! let library = Library::spawn(Settings::new("/steam/appcache/appinfo.vdf"))?;
//! let snapshot = library.resolve_blocking(vec![440])?;
//! if let Some(app) = snapshot.get(440) {
//!     println!("{}", app.name);
//! }
//! library.shutdown()?;
//! # Ok::<(), appmeta_library::error::Error>(())
//! ```

pub mod error;
mod settings;
mod snapshot;
mod worker;

pub use crate::settings::Settings;
pub use crate::snapshot::Snapshot;

use crate::error::{ErrorKind, Result};
use crate::worker::{Reply, Request, Worker};
use appmeta_appinfo::AppId;
use exn::{OptionExt, ResultExt};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot, watch};

const THREAD_NAME: &str = "appmeta-library";

/// Handle to the library worker.
///
/// Dropping the handle stops the worker without waiting for it.
pub struct Library {
    requests: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<Arc<Snapshot>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}
impl fmt::Debug for Library {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("generation", &self.snapshots.borrow().generation)
            .finish_non_exhaustive()
    }
}
impl Library {
    /// Starts the worker, which loads the cache before handling requests.
    #[tracing::instrument(skip_all, fields(path = %settings.appinfo_path.display()))]
    pub fn spawn(settings: Settings) -> Result<Self> {
        let (requests, receiver) = mpsc::unbounded_channel();
        let (sender, snapshots) = watch::channel(Arc::new(Snapshot::default()));
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = stop.clone();
        let worker = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || Worker::new(settings, sender, worker_stop).run(receiver))
            .or_raise(|| ErrorKind::Spawn)?;
        Ok(Self {
            requests,
            snapshots,
            stop,
            worker: Some(worker),
        })
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshots.borrow().clone()
    }

    /// A receiver notified on every publication.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.snapshots.clone()
    }

    fn send(&self, request: Request) -> Result<()> {
        self.requests.send(request).ok().ok_or_raise(|| ErrorKind::WorkerGone)
    }

    fn ask(&self, request: impl FnOnce(Reply) -> Request) -> Result<oneshot::Receiver<Arc<Snapshot>>> {
        let (reply, answer) = oneshot::channel();
        self.send(request(Some(reply)))?;
        Ok(answer)
    }

    /// Queues resolution of `appids`; watch the snapshots for the result.
    pub fn resolve(&self, appids: Vec<AppId>) -> Result<()> {
        self.send(Request::Resolve { appids, reply: None })
    }

    /// Queues resolution of every application in the cache.
    pub fn resolve_all(&self) -> Result<()> {
        self.send(Request::ResolveAll { reply: None })
    }

    /// Queues a reload of the cache file.
    pub fn reload(&self) -> Result<()> {
        self.send(Request::Reload { reply: None })
    }

    /// Resolves `appids` and waits for the snapshot containing them.
    ///
    /// Must not be called from within an async runtime.
    pub fn resolve_blocking(&self, appids: Vec<AppId>) -> Result<Arc<Snapshot>> {
        let answer = self.ask(|reply| Request::Resolve { appids, reply })?;
        answer.blocking_recv().ok().ok_or_raise(|| ErrorKind::WorkerGone)
    }

    /// Resolves every application and waits for the result.
    ///
    /// Must not be called from within an async runtime.
    pub fn resolve_all_blocking(&self) -> Result<Arc<Snapshot>> {
        let answer = self.ask(|reply| Request::ResolveAll { reply })?;
        answer.blocking_recv().ok().ok_or_raise(|| ErrorKind::WorkerGone)
    }

    /// Reloads the cache file and waits for the result.
    ///
    /// Must not be called from within an async runtime.
    pub fn reload_blocking(&self) -> Result<Arc<Snapshot>> {
        let answer = self.ask(|reply| Request::Reload { reply })?;
        answer.blocking_recv().ok().ok_or_raise(|| ErrorKind::WorkerGone)
    }

    pub async fn resolve_async(&self, appids: Vec<AppId>) -> Result<Arc<Snapshot>> {
        let answer = self.ask(|reply| Request::Resolve { appids, reply })?;
        answer.await.ok().ok_or_raise(|| ErrorKind::WorkerGone)
    }

    /// Stops the worker, abandoning any resolution in progress, and waits
    /// for its thread to finish.
    pub fn shutdown(mut self) -> Result<()> {
        self.request_stop();
        if let Some(worker) = self.worker.take() {
            worker.join().ok().ok_or_raise(|| ErrorKind::WorkerGone)?;
        }
        Ok(())
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        // Already gone is fine.
        let _ = self.requests.send(Request::Shutdown);
    }
}
impl Drop for Library {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.request_stop();
        }
    }
}
