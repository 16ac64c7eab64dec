//! Load-once asset loading shared by every backdrop instance.
//!
//! An [`AssetLoader`] fetches its asset at most once, on a worker thread.
//! Interested parties attach through a [`Subscription`] and poll it from
//! the UI loop, so completion is always observed on the UI thread.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak, mpsc};
use std::thread;
use std::time::Duration;

/// Why an asset could not be made available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid asset: {0}")]
    Invalid(String),
    #[error("loader stopped before reporting a result")]
    Aborted,
}

/// Result delivered to subscribers once a load settles.
pub type LoadOutcome<A> = Result<Arc<A>, LoadError>;

/// Something that can produce an asset, possibly slowly.
pub trait AssetSource: Send + 'static {
    type Asset: Send + Sync + 'static;

    /// Human readable origin, for logs.
    fn describe(&self) -> String;

    /// Produce the asset. Runs on a worker thread.
    fn fetch(&self) -> Result<Self::Asset, LoadError>;
}

/// Loader state.
pub enum LoadPhase<A> {
    Unloaded,
    Loading,
    Loaded(Arc<A>),
    Failed(LoadError),
}

impl<A> LoadPhase<A> {
    /// Short lowercase name, used in the status line.
    pub fn name(&self) -> &'static str {
        match self {
            LoadPhase::Unloaded => "unloaded",
            LoadPhase::Loading => "loading",
            LoadPhase::Loaded(_) => "loaded",
            LoadPhase::Failed(_) => "failed",
        }
    }

    fn outcome(&self) -> Option<LoadOutcome<A>> {
        match self {
            LoadPhase::Loaded(asset) => Some(Ok(Arc::clone(asset))),
            LoadPhase::Failed(err) => Some(Err(err.clone())),
            LoadPhase::Unloaded | LoadPhase::Loading => None,
        }
    }
}

impl<A> Clone for LoadPhase<A> {
    fn clone(&self) -> Self {
        match self {
            LoadPhase::Unloaded => LoadPhase::Unloaded,
            LoadPhase::Loading => LoadPhase::Loading,
            LoadPhase::Loaded(asset) => LoadPhase::Loaded(Arc::clone(asset)),
            LoadPhase::Failed(err) => LoadPhase::Failed(err.clone()),
        }
    }
}

impl<A> fmt::Debug for LoadPhase<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            other => f.write_str(other.name()),
        }
    }
}

struct Inner<A> {
    phase: LoadPhase<A>,
    waiters: Vec<(u64, mpsc::Sender<LoadOutcome<A>>)>,
    next_id: u64,
}

/// Shared handle to a single lazily loaded asset.
pub struct AssetLoader<A> {
    inner: Arc<Mutex<Inner<A>>>,
}

impl<A> Clone for AssetLoader<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: Send + Sync + 'static> Default for AssetLoader<A> {
    fn default() -> Self {
        Self::new()
    }
}

/// What a mount gets back from [`AssetLoader::acquire`].
pub enum Acquire<A> {
    /// Already loaded; use it right away.
    Ready(Arc<A>),
    /// A load is in flight; poll the subscription.
    Pending(Subscription<A>),
    /// A previous load failed. There are no retries.
    Unavailable(LoadError),
}

impl<A: Send + Sync + 'static> AssetLoader<A> {
    /// A loader that has not started fetching.
    pub fn new() -> Self {
        Self::with_phase(LoadPhase::Unloaded)
    }

    /// A loader whose asset is already present.
    pub fn preloaded(asset: A) -> Self {
        Self::with_phase(LoadPhase::Loaded(Arc::new(asset)))
    }

    fn with_phase(phase: LoadPhase<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                phase,
                waiters: Vec::new(),
                next_id: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<A>> {
        lock(&self.inner)
    }

    /// Current state.
    pub fn phase(&self) -> LoadPhase<A> {
        self.lock().phase.clone()
    }

    /// Number of subscriptions still waiting for an outcome.
    pub fn waiting(&self) -> usize {
        self.lock().waiters.len()
    }

    /// Start fetching from `source` unless a load was already initiated.
    ///
    /// Returns `true` when this call started the load.
    pub fn begin<S: AssetSource<Asset = A>>(&self, source: S) -> bool {
        {
            let mut inner = self.lock();
            if !matches!(inner.phase, LoadPhase::Unloaded) {
                return false;
            }
            inner.phase = LoadPhase::Loading;
        }

        let origin = source.describe();
        log::info!("loading {origin}");

        let shared = Arc::clone(&self.inner);
        let spawned = thread::Builder::new()
            .name("stardrift-loader".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| source.fetch()))
                    .unwrap_or(Err(LoadError::Aborted));
                match &result {
                    Ok(_) => log::info!("loaded {origin}"),
                    Err(err) => log::error!("failed to load {origin}: {err}"),
                }
                settle(&shared, result);
            });

        if let Err(err) = spawned {
            log::error!("could not spawn loader thread: {err}");
            settle(&self.inner, Err(LoadError::Aborted));
        }
        true
    }

    /// Attach to the outcome of the load.
    ///
    /// If the load already settled the outcome is available immediately.
    pub fn subscribe(&self) -> Subscription<A> {
        let (sender, receiver) = mpsc::channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        match inner.phase.outcome() {
            Some(outcome) => {
                let _ = sender.send(outcome);
            }
            None => inner.waiters.push((id, sender)),
        }
        Subscription {
            id,
            receiver,
            loader: Arc::downgrade(&self.inner),
        }
    }

    /// Obtain the asset for a new mount: use it, wait for it, or give up.
    pub fn acquire<S: AssetSource<Asset = A>>(&self, source: S) -> Acquire<A> {
        match self.phase() {
            LoadPhase::Loaded(asset) => Acquire::Ready(asset),
            LoadPhase::Failed(err) => Acquire::Unavailable(err),
            LoadPhase::Loading => Acquire::Pending(self.subscribe()),
            LoadPhase::Unloaded => {
                let subscription = self.subscribe();
                self.begin(source);
                Acquire::Pending(subscription)
            }
        }
    }
}

fn lock<A>(inner: &Mutex<Inner<A>>) -> MutexGuard<'_, Inner<A>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn settle<A>(inner: &Mutex<Inner<A>>, result: Result<A, LoadError>) {
    let mut inner = lock(inner);
    inner.phase = match result {
        Ok(asset) => LoadPhase::Loaded(Arc::new(asset)),
        Err(err) => LoadPhase::Failed(err),
    };
    if let Some(outcome) = inner.phase.outcome() {
        for (_, waiter) in inner.waiters.drain(..) {
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// A pending interest in a load's outcome. Dropping it detaches from the loader.
pub struct Subscription<A> {
    id: u64,
    receiver: mpsc::Receiver<LoadOutcome<A>>,
    loader: Weak<Mutex<Inner<A>>>,
}

impl<A> Subscription<A> {
    /// Take the outcome if the load has settled.
    pub fn try_take(&self) -> Option<LoadOutcome<A>> {
        self.receiver.try_recv().ok()
    }

    /// Block up to `timeout` for the outcome.
    pub fn wait(&self, timeout: Duration) -> Option<LoadOutcome<A>> {
        self.receiver.recv_timeout(timeout).ok()
    }
}

impl<A> fmt::Debug for Subscription<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl<A> Drop for Subscription<A> {
    fn drop(&mut self) {
        if let Some(inner) = self.loader.upgrade() {
            lock(&inner).waiters.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const WAIT: Duration = Duration::from_secs(5);

    /// Source that blocks until the test releases it.
    struct GatedSource {
        gate: mpsc::Receiver<Result<u32, LoadError>>,
        fetches: Arc<AtomicUsize>,
    }

    impl AssetSource for GatedSource {
        type Asset = u32;

        fn describe(&self) -> String {
            "gated test asset".to_string()
        }

        fn fetch(&self) -> Result<u32, LoadError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.gate.recv().unwrap_or(Err(LoadError::Aborted))
        }
    }

    fn gated() -> (GatedSource, mpsc::Sender<Result<u32, LoadError>>, Arc<AtomicUsize>) {
        let (release, gate) = mpsc::channel();
        let fetches = Arc::new(AtomicUsize::new(0));
        let source = GatedSource {
            gate,
            fetches: Arc::clone(&fetches),
        };
        (source, release, fetches)
    }

    struct PanickingSource;

    impl AssetSource for PanickingSource {
        type Asset = u32;

        fn describe(&self) -> String {
            "panicking test asset".to_string()
        }

        fn fetch(&self) -> Result<u32, LoadError> {
            panic!("fetch blew up")
        }
    }

    #[test]
    fn test_preloaded_is_ready() {
        let loader = AssetLoader::preloaded(7u32);
        let (source, _release, fetches) = gated();
        match loader.acquire(source) {
            Acquire::Ready(asset) => assert_eq!(*asset, 7),
            _ => panic!("expected ready"),
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_second_acquire_attaches_to_in_flight_load() {
        let loader = AssetLoader::new();
        let (first, release, fetches) = gated();
        let (second, _unused, second_fetches) = gated();

        let Acquire::Pending(a) = loader.acquire(first) else {
            panic!("expected pending");
        };
        assert_eq!(loader.phase().name(), "loading");
        let Acquire::Pending(b) = loader.acquire(second) else {
            panic!("expected pending");
        };

        release.send(Ok(42)).unwrap();
        assert_eq!(*a.wait(WAIT).unwrap().unwrap(), 42);
        assert_eq!(*b.wait(WAIT).unwrap().unwrap(), 42);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(second_fetches.load(Ordering::SeqCst), 0);
        assert_eq!(loader.phase().name(), "loaded");
    }

    #[test]
    fn test_begin_only_once() {
        let loader = AssetLoader::new();
        let (first, release, _) = gated();
        let (second, _unused, _) = gated();
        assert!(loader.begin(first));
        assert!(!loader.begin(second));
        release.send(Ok(1)).unwrap();
    }

    #[test]
    fn test_failure_is_reported_and_not_retried() {
        let loader = AssetLoader::new();
        let (source, release, _) = gated();
        let Acquire::Pending(sub) = loader.acquire(source) else {
            panic!("expected pending");
        };
        release
            .send(Err(LoadError::Network("offline".to_string())))
            .unwrap();
        assert_eq!(
            sub.wait(WAIT).unwrap().unwrap_err(),
            LoadError::Network("offline".to_string())
        );

        let (retry, _unused, retry_fetches) = gated();
        assert!(matches!(loader.acquire(retry), Acquire::Unavailable(_)));
        assert_eq!(retry_fetches.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_subscribe_after_settle_gets_outcome() {
        let loader = AssetLoader::new();
        let (source, release, _) = gated();
        let first = loader.subscribe();
        loader.begin(source);
        release.send(Ok(5)).unwrap();
        first.wait(WAIT).unwrap().unwrap();

        let late = loader.subscribe();
        assert_eq!(*late.try_take().unwrap().unwrap(), 5);
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let loader = AssetLoader::new();
        let (source, release, _) = gated();
        let sub = loader.subscribe();
        let kept = loader.subscribe();
        assert_eq!(loader.waiting(), 2);
        drop(sub);
        assert_eq!(loader.waiting(), 1);

        loader.begin(source);
        release.send(Ok(3)).unwrap();
        kept.wait(WAIT).unwrap().unwrap();
        assert_eq!(loader.waiting(), 0);
    }

    #[test]
    fn test_panicking_source_fails_load() {
        let loader = AssetLoader::new();
        let Acquire::Pending(sub) = loader.acquire(PanickingSource) else {
            panic!("expected pending");
        };
        assert_eq!(sub.wait(WAIT).unwrap().unwrap_err(), LoadError::Aborted);
        assert_eq!(loader.phase().name(), "failed");
    }
}
