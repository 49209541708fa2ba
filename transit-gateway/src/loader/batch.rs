//! Request-scoped batching loader.
//!
//! Keys submitted while a batch is open join that batch; the batch is sent
//! to the fetcher when its wait timer fires or it reaches capacity,
//! whichever happens first. Results are memoized per key for the life of
//! the loader, which is the life of one request.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, join_all};
use tokio::sync::watch;
use tracing::{error, trace};

use super::cancel::CancelSignal;
use crate::finder::FinderError;

/// What a batch fetcher returns: an outer error fails the whole batch,
/// inner errors belong to the key at the same index.
pub type BatchResult<V> = Result<Vec<Result<V, FinderError>>, FinderError>;

type BatchFn<K, V> = dyn Fn(Vec<K>) -> BoxFuture<'static, BatchResult<V>> + Send + Sync;

/// Errors seen by a caller of [`Loader::load`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoaderError {
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] FinderError),
}

#[derive(Debug, Clone, Copy)]
pub struct LoaderOptions {
    /// How long the first key of a batch waits for company.
    pub wait: Duration,

    /// Most keys sent to the fetcher in one call.
    pub capacity: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            wait: Duration::from_millis(2),
            capacity: 100,
        }
    }
}

impl LoaderOptions {
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

type Outcome<V> = Result<Vec<Result<V, FinderError>>, LoaderError>;
type Done<V> = Option<Arc<Outcome<V>>>;

struct Batch<K, V> {
    id: u64,
    keys: Vec<K>,
    done: watch::Sender<Done<V>>,
}

/// Where a key's result will appear.
struct Slot<V> {
    done: watch::Receiver<Done<V>>,
    index: usize,
    batch_id: u64,
}

impl<V> Clone for Slot<V> {
    fn clone(&self) -> Self {
        Self {
            done: self.done.clone(),
            index: self.index,
            batch_id: self.batch_id,
        }
    }
}

struct State<K, V> {
    cache: HashMap<K, Slot<V>>,
    batch: Option<Batch<K, V>>,
    next_batch_id: u64,
}

struct Inner<K, V> {
    name: &'static str,
    fetch: Box<BatchFn<K, V>>,
    options: LoaderOptions,
    cancel: CancelSignal,
    state: Mutex<State<K, V>>,
}

impl<K, V> Inner<K, V> {
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A coalescing, memoizing front for a batch fetcher.
///
/// `V` is the per-key value: `Option<T>` for lookups by id, `Vec<T>` for
/// lookups by parameter record. `V::default()` stands in when a fetcher
/// breaks the one-result-per-key contract.
pub struct Loader<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for Loader<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Loader<K, V>
where
    K: Clone + Eq + Hash + Send + Sync + 'static,
    V: Clone + Default + Send + Sync + 'static,
{
    pub fn new<F>(name: &'static str, options: LoaderOptions, cancel: CancelSignal, fetch: F) -> Self
    where
        F: Fn(Vec<K>) -> BoxFuture<'static, BatchResult<V>> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                name,
                fetch: Box::new(fetch),
                options,
                cancel,
                state: Mutex::new(State {
                    cache: HashMap::new(),
                    batch: None,
                    next_batch_id: 0,
                }),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Load one key, joining or opening a batch as needed.
    pub async fn load(&self, key: K) -> Result<V, LoaderError> {
        let slot = self.submit(key)?;
        self.wait(slot).await
    }

    /// Load several keys concurrently. Results are in key order.
    pub async fn load_many(&self, keys: Vec<K>) -> Vec<Result<V, LoaderError>> {
        join_all(keys.into_iter().map(|key| self.load(key))).await
    }

    fn submit(&self, key: K) -> Result<Slot<V>, LoaderError> {
        if self.inner.cancel.is_cancelled() {
            return Err(LoaderError::Cancelled);
        }
        let mut state = self.inner.lock();
        if let Some(slot) = state.cache.get(&key) {
            return Ok(slot.clone());
        }

        let mut batch = match state.batch.take() {
            Some(batch) => batch,
            None => {
                let id = state.next_batch_id;
                state.next_batch_id += 1;
                self.start_timer(id);
                let (done, _) = watch::channel(None);
                Batch {
                    id,
                    keys: Vec::with_capacity(self.inner.options.capacity),
                    done,
                }
            }
        };

        let slot = Slot {
            done: batch.done.subscribe(),
            index: batch.keys.len(),
            batch_id: batch.id,
        };
        batch.keys.push(key.clone());
        state.cache.insert(key, slot.clone());

        if batch.keys.len() >= self.inner.options.capacity {
            drop(state);
            self.dispatch(batch);
        } else {
            state.batch = Some(batch);
        }
        Ok(slot)
    }

    fn start_timer(&self, batch_id: u64) {
        let loader = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(loader.inner.options.wait).await;
            // Capacity may already have closed this batch.
            let batch = {
                let mut state = loader.inner.lock();
                match &state.batch {
                    Some(open) if open.id == batch_id => state.batch.take(),
                    _ => None,
                }
            };
            if let Some(batch) = batch {
                loader.dispatch(batch);
            }
        });
    }

    fn dispatch(&self, batch: Batch<K, V>) {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let Batch { id, keys, done } = batch;
            let expected = keys.len();
            trace!(loader = inner.name, batch = id, keys = expected, "dispatching batch");

            let outcome: Outcome<V> = if inner.cancel.is_cancelled() {
                Err(LoaderError::Cancelled)
            } else {
                tokio::select! {
                    _ = inner.cancel.cancelled() => Err(LoaderError::Cancelled),
                    result = (inner.fetch)(keys.clone()) => match result {
                        Ok(values) if values.len() == expected => Ok(values),
                        Ok(values) => {
                            error!(
                                loader = inner.name,
                                expected,
                                actual = values.len(),
                                "fetcher returned wrong number of results"
                            );
                            Ok(vec![Ok(V::default()); expected])
                        }
                        Err(e) => Err(LoaderError::Fetch(e)),
                    },
                }
            };

            // Failed keys may be retried by a later batch.
            {
                let mut state = inner.lock();
                for (i, key) in keys.iter().enumerate() {
                    let failed = match &outcome {
                        Ok(values) => values[i].is_err(),
                        Err(_) => true,
                    };
                    if failed && state.cache.get(key).is_some_and(|s| s.batch_id == id) {
                        state.cache.remove(key);
                    }
                }
            }

            done.send_replace(Some(Arc::new(outcome)));
        });
    }

    async fn wait(&self, slot: Slot<V>) -> Result<V, LoaderError> {
        let Slot {
            mut done, index, ..
        } = slot;
        let outcome = tokio::select! {
            biased;
            ready = done.wait_for(Option::is_some) => match ready {
                Ok(outcome) => (*outcome).clone(),
                Err(_) => None,
            },
            _ = self.inner.cancel.cancelled() => None,
        };
        let Some(outcome) = outcome else {
            return Err(LoaderError::Cancelled);
        };
        match outcome.as_ref() {
            Ok(values) => match values.get(index) {
                Some(value) => value.clone().map_err(LoaderError::from),
                None => Ok(V::default()),
            },
            Err(e) => Err(e.clone()),
        }
    }
}
