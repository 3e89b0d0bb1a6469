//! # Dispatch Engine
//!
//! Per-event-type handler pipeline with compiled call strategies.
//!
//! Registration mutates plain `Vec`s behind a lock and invalidates the
//! compiled plan; the first dispatch after a change recompiles and caches
//! it. Steady-state dispatch therefore takes one read lock, clones an
//! `Arc`, and runs the plan without touching the registration lists.
//!
//! Strategy selection, by handler count `n` for each phase:
//! - `n == 0`: nothing to call, pre verdict is `true`
//! - `n == 1`: direct call
//! - `n == 2`: inline pair, no loop
//! - otherwise: sequential loop, or a task fan-out when parallel dispatch
//!   is enabled and `n` reaches the configured threshold
//!
//! The pre phase never short-circuits: every gatekeeper sees the event
//! even after an earlier veto, and the verdicts are AND-ed at the end.
//! Handler panics propagate to the dispatching task.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use futures::future::BoxFuture;
use tracing::{debug, trace, warn};

use crate::config::DispatchConfig;
use crate::dispatch::{DispatchPriority, PostHandler, PreHandler};
use crate::error::{ProtocolError, Result};
use crate::utils::metrics;

/// Opaque handle to one registration, used to remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Entry<H> {
    id: HandlerId,
    priority: DispatchPriority,
    handler: H,
}

/// Call shape compiled from one phase's handler list.
enum Strategy<H> {
    Empty,
    Single(H),
    Pair(H, H),
    Sequential(Arc<[H]>),
    Parallel(Arc<[H]>),
}

struct CompiledDispatch<E> {
    pre: Strategy<PreHandler<E>>,
    post: Strategy<PostHandler<E>>,
}

struct Registrations<E> {
    pre: Vec<Entry<PreHandler<E>>>,
    post: Vec<Entry<PostHandler<E>>>,
    compiled: Option<Arc<CompiledDispatch<E>>>,
    next_id: u64,
}

impl<E> Registrations<E> {
    fn allocate_id(&mut self) -> HandlerId {
        self.next_id += 1;
        HandlerId(self.next_id)
    }
}

impl<E> Default for Registrations<E> {
    fn default() -> Self {
        Self {
            pre: Vec::new(),
            post: Vec::new(),
            compiled: None,
            next_id: 0,
        }
    }
}

/// Priority-ordered async dispatcher for one event type.
pub struct EventDispatcher<E> {
    config: DispatchConfig,
    inner: RwLock<Registrations<E>>,
}

impl<E: Send + Sync + 'static> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl<E: Send + Sync + 'static> EventDispatcher<E> {
    /// Creates a dispatcher with no handlers.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(Registrations::default()),
        }
    }

    /// Registers a gatekeeping handler.
    ///
    /// Registering the same `Arc` instance twice is rejected with
    /// [`ProtocolError::DuplicateHandler`]; a double registration would
    /// double-count its verdict.
    pub fn register_pre(
        &self,
        priority: DispatchPriority,
        handler: PreHandler<E>,
    ) -> Result<HandlerId> {
        let mut inner = self.write_inner()?;
        if inner
            .pre
            .iter()
            .any(|entry| Arc::ptr_eq(&entry.handler, &handler))
        {
            return Err(ProtocolError::DuplicateHandler);
        }
        let id = inner.allocate_id();
        inner.pre.push(Entry {
            id,
            priority,
            handler,
        });
        inner.pre.sort_by_key(|entry| entry.priority);
        inner.compiled = None;
        debug!(?priority, total = inner.pre.len(), "pre-handler registered");
        Ok(id)
    }

    /// Registers an observing handler. The same instance may be registered
    /// more than once; observers have no verdict to double-count.
    pub fn register_post(
        &self,
        priority: DispatchPriority,
        handler: PostHandler<E>,
    ) -> Result<HandlerId> {
        let mut inner = self.write_inner()?;
        let id = inner.allocate_id();
        inner.post.push(Entry {
            id,
            priority,
            handler,
        });
        inner.post.sort_by_key(|entry| entry.priority);
        inner.compiled = None;
        debug!(?priority, total = inner.post.len(), "post-handler registered");
        Ok(id)
    }

    /// Registers a gatekeeper from an async closure.
    pub fn on_pre<F, Fut>(&self, priority: DispatchPriority, handler: F) -> Result<HandlerId>
    where
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.register_pre(
            priority,
            Arc::new(move |event| -> BoxFuture<'static, bool> { Box::pin(handler(event)) }),
        )
    }

    /// Registers an observer from an async closure.
    pub fn on_post<F, Fut>(&self, priority: DispatchPriority, handler: F) -> Result<HandlerId>
    where
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.register_post(
            priority,
            Arc::new(move |event| -> BoxFuture<'static, ()> { Box::pin(handler(event)) }),
        )
    }

    /// Removes a gatekeeper, returning whether it was present.
    pub fn unregister_pre(&self, id: HandlerId) -> Result<bool> {
        let mut inner = self.write_inner()?;
        let before = inner.pre.len();
        inner.pre.retain(|entry| entry.id != id);
        let removed = inner.pre.len() != before;
        if removed {
            inner.compiled = None;
        }
        Ok(removed)
    }

    /// Removes an observer, returning whether it was present.
    pub fn unregister_post(&self, id: HandlerId) -> Result<bool> {
        let mut inner = self.write_inner()?;
        let before = inner.post.len();
        inner.post.retain(|entry| entry.id != id);
        let removed = inner.post.len() != before;
        if removed {
            inner.compiled = None;
        }
        Ok(removed)
    }

    /// Number of registered gatekeepers.
    pub fn pre_handler_count(&self) -> Result<usize> {
        Ok(self.read_inner()?.pre.len())
    }

    /// Number of registered observers.
    pub fn post_handler_count(&self) -> Result<usize> {
        Ok(self.read_inner()?.post.len())
    }

    /// Runs the event through both phases.
    ///
    /// Returns `Ok(true)` when every gatekeeper approved (observers have
    /// then already run), `Ok(false)` when at least one vetoed.
    pub async fn dispatch(&self, event: Arc<E>) -> Result<bool> {
        let compiled = self.compiled()?;
        metrics::global().record_dispatch();

        let approved = run_pre(&compiled.pre, &event).await;
        if !approved {
            metrics::global().record_veto();
            trace!("event vetoed in pre phase");
            return Ok(false);
        }
        run_post(&compiled.post, &event).await;
        Ok(true)
    }

    /// Returns the cached plan, compiling it first if registrations
    /// changed since the last dispatch.
    fn compiled(&self) -> Result<Arc<CompiledDispatch<E>>> {
        if let Some(compiled) = self.read_inner()?.compiled.as_ref() {
            return Ok(Arc::clone(compiled));
        }

        let mut inner = self.write_inner()?;
        // Another dispatcher may have compiled while we waited.
        if let Some(compiled) = inner.compiled.as_ref() {
            return Ok(Arc::clone(compiled));
        }

        let pre_handlers: Vec<_> = inner.pre.iter().map(|e| Arc::clone(&e.handler)).collect();
        let post_handlers: Vec<_> = inner.post.iter().map(|e| Arc::clone(&e.handler)).collect();
        let compiled = Arc::new(CompiledDispatch {
            pre: self.select_strategy(pre_handlers),
            post: self.select_strategy(post_handlers),
        });
        debug!(
            pre = inner.pre.len(),
            post = inner.post.len(),
            parallel = self.config.parallel,
            "dispatch plan compiled"
        );
        inner.compiled = Some(Arc::clone(&compiled));
        Ok(compiled)
    }

    fn select_strategy<H>(&self, handlers: Vec<H>) -> Strategy<H> {
        let n = handlers.len();
        let mut iter = handlers.into_iter();
        match (iter.next(), iter.next()) {
            (None, _) => Strategy::Empty,
            (Some(single), None) => Strategy::Single(single),
            (Some(first), Some(second)) => {
                if iter.len() == 0 {
                    return Strategy::Pair(first, second);
                }
                let mut all = vec![first, second];
                all.extend(iter);
                if self.config.parallel && n >= self.config.min_parallel_handlers {
                    Strategy::Parallel(all.into())
                } else {
                    Strategy::Sequential(all.into())
                }
            }
        }
    }

    fn read_inner(&self) -> Result<RwLockReadGuard<'_, Registrations<E>>> {
        self.inner
            .read()
            .map_err(|_| ProtocolError::Internal("dispatch registration lock poisoned".into()))
    }

    fn write_inner(&self) -> Result<RwLockWriteGuard<'_, Registrations<E>>> {
        self.inner
            .write()
            .map_err(|_| ProtocolError::Internal("dispatch registration lock poisoned".into()))
    }
}

impl<E> fmt::Debug for EventDispatcher<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

async fn run_pre<E>(strategy: &Strategy<PreHandler<E>>, event: &Arc<E>) -> bool {
    match strategy {
        Strategy::Empty => true,
        Strategy::Single(handler) => handler(Arc::clone(event)).await,
        Strategy::Pair(first, second) => {
            // Collect both verdicts before combining; no short-circuit.
            let a = first(Arc::clone(event)).await;
            let b = second(Arc::clone(event)).await;
            a && b
        }
        Strategy::Sequential(handlers) => {
            let mut approved = true;
            for handler in handlers.iter() {
                approved &= handler(Arc::clone(event)).await;
            }
            approved
        }
        Strategy::Parallel(handlers) => {
            let tasks: Vec<_> = handlers
                .iter()
                .map(|handler| tokio::spawn(handler(Arc::clone(event))))
                .collect();
            let mut approved = true;
            for task in tasks {
                match task.await {
                    Ok(verdict) => approved &= verdict,
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    Err(_) => {
                        warn!("pre-handler task cancelled mid-dispatch");
                        approved = false;
                    }
                }
            }
            approved
        }
    }
}

async fn run_post<E>(strategy: &Strategy<PostHandler<E>>, event: &Arc<E>) {
    match strategy {
        Strategy::Empty => {}
        Strategy::Single(handler) => handler(Arc::clone(event)).await,
        Strategy::Pair(first, second) => {
            first(Arc::clone(event)).await;
            second(Arc::clone(event)).await;
        }
        Strategy::Sequential(handlers) => {
            for handler in handlers.iter() {
                handler(Arc::clone(event)).await;
            }
        }
        Strategy::Parallel(handlers) => {
            let tasks: Vec<_> = handlers
                .iter()
                .map(|handler| tokio::spawn(handler(Arc::clone(event))))
                .collect();
            for task in tasks {
                match task.await {
                    Ok(()) => {}
                    Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                    Err(_) => warn!("post-handler task cancelled mid-dispatch"),
                }
            }
        }
    }
}
