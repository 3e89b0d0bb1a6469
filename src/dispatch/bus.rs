//! # Event Bus
//!
//! Type-keyed collection of [`EventDispatcher`]s behind one value.
//!
//! The bus creates a pipeline the first time anything registers for an
//! event type; dispatching a type nobody registered for touches no
//! pipeline at all and trivially approves. All pipelines share the bus's
//! [`DispatchConfig`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::config::DispatchConfig;
use crate::dispatch::engine::{EventDispatcher, HandlerId};
use crate::dispatch::{DispatchPriority, PostHandler, PreHandler};
use crate::error::{ProtocolError, Result};

type Slots = HashMap<TypeId, Box<dyn Any + Send + Sync>>;

/// Heterogeneous event dispatch: one bus, one pipeline per event type.
pub struct EventBus {
    config: DispatchConfig,
    slots: RwLock<Slots>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DispatchConfig::default())
    }
}

impl EventBus {
    /// Creates an empty bus; pipelines inherit `config`.
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            config,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Pipeline for `E`, created on first use.
    pub fn dispatcher<E: Send + Sync + 'static>(&self) -> Result<Arc<EventDispatcher<E>>> {
        let key = TypeId::of::<E>();
        {
            let slots = self.read_slots()?;
            if let Some(slot) = slots.get(&key) {
                return downcast_slot::<E>(slot.as_ref());
            }
        }

        let mut slots = self.write_slots()?;
        if let Some(slot) = slots.get(&key) {
            return downcast_slot::<E>(slot.as_ref());
        }
        let dispatcher = Arc::new(EventDispatcher::<E>::new(self.config.clone()));
        slots.insert(key, Box::new(Arc::clone(&dispatcher)));
        debug!(event = std::any::type_name::<E>(), "event pipeline created");
        Ok(dispatcher)
    }

    /// Registers a gatekeeper for `E` on the bus's pipeline.
    pub fn register_pre<E: Send + Sync + 'static>(
        &self,
        priority: DispatchPriority,
        handler: PreHandler<E>,
    ) -> Result<HandlerId> {
        self.dispatcher::<E>()?.register_pre(priority, handler)
    }

    /// Registers an observer for `E` on the bus's pipeline.
    pub fn register_post<E: Send + Sync + 'static>(
        &self,
        priority: DispatchPriority,
        handler: PostHandler<E>,
    ) -> Result<HandlerId> {
        self.dispatcher::<E>()?.register_post(priority, handler)
    }

    /// Registers a gatekeeper for `E` from an async closure.
    pub fn on_pre<E, F, Fut>(&self, priority: DispatchPriority, handler: F) -> Result<HandlerId>
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.dispatcher::<E>()?.on_pre(priority, handler)
    }

    /// Registers an observer for `E` from an async closure.
    pub fn on_post<E, F, Fut>(&self, priority: DispatchPriority, handler: F) -> Result<HandlerId>
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.dispatcher::<E>()?.on_post(priority, handler)
    }

    /// Removes a gatekeeper from `E`'s pipeline. `Ok(false)` when the id
    /// is unknown or the pipeline was never created.
    pub fn unregister_pre<E: Send + Sync + 'static>(&self, id: HandlerId) -> Result<bool> {
        match self.existing_dispatcher::<E>()? {
            Some(dispatcher) => dispatcher.unregister_pre(id),
            None => Ok(false),
        }
    }

    /// Removes an observer from `E`'s pipeline.
    pub fn unregister_post<E: Send + Sync + 'static>(&self, id: HandlerId) -> Result<bool> {
        match self.existing_dispatcher::<E>()? {
            Some(dispatcher) => dispatcher.unregister_post(id),
            None => Ok(false),
        }
    }

    /// Runs `event` through its type's pipeline.
    ///
    /// A type with no pipeline approves without allocating one.
    pub async fn dispatch<E: Send + Sync + 'static>(&self, event: E) -> Result<bool> {
        let dispatcher = self.existing_dispatcher::<E>()?;
        match dispatcher {
            Some(dispatcher) => dispatcher.dispatch(Arc::new(event)).await,
            None => Ok(true),
        }
    }

    /// Like [`dispatch`](Self::dispatch) for events already shared.
    pub async fn dispatch_shared<E: Send + Sync + 'static>(&self, event: Arc<E>) -> Result<bool> {
        let dispatcher = self.existing_dispatcher::<E>()?;
        match dispatcher {
            Some(dispatcher) => dispatcher.dispatch(event).await,
            None => Ok(true),
        }
    }

    /// Number of event types with a live pipeline.
    pub fn pipeline_count(&self) -> Result<usize> {
        Ok(self.read_slots()?.len())
    }

    fn existing_dispatcher<E: Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<EventDispatcher<E>>>> {
        let slots = self.read_slots()?;
        match slots.get(&TypeId::of::<E>()) {
            Some(slot) => Ok(Some(downcast_slot::<E>(slot.as_ref())?)),
            None => Ok(None),
        }
    }

    fn read_slots(&self) -> Result<RwLockReadGuard<'_, Slots>> {
        self.slots
            .read()
            .map_err(|_| ProtocolError::Internal("event bus lock poisoned".into()))
    }

    fn write_slots(&self) -> Result<RwLockWriteGuard<'_, Slots>> {
        self.slots
            .write()
            .map_err(|_| ProtocolError::Internal("event bus lock poisoned".into()))
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn downcast_slot<E: Send + Sync + 'static>(
    slot: &(dyn Any + Send + Sync),
) -> Result<Arc<EventDispatcher<E>>> {
    slot.downcast_ref::<Arc<EventDispatcher<E>>>()
        .cloned()
        .ok_or_else(|| ProtocolError::Internal("event bus slot holds the wrong pipeline".into()))
}
