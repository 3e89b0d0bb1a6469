//! # Event Dispatch
//!
//! Priority-ordered async handler pipelines for server events.
//!
//! Each event type gets two phases:
//! - **pre**: every handler sees the event and returns a verdict; the
//!   dispatch result is the AND of all verdicts. One veto does not hide
//!   the event from the remaining pre-handlers.
//! - **post**: runs only when no pre-handler vetoed; observers with no
//!   say in the outcome.
//!
//! Handlers run in [`DispatchPriority`] order, registration order within a
//! priority. The [`engine`] compiles the handler lists into a shape picked
//! for their size (nothing, one direct call, an inline pair, a loop, or a
//! task fan-out) and caches it until the lists change.
//!
//! [`bus::EventBus`] adds a type-keyed front door so one value can carry
//! pipelines for any number of event types.

use std::sync::Arc;

use futures::future::BoxFuture;

pub mod bus;
pub mod engine;

pub use bus::EventBus;
pub use engine::{EventDispatcher, HandlerId};

/// Relative ordering of handlers within one event pipeline.
///
/// `Highest` runs first. Handlers sharing a priority run in the order they
/// were registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum DispatchPriority {
    Highest,
    High,
    #[default]
    Normal,
    Low,
    Lowest,
}

/// Gatekeeping handler: observes the event and votes on whether the action
/// it describes may proceed.
pub type PreHandler<E> = Arc<dyn Fn(Arc<E>) -> BoxFuture<'static, bool> + Send + Sync>;

/// Observing handler: runs after an event survives the pre phase.
pub type PostHandler<E> = Arc<dyn Fn(Arc<E>) -> BoxFuture<'static, ()> + Send + Sync>;
