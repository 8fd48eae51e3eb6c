//! Listener binding and dispatch.
//!
//! [`CreationPass::listen`] is the entry point used while a view is built.
//! Handlers for the same native event on the same element share one native
//! subscription through a [`CoalescedListener`]; the [`ListenerWrapper`]
//! registered with the renderer marks the owning view dirty once per event and
//! then runs every chained handler with failures isolated.

mod coalesce;
mod config;
mod installer;
mod wrapper;


pub use coalesce::{ChainIter, CoalescedListener};
pub use config::{DEFAULT_LOG_TARGET, ListenerConfig};
pub use installer::{CreationPass, ListenOptions, ListenOutcome, NativeOutcome, RendererLoader};
pub use wrapper::{ListenerWrapper, invoke_with_isolation};
