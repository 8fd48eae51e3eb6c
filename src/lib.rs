//! Event listener binding and dispatch for the Room view runtime.
//!
//! Views install listeners during a creation pass. Handlers bound to the same
//! native event on the same element share one native subscription, every
//! dispatch marks the owning view dirty before user code runs, and all native
//! and output subscriptions are released exactly once when the view is
//! destroyed.

pub mod cleanup;
pub mod error;
pub mod event;
pub mod harness;
pub mod listener;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod renderer;
pub mod view;

pub use cleanup::{
    DisposalMode, ListenerTarget, TemplateCleanup, TemplateCleanupEntry, ViewCleanup,
    ViewCleanupEntry,
};
pub use error::{ListenerError, Result};
pub use event::{Event, Handler, HandlerFailure, HandlerResult, handler, is_explicit_false};
pub use listener::{
    CoalescedListener, CreationPass, ListenOptions, ListenOutcome, ListenerConfig,
    ListenerWrapper, NativeOutcome, RendererLoader, invoke_with_isolation,
};
pub use logging::{LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult};
pub use metrics::{ListenerMetrics, MetricSnapshot};
pub use output::{
    Directive, DirectiveDef, EventEmitter, OutputAlias, OutputAliases, OutputStream,
    OutputSubscription,
};
pub use renderer::{
    Disposer, EventTarget, NativeBinding, NativeCallback, NativeDom, NativeListenerId,
    NativeNode, ProceduralRenderer, Renderer, ResolvedTarget, TargetResolver,
};
pub use view::{FirstPassState, NodeKind, TNode, TemplateDescriptor, View, ViewFlags, ViewHost, ViewId};
