use thiserror::Error;

use crate::view::ViewId;

/// Unified result type for the listener binding crate.
pub type Result<T> = std::result::Result<T, ListenerError>;

/// Construction-time failures raised while installing listeners.
///
/// Handler failures during dispatch are never surfaced here; they are routed
/// to the view host instead.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("output `{property}` declared by `{owner}` is not a subscribable stream")]
    MisconfiguredOutput { property: String, owner: String },
    #[error("node {index} not found in template `{template}`")]
    UnknownNode { index: usize, template: String },
    #[error("node {0} has no native element in this view")]
    MissingNative(usize),
    #[error("component host {0} has no component view registered")]
    MissingComponentView(usize),
    #[error("directive index {0} out of range")]
    UnknownDirective(usize),
    #[error("template `{0}` is already running its first creation pass")]
    ReentrantFirstPass(String),
    #[error("cleanup layout of template `{template}` diverged at slot {slot}")]
    CleanupMismatch { template: String, slot: usize },
    #[error("view {0} already holds listeners from an earlier creation pass")]
    CreationRepeated(ViewId),
    #[error("view {0} has already been destroyed")]
    ViewDestroyed(ViewId),
}
