//! View instances and the template data they share.
//!
//! The view tree itself is owned elsewhere; this module only keeps what the
//! listener machinery needs: native nodes, directive instances, the renderer
//! in effect, and the cleanup log.

mod core;
mod template;

pub use core::{View, ViewFlags, ViewHost, ViewId};
pub use template::{FirstPassState, NodeKind, TNode, TemplateDescriptor};
