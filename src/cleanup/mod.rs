//! Cleanup registry.
//!
//! Templates keep a shared log describing what each instance records; views
//! keep the live handles. Both logs are append-only and use tagged entries,
//! so scans never depend on entry widths.

mod core;

pub use core::{
    DisposalMode, ListenerTarget, TemplateCleanup, TemplateCleanupEntry, ViewCleanup,
    ViewCleanupEntry,
};
