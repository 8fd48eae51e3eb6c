use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use serde_json::json;

use crate::cleanup::ViewCleanup;
use crate::error::Result;
use crate::event::HandlerFailure;
use crate::listener::{CreationPass, ListenerConfig};
use crate::logging::{LogLevel, json_kv};
use crate::output::Directive;
use crate::renderer::{NativeNode, Renderer};

use super::template::TemplateDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewFlags: u8 {
        /// A creation pass is currently running for this view.
        const CREATION_MODE = 1 << 0;
        /// Handlers never mark views dirty automatically.
        const MANUAL_CHANGE_DETECTION = 1 << 1;
        const DESTROYED = 1 << 2;
    }
}

/// Collaborator owning the view tree: dirty propagation and error reporting.
pub trait ViewHost {
    fn mark_view_dirty(&self, view: ViewId);

    fn handle_error(&self, view: ViewId, error: &HandlerFailure);
}

/// Runtime state of one instantiated template.
pub struct View {
    pub(crate) id: ViewId,
    pub(crate) template: Rc<TemplateDescriptor>,
    pub(crate) flags: Rc<Cell<ViewFlags>>,
    pub(crate) renderer: Renderer,
    pub(crate) host: Rc<dyn ViewHost>,
    pub(crate) natives: HashMap<usize, NativeNode>,
    pub(crate) component_views: HashMap<usize, ViewId>,
    pub(crate) directives: Vec<Rc<dyn Directive>>,
    pub(crate) cleanup: Option<ViewCleanup>,
    pub(crate) config: ListenerConfig,
}

impl View {
    pub fn new(
        id: ViewId,
        template: Rc<TemplateDescriptor>,
        renderer: Renderer,
        host: Rc<dyn ViewHost>,
    ) -> Self {
        Self {
            id,
            template,
            flags: Rc::new(Cell::new(ViewFlags::empty())),
            renderer,
            host,
            natives: HashMap::new(),
            component_views: HashMap::new(),
            directives: Vec::new(),
            cleanup: None,
            config: ListenerConfig::default(),
        }
    }

    pub fn with_native(mut self, index: usize, node: NativeNode) -> Self {
        self.natives.insert(index, node);
        self
    }

    /// Register the view owned by the component hosted at `index`.
    pub fn with_component_view(mut self, index: usize, view: ViewId) -> Self {
        self.component_views.insert(index, view);
        self
    }

    /// Append a directive instance; its position is the index nodes refer to.
    pub fn with_directive(mut self, directive: Rc<dyn Directive>) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn with_config(mut self, config: ListenerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_manual_change_detection(self, manual: bool) -> Self {
        self.set_manual_change_detection(manual);
        self
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn template(&self) -> &Rc<TemplateDescriptor> {
        &self.template
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn flags(&self) -> ViewFlags {
        self.flags.get()
    }

    /// Takes effect for handlers already installed.
    pub fn set_manual_change_detection(&self, manual: bool) {
        let mut flags = self.flags.get();
        flags.set(ViewFlags::MANUAL_CHANGE_DETECTION, manual);
        self.flags.set(flags);
    }

    pub fn native(&self, index: usize) -> Option<NativeNode> {
        self.natives.get(&index).copied()
    }

    pub fn component_view(&self, index: usize) -> Option<ViewId> {
        self.component_views.get(&index).copied()
    }

    pub fn directive(&self, index: usize) -> Option<&Rc<dyn Directive>> {
        self.directives.get(index)
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    /// Number of cleanup entries recorded for this instance.
    pub fn cleanup_len(&self) -> usize {
        self.cleanup.as_ref().map(ViewCleanup::len).unwrap_or(0)
    }

    pub fn is_destroyed(&self) -> bool {
        self.flags.get().contains(ViewFlags::DESTROYED)
    }

    /// Open the construction pass that installs this view's listeners.
    pub fn begin_creation(&mut self) -> Result<CreationPass<'_>> {
        CreationPass::start(self)
    }

    /// Run every recorded cleanup action once, in registration order.
    ///
    /// Returns how many actions ran; later calls return 0.
    pub fn destroy(&mut self) -> usize {
        let flags = self.flags.get();
        if flags.contains(ViewFlags::DESTROYED) {
            return 0;
        }
        self.flags.set(flags | ViewFlags::DESTROYED);

        let ran = self
            .cleanup
            .take()
            .map(|mut cleanup| cleanup.run_all())
            .unwrap_or(0);

        self.config.record(|metrics| metrics.record_disposals(ran));
        self.config.log(
            LogLevel::Debug,
            "view_destroyed",
            [
                json_kv("view", json!(self.id.0)),
                json_kv("template", json!(self.template.name())),
                json_kv("cleanups", json!(ran)),
            ],
        );
        ran
    }
}

impl Drop for View {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("template", &self.template.name())
            .field("flags", &self.flags.get())
            .field("renderer", &self.renderer)
            .field("cleanup_len", &self.cleanup_len())
            .finish()
    }
}
