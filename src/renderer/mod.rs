//! Native rendering boundary.
//!
//! Two shapes exist: a procedural renderer that owns its own subscriptions
//! and hands back a disposer, and a direct native target API with explicit
//! add/remove calls. [`Renderer`] closes over both so callers never probe for
//! capabilities at runtime.

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::event::Event;

/// Opaque native node handle produced by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeNode(pub u64);

/// Where a native listener is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Node(NativeNode),
    /// Global object such as `window` or `document`.
    Global(String),
}

impl fmt::Display for EventTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTarget::Node(node) => write!(f, "node#{}", node.0),
            EventTarget::Global(name) => f.write_str(name),
        }
    }
}

/// Result of a target resolver: the alternate target plus an optional
/// symbolic name understood by procedural renderers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: EventTarget,
    pub name: Option<String>,
}

impl ResolvedTarget {
    pub fn global(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            target: EventTarget::Global(name.clone()),
            name: Some(name),
        }
    }

    /// Target handed to a procedural renderer.
    pub fn listen_target(&self) -> EventTarget {
        match &self.name {
            Some(name) => EventTarget::Global(name.clone()),
            None => self.target.clone(),
        }
    }
}

pub type TargetResolver = Rc<dyn Fn(&NativeNode) -> ResolvedTarget>;

/// Callback registered with the native layer; returns the final handler result.
pub type NativeCallback = Rc<dyn Fn(&mut Event) -> Value>;

pub type Disposer = Box<dyn FnOnce()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeListenerId(pub u64);

/// Renderer abstraction that manages subscriptions itself.
pub trait ProceduralRenderer {
    fn listen(
        &self,
        target: &EventTarget,
        event_name: &str,
        callback: NativeCallback,
    ) -> Disposer;
}

/// Direct native event API.
pub trait NativeDom {
    fn add_event_listener(
        &self,
        target: &EventTarget,
        event_name: &str,
        callback: NativeCallback,
        use_capture: bool,
    ) -> NativeListenerId;

    fn remove_event_listener(
        &self,
        target: &EventTarget,
        event_name: &str,
        id: NativeListenerId,
        use_capture: bool,
    );
}

#[derive(Clone)]
pub enum Renderer {
    Procedural(Rc<dyn ProceduralRenderer>),
    Direct(Rc<dyn NativeDom>),
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Renderer::Procedural(_) => f.write_str("Renderer::Procedural"),
            Renderer::Direct(_) => f.write_str("Renderer::Direct"),
        }
    }
}

impl Renderer {
    pub fn procedural<R>(renderer: R) -> Self
    where
        R: ProceduralRenderer + 'static,
    {
        Renderer::Procedural(Rc::new(renderer))
    }

    pub fn direct<D>(dom: D) -> Self
    where
        D: NativeDom + 'static,
    {
        Renderer::Direct(Rc::new(dom))
    }

    pub fn is_procedural(&self) -> bool {
        matches!(self, Renderer::Procedural(_))
    }

    /// Perform exactly one native subscription.
    ///
    /// `capture` is ignored by procedural renderers.
    pub fn bind(
        &self,
        target: &ResolvedTarget,
        event_name: &str,
        callback: NativeCallback,
        capture: bool,
    ) -> NativeBinding {
        match self {
            Renderer::Procedural(renderer) => {
                let dispose = renderer.listen(&target.listen_target(), event_name, callback);
                NativeBinding::Disposer(dispose)
            }
            Renderer::Direct(dom) => {
                let id = dom.add_event_listener(&target.target, event_name, callback, capture);
                NativeBinding::Direct {
                    dom: Rc::clone(dom),
                    id,
                }
            }
        }
    }
}

/// Handle for one live native subscription.
pub enum NativeBinding {
    Disposer(Disposer),
    Direct {
        dom: Rc<dyn NativeDom>,
        id: NativeListenerId,
    },
}

impl fmt::Debug for NativeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeBinding::Disposer(_) => f.write_str("NativeBinding::Disposer"),
            NativeBinding::Direct { id, .. } => write!(f, "NativeBinding::Direct({})", id.0),
        }
    }
}

impl NativeBinding {
    /// Tear the subscription down. Consumes the handle so it runs once.
    pub fn unbind(self, target: &EventTarget, event_name: &str, capture: bool) {
        match self {
            NativeBinding::Disposer(dispose) => dispose(),
            NativeBinding::Direct { dom, id } => {
                dom.remove_event_listener(target, event_name, id, capture)
            }
        }
    }
}
