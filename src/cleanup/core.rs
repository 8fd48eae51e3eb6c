use std::fmt;
use std::rc::Rc;

use crate::listener::CoalescedListener;
use crate::output::OutputSubscription;
use crate::renderer::{EventTarget, NativeBinding, TargetResolver};

/// How a listener's target is re-derived for a view instance.
#[derive(Clone)]
pub enum ListenerTarget {
    Node(usize),
    Resolver { node: usize, resolver: TargetResolver },
}

impl ListenerTarget {
    pub fn node(&self) -> usize {
        match self {
            ListenerTarget::Node(node) => *node,
            ListenerTarget::Resolver { node, .. } => *node,
        }
    }
}

impl fmt::Debug for ListenerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListenerTarget::Node(node) => f.debug_tuple("Node").field(node).finish(),
            ListenerTarget::Resolver { node, .. } => {
                f.debug_struct("Resolver").field("node", node).finish_non_exhaustive()
            }
        }
    }
}

/// Which native path a listener took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalMode {
    /// Attached directly; carries the capture flag needed for removal.
    Capture(bool),
    /// Subscribed through a procedural renderer that returned a disposer.
    Disposer,
}

/// One record of the per-template cleanup log.
#[derive(Debug, Clone)]
pub enum TemplateCleanupEntry {
    Listener {
        event: String,
        target: ListenerTarget,
        slot: usize,
        mode: DisposalMode,
    },
    Output {
        event: String,
        node: usize,
        slot: usize,
    },
    DestroyHook {
        slot: usize,
    },
}

impl TemplateCleanupEntry {
    /// Position of the matching entry in every instance's [`ViewCleanup`].
    pub fn slot(&self) -> usize {
        match self {
            TemplateCleanupEntry::Listener { slot, .. }
            | TemplateCleanupEntry::Output { slot, .. }
            | TemplateCleanupEntry::DestroyHook { slot } => *slot,
        }
    }

    /// Structural equality; resolver closures are compared by node only.
    pub fn same_layout(&self, other: &TemplateCleanupEntry) -> bool {
        use TemplateCleanupEntry::*;

        match (self, other) {
            (
                Listener {
                    event: a_event,
                    target: a_target,
                    slot: a_slot,
                    mode: a_mode,
                },
                Listener {
                    event: b_event,
                    target: b_target,
                    slot: b_slot,
                    mode: b_mode,
                },
            ) => {
                a_event == b_event
                    && a_slot == b_slot
                    && a_mode == b_mode
                    && a_target.node() == b_target.node()
                    && matches!(a_target, ListenerTarget::Node(_))
                        == matches!(b_target, ListenerTarget::Node(_))
            }
            (
                Output {
                    event: a_event,
                    node: a_node,
                    slot: a_slot,
                },
                Output {
                    event: b_event,
                    node: b_node,
                    slot: b_slot,
                },
            ) => a_event == b_event && a_node == b_node && a_slot == b_slot,
            (DestroyHook { slot: a }, DestroyHook { slot: b }) => a == b,
            _ => false,
        }
    }
}

/// Append-only cleanup log shared by all instances of a template.
///
/// Starts empty and allocates on the first recorded entry.
#[derive(Debug, Default, Clone)]
pub struct TemplateCleanup {
    entries: Vec<TemplateCleanupEntry>,
}

impl TemplateCleanup {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[TemplateCleanupEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TemplateCleanupEntry> {
        self.entries.get(index)
    }

    pub(crate) fn push(&mut self, entry: TemplateCleanupEntry) {
        self.entries.push(entry);
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    /// Slot of the native subscription already made for `(event, node)`.
    ///
    /// Only listeners bound to the node itself qualify; retargeted listeners
    /// never take part in coalescing.
    pub fn find_listener(&self, event: &str, node: usize) -> Option<usize> {
        self.entries.iter().find_map(|entry| match entry {
            TemplateCleanupEntry::Listener {
                event: recorded,
                target: ListenerTarget::Node(index),
                slot,
                ..
            } if recorded == event && *index == node => Some(*slot),
            _ => None,
        })
    }
}

/// Per-instance cleanup action.
pub enum ViewCleanupEntry {
    Listener {
        listener: Rc<CoalescedListener>,
        binding: NativeBinding,
        target: EventTarget,
        event: String,
        capture: bool,
    },
    Output {
        subscription: Box<dyn OutputSubscription>,
    },
    DestroyHook(Box<dyn FnOnce()>),
}

impl ViewCleanupEntry {
    fn run(self) {
        match self {
            ViewCleanupEntry::Listener {
                binding,
                target,
                event,
                capture,
                ..
            } => binding.unbind(&target, &event, capture),
            ViewCleanupEntry::Output { mut subscription } => subscription.unsubscribe(),
            ViewCleanupEntry::DestroyHook(hook) => hook(),
        }
    }
}

impl fmt::Debug for ViewCleanupEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViewCleanupEntry::Listener {
                listener,
                binding,
                target,
                event,
                capture,
            } => f
                .debug_struct("Listener")
                .field("event", event)
                .field("target", target)
                .field("capture", capture)
                .field("handlers", &listener.len())
                .field("binding", binding)
                .finish(),
            ViewCleanupEntry::Output { subscription } => f
                .debug_struct("Output")
                .field("closed", &subscription.is_closed())
                .finish(),
            ViewCleanupEntry::DestroyHook(_) => f.write_str("DestroyHook"),
        }
    }
}

/// Per-instance cleanup log, indexed in lock-step with [`TemplateCleanup`].
#[derive(Debug, Default)]
pub struct ViewCleanup {
    entries: Vec<Option<ViewCleanupEntry>>,
}

impl ViewCleanup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry and return its slot.
    pub fn push(&mut self, entry: ViewCleanupEntry) -> usize {
        self.entries.push(Some(entry));
        self.entries.len() - 1
    }

    /// Head of the coalesced chain stored at `slot`, if that slot holds a listener.
    pub fn listener_at(&self, slot: usize) -> Option<Rc<CoalescedListener>> {
        match self.entries.get(slot) {
            Some(Some(ViewCleanupEntry::Listener { listener, .. })) => Some(Rc::clone(listener)),
            _ => None,
        }
    }

    /// Run every pending entry in forward order. Each entry runs at most once.
    pub fn run_all(&mut self) -> usize {
        let mut ran = 0;
        for slot in self.entries.iter_mut() {
            if let Some(entry) = slot.take() {
                entry.run();
                ran += 1;
            }
        }
        ran
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::event::handler;
    use crate::renderer::{NativeNode, ResolvedTarget};
    use serde_json::Value;

    fn listener_entry(event: &str, node: usize, slot: usize) -> TemplateCleanupEntry {
        TemplateCleanupEntry::Listener {
            event: event.to_string(),
            target: ListenerTarget::Node(node),
            slot,
            mode: DisposalMode::Disposer,
        }
    }

    #[test]
    fn find_listener_skips_other_entry_kinds() {
        let mut cleanup = TemplateCleanup::default();
        cleanup.push(TemplateCleanupEntry::DestroyHook { slot: 0 });
        cleanup.push(TemplateCleanupEntry::Output {
            event: "click".to_string(),
            node: 1,
            slot: 1,
        });
        cleanup.push(listener_entry("click", 1, 2));

        assert_eq!(cleanup.find_listener("click", 1), Some(2));
        assert_eq!(cleanup.find_listener("click", 2), None);
        assert_eq!(cleanup.find_listener("input", 1), None);
    }

    #[test]
    fn find_listener_ignores_retargeted_entries() {
        let mut cleanup = TemplateCleanup::default();
        cleanup.push(TemplateCleanupEntry::Listener {
            event: "resize".to_string(),
            target: ListenerTarget::Resolver {
                node: 0,
                resolver: Rc::new(|_: &NativeNode| ResolvedTarget::global("window")),
            },
            slot: 0,
            mode: DisposalMode::Disposer,
        });
        assert_eq!(cleanup.find_listener("resize", 0), None);
    }

    #[test]
    fn same_layout_compares_structure() {
        assert!(listener_entry("click", 1, 0).same_layout(&listener_entry("click", 1, 0)));
        assert!(!listener_entry("click", 1, 0).same_layout(&listener_entry("click", 2, 0)));
        assert!(
            !listener_entry("click", 1, 0).same_layout(&TemplateCleanupEntry::DestroyHook {
                slot: 0
            })
        );
    }

    #[test]
    fn run_all_executes_each_entry_once_in_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut cleanup = ViewCleanup::new();

        let first = Rc::clone(&order);
        cleanup.push(ViewCleanupEntry::DestroyHook(Box::new(move || {
            first.borrow_mut().push("hook")
        })));
        let second = Rc::clone(&order);
        let slot = cleanup.push(ViewCleanupEntry::Listener {
            listener: Rc::new(CoalescedListener::new(handler(|_| Ok(Value::Null)))),
            binding: NativeBinding::Disposer(Box::new(move || second.borrow_mut().push("listener"))),
            target: EventTarget::Global("window".to_string()),
            event: "scroll".to_string(),
            capture: false,
        });
        assert!(cleanup.listener_at(slot).is_some());
        assert!(cleanup.listener_at(0).is_none());

        assert_eq!(cleanup.run_all(), 2);
        assert_eq!(cleanup.run_all(), 0);
        assert_eq!(*order.borrow(), vec!["hook", "listener"]);
    }
}
