//! In-memory doubles for the native boundary and the view host.
//!
//! `RecordingRenderer` and `RecordingDom` keep every subscription they are
//! asked to make and can fire simulated native events at a target.
//! `RecordingHost` journals dirty marks and routed errors.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::event::{Event, HandlerFailure};
use crate::renderer::{
    Disposer, EventTarget, NativeCallback, NativeDom, NativeListenerId, ProceduralRenderer,
};
use crate::view::{ViewHost, ViewId};

/// A subscription made against one of the recording doubles.
#[derive(Clone)]
pub struct RecordedListener {
    pub id: u64,
    pub target: EventTarget,
    pub event: String,
    pub capture: bool,
    pub active: bool,
    callback: NativeCallback,
}

#[derive(Default)]
struct ListenerTable {
    listeners: Vec<RecordedListener>,
    next_id: u64,
    removals: usize,
}

impl ListenerTable {
    fn add(
        &mut self,
        target: &EventTarget,
        event: &str,
        callback: NativeCallback,
        capture: bool,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(RecordedListener {
            id,
            target: target.clone(),
            event: event.to_string(),
            capture,
            active: true,
            callback,
        });
        id
    }

    /// Deactivate a listener; returns false if it was not live.
    fn remove(&mut self, id: u64) -> bool {
        match self
            .listeners
            .iter_mut()
            .find(|listener| listener.id == id && listener.active)
        {
            Some(listener) => {
                listener.active = false;
                self.removals += 1;
                true
            }
            None => false,
        }
    }

    fn matching(&self, target: &EventTarget, event: &str) -> Vec<NativeCallback> {
        self.listeners
            .iter()
            .filter(|l| l.active && &l.target == target && l.event == event)
            .map(|l| Rc::clone(&l.callback))
            .collect()
    }
}

fn fire(table: &RefCell<ListenerTable>, target: &EventTarget, event: &mut Event) -> Vec<Value> {
    event.target = Some(target.clone());
    // Release the borrow before callbacks run; they may install listeners.
    let callbacks = table.borrow().matching(target, &event.name);
    callbacks.iter().map(|callback| callback(event)).collect()
}

/// Procedural renderer double.
#[derive(Clone, Default)]
pub struct RecordingRenderer {
    table: Rc<RefCell<ListenerTable>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `listen` calls ever made.
    pub fn listen_calls(&self) -> usize {
        self.table.borrow().listeners.len()
    }

    pub fn active_count(&self) -> usize {
        self.table.borrow().listeners.iter().filter(|l| l.active).count()
    }

    pub fn disposals(&self) -> usize {
        self.table.borrow().removals
    }

    pub fn listeners(&self) -> Vec<RecordedListener> {
        self.table.borrow().listeners.clone()
    }

    /// Fire `event` at `target`, returning each callback's result.
    pub fn dispatch(&self, target: &EventTarget, event: &mut Event) -> Vec<Value> {
        fire(&self.table, target, event)
    }
}

impl ProceduralRenderer for RecordingRenderer {
    fn listen(
        &self,
        target: &EventTarget,
        event_name: &str,
        callback: NativeCallback,
    ) -> Disposer {
        let id = self
            .table
            .borrow_mut()
            .add(target, event_name, callback, false);
        let table = Rc::clone(&self.table);
        Box::new(move || {
            table.borrow_mut().remove(id);
        })
    }
}

/// Direct native API double.
#[derive(Clone, Default)]
pub struct RecordingDom {
    table: Rc<RefCell<ListenerTable>>,
    mismatched_removals: Rc<RefCell<usize>>,
}

impl RecordingDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_calls(&self) -> usize {
        self.table.borrow().listeners.len()
    }

    pub fn active_count(&self) -> usize {
        self.table.borrow().listeners.iter().filter(|l| l.active).count()
    }

    pub fn removals(&self) -> usize {
        self.table.borrow().removals
    }

    /// Removal requests whose target, event or capture flag did not match.
    pub fn mismatched_removals(&self) -> usize {
        *self.mismatched_removals.borrow()
    }

    pub fn listeners(&self) -> Vec<RecordedListener> {
        self.table.borrow().listeners.clone()
    }

    pub fn dispatch(&self, target: &EventTarget, event: &mut Event) -> Vec<Value> {
        fire(&self.table, target, event)
    }
}

impl NativeDom for RecordingDom {
    fn add_event_listener(
        &self,
        target: &EventTarget,
        event_name: &str,
        callback: NativeCallback,
        use_capture: bool,
    ) -> NativeListenerId {
        let id = self
            .table
            .borrow_mut()
            .add(target, event_name, callback, use_capture);
        NativeListenerId(id)
    }

    fn remove_event_listener(
        &self,
        target: &EventTarget,
        event_name: &str,
        id: NativeListenerId,
        use_capture: bool,
    ) {
        let mut table = self.table.borrow_mut();
        let matches = table.listeners.iter().any(|l| {
            l.id == id.0 && &l.target == target && l.event == event_name && l.capture == use_capture
        });
        if !matches || !table.remove(id.0) {
            *self.mismatched_removals.borrow_mut() += 1;
        }
    }
}

/// View host double journaling dirty marks and errors in call order.
#[derive(Default)]
pub struct RecordingHost {
    journal: Rc<RefCell<Vec<String>>>,
    dirty: RefCell<Vec<ViewId>>,
    errors: RefCell<Vec<(ViewId, String)>>,
}

impl RecordingHost {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    /// Shared journal; handlers may append to it to observe ordering.
    pub fn journal(&self) -> Rc<RefCell<Vec<String>>> {
        Rc::clone(&self.journal)
    }

    pub fn dirty_marks(&self) -> Vec<ViewId> {
        self.dirty.borrow().clone()
    }

    pub fn errors(&self) -> Vec<(ViewId, String)> {
        self.errors.borrow().clone()
    }
}

impl ViewHost for RecordingHost {
    fn mark_view_dirty(&self, view: ViewId) {
        self.dirty.borrow_mut().push(view);
        self.journal.borrow_mut().push(format!("dirty:{view}"));
    }

    fn handle_error(&self, view: ViewId, error: &HandlerFailure) {
        self.errors.borrow_mut().push((view, error.message.clone()));
        self.journal
            .borrow_mut()
            .push(format!("error:{view}:{}", error.message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NativeNode;

    #[test]
    fn disposer_deactivates_procedural_listener() {
        let renderer = RecordingRenderer::new();
        let target = EventTarget::Node(NativeNode(1));
        let dispose = renderer.listen(&target, "click", Rc::new(|_: &mut Event| Value::Bool(true)));
        assert_eq!(renderer.dispatch(&target, &mut Event::new("click")).len(), 1);

        let mut fired = Event::new("click");
        renderer.dispatch(&target, &mut fired);
        assert_eq!(fired.target, Some(target.clone()));

        dispose();
        assert_eq!(renderer.active_count(), 0);
        assert_eq!(renderer.disposals(), 1);
        assert!(renderer.dispatch(&target, &mut Event::new("click")).is_empty());
    }

    #[test]
    fn dom_flags_removal_with_wrong_capture() {
        let dom = RecordingDom::new();
        let target = EventTarget::Node(NativeNode(2));
        let id = dom.add_event_listener(&target, "focus", Rc::new(|_: &mut Event| Value::Null), true);

        dom.remove_event_listener(&target, "focus", id, false);
        assert_eq!(dom.mismatched_removals(), 1);
        assert_eq!(dom.active_count(), 1);

        dom.remove_event_listener(&target, "focus", id, true);
        assert_eq!(dom.removals(), 1);
        assert_eq!(dom.active_count(), 0);
    }
}
