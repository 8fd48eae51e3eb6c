use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::event::Handler;

/// One handler in a coalesced chain.
pub struct ChainLink {
    handler: Handler,
    next: Option<Rc<ChainLink>>,
}

/// All handlers sharing a single native subscription on one
/// `(element, event)` pair.
///
/// New handlers are prepended, so iteration yields the most recently bound
/// handler first.
pub struct CoalescedListener {
    head: RefCell<Rc<ChainLink>>,
    len: Cell<usize>,
}

impl CoalescedListener {
    pub fn new(handler: Handler) -> Self {
        Self {
            head: RefCell::new(Rc::new(ChainLink {
                handler,
                next: None,
            })),
            len: Cell::new(1),
        }
    }

    pub fn prepend(&self, handler: Handler) {
        let previous = Rc::clone(&self.head.borrow());
        *self.head.borrow_mut() = Rc::new(ChainLink {
            handler,
            next: Some(previous),
        });
        self.len.set(self.len.get() + 1);
    }

    pub fn len(&self) -> usize {
        self.len.get()
    }

    /// Walk the chain from a snapshot of the current head.
    ///
    /// Handlers prepended during the walk are not visited.
    pub fn handlers(&self) -> ChainIter {
        ChainIter {
            cursor: Some(Rc::clone(&self.head.borrow())),
        }
    }
}

impl fmt::Debug for CoalescedListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoalescedListener")
            .field("len", &self.len())
            .finish()
    }
}

pub struct ChainIter {
    cursor: Option<Rc<ChainLink>>,
}

impl Iterator for ChainIter {
    type Item = Handler;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.cursor.take()?;
        self.cursor = link.next.clone();
        Some(Rc::clone(&link.handler))
    }
}
