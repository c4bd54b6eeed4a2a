//! # Staged Subscriber Set
//!
//! The main membership set of a global registry plus the two staging sets
//! that absorb mutation while a dispatch is iterating.
//!
//! ## Protocol
//!
//! - **Idle / Draining:** `insert` and `remove` apply to the main set directly.
//! - **Dispatching:** the main set is only borrowed immutably. `insert` goes
//!   to pending-add, `remove` goes to pending-remove. A request withdraws any
//!   opposite request for the same receiver that is still staged, so the last
//!   request made during a dispatch wins.
//! - When the [`DispatchPass`] guard is dropped (normally or while unwinding)
//!   the set drains: pending-remove is applied, then pending-add, then the
//!   state returns to Idle.
//!
//! Membership is kept in registration order.

use super::identity::ReceiverKey;
use super::state::DispatchState;
use indexmap::{IndexMap, IndexSet};
use std::cell::{Cell, Ref, RefCell};
use std::mem;
use std::rc::Rc;

/// Main subscriber set plus staging sets. Single-threaded by construction.
pub struct SubscriberSet<T: ?Sized> {
    state: Cell<DispatchState>,
    members: RefCell<IndexMap<ReceiverKey, Rc<T>>>,
    pending_add: RefCell<IndexMap<ReceiverKey, Rc<T>>>,
    pending_remove: RefCell<IndexSet<ReceiverKey>>,
}

impl<T: ?Sized> SubscriberSet<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Cell::new(DispatchState::Idle),
            members: RefCell::new(IndexMap::new()),
            pending_add: RefCell::new(IndexMap::new()),
            pending_remove: RefCell::new(IndexSet::new()),
        }
    }

    #[must_use]
    pub fn state(&self) -> DispatchState {
        self.state.get()
    }

    /// Add a receiver, or stage the addition while dispatching.
    ///
    /// Returns `true` when membership changed or will change once the current
    /// dispatch drains.
    pub fn insert(&self, receiver: Rc<T>) -> bool {
        let key = ReceiverKey::of_rc(&receiver);

        if self.state.get().stages_mutations() {
            let withdrawn = self.pending_remove.borrow_mut().shift_remove(&key);
            if self.members.borrow().contains_key(&key) {
                return withdrawn;
            }
            return self.pending_add.borrow_mut().insert(key, receiver).is_none();
        }

        let mut members = self.members.borrow_mut();
        if members.contains_key(&key) {
            return false;
        }
        members.insert(key, receiver);
        true
    }

    /// Remove a receiver, or stage the removal while dispatching.
    ///
    /// The removed `Rc` is dropped only after every borrow is released, so a
    /// receiver whose `Drop` calls back into the set is fine.
    pub fn remove(&self, key: ReceiverKey) -> bool {
        if self.state.get().stages_mutations() {
            let withdrawn = self.pending_add.borrow_mut().shift_remove(&key);
            let changed = if self.members.borrow().contains_key(&key) {
                self.pending_remove.borrow_mut().insert(key)
            } else {
                withdrawn.is_some()
            };
            drop(withdrawn);
            return changed;
        }

        let removed = self.members.borrow_mut().shift_remove(&key);
        let changed = removed.is_some();
        drop(removed);
        changed
    }

    /// Size of the main set. Staged changes are not counted.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.borrow().is_empty()
    }

    #[must_use]
    pub fn contains(&self, key: ReceiverKey) -> bool {
        self.members.borrow().contains_key(&key)
    }

    /// Copy of the main set in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Rc<T>> {
        self.members.borrow().values().cloned().collect()
    }

    /// Number of staged additions and removals.
    #[must_use]
    pub fn pending(&self) -> (usize, usize) {
        (
            self.pending_add.borrow().len(),
            self.pending_remove.borrow().len(),
        )
    }

    /// Drop every member and every staged change.
    ///
    /// Returns `false`, leaving the set untouched, while a dispatch is running.
    pub fn clear(&self) -> bool {
        if !self.state.get().is_idle() {
            return false;
        }
        let members = mem::take(&mut *self.members.borrow_mut());
        let added = mem::take(&mut *self.pending_add.borrow_mut());
        self.pending_remove.borrow_mut().clear();
        drop((members, added));
        true
    }

    /// Enter `Dispatching`. `None` unless the set is Idle.
    pub fn begin_dispatch(&self) -> Option<DispatchPass<'_, T>> {
        if !self.state.get().is_idle() {
            return None;
        }
        self.state.set(DispatchState::Dispatching);
        Some(DispatchPass { set: self })
    }

    /// Merge staged changes, return to Idle, then release removed receivers.
    fn drain(&self) {
        self.state.set(DispatchState::Draining);

        let removals = mem::take(&mut *self.pending_remove.borrow_mut());
        let additions = mem::take(&mut *self.pending_add.borrow_mut());
        let mut released = Vec::with_capacity(removals.len());
        {
            let mut members = self.members.borrow_mut();
            released.extend(removals.iter().filter_map(|key| members.shift_remove(key)));
            for (key, receiver) in additions {
                if members.contains_key(&key) {
                    released.push(receiver);
                } else {
                    members.insert(key, receiver);
                }
            }
        }

        self.state.set(DispatchState::Idle);
        drop(released);
    }
}

impl<T: ?Sized> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-progress dispatch over a [`SubscriberSet`].
///
/// Borrows taken through [`DispatchPass::members`] must be released before
/// the pass is dropped; declaring them after the pass is enough.
pub struct DispatchPass<'a, T: ?Sized> {
    set: &'a SubscriberSet<T>,
}

impl<'a, T: ?Sized> DispatchPass<'a, T> {
    /// The live main set. Stays stable for the whole pass.
    pub fn members(&self) -> Ref<'a, IndexMap<ReceiverKey, Rc<T>>> {
        self.set.members.borrow()
    }

    /// Schedule removal of a member without touching the main set.
    pub fn schedule_removal(&self, key: ReceiverKey) {
        let withdrawn = self.set.pending_add.borrow_mut().shift_remove(&key);
        self.set.pending_remove.borrow_mut().insert(key);
        drop(withdrawn);
    }
}

impl<T: ?Sized> Drop for DispatchPass<'_, T> {
    fn drop(&mut self) {
        self.set.drain();
    }
}
