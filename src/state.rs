//! Device state machines with synchronous change listeners.

use std::{cell::RefCell, fmt::Debug, rc::Rc};

// -------------------------------------------------------------------------------------------------

/// States a device can be in. Which transitions are valid is up to the device owning the
/// [`State`], not the state object itself.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, strum::EnumString, strum::Display, strum::VariantNames,
)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeviceState {
    /// No sample buffer available.
    Empty,
    /// A recorder is capturing from the input bus.
    Recording,
    /// A granular device received a buffer and is ready to granulate.
    Loaded,
    /// A source device holds a sample buffer.
    Full,
    /// A source device is looping its sample buffer.
    Looping,
    /// A granular device has live grain voices.
    Granulating,
}

// -------------------------------------------------------------------------------------------------

/// Callback type for [`State::on_change`].
pub type StateListener<S> = Rc<dyn Fn(S)>;

struct StateInner<S> {
    current: S,
    listeners: Vec<StateListener<S>>,
}

/// A minimal observable state machine.
///
/// Every call to [`change`](Self::change) notifies all listeners synchronously, in registration
/// order, even when the new state equals the current one.
///
/// `State` is a cheap handle: clones share the same value and listener list, so scheduled
/// callbacks can observe a device's state without owning the device.
pub struct State<S: Copy + Debug + 'static> {
    inner: Rc<RefCell<StateInner<S>>>,
}

impl<S: Copy + Debug + 'static> Clone for State<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Copy + Debug + 'static> Debug for State<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("State")
            .field("current", &inner.current)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<S: Copy + Debug + 'static> State<S> {
    /// Create a new state machine in the given initial state, without listeners.
    pub fn new(initial: S) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StateInner {
                current: initial,
                listeners: Vec::new(),
            })),
        }
    }

    /// The current state.
    pub fn get(&self) -> S {
        self.inner.borrow().current
    }

    /// Register a listener which gets called on every following state change.
    pub fn on_change<F: Fn(S) + 'static>(&self, listener: F) {
        self.inner.borrow_mut().listeners.push(Rc::new(listener));
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Move to a new state and notify all listeners.
    pub fn change(&self, new_state: S) {
        // listeners may read or change the state again, so don't hold the borrow
        let listeners = {
            let mut inner = self.inner.borrow_mut();
            inner.current = new_state;
            inner.listeners.clone()
        };
        for listener in listeners {
            listener(new_state);
        }
    }

    /// Drop all listeners. Used when the owning device gets removed.
    pub fn clear_listeners(&self) {
        self.inner.borrow_mut().listeners.clear();
    }
}

// -------------------------------------------------------------------------------------------------
