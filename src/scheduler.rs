//! Cooperative, single-threaded interval timers.

use std::{cell::RefCell, fmt::Display, rc::Rc, time::Duration};

// -------------------------------------------------------------------------------------------------

/// Identifies a scheduled interval callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntervalId(usize);

impl Display for IntervalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -------------------------------------------------------------------------------------------------

struct Interval {
    id: IntervalId,
    period: Duration,
    next_due: Duration,
    callback: Rc<dyn Fn()>,
}

#[derive(Default)]
struct SchedulerInner {
    now: Duration,
    next_id: usize,
    intervals: Vec<Interval>,
}

/// Runs periodic callbacks on the caller's timeline.
///
/// Time only moves forward when the host calls [`advance`](Self::advance), so callbacks never run
/// concurrently with each other or with the render cycle. Due callbacks fire in chronological
/// order; callbacks due at the same time fire in registration order.
///
/// `Scheduler` is a cheap handle: clones share the same timeline.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current scheduler time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of active intervals.
    pub fn interval_count(&self) -> usize {
        self.inner.borrow().intervals.len()
    }

    /// Register a callback which is invoked every `period`, starting one period from now.
    pub fn set_interval<F: Fn() + 'static>(&self, period: Duration, callback: F) -> IntervalId {
        assert!(!period.is_zero(), "Interval period must be > 0");
        let mut inner = self.inner.borrow_mut();
        let id = IntervalId(inner.next_id);
        inner.next_id += 1;
        let next_due = inner.now + period;
        inner.intervals.push(Interval {
            id,
            period,
            next_due,
            callback: Rc::new(callback),
        });
        id
    }

    /// Cancel an interval. Returns false when the interval no longer exists, which makes
    /// cancelling twice a harmless no-op.
    pub fn clear_interval(&self, id: IntervalId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let count = inner.intervals.len();
        inner.intervals.retain(|i| i.id != id);
        inner.intervals.len() != count
    }

    /// Move time forward by `delta`, running all callbacks which become due.
    /// Returns the number of invoked callbacks.
    pub fn advance(&self, delta: Duration) -> usize {
        let target = self.now() + delta;
        let mut fired = 0;
        loop {
            // callbacks may (un)register intervals, so don't hold the borrow while calling them
            let next = {
                let inner = self.inner.borrow();
                inner
                    .intervals
                    .iter()
                    .filter(|i| i.next_due <= target)
                    .min_by_key(|i| (i.next_due, i.id))
                    .map(|i| (i.id, i.next_due, Rc::clone(&i.callback)))
            };
            let Some((id, due, callback)) = next else {
                break;
            };
            {
                let mut inner = self.inner.borrow_mut();
                inner.now = due;
                if let Some(interval) = inner.intervals.iter_mut().find(|i| i.id == id) {
                    interval.next_due += interval.period;
                }
            }
            callback();
            fired += 1;
        }
        self.inner.borrow_mut().now = target;
        fired
    }
}

// -------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn fires_per_period() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        {
            let count = Rc::clone(&count);
            scheduler.set_interval(Duration::from_millis(1), move || count.set(count.get() + 1));
        }
        assert_eq!(scheduler.advance(Duration::from_micros(500)), 0);
        assert_eq!(scheduler.advance(Duration::from_micros(500)), 1);
        assert_eq!(scheduler.advance(Duration::from_millis(10)), 10);
        assert_eq!(count.get(), 11);
        assert_eq!(scheduler.now(), Duration::from_millis(11));
    }

    #[test]
    fn registration_order_breaks_ties() {
        let scheduler = Scheduler::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b"] {
            let log = Rc::clone(&log);
            scheduler.set_interval(Duration::from_millis(2), move || log.borrow_mut().push(name));
        }
        {
            let log = Rc::clone(&log);
            scheduler.set_interval(Duration::from_millis(3), move || log.borrow_mut().push("c"));
        }
        scheduler.advance(Duration::from_millis(6));
        assert_eq!(
            *log.borrow(),
            vec!["a", "b", "c", "a", "b", "a", "b", "c"]
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let id = {
            let count = Rc::clone(&count);
            scheduler.set_interval(Duration::from_millis(1), move || count.set(count.get() + 1))
        };
        scheduler.advance(Duration::from_millis(2));
        assert!(scheduler.clear_interval(id));
        assert!(!scheduler.clear_interval(id));
        scheduler.advance(Duration::from_millis(2));
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.interval_count(), 0);
    }

    #[test]
    fn callback_may_cancel_itself() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let own_id = Rc::new(Cell::new(None));
        let id = {
            let scheduler_handle = scheduler.clone();
            let count = Rc::clone(&count);
            let own_id = Rc::clone(&own_id);
            scheduler.set_interval(Duration::from_millis(1), move || {
                count.set(count.get() + 1);
                if let Some(id) = own_id.get() {
                    scheduler_handle.clear_interval(id);
                }
            })
        };
        own_id.set(Some(id));
        scheduler.advance(Duration::from_millis(5));
        assert_eq!(count.get(), 1);
    }
}
