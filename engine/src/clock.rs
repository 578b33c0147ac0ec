use std::collections::BTreeMap;
use std::time::Duration;

/// Handle for a single scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Groups timers so they can be cancelled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerScope(pub u32);

impl TimerScope {
    pub const ROOT: TimerScope = TimerScope(0);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<T> {
    pub id: TimerId,
    pub at: Duration,
    pub payload: T,
}

#[derive(Debug, Clone)]
struct Timer<T> {
    due: Duration,
    period: Option<Duration>,
    scope: TimerScope,
    payload: T,
}

/// A virtual clock with browser-style timeouts and intervals.
///
/// Nothing fires on its own: the host calls [`Scheduler::pop_due`] in a loop
/// and handles each timer before asking for the next one, so a handler that
/// cancels another timer is always honoured. Each interval ticks monotonically;
/// independent timers are ordered by due time, then by creation order.
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    timers: BTreeMap<TimerId, Timer<T>>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 1,
            timers: BTreeMap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn active_in(&self, scope: TimerScope) -> usize {
        self.timers.values().filter(|t| t.scope == scope).count()
    }

    pub fn set_timeout(&mut self, scope: TimerScope, delay: Duration, payload: T) -> TimerId {
        self.insert(Timer {
            due: self.now.saturating_add(delay),
            period: None,
            scope,
            payload,
        })
    }

    /// Zero periods are bumped to one millisecond so an interval can never
    /// starve the loop.
    pub fn set_interval(&mut self, scope: TimerScope, period: Duration, payload: T) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.insert(Timer {
            due: self.now.saturating_add(period),
            period: Some(period),
            scope,
            payload,
        })
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.timers.remove(&id).is_some()
    }

    pub fn cancel_scope(&mut self, scope: TimerScope) -> usize {
        let before = self.timers.len();
        self.timers.retain(|_, t| t.scope != scope);
        before - self.timers.len()
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }

    /// Moves the clock forward once every due timer has been drained.
    pub fn settle(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    fn insert(&mut self, timer: Timer<T>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.timers.insert(id, timer);
        id
    }

    fn earliest(&self, until: Duration) -> Option<TimerId> {
        self.timers
            .iter()
            .filter(|(_, t)| t.due <= until)
            .min_by_key(|(id, t)| (t.due, **id))
            .map(|(id, _)| *id)
    }
}

impl<T: Clone> Scheduler<T> {
    pub fn pop_due(&mut self, until: Duration) -> Option<Fired<T>> {
        let id = self.earliest(until)?;
        let timer = self.timers.get_mut(&id)?;
        let at = timer.due;
        let payload = timer.payload.clone();
        match timer.period {
            Some(period) => timer.due = at.saturating_add(period),
            None => {
                self.timers.remove(&id);
            }
        }
        if at > self.now {
            self.now = at;
        }
        Some(Fired { id, at, payload })
    }

    /// Drains and returns everything due up to `until`, then settles there.
    ///
    /// Convenient when handlers never cancel each other; otherwise loop on
    /// [`Scheduler::pop_due`].
    pub fn advance(&mut self, until: Duration) -> Vec<Fired<T>> {
        let mut fired = Vec::new();
        while let Some(next) = self.pop_due(until) {
            fired.push(next);
        }
        self.settle(until);
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: TimerScope = TimerScope(1);
    const B: TimerScope = TimerScope(2);

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn timeout_fires_once_at_its_due_time() {
        let mut s = Scheduler::new();
        s.set_timeout(A, ms(300), "next");

        assert!(s.advance(ms(299)).is_empty());
        let fired = s.advance(ms(300));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].at, ms(300));
        assert!(s.advance(ms(10_000)).is_empty());
    }

    #[test]
    fn interval_fires_every_period_until_cancelled() {
        let mut s = Scheduler::new();
        let id = s.set_interval(A, ms(1000), 'c');

        let fired = s.advance(ms(3500));
        let times: Vec<_> = fired.iter().map(|f| f.at).collect();
        assert_eq!(times, vec![ms(1000), ms(2000), ms(3000)]);

        assert!(s.cancel(id));
        assert!(s.advance(ms(10_000)).is_empty());
    }

    #[test]
    fn ties_break_by_creation_order() {
        let mut s = Scheduler::new();
        s.set_timeout(A, ms(30), 1);
        s.set_interval(A, ms(30), 2);
        s.set_timeout(B, ms(30), 3);

        let order: Vec<_> = s.advance(ms(30)).into_iter().map(|f| f.payload).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn cancel_scope_only_touches_that_scope() {
        let mut s = Scheduler::new();
        s.set_interval(A, ms(30), 'a');
        s.set_interval(A, ms(800), 'a');
        s.set_interval(B, ms(1000), 'b');

        assert_eq!(s.cancel_scope(A), 2);
        assert_eq!(s.active_in(A), 0);
        assert_eq!(s.active_in(B), 1);
    }

    #[test]
    fn handler_can_cancel_a_timer_due_in_the_same_window() {
        let mut s = Scheduler::new();
        s.set_timeout(A, ms(10), "first");
        let doomed = s.set_timeout(A, ms(20), "second");

        let first = s.pop_due(ms(50)).unwrap();
        assert_eq!(first.payload, "first");
        assert_eq!(s.now(), ms(10));
        s.cancel(doomed);
        assert!(s.pop_due(ms(50)).is_none());
        s.settle(ms(50));
        assert_eq!(s.now(), ms(50));
    }

    #[test]
    fn timers_set_during_a_window_are_relative_to_the_fired_time() {
        let mut s = Scheduler::new();
        s.set_timeout(A, ms(100), "fade-done");
        let fired = s.pop_due(ms(1000)).unwrap();
        assert_eq!(fired.payload, "fade-done");

        s.set_timeout(A, ms(300), "mount");
        let mount = s.pop_due(ms(1000)).unwrap();
        assert_eq!(mount.at, ms(400));
    }
}
