//! Request ordering for cooperative cancellation.

use parking_lot::Mutex;
use tandem_core::NormalizedKey;

/// Position of a request in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Default)]
struct ClockState {
    next: u64,
    latest: Option<(u64, NormalizedKey)>,
    /// Highest ticket whose key differs from `latest`'s key
    latest_other: Option<u64>,
}

/// Hands out tickets and answers whether a request has been overtaken by a
/// newer request for a different prompt.
#[derive(Default)]
pub struct SessionClock {
    state: Mutex<ClockState>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an arriving request for `key`.
    pub fn arrive(&self, key: &NormalizedKey) -> Ticket {
        let mut state = self.state.lock();
        state.next += 1;
        let ticket = state.next;

        match state.latest.take() {
            Some((_, latest_key)) if latest_key == *key => {}
            Some((previous, _)) => state.latest_other = Some(previous),
            None => {}
        }
        state.latest = Some((ticket, key.clone()));

        Ticket(ticket)
    }

    /// True when a request for a different key arrived after `ticket`.
    pub fn is_superseded(&self, ticket: Ticket, key: &NormalizedKey) -> bool {
        let state = self.state.lock();
        match &state.latest {
            Some((latest, latest_key)) if latest_key != key => *latest > ticket.0,
            _ => state.latest_other.is_some_and(|other| other > ticket.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> NormalizedKey {
        NormalizedKey::normalize(s).unwrap()
    }

    #[test]
    fn test_single_request_is_current() {
        let clock = SessionClock::new();
        let t = clock.arrive(&key("a"));
        assert!(!clock.is_superseded(t, &key("a")));
    }

    #[test]
    fn test_same_key_does_not_supersede() {
        let clock = SessionClock::new();
        let t1 = clock.arrive(&key("a"));
        let _t2 = clock.arrive(&key("a"));
        assert!(!clock.is_superseded(t1, &key("a")));
    }

    #[test]
    fn test_different_key_supersedes() {
        let clock = SessionClock::new();
        let a = clock.arrive(&key("a"));
        let b = clock.arrive(&key("b"));
        assert!(clock.is_superseded(a, &key("a")));
        assert!(!clock.is_superseded(b, &key("b")));
    }

    #[test]
    fn test_interleaved_keys() {
        let clock = SessionClock::new();
        let a1 = clock.arrive(&key("a"));
        let b = clock.arrive(&key("b"));
        let a2 = clock.arrive(&key("a"));

        // b arrived after a1, even though the latest request is for "a" again
        assert!(clock.is_superseded(a1, &key("a")));
        // a2 arrived after b
        assert!(clock.is_superseded(b, &key("b")));
        assert!(!clock.is_superseded(a2, &key("a")));
    }
}
