//! Round-robin selection of the gateway session used for each delivery.
//!
//! Workers race on the shared counter, so assignment follows counter order,
//! not job arrival order. Distribution is even over time; per-job sequencing
//! is not guaranteed when more than one worker is running.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::DispatchError;

#[derive(Debug)]
pub struct SessionRotator {
    sessions: Box<[String]>,
    counter: AtomicU64,
}

impl SessionRotator {
    /// Entries are trimmed and blank ones dropped; at least one must remain.
    pub fn new(sessions: Vec<String>) -> crate::Result<Self> {
        let sessions: Vec<String> = sessions
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if sessions.is_empty() {
            return Err(DispatchError::NoSessions);
        }
        Ok(Self {
            sessions: sessions.into_boxed_slice(),
            counter: AtomicU64::new(0),
        })
    }

    /// Next session to use. A single session is returned without touching the counter.
    pub fn next(&self) -> &str {
        if self.sessions.len() == 1 {
            return &self.sessions[0];
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        &self.sessions[(n % self.sessions.len() as u64) as usize]
    }

    pub fn sessions(&self) -> &[String] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn rotator(names: &[&str]) -> SessionRotator {
        SessionRotator::new(names.iter().map(|s| s.to_string()).collect()).unwrap()
    }

    #[test]
    fn test_empty_list_rejected() {
        assert!(matches!(SessionRotator::new(vec![]), Err(DispatchError::NoSessions)));
        assert!(matches!(
            SessionRotator::new(vec!["".to_string(), "  ".to_string()]),
            Err(DispatchError::NoSessions)
        ));
    }

    #[test]
    fn test_single_session_always_returned() {
        let r = rotator(&["only"]);
        for _ in 0..5 {
            assert_eq!(r.next(), "only");
        }
        assert_eq!(r.counter.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_round_robin_order() {
        let r = rotator(&["A", "B", "C"]);
        let picked: Vec<&str> = (0..6).map(|_| r.next()).collect();
        assert_eq!(picked, vec!["A", "B", "C", "A", "B", "C"]);
    }

    #[test]
    fn test_blank_sessions_dropped() {
        let r = rotator(&["A", "", " ", " B "]);
        assert_eq!(r.sessions(), &["A".to_string(), "B".to_string()]);
        let picked: Vec<&str> = (0..4).map(|_| r.next()).collect();
        assert_eq!(picked, vec!["A", "B", "A", "B"]);
    }

    #[test]
    fn test_concurrent_rotation_is_even() {
        let r = Arc::new(rotator(&["A", "B", "C", "D"]));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let r = r.clone();
                std::thread::spawn(move || {
                    (0..1000).map(|_| r.next().to_string()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<String, usize> = HashMap::new();
        for h in handles {
            for s in h.join().unwrap() {
                *counts.entry(s).or_default() += 1;
            }
        }

        // No lost increments: 8000 picks over 4 sessions is exactly 2000 each
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 2000));
    }
}
