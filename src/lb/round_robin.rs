use crate::error::{PolicyError, Result};
use crate::strategy::SelectionStrategy;
use crate::subchannel::Subchannel;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cyclic selection in table order.
///
/// The cursor is shared by every caller and is never reset when the table is
/// replaced, so the position within a new table is `cursor % new_len`.
#[derive(Debug, Default)]
pub struct RoundRobin {
    current: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for RoundRobin {
    fn next_subchannel(&self, subchannels: &[Subchannel]) -> Result<Subchannel> {
        if subchannels.is_empty() {
            return Err(PolicyError::NoAvailableBackends);
        }

        let current = self.current.fetch_add(1, Ordering::SeqCst);
        let index = current % subchannels.len();
        Ok(subchannels[index].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn subchannels() -> Vec<Subchannel> {
        ["http://10.1.5.210:80", "http://10.1.5.212:80", "http://10.1.5.211:80", "http://10.1.5.213:80"]
            .iter()
            .map(|uri| Subchannel::from_uri(uri).unwrap())
            .collect()
    }

    #[test]
    fn cycles_in_table_order() {
        let rr = RoundRobin::new();
        let subchannels = subchannels();

        for i in 0..30 {
            let picked = rr.next_subchannel(&subchannels).unwrap();
            let expected = &subchannels[i % subchannels.len()];
            assert_eq!(picked.host(), expected.host());
            assert_eq!(picked.port(), expected.port());
            assert_eq!(picked.scheme(), expected.scheme());
        }
    }

    #[test]
    fn empty_table_has_no_backends() {
        let rr = RoundRobin::new();
        assert!(matches!(
            rr.next_subchannel(&[]),
            Err(PolicyError::NoAvailableBackends)
        ));
    }

    #[test]
    fn cursor_carries_over_a_replacement() {
        let rr = RoundRobin::new();
        let four = subchannels();
        for _ in 0..5 {
            rr.next_subchannel(&four).unwrap();
        }

        let three = &four[..3];
        // cursor is 5, so the next pick is index 5 % 3
        assert_eq!(rr.next_subchannel(three).unwrap(), three[2]);
        assert_eq!(rr.next_subchannel(three).unwrap(), three[0]);
    }

    #[test]
    fn concurrent_callers_share_one_cursor() {
        let rr = Arc::new(RoundRobin::new());
        let subchannels = Arc::new(subchannels());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let rr = rr.clone();
                let subchannels = subchannels.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .map(|_| rr.next_subchannel(&subchannels).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<Subchannel, usize> = HashMap::new();
        for handle in handles {
            for picked in handle.join().unwrap() {
                *counts.entry(picked).or_default() += 1;
            }
        }
        assert_eq!(counts.len(), 4);
        assert!(counts.values().all(|&c| c == 200));
    }
}
