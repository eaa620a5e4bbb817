use crate::subchannel::Subchannel;
use arc_swap::ArcSwap;
use std::sync::Arc;
use tokio::sync::watch;

/// Current backend set, replaced wholesale on every server list.
///
/// Readers load an `Arc` snapshot without locking; a snapshot never mixes entries
/// from two different replacements.
pub struct SubchannelTable {
    current: ArcSwap<Vec<Subchannel>>,
    generation: watch::Sender<u64>,
}

impl SubchannelTable {
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            current: ArcSwap::from_pointee(Vec::new()),
            generation,
        }
    }

    pub fn replace(&self, subchannels: Vec<Subchannel>) {
        self.current.store(Arc::new(subchannels));
        self.generation.send_modify(|g| *g += 1);
    }

    pub fn snapshot(&self) -> Arc<Vec<Subchannel>> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of replacements so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that is notified after each replacement.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }
}

impl Default for SubchannelTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_of(n: u16, port: u16) -> Vec<Subchannel> {
        (0..n)
            .map(|i| Subchannel::new("http", format!("10.0.0.{i}"), port))
            .collect()
    }

    #[test]
    fn starts_empty() {
        let table = SubchannelTable::new();
        assert!(table.is_empty());
        assert_eq!(table.generation(), 0);
    }

    #[test]
    fn replace_swaps_the_whole_table() {
        let table = SubchannelTable::new();
        table.replace(table_of(3, 80));
        let before = table.snapshot();

        table.replace(table_of(2, 81));

        assert_eq!(before.len(), 3);
        assert!(before.iter().all(|s| s.port() == 80));
        assert_eq!(table.snapshot().as_slice(), table_of(2, 81).as_slice());
        assert_eq!(table.generation(), 2);
    }

    #[test]
    fn concurrent_readers_never_see_mixed_tables() {
        let table = Arc::new(SubchannelTable::new());
        table.replace(table_of(4, 1));

        let writer = {
            let table = table.clone();
            std::thread::spawn(move || {
                for port in 2..500u16 {
                    table.replace(table_of(4 + port % 3, port));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let table = table.clone();
                std::thread::spawn(move || {
                    for _ in 0..2_000 {
                        let snapshot = table.snapshot();
                        let port = snapshot[0].port();
                        assert!(snapshot.iter().all(|s| s.port() == port));
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
