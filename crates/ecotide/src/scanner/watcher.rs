use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Structural change reported by the watched surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutationRecord {
    pub added_nodes: usize,
}

impl MutationRecord {
    /// Only mutations that add nodes can introduce new products.
    pub fn is_structural(&self) -> bool {
        self.added_nodes > 0
    }
}

/// Signal that a debounced rescan is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanTrigger;

/// Coalesces bursts of mutations into single rescan triggers. Every
/// structural mutation re-arms a `delay` timer; one trigger is emitted when
/// the timer elapses. A pending burst is still flushed when the mutation
/// channel closes.
pub fn debounce(
    mut mutations: mpsc::Receiver<MutationRecord>,
    delay: Duration,
) -> mpsc::Receiver<RescanTrigger> {
    let (triggers, receiver) = mpsc::channel(1);

    tokio::spawn(async move {
        loop {
            let armed = loop {
                match mutations.recv().await {
                    Some(record) if record.is_structural() => break true,
                    Some(_) => continue,
                    None => break false,
                }
            };
            if !armed {
                return;
            }

            let deadline = sleep(delay);
            tokio::pin!(deadline);
            let mut closed = false;
            let mut coalesced = 1usize;

            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    next = mutations.recv() => match next {
                        Some(record) if record.is_structural() => {
                            coalesced += 1;
                            deadline.as_mut().reset(Instant::now() + delay);
                        }
                        Some(_) => {}
                        None => {
                            closed = true;
                            break;
                        }
                    },
                }
            }

            if closed {
                deadline.as_mut().await;
            }

            debug!(coalesced, "rescan due");
            match triggers.try_send(RescanTrigger) {
                // A trigger is already queued; that rescan will see this burst too.
                Ok(()) | Err(TrySendError::Full(_)) => {}
                Err(TrySendError::Closed(_)) => return,
            }

            if closed {
                return;
            }
        }
    });

    receiver
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn burst_of_mutations_yields_one_trigger() {
        let (tx, rx) = mpsc::channel(16);
        let mut triggers = debounce(rx, DELAY);

        for _ in 0..5 {
            tx.send(MutationRecord { added_nodes: 2 }).await.expect("send");
            tokio::time::advance(Duration::from_millis(100)).await;
        }

        assert!(triggers.try_recv().is_err(), "timer re-armed by each mutation");
        tokio::time::advance(DELAY).await;
        assert_eq!(triggers.recv().await, Some(RescanTrigger));

        drop(tx);
        assert_eq!(triggers.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn non_structural_mutations_are_ignored() {
        let (tx, rx) = mpsc::channel(16);
        let mut triggers = debounce(rx, DELAY);

        tx.send(MutationRecord { added_nodes: 0 }).await.expect("send");
        tokio::time::advance(DELAY * 2).await;
        drop(tx);

        assert_eq!(triggers.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_burst_flushes_when_channel_closes() {
        let (tx, rx) = mpsc::channel(16);
        let mut triggers = debounce(rx, DELAY);

        tx.send(MutationRecord { added_nodes: 1 }).await.expect("send");
        drop(tx);

        assert_eq!(triggers.recv().await, Some(RescanTrigger));
        assert_eq!(triggers.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn separated_bursts_trigger_separately() {
        let (tx, rx) = mpsc::channel(16);
        let mut triggers = debounce(rx, DELAY);

        tx.send(MutationRecord { added_nodes: 1 }).await.expect("send");
        assert_eq!(triggers.recv().await, Some(RescanTrigger));

        tx.send(MutationRecord { added_nodes: 3 }).await.expect("send");
        assert_eq!(triggers.recv().await, Some(RescanTrigger));
    }
}
