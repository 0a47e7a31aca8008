//! Waiting queue of logged-in players without an opponent

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::game::peer::PeerHandle;

/// Player waiting for an opponent
#[derive(Debug, Clone)]
pub struct QueuedPlayer {
    pub peer: PeerHandle,
    pub name: String,
    pub queued_at: Instant,
}

impl QueuedPlayer {
    pub fn new(peer: PeerHandle, name: String) -> Self {
        Self {
            peer,
            name,
            queued_at: Instant::now(),
        }
    }

    /// How long this player has been waiting
    pub fn wait_time(&self) -> Duration {
        self.queued_at.elapsed()
    }
}

/// FIFO queue of waiting players
#[derive(Debug, Default)]
pub struct WaitingQueue {
    queue: VecDeque<QueuedPlayer>,
}

impl WaitingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a player to the back of the queue
    pub fn enqueue(&mut self, player: QueuedPlayer) {
        // A connection is queued at most once
        let id = player.peer.id();
        self.queue.retain(|p| p.peer.id() != id);
        self.queue.push_back(player);
    }

    /// Remove a connection from the queue
    pub fn dequeue(&mut self, conn_id: Uuid) -> Option<QueuedPlayer> {
        let pos = self.queue.iter().position(|p| p.peer.id() == conn_id)?;
        self.queue.remove(pos)
    }

    pub fn contains(&self, conn_id: &Uuid) -> bool {
        self.queue.iter().any(|p| &p.peer.id() == conn_id)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop the two longest-waiting live players, if there are two.
    /// Connections already shutting down are dropped first.
    pub fn try_form_pair(&mut self) -> Option<(QueuedPlayer, QueuedPlayer)> {
        self.queue.retain(|p| !p.peer.is_closing());
        if self.queue.len() < 2 {
            return None;
        }
        let first = self.queue.pop_front()?;
        let second = self.queue.pop_front()?;
        Some((first, second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::peer::test_peer;

    fn queued(name: &str) -> QueuedPlayer {
        let (peer, _rx) = test_peer();
        QueuedPlayer::new(peer, name.to_string())
    }

    #[test]
    fn test_pairs_in_arrival_order() {
        let mut queue = WaitingQueue::new();
        queue.enqueue(queued("a"));
        assert!(queue.try_form_pair().is_none());
        assert_eq!(queue.len(), 1);

        queue.enqueue(queued("b"));
        queue.enqueue(queued("c"));
        let (first, second) = queue.try_form_pair().unwrap();
        assert_eq!((first.name.as_str(), second.name.as_str()), ("a", "b"));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_closing_peers_are_pruned() {
        let mut queue = WaitingQueue::new();
        let gone = queued("gone");
        gone.peer.begin_close();
        queue.enqueue(gone);
        queue.enqueue(queued("b"));
        assert!(queue.try_form_pair().is_none());
        assert_eq!(queue.len(), 1);

        queue.enqueue(queued("c"));
        let (first, second) = queue.try_form_pair().unwrap();
        assert_eq!((first.name.as_str(), second.name.as_str()), ("b", "c"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dequeue_and_requeue() {
        let mut queue = WaitingQueue::new();
        let a = queued("a");
        let id = a.peer.id();
        queue.enqueue(a.clone());
        queue.enqueue(a);
        assert_eq!(queue.len(), 1);
        assert!(queue.contains(&id));

        assert!(queue.dequeue(id).is_some());
        assert!(queue.dequeue(id).is_none());
        assert!(!queue.contains(&id));
    }
}
