use crate::block::{Block, BlockId};
use crate::transaction::{PeerId, Transaction};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;

/// §4.1 dispatch table. Exhaustive — there is no callback registry and no
/// implicit dispatch beyond this enum's four variants.
#[derive(Debug, Clone)]
pub enum Event {
    TxnGen { txn: Rc<Transaction> },
    TxnRecv { sender: PeerId, receiver: PeerId, txn: Rc<Transaction> },
    BlockMined { blk: Rc<Block> },
    BlockRecv { sender: PeerId, receiver: PeerId, blk: Rc<Block> },
}

impl Event {
    /// The drain phase dispatches only in-flight deliveries; everything
    /// else is discarded once the active phase's time bound is reached.
    pub fn is_in_flight_delivery(&self) -> bool {
        matches!(self, Event::TxnRecv { .. } | Event::BlockRecv { .. })
    }
}

struct QueueEntry {
    fire_time: f64,
    seq: u64,
    event: Event,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    // BinaryHeap is a max-heap; reversing (fire_time, seq) here makes it
    // behave as the min-heap the scheduler needs, with ties broken by
    // insertion order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_time
            .partial_cmp(&self.fire_time)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A min-heap over `(fire_time, insertion_order)`. Simulated time only ever
/// advances by popping.
#[derive(Default)]
pub struct EventQueue {
    heap: BinaryHeap<QueueEntry>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, fire_time: f64, event: Event) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(QueueEntry { fire_time, seq, event });
    }

    pub fn pop_min(&mut self) -> Option<(f64, Event)> {
        self.heap.pop().map(|entry| (entry.fire_time, entry.event))
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::Transaction;

    fn gen_event(id: u64) -> Event {
        Event::TxnGen { txn: Rc::new(Transaction::pending(id, 0, 1)) }
    }

    #[test]
    fn pops_in_fire_time_order() {
        let mut q = EventQueue::new();
        q.enqueue(5.0, gen_event(1));
        q.enqueue(1.0, gen_event(2));
        q.enqueue(3.0, gen_event(3));

        let (t1, _) = q.pop_min().unwrap();
        let (t2, _) = q.pop_min().unwrap();
        let (t3, _) = q.pop_min().unwrap();
        assert_eq!((t1, t2, t3), (1.0, 3.0, 5.0));
    }

    #[test]
    fn ties_break_by_insertion_order() {
        let mut q = EventQueue::new();
        q.enqueue(1.0, gen_event(1));
        q.enqueue(1.0, gen_event(2));
        q.enqueue(1.0, gen_event(3));

        let ids: Vec<u64> = (0..3)
            .map(|_| match q.pop_min().unwrap().1 {
                Event::TxnGen { txn } => txn.id,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn empty_queue_pops_none() {
        let mut q = EventQueue::new();
        assert!(q.pop_min().is_none());
        assert!(q.is_empty());
    }
}
