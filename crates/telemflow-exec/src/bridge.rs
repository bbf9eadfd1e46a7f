//! Stage bridge: turns the multiplexer's pushes into the pull-driven stream a
//! physical operator consumes.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use telemflow_core::prelude::Batch;

/// End-of-input flag shared by a multiplexer and all of its bridges.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Rc<Cell<bool>>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.set(true);
    }

    pub fn is_set(&self) -> bool {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    /// Queue empty, more input may come: yields a stall.
    WaitingForInput,
    /// Queue non-empty: yields the oldest batch.
    HasInput,
    /// Queue empty and input finished: the stream ends.
    Stopped,
}

type Queue = Rc<RefCell<VecDeque<Batch>>>;

/// Push side, kept by the multiplexer.
#[derive(Debug)]
pub struct BridgeFeeder {
    queue: Queue,
}

impl BridgeFeeder {
    pub fn push(&self, batch: Batch) {
        self.queue.borrow_mut().push_back(batch);
    }

    pub fn queued(&self) -> usize {
        self.queue.borrow().len()
    }
}

/// Pull side, handed to the physical operator as its input.
#[derive(Debug)]
pub struct BridgeStream {
    queue: Queue,
    stop: StopFlag,
}

impl BridgeStream {
    pub fn state(&self) -> BridgeState {
        if !self.queue.borrow().is_empty() {
            BridgeState::HasInput
        } else if self.stop.is_set() {
            BridgeState::Stopped
        } else {
            BridgeState::WaitingForInput
        }
    }
}

impl Iterator for BridgeStream {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        match self.state() {
            BridgeState::HasInput => self.queue.borrow_mut().pop_front(),
            BridgeState::WaitingForInput => Some(Batch::Empty),
            BridgeState::Stopped => None,
        }
    }
}

/// Create a connected feeder/stream pair that ends once `stop` is set and
/// the queue is drained.
pub fn bridge(stop: StopFlag) -> (BridgeFeeder, BridgeStream) {
    let queue: Queue = Rc::default();
    (
        BridgeFeeder {
            queue: Rc::clone(&queue),
        },
        BridgeStream { queue, stop },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemflow_core::prelude::Chunk;

    fn bytes(s: &str) -> Batch {
        Batch::Bytes(Chunk::from(s.as_bytes()))
    }

    #[test]
    fn stalls_while_waiting_and_keeps_fifo_order() {
        let stop = StopFlag::new();
        let (feeder, mut stream) = bridge(stop.clone());
        assert_eq!(stream.state(), BridgeState::WaitingForInput);
        assert_eq!(stream.next(), Some(Batch::Empty));
        assert_eq!(stream.next(), Some(Batch::Empty));

        feeder.push(bytes("a"));
        feeder.push(bytes("b"));
        assert_eq!(feeder.queued(), 2);
        assert_eq!(stream.state(), BridgeState::HasInput);
        assert_eq!(stream.next(), Some(bytes("a")));
        assert_eq!(stream.next(), Some(bytes("b")));
        assert_eq!(stream.next(), Some(Batch::Empty));
    }

    #[test]
    fn drains_queue_after_stop_then_ends() {
        let stop = StopFlag::new();
        let (feeder, mut stream) = bridge(stop.clone());
        feeder.push(bytes("late"));
        stop.set();
        assert_eq!(stream.next(), Some(bytes("late")));
        assert_eq!(stream.state(), BridgeState::Stopped);
        assert_eq!(stream.next(), None);
        assert_eq!(stream.next(), None);
    }
}
