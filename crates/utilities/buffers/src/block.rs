//! Contains the [`BlockBuffer`].

use opera_protocol::Block;
use std::{num::NonZeroUsize, sync::Arc};

/// A cyclic buffer of recent blocks keyed by block number.
///
/// The block numbered `k` lives in slot `k mod capacity`. Blocks are expected to be inserted in
/// ascending order; an older block written after a newer one silently takes the newer block's
/// slot.
#[derive(Debug, Clone)]
pub struct BlockBuffer {
    slots: Vec<Option<Arc<Block>>>,
    /// Index of the most recently written slot.
    head: usize,
    /// Number of occupied slots.
    count: usize,
}

impl BlockBuffer {
    /// Creates an empty [`BlockBuffer`] with the given capacity.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { slots: vec![None; capacity.get()], head: 0, count: 0 }
    }

    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of occupied slots.
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no block is buffered.
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn slot(&self, number: u64) -> usize {
        (number % self.slots.len() as u64) as usize
    }

    /// Stores the block in slot `number mod capacity`, replacing any previous occupant, and
    /// moves the head to it.
    pub fn add(&mut self, block: Arc<Block>) {
        let index = self.slot(block.number);
        if self.slots[index].replace(block).is_none() {
            self.count += 1;
        }
        self.head = index;
    }

    /// Returns the block with the given number if it is still buffered.
    ///
    /// A slot holding a different block number is a miss, which makes the buffer safe to use as
    /// a positive cache in front of the upstream node.
    pub fn get(&self, number: u64) -> Option<Arc<Block>> {
        self.slots[self.slot(number)].as_ref().filter(|block| block.number == number).cloned()
    }

    /// Returns the most recently written block.
    pub fn head(&self) -> Option<Arc<Block>> {
        self.slots[self.head].clone()
    }

    /// Returns up to `count` blocks walking backwards from the head, newest first.
    pub fn latest(&self, count: usize) -> Vec<Arc<Block>> {
        let capacity = self.slots.len();
        let steps = count.min(self.count);
        let mut blocks = Vec::with_capacity(steps);
        for step in 0..steps {
            let index = (self.head + capacity - step) % capacity;
            if let Some(block) = &self.slots[index] {
                blocks.push(block.clone());
            }
        }
        blocks
    }
}
