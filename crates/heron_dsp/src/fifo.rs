//! Lock-Free Fifo
//!
//! Bounded single-producer/single-consumer queue for handing data between
//! the audio thread, the analyzer thread and the renderer.
//!
//! The queue is split into a [`FifoProducer`] and a [`FifoConsumer`]; owning
//! a half is what makes a thread "the" producer or consumer, so the SPSC
//! contract is enforced by the type system instead of by convention.
//! A push on a full queue fails and leaves the queue untouched; a pull on an
//! empty queue fails and leaves the caller's value untouched. Neither side
//! ever blocks.

use rtrb::{Consumer, Producer, PushError, RingBuffer};

/// Default number of slots in every Fifo of the pipeline
pub const FIFO_CAPACITY: usize = 32;

/// Create a Fifo with room for `capacity` elements
pub fn fifo<T>(capacity: usize) -> (FifoProducer<T>, FifoConsumer<T>) {
    let capacity = capacity.max(1);
    let (producer, consumer) = RingBuffer::<T>::new(capacity);
    (FifoProducer { producer, capacity }, FifoConsumer { consumer })
}

/// Writing half of a Fifo
pub struct FifoProducer<T> {
    producer: Producer<T>,
    capacity: usize,
}

impl<T> FifoProducer<T> {
    /// Push `item`, handing it back if the queue is full
    ///
    /// # Real-time Safety
    /// O(1), never allocates. The rejected item is returned so the caller
    /// decides where it gets dropped.
    #[inline]
    pub fn try_push(&mut self, item: T) -> Result<(), T> {
        self.producer.push(item).map_err(|err| match err {
            PushError::Full(item) => item,
        })
    }

    /// Push `item`; returns false (and drops the item) if the queue is full
    #[inline]
    pub fn push(&mut self, item: T) -> bool {
        self.try_push(item).is_ok()
    }

    /// Free slots right now (a hint under concurrency)
    pub fn num_free(&self) -> usize {
        self.producer.slots()
    }

    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Reading half of a Fifo
pub struct FifoConsumer<T> {
    consumer: Consumer<T>,
}

impl<T> FifoConsumer<T> {
    /// Take the oldest element, if any
    #[inline]
    pub fn pull(&mut self) -> Option<T> {
        self.consumer.pop().ok()
    }

    /// Move the oldest element into `item`; returns false and leaves `item`
    /// untouched when the queue is empty
    #[inline]
    pub fn pull_into(&mut self, item: &mut T) -> bool {
        match self.consumer.pop() {
            Ok(value) => {
                *item = value;
                true
            }
            Err(_) => false,
        }
    }

    /// Elements ready to read
    ///
    /// Advisory only: the producer may push more right after this returns.
    /// Loop on `pull()` until it yields `None` instead of trusting the count.
    pub fn num_available_for_reading(&self) -> usize {
        self.consumer.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    /// Discard everything currently queued
    pub fn clear(&mut self) {
        while self.consumer.pop().is_ok() {}
    }

    /// Pull until empty and keep only the newest element
    pub fn pull_latest(&mut self) -> Option<T> {
        let mut latest = None;
        while let Ok(value) = self.consumer.pop() {
            latest = Some(value);
        }
        latest
    }
}
