//! Fixed-capacity SPSC parameter queue
//!
//! Uses rtrb (real-time ring buffer): atomic head/tail indices with
//! acquire/release ordering, storage allocated once at construction.
//! Producer and consumer are separate, non-`Clone` handles, so the
//! single-producer/single-consumer rule is enforced by ownership.

use rtrb::{Consumer, Producer, RingBuffer};
use sd_core::ParamMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by both ends of one queue
#[derive(Debug)]
pub struct QueueStats {
    capacity: usize,
    dropped: AtomicU64,
}

impl QueueStats {
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages discarded because the queue was full
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Constructor for a producer/consumer pair
pub struct ParamQueue;

impl ParamQueue {
    /// Create a queue holding at most `capacity` pending messages
    pub fn with_capacity(capacity: usize) -> (QueueProducer, QueueConsumer) {
        let (producer, consumer) = RingBuffer::new(capacity);
        let stats = Arc::new(QueueStats {
            capacity,
            dropped: AtomicU64::new(0),
        });

        (
            QueueProducer {
                producer,
                stats: stats.clone(),
            },
            QueueConsumer { consumer, stats },
        )
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRODUCER
// ═══════════════════════════════════════════════════════════════════════════════

/// Write end of a [`ParamQueue`]
pub struct QueueProducer {
    producer: Producer<ParamMessage>,
    stats: Arc<QueueStats>,
}

impl QueueProducer {
    /// Publish one message (non-blocking, real-time safe).
    ///
    /// Returns false and drops the message if the queue is full.
    #[inline]
    pub fn try_enqueue(&mut self, msg: ParamMessage) -> bool {
        match self.producer.push(msg) {
            Ok(()) => true,
            Err(_) => {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Free slots
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.producer.is_full()
    }

    #[inline]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONSUMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Read end of a [`ParamQueue`]
pub struct QueueConsumer {
    consumer: Consumer<ParamMessage>,
    stats: Arc<QueueStats>,
}

impl QueueConsumer {
    /// Remove the oldest pending message, `None` when empty (never blocks)
    #[inline]
    pub fn try_dequeue(&mut self) -> Option<ParamMessage> {
        self.consumer.pop().ok()
    }

    /// Messages waiting to be read
    #[inline]
    pub fn pending(&self) -> usize {
        self.consumer.slots()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.consumer.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}
