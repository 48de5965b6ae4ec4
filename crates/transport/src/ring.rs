//! Bounded lock-free MPSC ring buffer.
//!
//! Dmitry Vyukov's bounded MPMC queue, specialised for a single consumer.
//! Each slot carries an atomic sequence counter: at rest slot `i` holds
//! `sequence == i`; after a producer publishes at position `p` the slot
//! holds `p + 1`; after the consumer reclaims position `p` it holds
//! `p + capacity`. Producers contend on a shared `tail` via CAS; the single
//! consumer owns `head` and needs only relaxed stores on it.
//!
//! Memory ordering: acquire on sequence reads pairs with release on
//! sequence writes, making the payload visible once the sequence has
//! advanced. The `tail` CAS uses acq_rel to linearise producer claims.

use crate::error::TransportError;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pads an atomic counter onto its own cache line so the consumer's `head`
/// and the producers' `tail` never false-share.
#[repr(align(64))]
struct CacheAligned<T>(T);

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

pub struct MpscRing<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    /// Consumer index. Single reader; relaxed stores suffice.
    head: CacheAligned<AtomicUsize>,
    /// Producer index, contended by every producer.
    tail: CacheAligned<AtomicUsize>,
}

// SAFETY: slots hand ownership of `T` across threads through the sequence
// protocol; the payload cell is only touched by the thread that currently
// owns the slot.
unsafe impl<T: Send> Send for MpscRing<T> {}
unsafe impl<T: Send> Sync for MpscRing<T> {}

impl<T> MpscRing<T> {
    /// Create a ring with the given capacity (power of two, at least 2).
    pub fn with_capacity(capacity: usize) -> Result<Self, TransportError> {
        if capacity < 2 || !capacity.is_power_of_two() {
            return Err(TransportError::InvalidCapacity(capacity));
        }
        let buffer: Box<[Slot<T>]> = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();
        Ok(Self {
            buffer,
            mask: capacity - 1,
            head: CacheAligned(AtomicUsize::new(0)),
            tail: CacheAligned(AtomicUsize::new(0)),
        })
    }

    /// Attempt to enqueue from any producer thread. Non-blocking; on a full
    /// ring the value is handed back to the caller.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut pos = self.tail.0.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;

            if diff == 0 {
                // Slot is writable; try to claim it.
                match self.tail.0.compare_exchange_weak(
                    pos,
                    pos.wrapping_add(1),
                    Ordering::AcqRel,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: the CAS gave this thread exclusive
                        // ownership of the slot; no other producer can
                        // claim it until the consumer recycles the
                        // sequence.
                        unsafe { (*slot.value.get()).write(value) };
                        slot.sequence.store(pos.wrapping_add(1), Ordering::Release);
                        return Ok(());
                    }
                    Err(actual) => pos = actual,
                }
            } else if diff < 0 {
                // Consumer has not reclaimed this slot: ring is full.
                return Err(value);
            } else {
                // Another producer claimed the slot but has not published
                // yet; reload the tail and retry.
                pos = self.tail.0.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempt to dequeue. Must only be called from the single consumer
    /// thread.
    pub fn try_pop(&self) -> Option<T> {
        let pos = self.head.0.load(Ordering::Relaxed);
        let slot = &self.buffer[pos & self.mask];
        let seq = slot.sequence.load(Ordering::Acquire);
        let diff = seq as isize - pos.wrapping_add(1) as isize;

        if diff < 0 {
            // Empty, or a producer claimed the slot but has not published.
            return None;
        }

        // SAFETY: `sequence == pos + 1` means a producer published this
        // slot; the single consumer owns the payload until the sequence is
        // recycled below.
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.sequence
            .store(pos.wrapping_add(self.buffer.len()), Ordering::Release);
        self.head.0.store(pos.wrapping_add(1), Ordering::Relaxed);
        Some(value)
    }

    /// Approximate occupancy: `tail - head` with both loads relaxed. May be
    /// transiently off by the number of in-flight claims; fine for
    /// telemetry.
    pub fn len(&self) -> usize {
        let tail = self.tail.0.load(Ordering::Relaxed);
        let head = self.head.0.load(Ordering::Relaxed);
        tail.wrapping_sub(head)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

impl<T> Drop for MpscRing<T> {
    fn drop(&mut self) {
        // Release payloads that were published but never drained.
        while self.try_pop().is_some() {}
    }
}
