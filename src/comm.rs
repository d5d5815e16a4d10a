// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Point-to-point links and collective reductions for the halo strategy.
//!
//! Participants run as in-process ranks connected in a chain. Neighboring
//! ranks exchange single cells over dedicated channels, and the steepness
//! reduction is a barrier-synchronized sum every rank observes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier};

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Direction a halo value travels between neighboring ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaloTag {
    /// Toward the lower-ranked neighbor.
    Leftward,
    /// Toward the higher-ranked neighbor.
    Rightward,
}

/// A halo value in flight, tagged with its direction of travel.
#[derive(Debug, Clone, Copy)]
pub struct HaloMsg {
    /// Direction of travel; lets a receiver assert which exchange a value
    /// belongs to.
    pub tag: HaloTag,
    /// The boundary cell value.
    pub value: f64,
}

/// One endpoint of the bidirectional link between two neighboring ranks.
pub struct Link {
    tx: Sender<HaloMsg>,
    rx: Receiver<HaloMsg>,
}

impl Link {
    /// Send one boundary value to the neighbor. Sends never block; the
    /// channels are unbounded so both sides of an exchange can send before
    /// either receives.
    pub fn send(&self, tag: HaloTag, value: f64) {
        let _ = self.tx.send(HaloMsg { tag, value });
    }

    /// Receive the neighbor's boundary value, or `None` if the neighbor is
    /// gone.
    pub fn recv(&self, expect: HaloTag) -> Option<f64> {
        match self.rx.recv() {
            Ok(msg) => {
                debug_assert_eq!(msg.tag, expect);
                Some(msg.value)
            }
            Err(_) => None,
        }
    }
}

/// Build the chain of links for `size` ranks. Element `i` of the result is
/// `(left, right)`: rank 0 has no left link and rank `size - 1` no right
/// link.
pub fn link_chain(size: usize) -> Vec<(Option<Link>, Option<Link>)> {
    let mut chain: Vec<(Option<Link>, Option<Link>)> = (0..size).map(|_| (None, None)).collect();
    for i in 0..size.saturating_sub(1) {
        let (to_right, from_left) = unbounded();
        let (to_left, from_right) = unbounded();
        chain[i].1 = Some(Link {
            tx: to_right,
            rx: from_right,
        });
        chain[i + 1].0 = Some(Link {
            tx: to_left,
            rx: from_left,
        });
    }
    chain
}

/// Add `value` into an f64 accumulator stored as bits in an `AtomicU64`.
pub(crate) fn add_f64(cell: &AtomicU64, value: f64) {
    let mut current = cell.load(Ordering::Relaxed);
    loop {
        let next = f64::from_bits(current) + value;
        match cell.compare_exchange_weak(
            current,
            next.to_bits(),
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

/// A barrier-synchronized sum over all ranks; every caller observes the
/// same total.
///
/// Two accumulator slots alternate between consecutive rounds so a slot is
/// never reset while a fast rank is already contributing to the next
/// collective call.
pub struct AllReduce {
    barrier: Barrier,
    slots: [AtomicU64; 2],
}

impl AllReduce {
    /// A reduction shared by `size` ranks.
    pub fn new(size: usize) -> Arc<Self> {
        Arc::new(AllReduce {
            barrier: Barrier::new(size),
            slots: [AtomicU64::new(0), AtomicU64::new(0)],
        })
    }

    /// Contribute `local` and return the sum over every rank's
    /// contribution. `round` must advance by one on every rank for every
    /// collective call, in the same order on all ranks.
    pub fn sum(&self, round: usize, local: f64) -> f64 {
        let slot = &self.slots[round % 2];
        add_f64(slot, local);
        self.barrier.wait();
        let total = f64::from_bits(slot.load(Ordering::Acquire));
        if self.barrier.wait().is_leader() {
            slot.store(0, Ordering::Release);
        }
        total
    }
}
