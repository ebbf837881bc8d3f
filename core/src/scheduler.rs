use std::collections::VecDeque;

use crate::packet::InFlightPacket;

/// FIFO of waiting packets feeding a capped set of packets in flight.
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub pending: VecDeque<InFlightPacket>,
    pub active: Vec<InFlightPacket>,
    pub max_active: usize,
}

impl Scheduler {
    pub fn new(max_active: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            active: Vec::with_capacity(max_active),
            max_active,
        }
    }

    pub fn enqueue(&mut self, packet: InFlightPacket) {
        self.pending.push_back(packet);
    }

    /// Advances every active packet and removes the ones that finished,
    /// returned in activation order.
    pub fn advance(&mut self, dt: f32, speed_multiplier: f32) -> Vec<InFlightPacket> {
        for packet in &mut self.active {
            packet.advance(dt, speed_multiplier);
        }
        let (done, still_flying): (Vec<_>, Vec<_>) =
            self.active.drain(..).partition(|p| p.completed);
        self.active = still_flying;
        done
    }

    pub fn refill(&mut self) {
        while self.active.len() < self.max_active {
            match self.pending.pop_front() {
                Some(packet) => self.active.push(packet),
                None => break,
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_empty() && self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.active.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InFlightPacket, bool)> {
        self.active
            .iter()
            .map(|p| (p, true))
            .chain(self.pending.iter().map(|p| (p, false)))
    }
}
