//! Cancellable per-packet hop timers.
//!
//! Every in-flight hop registers a cancellation handle under its packet id.
//! `cancel` / `cancel_all` wake the waiting hop immediately with
//! [`Error::Cancelled`]; a timer that was cancelled never reports success.
//! A wait that is dropped before it finishes unregisters itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::error::{Error, Result};
use crate::packet::PacketId;

#[derive(Debug, Clone, Default)]
pub struct HopScheduler {
    pending: Arc<Mutex<HashMap<PacketId, oneshot::Sender<()>>>>,
}

impl HopScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<PacketId, oneshot::Sender<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Suspend the hop of `packet` for `duration`, calling `on_tick` every
    /// `tick` while it waits.
    ///
    /// A zero duration still yields to the runtime once and ticks once, so
    /// instant runs stay cooperative and cancellable.
    pub async fn wait<F>(&self, packet: PacketId, duration: Duration, tick: Duration, mut on_tick: F) -> Result<()>
    where
        F: FnMut(),
    {
        let (tx, rx) = oneshot::channel();
        if let Some(stale) = self.pending().insert(packet, tx) {
            let _ = stale.send(());
        }
        let mut registration = Registration {
            scheduler: self,
            packet,
            rx,
        };

        if duration.is_zero() {
            tokio::task::yield_now().await;
            if !matches!(registration.rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)) {
                return Err(Error::Cancelled);
            }
            drop(registration);
            on_tick();
            return Ok(());
        }

        let ticking = !tick.is_zero();
        let period = tick.max(Duration::from_millis(1));
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = time::sleep(duration);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut registration.rx => {
                    tracing::trace!(packet_id = %packet, "hop cancelled");
                    return Err(Error::Cancelled);
                }
                _ = ticker.tick(), if ticking => on_tick(),
                _ = &mut deadline => break,
            }
        }

        Ok(())
    }

    /// Cancel the pending hop of one packet. Returns false if it had none.
    pub fn cancel(&self, packet: PacketId) -> bool {
        match self.pending().remove(&packet) {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    /// Cancel every pending hop. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<_> = self.pending().drain().collect();
        let count = drained.len();
        for (_, tx) in drained {
            let _ = tx.send(());
        }
        if count > 0 {
            tracing::debug!(count, "cancelled pending hops");
        }
        count
    }

    pub fn is_pending(&self, packet: PacketId) -> bool {
        self.pending().contains_key(&packet)
    }

    pub fn pending_count(&self) -> usize {
        self.pending().len()
    }
}

/// One registered hop. Dropping it removes the entry, unless a newer wait
/// for the same packet has replaced it.
struct Registration<'a> {
    scheduler: &'a HopScheduler,
    packet: PacketId,
    rx: oneshot::Receiver<()>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.rx.close();
        let mut pending = self.scheduler.pending();
        if pending.get(&self.packet).is_some_and(oneshot::Sender::is_closed) {
            pending.remove(&self.packet);
        }
    }
}
