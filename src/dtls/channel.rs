use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::error::{Error, Result};

/// InboundQueue is the buffering half of a duplex channel (spec §9): a
/// bounded FIFO of payloads the receive pump has classified and demuxed,
/// paired with a cancellation signal. `recv()` races the FIFO against the
/// signal, exactly as spec §5 requires for every await on a channel.
pub(crate) struct InboundQueue {
    rx: Mutex<mpsc::Receiver<Bytes>>,
    closed_flag: AtomicBool,
    closed: Notify,
}

/// The sending half the pump uses to enqueue a demuxed payload. Kept
/// separate from `InboundQueue` so the pump owns a plain `Sender` and
/// `recv()` callers never see it.
pub(crate) struct InboundQueueSender(mpsc::Sender<Bytes>);

impl InboundQueueSender {
    /// Enqueues a payload. A full queue or a dropped receiver both mean the
    /// session is shutting down; either way this is not an error the pump
    /// needs to propagate (spec §4.2: packet-level issues are dropped, not
    /// fatal).
    pub(crate) fn try_enqueue(&self, payload: Bytes) {
        let _ = self.0.try_send(payload);
    }
}

const CHANNEL_DEPTH: usize = 256;

pub(crate) fn inbound_queue() -> (InboundQueueSender, InboundQueue) {
    let (tx, rx) = mpsc::channel(CHANNEL_DEPTH);
    (
        InboundQueueSender(tx),
        InboundQueue {
            rx: Mutex::new(rx),
            closed_flag: AtomicBool::new(false),
            closed: Notify::new(),
        },
    )
}

impl InboundQueue {
    /// Yields the next buffered inbound payload, or fails with
    /// `ConnectionClosed` once the session has been torn down and no more
    /// payloads remain.
    pub(crate) async fn recv(&self) -> Result<Bytes> {
        if self.closed_flag.load(Ordering::Acquire) {
            return Err(Error::ConnectionClosed);
        }
        let mut rx = self.rx.lock().await;
        tokio::select! {
            biased;
            () = self.closed.notified() => Err(Error::ConnectionClosed),
            v = rx.recv() => v.ok_or(Error::ConnectionClosed),
        }
    }

    /// Marks the queue closed and wakes every waiting `recv()`. Idempotent:
    /// calling this more than once is harmless, matching close's idempotence
    /// requirement (spec §8 property 6).
    pub(crate) fn close(&self) {
        self.closed_flag.store(true, Ordering::Release);
        self.closed.notify_waiters();
    }
}
