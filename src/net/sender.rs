//! Outbound packet queue and sender worker.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Ceiling on the bytes queued toward one peer.
pub const MAX_QUEUE_BYTES: usize = 10 * 1024 * 1024;

/// How long the sender waits after a zero-byte write before retrying.
pub const SEND_RETRY_WAIT: Duration = Duration::from_millis(1000);

#[derive(Default)]
struct OutboxState {
    packets: VecDeque<Vec<u8>>,
    queued_bytes: usize,
    stopped: bool,
}

/// Byte-bounded FIFO between message producers and the sender worker.
#[derive(Default)]
pub struct Outbox {
    state: Mutex<OutboxState>,
    cond: Condvar,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a packet, blocking while the queue is over its byte bound.
    /// Returns false when the outbox was stopped and nothing was enqueued.
    pub fn post(&self, packet: Vec<u8>) -> bool {
        if packet.is_empty() {
            return true;
        }

        let mut state = self.state.lock().expect("outbox lock poisoned");
        while state.queued_bytes + packet.len() > MAX_QUEUE_BYTES && !state.stopped {
            state = self.cond.wait(state).expect("outbox lock poisoned");
        }
        if state.stopped {
            return false;
        }

        state.queued_bytes += packet.len();
        state.packets.push_back(packet);
        self.cond.notify_all();
        true
    }

    /// Blocks until a packet is available or the outbox stops.
    pub(crate) fn next_packet(&self) -> Option<Vec<u8>> {
        let mut state = self.state.lock().expect("outbox lock poisoned");
        while state.packets.is_empty() && !state.stopped {
            state = self.cond.wait(state).expect("outbox lock poisoned");
        }
        if state.stopped {
            return None;
        }

        let packet = state.packets.pop_front()?;
        state.queued_bytes -= packet.len();
        self.cond.notify_all();
        Some(packet)
    }

    pub fn queued_bytes(&self) -> usize {
        self.state.lock().expect("outbox lock poisoned").queued_bytes
    }

    pub fn is_stopped(&self) -> bool {
        self.state.lock().expect("outbox lock poisoned").stopped
    }

    /// Unblocks producers and the worker; packets already queued are
    /// abandoned.
    pub fn request_stop(&self) {
        let mut state = self.state.lock().expect("outbox lock poisoned");
        state.stopped = true;
        self.cond.notify_all();
    }

    /// Waits up to `timeout` for a stop request. Returns the stop state.
    pub(crate) fn wait_stop(&self, timeout: Duration) -> bool {
        let state = self.state.lock().expect("outbox lock poisoned");
        if state.stopped {
            return true;
        }
        let (state, _) = self
            .cond
            .wait_timeout(state, timeout)
            .expect("outbox lock poisoned");
        state.stopped
    }
}

/// Writes one whole packet, looping over short writes. A zero-byte write
/// backs off on the outbox monitor so a stop request can interrupt it.
/// `Ok(false)` means a stop request cut the send short.
pub(crate) fn send_packet<W: Write>(
    stream: &mut W,
    outbox: &Outbox,
    packet: &[u8],
) -> std::io::Result<bool> {
    let mut offset = 0;
    while offset < packet.len() {
        let count = stream.write(&packet[offset..])?;
        if count == 0 {
            if outbox.wait_stop(SEND_RETRY_WAIT) {
                return Ok(false);
            }
            continue;
        }
        offset += count;
    }
    Ok(true)
}

/// Sender loop: pops packets in FIFO order until stopped. Returns false on a
/// stream error, which the caller reports as a closed connection.
pub(crate) fn run_sender<W: Write>(outbox: &Outbox, stream: &mut W, name: &str) -> bool {
    loop {
        let Some(packet) = outbox.next_packet() else {
            return true;
        };
        match send_packet(stream, outbox, &packet) {
            Ok(_) => {}
            Err(err) => {
                if outbox.is_stopped() {
                    return true;
                }
                tracing::error!("{name}: send failed: {err}");
                return false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn packets_keep_fifo_order() {
        let outbox = Outbox::new();
        assert!(outbox.post(vec![1]));
        assert!(outbox.post(vec![2]));
        assert_eq!(outbox.queued_bytes(), 2);

        assert_eq!(outbox.next_packet().unwrap(), vec![1]);
        assert_eq!(outbox.next_packet().unwrap(), vec![2]);
        assert_eq!(outbox.queued_bytes(), 0);
    }

    #[test]
    fn post_blocks_at_the_byte_bound_until_a_dequeue() {
        let outbox = Arc::new(Outbox::new());
        assert!(outbox.post(vec![0u8; MAX_QUEUE_BYTES]));

        let producer = {
            let outbox = Arc::clone(&outbox);
            std::thread::spawn(move || {
                let start = Instant::now();
                assert!(outbox.post(vec![0u8; 1]));
                start.elapsed()
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        outbox.next_packet().unwrap();
        let blocked_for = producer.join().unwrap();
        assert!(blocked_for >= Duration::from_millis(40));
        assert_eq!(outbox.queued_bytes(), 1);
    }

    #[test]
    fn stop_unblocks_a_full_queue_without_enqueueing() {
        let outbox = Arc::new(Outbox::new());
        assert!(outbox.post(vec![0u8; MAX_QUEUE_BYTES]));

        let producer = {
            let outbox = Arc::clone(&outbox);
            std::thread::spawn(move || outbox.post(vec![0u8; 1]))
        };

        std::thread::sleep(Duration::from_millis(50));
        outbox.request_stop();
        assert!(!producer.join().unwrap());
        assert_eq!(outbox.queued_bytes(), MAX_QUEUE_BYTES);
    }

    #[test]
    fn stop_unblocks_an_idle_worker() {
        let outbox = Arc::new(Outbox::new());
        let worker = {
            let outbox = Arc::clone(&outbox);
            std::thread::spawn(move || outbox.next_packet())
        };

        std::thread::sleep(Duration::from_millis(20));
        outbox.request_stop();
        assert!(worker.join().unwrap().is_none());
    }

    #[test]
    fn stop_abandons_queued_packets() {
        let outbox = Outbox::new();
        outbox.post(vec![1, 2]);
        outbox.post(vec![3]);
        outbox.request_stop();

        let mut sink = Vec::new();
        assert!(run_sender(&outbox, &mut sink, "test"));
        assert!(sink.is_empty());
    }
}
