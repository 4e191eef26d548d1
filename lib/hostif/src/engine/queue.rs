// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! The MAC/VLAN request queue.
//!
//! Address and VLAN updates are queued here rather than sent inline:
//! the callers run in contexts that must not block on the management
//! channel (address-list callbacks fire with stack locks held), and
//! funneling every update through one FIFO avoids storming the
//! channel during reset. A service worker drains the queue when the
//! mailbox reports ready.
//!
//! The queue lock is held only for list manipulation, never across a
//! transport call: the drain detaches the whole list under the lock
//! and sends from the detached list afterwards.

use super::err;
use super::Mailbox;
use crate::ddi::sync::KMutex;
use alloc::collections::VecDeque;
use core::mem;
use core::sync::atomic::AtomicBool;
use core::sync::atomic::Ordering::SeqCst;
use hostif_api::Glort;
use hostif_api::MacAddr;
use hostif_api::MacRequest;
use hostif_api::MacVlanRequest;
use hostif_api::SyncError;
use hostif_api::VlanRange;
use hostif_api::VlanRequest;

/// Iteration cap for [`MacVlanQueue::wait_idle`]. A drain holds the
/// flag only for the detach-and-send of one batch, so this is
/// generous.
const WAIT_IDLE_SPINS: u32 = 1_000_000;

/// The result of one drain attempt.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DrainStatus {
    /// Queue fully drained.
    Idle,
    /// Mailbox not ready; nothing was sent and the queue still
    /// wants service.
    NotReady,
    /// Another drain is in flight; this attempt did nothing.
    Contended,
    /// Requests arrived during the drain; service is wanted again.
    Again,
}

pub struct MacVlanQueue {
    requests: KMutex<VecDeque<MacVlanRequest>>,
    /// A drain run has been requested and not yet started. Multiple
    /// enqueues before a drain collapse into one scheduled run.
    scheduled: AtomicBool,
    /// A drain run is executing. At most one at a time.
    draining: AtomicBool,
}

impl Default for MacVlanQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MacVlanQueue {
    pub fn new() -> Self {
        Self {
            requests: KMutex::new(VecDeque::new()),
            scheduled: AtomicBool::new(false),
            draining: AtomicBool::new(false),
        }
    }

    /// Queue a MAC table update for `(glort, addr, vid)`.
    ///
    /// Returns whether a drain run was newly scheduled (`false`
    /// means one is already pending). On allocation failure nothing
    /// is queued.
    pub fn queue_mac_request(
        &self,
        glort: Glort,
        addr: MacAddr,
        vid: u16,
        set: bool,
    ) -> Result<bool, SyncError> {
        self.push(MacVlanRequest::Mac(MacRequest { glort, addr, vid, set }))
    }

    /// Queue a VLAN table update covering `range`.
    pub fn queue_vlan_request(
        &self,
        range: VlanRange,
        vsi: u8,
        set: bool,
    ) -> Result<bool, SyncError> {
        self.push(MacVlanRequest::Vlan(VlanRequest { range, vsi, set }))
    }

    fn push(&self, req: MacVlanRequest) -> Result<bool, SyncError> {
        {
            let mut reqs = self.requests.lock();
            reqs.try_reserve(1).map_err(|_| SyncError::ResourceExhausted)?;
            reqs.push_back(req);
        }

        Ok(self.schedule())
    }

    /// Request a drain run. Idempotent between runs.
    pub fn schedule(&self) -> bool {
        !self.scheduled.swap(true, SeqCst)
    }

    /// Does the queue currently want a drain run?
    pub fn wants_service(&self) -> bool {
        self.scheduled.load(SeqCst)
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    /// Cancel all queued MAC requests targeting `glort` and, when
    /// `vlans` is set, all VLAN requests too. Expected to be called
    /// when a logical port goes down, so stale updates cannot race a
    /// recreated port. Has no effect on requests already handed to
    /// the transport.
    pub fn clear_queued(&self, glort: Glort, vlans: bool) {
        self.requests.lock().retain(|req| match req {
            MacVlanRequest::Mac(mac) => mac.glort != glort,
            MacVlanRequest::Vlan(_) => !vlans,
        });
    }

    /// Drain the queue to `mbx`, in FIFO order.
    ///
    /// Only one drain runs at a time. A not-ready mailbox defers the
    /// whole batch rather than discarding it. Send failures are
    /// logged and dropped; the next full resync re-asserts state.
    pub fn drain<M: Mailbox>(&self, mbx: &M) -> DrainStatus {
        if self.draining.swap(true, SeqCst) {
            return DrainStatus::Contended;
        }

        // Consume the scheduling slot before looking at the queue so
        // a request arriving mid-drain re-arms it.
        self.scheduled.store(false, SeqCst);

        // Readiness is checked per attempt, never cached.
        if !mbx.is_ready() {
            self.scheduled.store(true, SeqCst);
            self.draining.store(false, SeqCst);
            return DrainStatus::NotReady;
        }

        let detached = mem::take(&mut *self.requests.lock());

        for req in &detached {
            let status = match req.encode() {
                Ok(payload) => mbx.send(req.kind(), &payload),
                Err(e) => Err(e),
            };

            if let Err(e) = status {
                err!("failed to forward {:?} request: {:?}", req.kind(), e);
            }
        }

        let again = !self.requests.lock().is_empty();

        if again {
            self.scheduled.store(true, SeqCst);
        }

        self.draining.store(false, SeqCst);

        if again { DrainStatus::Again } else { DrainStatus::Idle }
    }

    /// Wait for an in-flight drain to finish. Bounded; returns
    /// whether the queue went quiet. Callers needing quiescence
    /// (device reset) call this before cancelling, rather than
    /// cancelling concurrently with a drain.
    pub fn wait_idle(&self) -> bool {
        for _ in 0..WAIT_IDLE_SPINS {
            if !self.draining.load(SeqCst) {
                return true;
            }

            #[cfg(feature = "std")]
            std::thread::yield_now();
            #[cfg(not(feature = "std"))]
            core::hint::spin_loop();
        }

        false
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hostif_api::RequestKind;
    use std::sync::Mutex;

    /// Records every request forwarded to it, decoded back from the
    /// payload bytes.
    struct TestMailbox {
        ready: AtomicBool,
        sent: Mutex<Vec<MacVlanRequest>>,
    }

    impl TestMailbox {
        fn new(ready: bool) -> Self {
            Self {
                ready: AtomicBool::new(ready),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn sent(&self) -> Vec<MacVlanRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Mailbox for TestMailbox {
        fn is_ready(&self) -> bool {
            self.ready.load(SeqCst)
        }

        fn send(
            &self,
            kind: RequestKind,
            payload: &[u8],
        ) -> Result<(), SyncError> {
            let req = MacVlanRequest::decode(payload)?;
            assert_eq!(req.kind(), kind);
            self.sent.lock().unwrap().push(req);
            Ok(())
        }
    }

    const ADDR: MacAddr =
        MacAddr::from_const([0xA8, 0x40, 0x25, 0x00, 0x00, 0x01]);

    #[test]
    fn fifo_order() {
        let queue = MacVlanQueue::new();
        let mbx = TestMailbox::new(true);

        assert!(queue.queue_mac_request(Glort::new(0x40), ADDR, 10, true).unwrap());
        // Second enqueue collapses into the already-scheduled run.
        assert!(!queue.queue_vlan_request(VlanRange::one(10), 0, true).unwrap());
        assert!(!queue.queue_mac_request(Glort::new(0x41), ADDR, 20, false).unwrap());

        assert_eq!(queue.drain(&mbx), DrainStatus::Idle);
        assert!(!queue.wants_service());

        let sent = mbx.sent();
        assert_eq!(sent.len(), 3);
        assert!(matches!(sent[0], MacVlanRequest::Mac(m) if m.vid == 10));
        assert!(matches!(sent[1], MacVlanRequest::Vlan(_)));
        assert!(matches!(sent[2], MacVlanRequest::Mac(m) if !m.set));
    }

    #[test]
    fn not_ready_defers() {
        let queue = MacVlanQueue::new();
        let mbx = TestMailbox::new(false);

        queue.queue_vlan_request(VlanRange::ALL, 0, true).unwrap();
        assert_eq!(queue.drain(&mbx), DrainStatus::NotReady);

        // Nothing discarded, still scheduled.
        assert_eq!(queue.len(), 1);
        assert!(queue.wants_service());
        assert!(mbx.sent().is_empty());

        // A later attempt with a ready mailbox forwards the backlog.
        mbx.ready.store(true, SeqCst);
        assert_eq!(queue.drain(&mbx), DrainStatus::Idle);
        assert_eq!(mbx.sent().len(), 1);
    }

    #[test]
    fn cancel_by_glort() {
        let queue = MacVlanQueue::new();
        let target = Glort::new(0x40);
        let other = Glort::new(0x41);

        queue.queue_mac_request(target, ADDR, 10, true).unwrap();
        queue.queue_vlan_request(VlanRange::one(10), 0, true).unwrap();
        queue.queue_mac_request(other, ADDR, 10, true).unwrap();
        queue.queue_mac_request(target, ADDR, 20, false).unwrap();

        // MAC entries for the glort go; VLAN entries stay.
        queue.clear_queued(target, false);
        assert_eq!(queue.len(), 2);

        // With vlans set, VLAN entries go too.
        queue.clear_queued(target, true);
        assert_eq!(queue.len(), 1);

        let mbx = TestMailbox::new(true);
        queue.drain(&mbx);
        let sent = mbx.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].glort(), Some(other));
    }

    #[test]
    fn cancel_everything_queued() {
        let queue = MacVlanQueue::new();
        let target = Glort::new(0x40);

        for vid in 1..=64u16 {
            queue.queue_mac_request(target, ADDR, vid, true).unwrap();
            queue.queue_vlan_request(VlanRange::one(vid), 0, true).unwrap();
        }

        queue.clear_queued(target, true);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn wait_idle_when_quiet() {
        let queue = MacVlanQueue::new();
        assert!(queue.wait_idle());
    }

    #[test]
    fn reentrant_enqueue_during_drain() {
        // A request arriving between detach and completion is kept
        // for the next run, never lost.
        struct Reenter<'a> {
            queue: &'a MacVlanQueue,
            inner: TestMailbox,
        }

        impl Mailbox for Reenter<'_> {
            fn is_ready(&self) -> bool {
                true
            }

            fn send(
                &self,
                kind: RequestKind,
                payload: &[u8],
            ) -> Result<(), SyncError> {
                // First send sneaks another request in.
                if self.inner.sent().is_empty() {
                    self.queue
                        .queue_mac_request(Glort::new(0x99), ADDR, 42, true)
                        .unwrap();
                }
                self.inner.send(kind, payload)
            }
        }

        let queue = MacVlanQueue::new();
        queue.queue_mac_request(Glort::new(0x40), ADDR, 1, true).unwrap();

        let mbx = Reenter { queue: &queue, inner: TestMailbox::new(true) };
        assert_eq!(queue.drain(&mbx), DrainStatus::Again);
        assert!(queue.wants_service());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.drain(&mbx), DrainStatus::Idle);
        assert_eq!(mbx.inner.sent().len(), 2);
        assert_eq!(queue.len(), 0);
    }
}
