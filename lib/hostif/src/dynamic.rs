// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

//! Atomically published, reference-counted snapshots.
//!
//! `Dynamic<T>` is the single-writer/multi-reader publication point
//! for state the receive path reads per packet without taking the
//! control-plane lock: the writer builds a complete replacement
//! value, then swaps it in behind one short rwlock acquisition. A
//! reader's `Snapshot` extends the lifetime of the value it loaded,
//! so a superseded snapshot is reclaimed only once the last in-flight
//! reader drops it. This stands in for the RCU assign/`kfree_rcu`
//! pairing the same structure would use in a kernel build.

// TODO: may want to look into porting arc-swap for alloc and core,
//       which should allow us to do better than a rwlock.

use crate::ddi::sync::KRwLock;
use crate::ddi::sync::KRwLockType;
use alloc::sync::Arc;
use core::fmt::Debug;
use core::ops::Deref;
use core::sync::atomic::AtomicU64;
use core::sync::atomic::Ordering;
use core::write;

#[derive(Clone)]
pub struct Dynamic<T>(Arc<InnerDynamic<T>>);

struct InnerDynamic<T> {
    inner: KRwLock<Arc<T>>,
    epoch: AtomicU64,
}

/// One reader's view of the published value. Never cache a snapshot
/// across a scheduling point; re-load per access.
#[derive(Debug)]
pub struct Snapshot<T> {
    pub value: Arc<T>,
    pub epoch: u64,
}

impl<T> From<T> for Dynamic<T> {
    fn from(value: T) -> Self {
        let mut inner = KRwLock::new(value.into());
        inner.init(KRwLockType::Driver);

        Self(InnerDynamic { inner, epoch: AtomicU64::default() }.into())
    }
}

impl<T> Dynamic<T> {
    pub fn store(&self, value: T) {
        let mut inner = self.0.inner.write();
        *inner = value.into();
        _ = self.0.epoch.fetch_add(1, Ordering::Relaxed);
    }

    pub fn load(&self) -> Snapshot<T> {
        let value_locked = self.0.inner.read();
        let value = Arc::clone(&*value_locked);
        let epoch = self.0.epoch.load(Ordering::Relaxed);

        Snapshot { epoch, value }
    }
}

impl<T: Debug> Debug for Dynamic<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let current_val = self.load();
        write!(f, "{current_val:?}")
    }
}

impl<T> Deref for Snapshot<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.value
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snapshot_survives_store() {
        let published: Dynamic<Vec<u32>> = vec![1, 2, 3].into();
        let before = published.load();

        published.store(vec![4, 5, 6, 7]);
        let after = published.load();

        // The old snapshot remains fully valid until dropped.
        assert_eq!(*before.value, vec![1, 2, 3]);
        assert_eq!(*after.value, vec![4, 5, 6, 7]);
        assert!(after.epoch > before.epoch);
    }
}
