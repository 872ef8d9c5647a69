//! Lock-free read-or-initialize reference slot.

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicPtr, Ordering};

/// One-shot atomic reference cell.
///
/// Many threads race to publish a value; the first compare-and-swap wins
/// and every observer, winners and losers alike, converges on that one
/// reference. A read is a single atomic load plus a reference-count
/// bump; nothing ever blocks or spins.
///
/// Emptying the cell requires `&mut self`, so a resident value is only
/// released while no shared read can be in flight.
pub struct RaceCell<T> {
    slot: AtomicPtr<T>,
    /// The slot owns up to one `Arc<T>` through its raw pointer.
    _owns: PhantomData<Arc<T>>,
}

impl<T> RaceCell<T> {
    pub const fn empty() -> Self {
        Self {
            slot: AtomicPtr::new(ptr::null_mut()),
            _owns: PhantomData,
        }
    }

    /// The resident value, if any thread has published one.
    pub fn load(&self) -> Option<Arc<T>> {
        let raw = self.slot.load(Ordering::Acquire);
        if raw.is_null() {
            return None;
        }
        // SAFETY: a non-null slot holds a pointer minted by `publish` via
        // `Arc::into_raw`, and the strong reference the slot owns is only
        // released under exclusive access (`clear`, drop). The count is
        // therefore at least one for the whole of this call.
        unsafe {
            Arc::increment_strong_count(raw);
            Some(Arc::from_raw(raw))
        }
    }

    /// Install `value` if the cell is empty.
    ///
    /// Returns the resident value: `value` itself when this call won the
    /// race, the earlier winner otherwise. A losing `value` is dropped
    /// here.
    pub fn publish(&self, value: Arc<T>) -> Arc<T> {
        let raw = Arc::into_raw(value).cast_mut();
        match self
            .slot
            .compare_exchange(ptr::null_mut(), raw, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                // SAFETY: the slot took ownership of the reference
                // consumed by `into_raw` above; mint a second one for the
                // caller.
                unsafe {
                    Arc::increment_strong_count(raw);
                    Arc::from_raw(raw)
                }
            }
            Err(winner) => {
                // SAFETY: the exchange failed, so the slot never took
                // `raw`; reclaim the reference `into_raw` consumed.
                drop(unsafe { Arc::from_raw(raw) });
                // SAFETY: the exchange only fails against a published
                // non-null pointer, whose slot-owned reference is alive
                // for the same reason as in `load`.
                unsafe {
                    Arc::increment_strong_count(winner);
                    Arc::from_raw(winner)
                }
            }
        }
    }

    /// Drop the resident value, if any, leaving the cell empty.
    pub fn clear(&mut self) {
        let raw = mem::replace(self.slot.get_mut(), ptr::null_mut());
        if !raw.is_null() {
            // SAFETY: the replaced pointer owned one strong reference,
            // and exclusive access means no concurrent `load` is midway
            // through bumping it.
            drop(unsafe { Arc::from_raw(raw) });
        }
    }
}

impl<T> Drop for RaceCell<T> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<T> Default for RaceCell<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for RaceCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let populated = !self.slot.load(Ordering::Acquire).is_null();
        f.debug_struct("RaceCell")
            .field("populated", &populated)
            .finish()
    }
}
