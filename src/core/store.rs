//! A heterogeneous key/value store with statically typed handles.
//!
//! Values are kept type-erased behind [`Var`] handles. Every handle is minted
//! by [`Var::fresh`] from a process-wide counter, so a handle can never be
//! confused with another one, even when it is used against a different
//! [`Store`]. That is what makes the downcast in [`Store::get`] an invariant
//! rather than a runtime condition.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

// vars may be used with any store, so ids have to be unique globally
static NEXT_VAR_ID: AtomicU64 = AtomicU64::new(1);

type Slot = Box<dyn Any + Send + Sync>;

/// A typed handle into a [`Store`].
pub struct Var<T> {
    id: u64,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Var<T> {
    /// Allocates a new handle that no other `Var` in the process shares.
    pub fn fresh() -> Self {
        Var {
            id: NEXT_VAR_ID.fetch_add(1, Ordering::Relaxed),
            _marker: PhantomData,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Var<T> {}

impl<T> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var<{}>({})", type_name::<T>(), self.id)
    }
}

/// Shared, internally synchronized key/value store.
///
/// Cloning a `Store` yields another handle to the same storage; parallel
/// branches rely on this to see each other's writes immediately.
#[derive(Clone, Default)]
pub struct Store {
    vars: Arc<RwLock<HashMap<u64, Slot>>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the value bound to `var`, if any.
    ///
    /// # Panics
    /// If the stored value is not a `T`. Handles are unique per type, so this
    /// only happens when a handle has been forged.
    pub fn get<T: Clone + Send + Sync + 'static>(&self, var: Var<T>) -> Option<T> {
        let vars = self.vars.read().unwrap_or_else(PoisonError::into_inner);
        let slot = vars.get(&var.id)?;
        match slot.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => panic!(
                "store type mismatch: {:?} holds a value of another type",
                var
            ),
        }
    }

    /// Binds `value` to `var`, replacing any previous binding.
    pub fn set<T: Send + Sync + 'static>(&self, var: Var<T>, value: T) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(var.id, Box::new(value));
    }

    pub fn contains<T>(&self, var: Var<T>) -> bool {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&var.id)
    }

    /// Unbinds `var`, returning the previous value.
    pub fn remove<T: Send + Sync + 'static>(&self, var: Var<T>) -> Option<T> {
        let slot = self
            .vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&var.id)?;
        match slot.downcast::<T>() {
            Ok(value) => Some(*value),
            Err(_) => panic!(
                "store type mismatch: {:?} holds a value of another type",
                var
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.vars.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A view that can only read.
    pub fn ro(&self) -> StoreRO<'_> {
        StoreRO { store: self }
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Store) -> bool {
        Arc::ptr_eq(&self.vars, &other.vars)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("len", &self.len()).finish()
    }
}

/// Read-only view of a [`Store`], handed to conditions.
#[derive(Clone, Copy, Debug)]
pub struct StoreRO<'a> {
    store: &'a Store,
}

impl StoreRO<'_> {
    pub fn get<T: Clone + Send + Sync + 'static>(&self, var: Var<T>) -> Option<T> {
        self.store.get(var)
    }

    pub fn contains<T>(&self, var: Var<T>) -> bool {
        self.store.contains(var)
    }
}
