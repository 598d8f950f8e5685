//! Bookkeeping of live matrix storage.
//!
//! Every [`DenseMatrix`][super::DenseMatrix], [`SparseMatrix`][super::SparseMatrix]
//! and [`Triplet`][super::Triplet] registers its storage here when created.
//! Storage is freed when the owning object is dropped,
//! and can also be released in bulk at a checkpoint,
//! either with [`delete_except`] or with a scoped [`Checkpoint`].
//! Using an object whose storage was released
//! fails with [`Error::Released`][crate::Error::Released].
//!
//! The registry is thread-local, matching the single-threaded execution model.
//!
//! ```
//! use ddg::linear_algebra::{registry::{self, Checkpoint}, DenseMatrix};
//!
//! let kept = DenseMatrix::<f64>::identity(3, 3);
//! let result = {
//!     let mut checkpoint = Checkpoint::new();
//!     let scratch = DenseMatrix::<f64>::ones(3, 3);
//!     let result = kept.plus(&scratch).unwrap();
//!     checkpoint.retain(&result);
//!     result
//!     // `scratch` is released here along with anything else
//!     // allocated since the checkpoint opened
//! };
//! assert_eq!(result.get(0, 0).unwrap(), 2.0);
//! assert!(kept.get(0, 0).is_ok());
//! # registry::delete_except(&[]);
//! ```

use std::{
    cell::{Cell, RefCell},
    collections::HashSet,
    rc::{Rc, Weak},
};

use crate::error::{Error, Result};

/// Implemented by every object whose storage the registry tracks.
pub trait Tracked {
    /// The registry id of this object's storage.
    fn registry_id(&self) -> u64;

    /// Whether the storage has been released by the registry.
    fn is_released(&self) -> bool;
}

/// Type-erased handle used by the registry to free storage.
trait Release {
    fn release(&self) -> bool;
}

impl<T> Release for RefCell<Option<T>> {
    /// Drop the stored value, returning whether there was one.
    fn release(&self) -> bool {
        self.borrow_mut().take().is_some()
    }
}

struct Entry {
    id: u64,
    storage: Weak<dyn Release>,
}

#[derive(Default)]
struct Registry {
    entries: Vec<Entry>,
}

impl Registry {
    /// Release every live entry that `keep` rejects
    /// and forget it along with any dead entry.
    /// Returns the number of releases.
    fn release_where(&mut self, mut keep: impl FnMut(u64) -> bool) -> usize {
        let mut released = 0;
        self.entries.retain(|entry| {
            let Some(storage) = entry.storage.upgrade() else {
                return false;
            };
            if keep(entry.id) {
                return true;
            }
            if storage.release() {
                released += 1;
            }
            false
        });
        released
    }

    fn prune(&mut self) {
        self.entries.retain(|entry| entry.storage.strong_count() > 0);
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
    static NEXT_ID: Cell<u64> = Cell::new(0);
}

/// Storage of a single tracked object.
///
/// The value lives behind a shared cell
/// so the registry can release it without owning it.
pub(crate) struct Slot<T> {
    id: u64,
    cell: Rc<RefCell<Option<T>>>,
}

impl<T: 'static> Slot<T> {
    /// Store a value and register it.
    pub fn new(value: T) -> Self {
        let id = NEXT_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        let cell = Rc::new(RefCell::new(Some(value)));
        let storage: Rc<dyn Release> = cell.clone();
        REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            // dropped objects leave dead entries behind;
            // clear them out before they pile up
            if registry.entries.len() >= 64 && registry.entries.len().is_power_of_two() {
                registry.prune();
            }
            registry.entries.push(Entry {
                id,
                storage: Rc::downgrade(&storage),
            });
        });
        Self { id, cell }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.cell.borrow().is_none()
    }

    /// Run a function on the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        match &*self.cell.borrow() {
            Some(value) => Ok(f(value)),
            None => Err(Error::Released { id: self.id }),
        }
    }

    /// Run a function on the stored value mutably.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        match &mut *self.cell.borrow_mut() {
            Some(value) => Ok(f(value)),
            None => Err(Error::Released { id: self.id }),
        }
    }
}

/// Release the storage of every tracked object except the ones in `retain`.
///
/// Afterwards the registry tracks exactly the retained objects.
/// Returns the number of objects released.
pub fn delete_except(retain: &[&dyn Tracked]) -> usize {
    let keep: HashSet<u64> = retain.iter().map(|obj| obj.registry_id()).collect();
    let (released, retained) = REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let released = registry.release_where(|id| keep.contains(&id));
        (released, registry.entries.len())
    });
    if retained < keep.len() {
        tracing::warn!(
            requested = keep.len(),
            retained,
            "some objects to retain were not tracked by the registry"
        );
    }
    tracing::debug!(released, retained, "released tracked matrix storage");
    released
}

/// Number of live objects tracked by the registry.
pub fn tracked_count() -> usize {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        registry.prune();
        registry.entries.len()
    })
}

/// A scope whose allocations are released when it ends.
///
/// Everything allocated between [`Checkpoint::new`] and
/// [`release`][Checkpoint::release] (or the checkpoint being dropped)
/// is released, except objects passed to [`retain`][Checkpoint::retain].
/// Objects allocated before the checkpoint opened are never touched.
#[derive(Debug)]
pub struct Checkpoint {
    first_id: u64,
    retained: HashSet<u64>,
    done: bool,
}

impl Checkpoint {
    /// Open a checkpoint.
    #[must_use = "the checkpoint releases its allocations when dropped"]
    pub fn new() -> Self {
        Self {
            first_id: NEXT_ID.with(Cell::get),
            retained: HashSet::new(),
            done: false,
        }
    }

    /// Keep an object alive past the end of this checkpoint.
    pub fn retain(&mut self, obj: &dyn Tracked) -> &mut Self {
        self.retained.insert(obj.registry_id());
        self
    }

    /// Release everything allocated since the checkpoint opened,
    /// except retained objects. Returns the number of objects released.
    pub fn release(mut self) -> usize {
        self.release_impl()
    }

    fn release_impl(&mut self) -> usize {
        if self.done {
            return 0;
        }
        self.done = true;
        let first_id = self.first_id;
        let released = REGISTRY.with(|registry| {
            registry
                .borrow_mut()
                .release_where(|id| id < first_id || self.retained.contains(&id))
        });
        tracing::debug!(
            released,
            retained = self.retained.len(),
            "checkpoint released matrix storage"
        );
        released
    }
}

impl Default for Checkpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Checkpoint {
    fn drop(&mut self) {
        self.release_impl();
    }
}
