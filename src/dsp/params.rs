//! Atomic parameter snapshots.
//!
//! Two cadences share every effect's parameters: the poll thread writes at
//! control-surface rate, the signal path reads per sample. [`ParamCell`]
//! keeps that safe without locks the audio path could stall on: writers
//! publish a complete value, readers load a complete value, and a reader can
//! never observe a half-updated multi-field set.

use crossbeam::atomic::AtomicCell;

/// Single-writer snapshot cell for a `Copy` parameter set.
///
/// The poll loop is the only writer; `update` is therefore a plain
/// read-modify-write without a compare loop. Readers call [`load`] once per
/// transform and work off the returned snapshot.
///
/// [`load`]: ParamCell::load
#[derive(Debug)]
pub struct ParamCell<T: Copy> {
    cell: AtomicCell<T>,
}

impl<T: Copy + Send> ParamCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            cell: AtomicCell::new(value),
        }
    }

    /// A complete, consistent snapshot of the current parameters.
    pub fn load(&self) -> T {
        self.cell.load()
    }

    /// Publish a complete new parameter set.
    pub fn store(&self, value: T) {
        self.cell.store(value);
    }

    /// Read-modify-write from the single writer (the poll thread).
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(T) -> T,
    {
        self.cell.store(f(self.cell.load()));
    }
}

impl<T: Copy + Send + Default> Default for ParamCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
