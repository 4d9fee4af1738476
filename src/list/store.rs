//! Indexable backing store used by every list.

use crate::error::{checked_end, CollectionError, Result};
use std::ops::{Deref, DerefMut};

/// A `Vec`-backed sequence with bounds-checked bulk operations.
///
/// Dereferences to a slice, so element access and in-place edits use the slice
/// API; length-changing edits go through the checked methods below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedStore<T> {
    items: Vec<T>,
}

impl<T> OrderedStore<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn get_checked(&self, index: usize) -> Result<&T> {
        self.items
            .get(index)
            .ok_or_else(|| CollectionError::out_of_range(index, self.items.len()))
    }

    pub fn push(&mut self, value: T) {
        self.items.push(value);
    }

    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        self.check_insert(index)?;
        self.items.insert(index, value);
        Ok(())
    }

    pub fn insert_all(&mut self, index: usize, values: impl IntoIterator<Item = T>) -> Result<()> {
        self.check_insert(index)?;
        self.items.splice(index..index, values);
        Ok(())
    }

    pub fn extend(&mut self, values: impl IntoIterator<Item = T>) {
        self.items.extend(values);
    }

    /// Replace one element, returning the previous one.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or_else(|| CollectionError::out_of_range(index, len))?;
        Ok(std::mem::replace(slot, value))
    }

    /// Replace `values.len()` consecutive elements starting at `index`.
    pub fn set_all(&mut self, index: usize, values: Vec<T>) -> Result<()> {
        self.check_range(index, values.len())?;
        for (slot, value) in self.items[index..].iter_mut().zip(values) {
            *slot = value;
        }
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<T> {
        if index >= self.items.len() {
            return Err(CollectionError::out_of_range(index, self.items.len()));
        }
        Ok(self.items.remove(index))
    }

    /// Remove `count` elements starting at `start` in one pass.
    pub fn remove_range(&mut self, start: usize, count: usize) -> Result<Vec<T>> {
        self.check_range(start, count)?;
        Ok(self.items.drain(start..start + count).collect())
    }

    /// Replace the `count` elements at `start` with `values`, which may differ in length.
    pub fn splice(
        &mut self,
        start: usize,
        count: usize,
        values: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        self.check_range(start, count)?;
        self.items.splice(start..start + count, values);
        Ok(())
    }

    /// Move `count` elements from `source` so that they start at `dest`.
    ///
    /// Performed in place as three reversals over the affected span, split at
    /// the boundary that is not shared with the destination.
    pub fn move_range(&mut self, source: usize, dest: usize, count: usize) -> Result<()> {
        self.check_range(source, count)?;
        self.check_range(dest, count)?;
        if source == dest || count == 0 {
            return Ok(());
        }

        let (low, pivot, high) = if source < dest {
            (source, source + count, dest + count)
        } else {
            (dest, source, source + count)
        };
        self.items[low..pivot].reverse();
        self.items[pivot..high].reverse();
        self.items[low..high].reverse();
        Ok(())
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Take every element out, leaving the store empty.
    pub fn take_all(&mut self) -> Vec<T> {
        std::mem::take(&mut self.items)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    fn check_insert(&self, index: usize) -> Result<()> {
        if index > self.items.len() {
            return Err(CollectionError::out_of_range(index, self.items.len()));
        }
        Ok(())
    }

    fn check_range(&self, start: usize, count: usize) -> Result<()> {
        let end = checked_end(start, count)?;
        if end > self.items.len() {
            return Err(CollectionError::out_of_range(end, self.items.len()));
        }
        Ok(())
    }
}

impl<T> Default for OrderedStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deref for OrderedStore<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.items
    }
}

impl<T> DerefMut for OrderedStore<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.items
    }
}

impl<T> From<Vec<T>> for OrderedStore<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

impl<T> FromIterator<T> for OrderedStore<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
