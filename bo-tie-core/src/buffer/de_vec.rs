//! A dynamically allocated double ended vector
//!
//! See the doc for [`DeVec`] for details.

use crate::buffer::{BufferError, TryExtend, TryFrontExtend, TryFrontRemove};
use alloc::vec::Vec;

/// A bounded double ended vector
///
/// This is a vector that is also able to add and remove items from the front. This is not a circle
/// buffer like [`VecDeque`], so it can be de-referenced to a slice. A `DeVec` has a 'reserve' space
/// in both the front and back that is fixed when it is created. Items pushed past the back reserve
/// are rejected instead of causing a reallocation, this is what keeps a misbehaving peer from
/// growing a packet buffer past the size it was allocated for.
///
/// ## Front push
/// A `DeVec` may only push to the front if there is front reserve space. Removing items from the
/// front moves them into the front reserve, so a header that was popped off can always be pushed
/// back on.
///
/// [`VecDeque`]: alloc::collections::VecDeque
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeVec<T> {
    start: usize,
    limit: usize,
    vec: Vec<T>,
}

impl<T> DeVec<T> {
    /// Create a `DeVec` with the specified front and back reserves
    ///
    /// # Note
    /// The total capacity is `front + back`
    pub fn with_capacity(front: usize, back: usize) -> Self
    where
        T: Default + Copy,
    {
        let mut vec = Vec::with_capacity(front + back);

        vec.resize(front, T::default());

        Self {
            start: front,
            limit: front + back,
            vec,
        }
    }

    /// Get the number of items that can still be pushed to the front
    pub fn front_capacity(&self) -> usize {
        self.start
    }

    /// Get the number of items that can still be pushed to the back
    pub fn back_capacity(&self) -> usize {
        self.limit - self.vec.len()
    }

    /// Clear the `DeVec` and reset its reserves
    pub fn clear_with_capacity(&mut self, front: usize, back: usize)
    where
        T: Default + Copy,
    {
        self.vec.clear();

        self.vec.reserve(front + back);

        self.vec.resize(front, T::default());

        self.start = front;

        self.limit = front + back;
    }

    /// Extend the back through a closure that fills a slice
    ///
    /// At most `max` default items are made available to `fill` which returns how many of them it
    /// wrote. The number of items written is returned. This is used for reading directly from a
    /// driver into the buffer.
    ///
    /// # Error
    /// An error is returned if `max` is larger than the back capacity.
    pub fn try_extend_with<F>(&mut self, max: usize, fill: F) -> Result<usize, BufferError>
    where
        T: Default + Copy,
        F: FnOnce(&mut [T]) -> usize,
    {
        if max > self.back_capacity() {
            return Err(BufferError::CapacityExceeded);
        }

        let old_len = self.vec.len();

        self.vec.resize(old_len + max, T::default());

        let filled = fill(&mut self.vec[old_len..]).min(max);

        self.vec.truncate(old_len + filled);

        Ok(filled)
    }
}

impl<T> core::ops::Deref for DeVec<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.vec[self.start..]
    }
}

impl<T> core::ops::DerefMut for DeVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vec[self.start..]
    }
}

impl<A> TryExtend<A> for DeVec<A> {
    type Error = BufferError;

    fn try_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = A>,
    {
        for item in iter {
            if self.vec.len() == self.limit {
                return Err(BufferError::CapacityExceeded);
            }

            self.vec.push(item);
        }

        Ok(())
    }
}

impl<A> TryFrontExtend<A> for DeVec<A> {
    type Error = BufferError;

    fn try_front_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = A>,
    {
        for item in iter {
            self.start
                .checked_sub(1)
                .map(|new_offset| {
                    self.start = new_offset;

                    self.vec[self.start] = item;
                })
                .ok_or(BufferError::FrontReserveSize)?;
        }

        Ok(())
    }
}

impl<A> TryFrontRemove<A> for DeVec<A>
where
    A: Copy,
{
    type Error = BufferError;
    type FrontRemoveIter<'a> = DeVecDrain<'a, A> where A: 'a;

    fn try_front_remove(&mut self, how_many: usize) -> Result<Self::FrontRemoveIter<'_>, Self::Error> {
        if self.len() >= how_many {
            let removed = &self.vec[self.start..(self.start + how_many)];

            self.start += how_many;

            Ok(DeVecDrain { removed, cnt: 0 })
        } else {
            Err(BufferError::LengthOfBuffer)
        }
    }
}

/// Drain iterator for a `DeVec`
pub struct DeVecDrain<'a, T> {
    removed: &'a [T],
    cnt: usize,
}

impl<T> Iterator for DeVecDrain<'_, T>
where
    T: Copy,
{
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.cnt;

        self.cnt += 1;

        self.removed.get(next).copied()
    }
}
