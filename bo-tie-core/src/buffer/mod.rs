//! Buffer Utilities
//!
//! Every HCI packet that passes through the H4 transport lives within a buffer that can grow at
//! both ends. Bytes received from the controller are pushed onto the *back* of a buffer while the
//! packet indicator and re-written ACL headers are pushed onto (or popped off of) the *front*.
//! `buffer` contains the traits for this 'filling' and 'emptying' along with the allocating
//! implementation [`DeVec`](de_vec::DeVec).

use core::fmt::{Debug, Display};

#[cfg(feature = "alloc")]
pub mod de_vec;

/// Try to extend a collection with an iterator
///
/// This is the try equivalent to [`Extend`](core::iter::Extend). Buffers used by the H4 transport
/// are bounded by the size they were allocated with, so extending past that size is an error
/// instead of a reallocation.
pub trait TryExtend<A> {
    type Error: Debug + Display;

    fn try_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = A>;

    fn try_extend_one(&mut self, item: A) -> Result<(), Self::Error> {
        self.try_extend(core::iter::once(item))
    }
}

/// Try to extend the front of a collection with an iterator
pub trait TryFrontExtend<A> {
    type Error: Debug + Display;

    /// Try to extend the collection by the iterator `iter`
    ///
    /// This will extend the front of the iterator by the contents produced by `iter`. The front of
    /// the collection is extended *in order* in which they are pushed to the front. This means that
    /// the items within `iter` are placed in reverse order at the front.
    fn try_front_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = A>;

    /// Reverses `iter` before extending the front of the collection
    ///
    /// The first item in `iter` becomes the first item in the collection.
    fn try_rev_front_extend<T>(&mut self, iter: T) -> Result<(), Self::Error>
    where
        T: IntoIterator<Item = A>,
        T::IntoIter: DoubleEndedIterator,
    {
        let iter = iter.into_iter();

        self.try_front_extend(iter.rev())
    }

    fn try_front_extend_one(&mut self, item: A) -> Result<(), Self::Error> {
        self.try_front_extend(core::iter::once(item))
    }
}

/// Try to remove items from the front of a collection
///
/// In order for a collection to implement this trait it must have a capacity at the front.
/// Removing items from the front must also increase this capacity.
pub trait TryFrontRemove<A> {
    type Error: Debug + Display;
    type FrontRemoveIter<'a>: Iterator<Item = A>
    where
        Self: 'a;

    /// Try to take a number of items from the front of the collection
    ///
    /// # Error
    /// `how_many` must not be larger than the length of the implementation.
    fn try_front_remove(&mut self, how_many: usize) -> Result<Self::FrontRemoveIter<'_>, Self::Error>;

    /// Try to pop the front item
    fn try_front_pop(&mut self) -> Option<A> {
        self.try_front_remove(1).ok()?.next()
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BufferError {
    LengthOfBuffer,
    FrontReserveSize,
    CapacityExceeded,
}

impl Display for BufferError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            BufferError::LengthOfBuffer => f.write_str("buffer is too small"),
            BufferError::FrontReserveSize => f.write_str("front reserve is too small"),
            BufferError::CapacityExceeded => f.write_str("buffer capacity exceeded"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for BufferError {}
