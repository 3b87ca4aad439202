//! Collaborators that create and recycle pooled instances

use crate::errors::BoxError;

/// Creates new instances when the pool has spare capacity.
///
/// Any `Fn() -> Result<T, E>` closure is a factory:
///
/// ```
/// use bounded_pool::Factory;
///
/// let factory = || Ok::<_, std::io::Error>(Vec::<u8>::with_capacity(4096));
/// let buffer = factory.create().unwrap();
/// assert_eq!(buffer.capacity(), 4096);
/// ```
pub trait Factory<T>: Send + Sync {
    fn create(&self) -> Result<T, BoxError>;
}

impl<T, E, F> Factory<T> for F
where
    F: Fn() -> Result<T, E> + Send + Sync,
    E: Into<BoxError>,
{
    fn create(&self) -> Result<T, BoxError> {
        self().map_err(Into::into)
    }
}

/// Normalizes an instance coming back to the pool.
///
/// Returning `false` rejects the instance: it is dropped and its capacity slot is freed
/// so a fresh instance can be constructed in its place.
pub trait Resetter<T>: Send + Sync {
    fn reset(&self, instance: &mut T) -> bool;
}

impl<T, F> Resetter<T> for F
where
    F: Fn(&mut T) -> bool + Send + Sync,
{
    fn reset(&self, instance: &mut T) -> bool {
        self(instance)
    }
}

/// Accepts every instance unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl<T> Resetter<T> for AcceptAll {
    fn reset(&self, _instance: &mut T) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_factory_boxes_errors() {
        let factory = || Err::<u32, _>(std::io::Error::other("no handles left"));
        let err = factory.create().unwrap_err();
        assert_eq!(err.to_string(), "no handles left");
    }

    #[test]
    fn test_closure_resetter_normalizes() {
        let resetter = |buf: &mut Vec<u8>| {
            buf.clear();
            buf.capacity() <= 1024
        };

        let mut small = Vec::with_capacity(16);
        small.extend_from_slice(b"stale");
        assert!(resetter.reset(&mut small));
        assert!(small.is_empty());

        let mut large = Vec::with_capacity(4096);
        assert!(!resetter.reset(&mut large));
    }

    #[test]
    fn test_accept_all() {
        let mut value = 7;
        assert!(AcceptAll.reset(&mut value));
        assert_eq!(value, 7);
    }
}
