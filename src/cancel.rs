//! Cancellation of blocked acquisitions

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener = Box<dyn Fn() + Send + Sync>;

/// A cloneable, sticky cancellation signal.
///
/// A blocked `acquire` observing a token returns [`PoolError::Cancelled`](crate::PoolError)
/// as soon as the token is cancelled. Cancellation is never reset, so code further up the
/// call chain can still see it with [`is_cancelled`](Self::is_cancelled).
///
/// # Examples
///
/// ```
/// use bounded_pool::CancelToken;
///
/// let token = CancelToken::new();
/// let child = token.child_token();
///
/// token.cancel();
/// assert!(token.is_cancelled());
/// assert!(child.is_cancelled());
/// ```
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    listeners: Mutex<Listeners>,
    // Keeps a child registered with its parent for as long as the child lives.
    parent: Mutex<Option<Registration>>,
}

#[derive(Default)]
struct Listeners {
    next_key: u64,
    entries: HashMap<u64, Listener>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel this token and every child token, waking any waiter observing them.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }

        // Listeners run outside the lock; they may take pool locks.
        let listeners = std::mem::take(&mut self.inner.listeners.lock().entries);
        for listener in listeners.into_values() {
            listener();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// A token that is cancelled when this one is, but can also be cancelled on its own.
    pub fn child_token(&self) -> CancelToken {
        let child = CancelToken::new();
        let weak: Weak<Inner> = Arc::downgrade(&child.inner);

        match self.register(move || {
            if let Some(inner) = weak.upgrade() {
                CancelToken { inner }.cancel();
            }
        }) {
            Some(registration) => *child.inner.parent.lock() = Some(registration),
            None => child.cancel(),
        }

        child
    }

    /// A guard that cancels this token when dropped.
    pub fn drop_guard(self) -> CancelOnDrop {
        CancelOnDrop { token: Some(self) }
    }

    /// Run `listener` on cancellation. Returns `None` if the token is already cancelled.
    pub(crate) fn register<F>(&self, listener: F) -> Option<Registration>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut listeners = self.inner.listeners.lock();
        // Checked under the listener lock: `cancel` sets the flag before draining.
        if self.is_cancelled() {
            return None;
        }

        let key = listeners.next_key;
        listeners.next_key += 1;
        listeners.entries.insert(key, Box::new(listener));

        Some(Registration {
            token: Arc::clone(&self.inner),
            key,
        })
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

/// Removes its listener from the token when dropped.
pub(crate) struct Registration {
    token: Arc<Inner>,
    key: u64,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.token.listeners.lock().entries.remove(&self.key);
    }
}

/// Cancels the wrapped token on drop unless disarmed.
#[derive(Debug)]
pub struct CancelOnDrop {
    token: Option<CancelToken>,
}

impl CancelOnDrop {
    /// Keep the token alive without cancelling it.
    pub fn disarm(mut self) -> CancelToken {
        self.token.take().unwrap_or_default()
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}
