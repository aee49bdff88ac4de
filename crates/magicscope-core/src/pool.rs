use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::config::MagicConfig;
use crate::error::{EngineError, MagicError, Result};
use crate::flags::Flags;
use crate::magic::Magic;

/// A fixed set of independent handles for classifying from several threads.
///
/// Each worker checks out its own handle; no handle is ever used by two
/// threads at once.
pub struct MagicPool {
    idle: Mutex<Vec<Magic>>,
    returned: Condvar,
    size: usize,
}

impl MagicPool {
    pub fn open(size: usize, flags: Flags) -> Result<Self> {
        Self::open_with(size, || Magic::open(flags))
    }

    /// Every handle is built by [`MagicConfig::open_magic`].
    pub fn with_config(size: usize, config: &MagicConfig) -> Result<Self> {
        Self::open_with(size, || config.open_magic())
    }

    pub fn open_with<F>(size: usize, mut factory: F) -> Result<Self>
    where
        F: FnMut() -> Result<Magic>,
    {
        if size == 0 {
            return Err(MagicError::Init(EngineError::new(0, "pool size must be at least 1")));
        }
        let handles = (0..size).map(|_| factory()).collect::<Result<Vec<_>>>()?;
        debug!(size, "opened magic pool");
        Ok(Self {
            idle: Mutex::new(handles),
            returned: Condvar::new(),
            size,
        })
    }

    /// Check out a handle, blocking until one is free.
    pub fn get(&self) -> PooledMagic<'_> {
        let mut idle = self.lock();
        loop {
            if let Some(magic) = idle.pop() {
                return PooledMagic::new(self, magic);
            }
            idle = self
                .returned
                .wait(idle)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Check out a handle if one is free right now.
    pub fn try_get(&self) -> Option<PooledMagic<'_>> {
        self.lock().pop().map(|magic| PooledMagic::new(self, magic))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Handles not currently checked out.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Magic>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn put_back(&self, magic: Magic) {
        self.lock().push(magic);
        self.returned.notify_one();
    }
}

/// A handle checked out of a [`MagicPool`]; returned to the pool on drop.
pub struct PooledMagic<'a> {
    pool: &'a MagicPool,
    magic: ManuallyDrop<Magic>,
}

impl<'a> PooledMagic<'a> {
    fn new(pool: &'a MagicPool, magic: Magic) -> Self {
        Self {
            pool,
            magic: ManuallyDrop::new(magic),
        }
    }
}

impl Deref for PooledMagic<'_> {
    type Target = Magic;

    fn deref(&self) -> &Magic {
        &self.magic
    }
}

impl DerefMut for PooledMagic<'_> {
    fn deref_mut(&mut self) -> &mut Magic {
        &mut self.magic
    }
}

impl Drop for PooledMagic<'_> {
    fn drop(&mut self) {
        // SAFETY: `magic` is never touched again after this take.
        let magic = unsafe { ManuallyDrop::take(&mut self.magic) };
        self.pool.put_back(magic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(MagicPool::open(0, Flags::NONE), Err(MagicError::Init(_))));
    }

    #[test]
    fn test_checkout_and_return() {
        let pool = MagicPool::open(2, Flags::MIME_TYPE).unwrap();
        assert_eq!(pool.size(), 2);
        {
            let mut a = pool.get();
            let _b = pool.get();
            assert_eq!(pool.idle(), 0);
            assert!(pool.try_get().is_none());
            assert_eq!(a.buffer(b"text\n").unwrap(), "text/plain");
        }
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_concurrent_workers() {
        let pool = MagicPool::open(3, Flags::MIME_TYPE).unwrap();
        let inputs: Vec<Vec<u8>> = (0..12).map(|i| format!("line {i}\n").into_bytes()).collect();

        let results: Vec<String> = std::thread::scope(|s| {
            let handles: Vec<_> = inputs
                .iter()
                .map(|input| {
                    let pool = &pool;
                    s.spawn(move || pool.get().buffer(input).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(results.len(), 12);
        assert!(results.iter().all(|r| r == "text/plain"));
        assert_eq!(pool.idle(), 3);
    }

    #[test]
    fn test_settings_stay_on_handle() {
        let pool = MagicPool::open(1, Flags::NONE).unwrap();
        pool.get().set_flags(Flags::MIME_TYPE).unwrap();
        assert_eq!(pool.get().flags(), Flags::MIME_TYPE);
    }
}
