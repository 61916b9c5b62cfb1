//! Host capabilities the engine runs against: wall clock, randomness, and
//! the key-value store that holds the save blob.
//!
//! Browser builds get `SystemClock` (Date.now), `RngSource` seeded from
//! the crypto API, and `LocalStorage`. Tests and the simulator swap in
//! `ManualClock`, seeded or scripted randomness, and `MemoryStore`.

#[cfg(test)]
use std::cell::Cell;
use std::collections::HashMap;
#[cfg(test)]
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::SmallRng;
#[cfg(test)]
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Wall-clock milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Uniform samples in `[0, 1)`.
pub trait Random {
    fn next_f64(&mut self) -> f64;

    /// Uniform sample in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum StoreError {
    #[error("storage is not available")]
    Unavailable,
    #[error("storage failure: {0}")]
    Io(String),
}

/// String key-value storage for the save blob.
pub trait PersistentStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Date.now() in the browser, SystemTime elsewhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[cfg(target_arch = "wasm32")]
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn now_ms(&self) -> f64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0.0, |d| d.as_secs_f64() * 1_000.0)
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Any `rand` generator as a `Random` source.
#[derive(Clone, Debug)]
pub struct RngSource<R> {
    rng: R,
}

impl RngSource<SmallRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: SmallRng::from_entropy(),
        }
    }
}

#[cfg(test)]
impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> Random for RngSource<R> {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of samples, then repeats the last one.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct ScriptedRandom {
    samples: VecDeque<f64>,
    last: f64,
}

#[cfg(test)]
impl ScriptedRandom {
    pub fn new(samples: &[f64]) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            last: 0.5,
        }
    }

    /// Queue more samples behind the ones not yet drawn.
    pub fn push(&mut self, samples: &[f64]) {
        self.samples.extend(samples.iter().copied());
    }
}

#[cfg(test)]
impl Random for ScriptedRandom {
    fn next_f64(&mut self) -> f64 {
        if let Some(v) = self.samples.pop_front() {
            self.last = v;
        }
        self.last
    }
}

/// In-memory store. Clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<std::cell::RefCell<HashMap<String, String>>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct read for tests and tooling.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    /// Direct write for tests and tooling.
    pub fn put(&self, key: &str, value: &str) {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Browser localStorage.
#[cfg(target_arch = "wasm32")]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Result<web_sys::Storage, StoreError> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok().flatten())
            .ok_or(StoreError::Unavailable)
    }
}

#[cfg(target_arch = "wasm32")]
impl PersistentStore for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::storage()?
            .get_item(key)
            .map_err(|e| StoreError::Io(format!("{e:?}")))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        Self::storage()?
            .set_item(key, value)
            .map_err(|e| StoreError::Io(format!("{e:?}")))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        Self::storage()?
            .remove_item(key)
            .map_err(|e| StoreError::Io(format!("{e:?}")))
    }
}
