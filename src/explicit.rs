//! Explicit storage: an exact set of raw input hashes, used while the
//! cardinality is small enough that storing them outright is cheaper (and
//! more accurate) than maintaining registers.
//!
//! Grounded in the teacher crate's `explicit.rs`; unchanged apart from
//! following the `Full`/`full.rs` rename (see [`crate::full`]).

use std::collections::BTreeSet;

use crate::full::FullRegisters;
use crate::settings::Settings;
use crate::sparse::SparseRegisters;
use crate::{Hll, Storage};

#[derive(Debug, Clone, PartialEq)]
pub struct ExplicitStorage {
    pub(crate) settings: Settings,
    buf: BTreeSet<i64>,
}

impl ExplicitStorage {
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            settings: *settings,
            buf: BTreeSet::new(),
        }
    }

    pub fn clone_with_settings(&self, settings: &Settings) -> Self {
        Self {
            settings: *settings,
            buf: self.buf.clone(),
        }
    }

    /// Replays every stored value into a freshly allocated Sparse or Full
    /// representation, whichever the settings call for.
    pub fn as_registers(&self) -> Hll {
        let mut storage = if self.settings.sparse_enabled() {
            Hll::Sparse(SparseRegisters::with_settings(&self.settings))
        } else {
            Hll::Full(FullRegisters::with_settings(&self.settings))
        };

        for value in self.buf.iter() {
            storage.add_raw(*value as u64);
        }

        storage
    }

    pub fn set(&mut self, value: u64) {
        self.buf.insert(value as i64);
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() as u32 > self.settings.explicit_threshold()
    }

    pub fn union_explicit(&mut self, other: &Self) {
        self.buf.extend(other.buf.iter());
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> {
        self.buf.iter().map(|i| *i as u64)
    }

    pub fn len(&self) -> u64 {
        self.buf.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Storage for ExplicitStorage {
    fn bytes_size(&self) -> usize {
        size_of::<i64>() * self.buf.len()
    }

    fn to_bytes(&self, buf: &mut [u8]) {
        for (i, value) in self.buf.iter().enumerate() {
            let idx = i * size_of::<i64>();
            buf[idx..(idx + size_of::<i64>())].copy_from_slice(&value.to_be_bytes());
        }
    }

    fn from_bytes(settings: &Settings, buf: &[u8]) -> Self {
        let mut res = Self::with_settings(settings);
        let mut idx = 0;

        while idx < buf.len() {
            let s = &buf[idx..(idx + size_of::<i64>())];
            let value = i64::from_be_bytes(s.try_into().unwrap());
            res.buf.insert(value);

            idx += size_of::<i64>();
        }

        res
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}
