//! Sparse storage: a sorted map from register index to register value,
//! used once Explicit storage would be wasteful but most registers are
//! still zero.
//!
//! Grounded in the teacher crate's `sparse.rs`, with serialization routed
//! through [`crate::words`] instead of inline bit-twiddling, and
//! `set_if_greater` masking incoming values with the settings'
//! `value_mask` (`(1 << regwidth) - 1`) rather than `m_bits_mask`
//! (`(1 << log2m) - 1`) — the teacher conflates the two, which happens to
//! be harmless only because every caller already passes values capped to
//! `regwidth` bits.

use std::collections::BTreeMap;
use std::collections::btree_map::{Entry, Iter};

use crate::bits::bits_to_bytes_round_up;
use crate::explicit::ExplicitStorage;
use crate::full::FullRegisters;
use crate::settings::Settings;
use crate::words::{calc_position, read_bits, write_bits};
use crate::{Registers, Storage};

#[derive(Clone, Debug, PartialEq)]
pub struct SparseRegisters {
    pub(crate) settings: Settings,
    pub(crate) buf: BTreeMap<u32, u8>,
}

impl SparseRegisters {
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            settings: *settings,
            buf: Default::default(),
        }
    }

    pub fn clone_with_settings(&self, settings: &Settings) -> Self {
        Self {
            settings: *settings,
            buf: self.buf.clone(),
        }
    }

    pub fn is_full(&self) -> bool {
        match self.settings.sparse_threshold {
            Some(threshold) => threshold < self.buf.len() as i32,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn to_full(&self, settings: Option<&Settings>) -> FullRegisters {
        let mut registers = FullRegisters::with_settings(settings.unwrap_or(&self.settings));
        for (reg_num, value) in self.buf.iter() {
            registers.set_reg(*reg_num as u64, *value);
        }

        registers
    }

    pub fn union_sparse(&mut self, other: &Self) {
        for (reg_num, value) in other.buf.iter() {
            self.set_if_greater(*reg_num, *value);
        }
    }

    pub fn union_explicit(&mut self, explicit_storage: &ExplicitStorage) {
        for i in explicit_storage.iter() {
            self.set(i);
        }
    }

    pub fn iter(&self) -> Iter<'_, u32, u8> {
        self.buf.iter()
    }
}

impl Registers for SparseRegisters {
    fn set_if_greater(&mut self, reg_num: u32, value: u8) {
        let value = value & (self.settings.value_mask as u8);

        match self.buf.entry(reg_num) {
            Entry::Vacant(entry) => {
                entry.insert(value);
            }
            Entry::Occupied(mut occupied_entry) => {
                if *occupied_entry.get() < value {
                    occupied_entry.insert(value);
                }
            }
        };
    }

    fn indicator(&self) -> (f64, u32) {
        let mut sum: f64 = 0.0;

        for v in self.buf.values() {
            sum += 1.0 / ((1_u64 << v) as f64)
        }

        let number_of_zeros = (self.settings.m() - self.buf.len() as u64) as u32;
        sum += number_of_zeros as f64;

        (sum, number_of_zeros)
    }

    fn log2m(&self) -> u32 {
        self.settings.log2m
    }

    fn pw_max_mask(&self) -> u64 {
        self.settings.pw_max_mask
    }

    fn m_bits_mask(&self) -> u64 {
        self.settings.m_bits_mask
    }
}

impl Storage for SparseRegisters {
    fn bytes_size(&self) -> usize {
        let bits_per_register = (self.settings.log2m + self.settings.regwidth) as u64;
        bits_to_bytes_round_up(bits_per_register * self.buf.len() as u64) as usize
    }

    fn to_bytes(&self, buf: &mut [u8]) {
        let bits_per_register: u8 = (self.settings.log2m + self.settings.regwidth) as u8;

        for (i, (reg_num, reg)) in self.buf.iter().enumerate() {
            let (idx, pos) = calc_position(i as u64, bits_per_register);
            let word = ((*reg_num as u64) << self.settings.regwidth) | (*reg as u64);
            write_bits(buf, idx, pos, word, bits_per_register);
        }
    }

    fn from_bytes(settings: &Settings, buf: &[u8]) -> Self {
        let bits_per_register = (settings.log2m + settings.regwidth) as u8;
        let mut offset: u64 = 0;
        let max_offset = buf.len() as u64 * u8::BITS as u64;
        let reg_mask: u64 = (1 << settings.regwidth) - 1;

        let mut res = Self::with_settings(settings);
        let mut i = 0u64;
        while offset + bits_per_register as u64 <= max_offset {
            let (idx, pos) = calc_position(i, bits_per_register);
            let value = read_bits(buf, idx, pos, bits_per_register);
            let reg_num = (value >> settings.regwidth) as u32;
            let reg_value = (value & reg_mask) as u8;

            // trailing zero-padding bits can decode as a spurious all-zero
            // word; a zero register is never actually stored in Sparse.
            if reg_value != 0 {
                res.buf.insert(reg_num, reg_value);
            }

            offset += bits_per_register as u64;
            i += 1;
        }

        res
    }

    fn clear(&mut self) {
        self.buf.clear();
    }
}
