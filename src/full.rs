//! Full storage: one register per bucket, the representation every other
//! representation eventually promotes to.
//!
//! Grounded in the teacher crate's `dense.rs` (renamed to match the
//! storage spec's "Full" terminology), rebuilt on top of
//! [`crate::registers::RegisterArray`] instead of its own ad hoc
//! bit-packing, since that packing is now shared with `Sparse::to_full`.

use crate::explicit::ExplicitStorage;
use crate::registers::RegisterArray;
use crate::settings::Settings;
use crate::sparse::SparseRegisters;
use crate::{Registers, Storage};

#[derive(Debug, Clone, PartialEq)]
pub struct FullRegisters {
    pub(crate) settings: Settings,
    registers: RegisterArray,
}

impl FullRegisters {
    pub fn with_settings(settings: &Settings) -> Self {
        Self {
            settings: *settings,
            registers: RegisterArray::new(settings.m(), settings.regwidth as u8),
        }
    }

    pub fn clone_with_settings(&self, settings: &Settings) -> Self {
        Self {
            settings: *settings,
            registers: self.registers.clone(),
        }
    }

    pub fn union_explicit(&mut self, explicit_storage: &ExplicitStorage) {
        for i in explicit_storage.iter() {
            self.set(i);
        }
    }

    pub fn union_sparse(&mut self, sparse_storage: &SparseRegisters) {
        for (reg_num, value) in sparse_storage.iter() {
            self.set_if_greater(*reg_num, *value);
        }
    }

    pub fn union_dense(&mut self, other: &Self) {
        for (reg_num, value) in other.registers.iter() {
            self.set_if_greater(reg_num as u32, value);
        }
    }

    /// Reads a single register. Exposed so two Full estimators with
    /// different settings (e.g. after `clone_with_settings`) can still be
    /// unioned register-by-register.
    pub fn get(&self, reg_num: u64) -> u8 {
        self.registers.get(reg_num)
    }

    pub fn set_reg(&mut self, reg_num: u64, value: u8) {
        self.registers.set(reg_num, value);
    }
}

impl Registers for FullRegisters {
    fn set_if_greater(&mut self, reg_num: u32, value: u8) {
        self.registers.set_max(reg_num as u64, value);
    }

    fn indicator(&self) -> (f64, u32) {
        let mut sum: f64 = 0.0;
        let mut number_of_zeros = 0;

        for (_, value) in self.registers.iter() {
            sum += 1.0 / ((1_u64 << value) as f64);
            if value == 0 {
                number_of_zeros += 1;
            }
        }

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

impl Storage for FullRegisters {
    fn bytes_size(&self) -> usize {
        self.registers.as_bytes().len()
    }

    fn to_bytes(&self, buf: &mut [u8]) {
        let bytes = self.registers.as_bytes();
        assert!(buf.len() >= bytes.len());
        buf[..bytes.len()].copy_from_slice(bytes);
    }

    fn from_bytes(settings: &Settings, buf: &[u8]) -> Self {
        let cap = RegisterArray::new(settings.m(), settings.regwidth as u8)
            .as_bytes()
            .len();
        assert!(cap >= buf.len());

        let mut owned = vec![0u8; cap];
        owned[..buf.len()].copy_from_slice(buf);

        Self {
            settings: *settings,
            registers: RegisterArray::from_raw(owned, settings.m(), settings.regwidth as u8),
        }
    }

    fn clear(&mut self) {
        self.registers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> Settings {
        Settings::new(4, 5, 0, false).unwrap()
    }

    #[test]
    fn set_if_greater_is_monotone() {
        let mut full = FullRegisters::with_settings(&settings());
        full.set_if_greater(3, 10);
        full.set_if_greater(3, 2);
        assert_eq!(full.get(3), 10);
        full.set_if_greater(3, 20);
        assert_eq!(full.get(3), 20);
    }

    #[test]
    fn indicator_counts_zero_registers() {
        let settings = settings();
        let mut full = FullRegisters::with_settings(&settings);
        full.set_if_greater(0, 3);

        let (_, zeros) = full.indicator();
        assert_eq!(zeros, settings.m() as u32 - 1);
    }

    #[test]
    fn to_bytes_round_trips_through_from_bytes() {
        let settings = settings();
        let mut full = FullRegisters::with_settings(&settings);
        full.set_reg(0, 7);
        full.set_reg(5, 12);

        let mut buf = vec![0u8; full.bytes_size()];
        full.to_bytes(&mut buf);

        let restored = FullRegisters::from_bytes(&settings, &buf);
        assert_eq!(restored.get(0), 7);
        assert_eq!(restored.get(5), 12);
    }
}
