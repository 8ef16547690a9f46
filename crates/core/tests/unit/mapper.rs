//! Address mapper and row-indirection table tests (§4.6).

use dram_core::dram::Level;
use dram_core::mapper::{AddressMapper, LinearMapper, RowIndirectionTable};

use crate::common::{ddr4_device, topology};

#[test]
fn linear_mapper_round_trips_bank_and_row_from_a_raw_address() {
    let device = ddr4_device();
    let mapper = LinearMapper::from_org(&device.spec.org);

    let addr_vec = mapper.apply(0, None);
    assert_eq!(addr_vec.0.len(), device.spec.org.levels.len());
    assert!(addr_vec.0.iter().all(|i| *i == 0));
}

#[test]
fn linear_mapper_is_stable_across_a_double_apply() {
    // Round-trip / idempotence law (§8): re-mapping an already-mapped
    // address vector's originating raw address is stable.
    let device = ddr4_device();
    let mapper = LinearMapper::from_org(&device.spec.org);

    let addr = 0x1234_5678u64;
    let first = mapper.apply(addr, None);
    let second = mapper.apply(addr, None);
    assert_eq!(first.0, second.0);
}

#[test]
fn linear_mapper_distinguishes_addresses_that_differ_in_bank_bits() {
    let device = ddr4_device();
    let mapper = LinearMapper::from_org(&device.spec.org);

    let a = mapper.apply(0, None);
    let b = mapper.apply(1 << 20, None);
    assert_ne!(a.0, b.0);
}

#[test]
fn rit_check_returns_none_until_an_entry_is_inserted() {
    let rit = RowIndirectionTable::new(4, 8);
    assert_eq!(rit.check(0, 17), None);
}

#[test]
fn rit_insert_and_check_round_trip() {
    let mut rit = RowIndirectionTable::new(4, 8);
    rit.insert_entry(0, 17, 900).unwrap();
    assert_eq!(rit.check(0, 17), Some(900));
    assert!(rit.check(0, 18).is_none());
}

#[test]
fn rit_insert_fails_once_bank_capacity_is_reached() {
    let mut rit = RowIndirectionTable::new(1, 2);
    rit.insert_entry(0, 1, 101).unwrap();
    rit.insert_entry(0, 2, 102).unwrap();
    assert!(rit.is_full(0));
    assert!(rit.insert_entry(0, 3, 103).is_err());
}

#[test]
fn rit_locked_entries_are_not_evictable() {
    let mut rit = RowIndirectionTable::new(1, 2);
    rit.insert_entry(0, 1, 101).unwrap();
    rit.lock(0, 1);
    assert_eq!(rit.any_evictable(0), None);
    rit.unlock(0, 1);
    assert_eq!(rit.any_evictable(0), Some(1));
}

#[test]
fn remove_entry_clears_both_the_mapping_and_any_lock() {
    let mut rit = RowIndirectionTable::new(1, 2);
    rit.insert_entry(0, 1, 101).unwrap();
    rit.lock(0, 1);
    rit.remove_entry(0, 1);
    assert_eq!(rit.check(0, 1), None);
    assert!(!rit.is_locked(0, 1));
}

#[test]
fn mapper_consults_the_rit_to_remap_a_row() {
    let device = ddr4_device();
    let mapper = LinearMapper::from_org(&device.spec.org);
    let row_pos = device.spec.org.levels.iter().position(|l| *l == Level::Row).unwrap();

    let unmapped = mapper.apply(0, None);
    let logical_row = unmapped.0[row_pos];

    let mut rit = RowIndirectionTable::new(topology(&device).num_banks, 8);
    // Bank 0 at this address; remap its row to a quarantine-zone row.
    rit.insert_entry(0, logical_row, 9999).unwrap();

    let remapped = mapper.apply(0, Some(&rit));
    assert_eq!(remapped.0[row_pos], 9999);
}
