//! Refresh manager tests (§4.4): periodic all-bank injection cadence.

use dram_core::controller::{ReqBuffer, RefreshManager};
use dram_core::dram::Level;

use crate::common::ddr4_device;

fn all_bank_manager(device: &dram_core::dram::Device, nrefi: i64) -> RefreshManager {
    let final_command = device.spec.final_command_for("all-bank-refresh").unwrap();
    let addr_len = device.spec.org.levels.len();
    let rank_pos = device.spec.org.levels.iter().position(|l| *l == Level::Rank).unwrap();
    let num_ranks = device.spec.org.fanout_at(Level::Rank);
    RefreshManager::all_bank(nrefi, num_ranks, final_command, addr_len, rank_pos)
}

#[test]
fn no_refresh_is_injected_before_the_first_interval_elapses() {
    let device = ddr4_device();
    let mut refresh = all_bank_manager(&device, 100);
    let mut priority = ReqBuffer::unbounded();

    for clk in 0..100 {
        refresh.tick(clk, &mut priority).unwrap();
    }
    assert!(priority.requests.is_empty());
}

#[test]
fn one_refresh_per_rank_is_injected_on_the_scheduled_cycle() {
    let device = ddr4_device();
    let num_ranks = device.spec.org.fanout_at(Level::Rank);
    let mut refresh = all_bank_manager(&device, 100);
    let mut priority = ReqBuffer::unbounded();

    for clk in 0..=100 {
        refresh.tick(clk, &mut priority).unwrap();
    }
    assert_eq!(priority.requests.len(), num_ranks);
}

#[test]
fn refresh_cadence_repeats_every_nrefi_cycles() {
    let device = ddr4_device();
    let num_ranks = device.spec.org.fanout_at(Level::Rank);
    let mut refresh = all_bank_manager(&device, 50);
    let mut priority = ReqBuffer::unbounded();

    for clk in 0..=150 {
        refresh.tick(clk, &mut priority).unwrap();
    }
    // Scheduled at 50, 100, 150: three rounds of one refresh per rank.
    assert_eq!(priority.requests.len(), num_ranks * 3);
}

#[test]
fn injected_refreshes_wildcard_every_level_but_rank() {
    let device = ddr4_device();
    let rank_pos = device.spec.org.levels.iter().position(|l| *l == Level::Rank).unwrap();
    let mut refresh = all_bank_manager(&device, 10);
    let mut priority = ReqBuffer::unbounded();

    for clk in 0..=10 {
        refresh.tick(clk, &mut priority).unwrap();
    }
    for (i, req) in priority.requests.iter().enumerate() {
        assert_eq!(req.addr_vec.0[rank_pos], i as i64);
        for (pos, idx) in req.addr_vec.0.iter().enumerate() {
            if pos != rank_pos {
                assert_eq!(*idx, -1);
            }
        }
    }
}
