//! Trace frontend parser tests (§6 "Trace format").

use dram_core::frontend::{Frontend, LoadStoreTraceFrontend, O3CoreTraceFrontend, RawRequest, ReadWriteTraceFrontend};

use crate::common::write_trace;

#[test]
fn read_write_trace_parses_resolved_addr_vecs() {
    let file = write_trace(&["R 0,0,0,5,0", "W 0,1,0,6,0"]);
    let mut frontend = ReadWriteTraceFrontend::open(file.path()).unwrap();

    let first = frontend.next_request().unwrap();
    match first {
        RawRequest::Resolved { is_read, addr_vec } => {
            assert!(is_read);
            assert_eq!(addr_vec.0, vec![0, 0, 0, 5, 0]);
        }
        RawRequest::Linear { .. } => panic!("expected a resolved request"),
    }

    let second = frontend.next_request().unwrap();
    assert!(matches!(second, RawRequest::Resolved { is_read: false, .. }));

    assert!(frontend.next_request().is_none());
    assert!(frontend.is_exhausted());
}

#[test]
fn read_write_trace_skips_blank_and_malformed_lines() {
    let file = write_trace(&["", "garbage line", "R 1,2,3"]);
    let mut frontend = ReadWriteTraceFrontend::open(file.path()).unwrap();

    let req = frontend.next_request().unwrap();
    assert!(matches!(req, RawRequest::Resolved { is_read: true, .. }));
    assert!(frontend.next_request().is_none());
}

#[test]
fn load_store_trace_parses_decimal_and_hex_addresses() {
    let file = write_trace(&["LD 4096", "ST 0x1000"]);
    let mut frontend = LoadStoreTraceFrontend::open(file.path()).unwrap();

    let load = frontend.next_request().unwrap();
    assert!(matches!(load, RawRequest::Linear { is_read: true, addr: 4096 }));

    let store = frontend.next_request().unwrap();
    assert!(matches!(store, RawRequest::Linear { is_read: false, addr: 0x1000 }));

    assert!(frontend.next_request().is_none());
    assert!(frontend.is_exhausted());
}

#[test]
fn load_store_trace_ignores_a_trailing_payload_size() {
    let file = write_trace(&["LD 64 8"]);
    let mut frontend = LoadStoreTraceFrontend::open(file.path()).unwrap();

    let req = frontend.next_request().unwrap();
    assert!(matches!(req, RawRequest::Linear { is_read: true, addr: 64 }));
}

#[test]
fn o3_core_trace_paces_a_load_behind_its_bubble_count() {
    let file = write_trace(&["3 128"]);
    let mut frontend = O3CoreTraceFrontend::open(file.path()).unwrap();

    // Three bubble ticks produce nothing, then the load is admitted.
    assert!(frontend.next_request().is_none());
    assert!(frontend.next_request().is_none());
    assert!(frontend.next_request().is_none());
    let req = frontend.next_request().unwrap();
    assert!(matches!(req, RawRequest::Linear { is_read: true, addr: 128 }));
}

#[test]
fn o3_core_trace_admits_a_co_issued_store_after_its_load() {
    let file = write_trace(&["0 128 256"]);
    let mut frontend = O3CoreTraceFrontend::open(file.path()).unwrap();

    let load = frontend.next_request().unwrap();
    assert!(matches!(load, RawRequest::Linear { is_read: true, addr: 128 }));
    let store = frontend.next_request().unwrap();
    assert!(matches!(store, RawRequest::Linear { is_read: false, addr: 256 }));
    assert!(frontend.next_request().is_none());
    assert!(frontend.is_exhausted());
}

#[test]
fn o3_core_trace_handles_consecutive_lines_with_no_bubbles() {
    let file = write_trace(&["0 1", "0 2", "0 3"]);
    let mut frontend = O3CoreTraceFrontend::open(file.path()).unwrap();

    for expected in [1u64, 2, 3] {
        let req = frontend.next_request().unwrap();
        assert!(matches!(req, RawRequest::Linear { is_read: true, addr } if addr == expected));
    }
    assert!(frontend.next_request().is_none());
}

#[test]
fn opening_a_missing_trace_file_is_a_configuration_error() {
    let result = ReadWriteTraceFrontend::open(std::path::Path::new("/no/such/trace/file.trace"));
    assert!(result.is_err());
}
