// SPDX-License-Identifier: Apache-2.0

//! End-to-end scenarios, run as separate handles within one process (the
//! library draws no distinction between subscribers in different processes
//! and subscribers in the same one; both just hold independent mappings of
//! the same named shared object).

use kstate::{Error, Permissions, State, Transaction};

#[ctor::ctor]
fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

fn unique(tag: &str) -> String {
    kstate::unique_name(tag)
}

fn read_u32(ptr: *const u8) -> u32 {
    unsafe { *(ptr as *const u32) }
}

fn write_u32(ptr: *mut u8, value: u32) {
    unsafe { *(ptr as *mut u32) = value };
}

#[test]
fn scenario_1_create_write_observe() {
    let mut s1 = State::new();
    s1.subscribe(&unique("scenario1"), Permissions::READ | Permissions::WRITE).unwrap();
    assert!(s1.len() >= 4096);
    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0);

    let mut t = Transaction::new();
    t.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();
    write_u32(t.data_ptr().unwrap(), 0x1234_5678);
    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0);

    assert!(t.commit().is_ok());
    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0x1234_5678);
}

#[test]
fn scenario_2_abort_discards() {
    let mut s1 = State::new();
    s1.subscribe(&unique("scenario2"), Permissions::READ | Permissions::WRITE).unwrap();

    let mut t = Transaction::new();
    t.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();
    write_u32(t.data_ptr().unwrap(), 0x1234_5678);

    assert!(t.abort().is_ok());
    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0);
}

#[test]
fn scenario_3_optimistic_conflict() {
    let mut s1 = State::new();
    s1.subscribe(&unique("scenario3"), Permissions::READ | Permissions::WRITE).unwrap();

    let mut t1 = Transaction::new();
    t1.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();
    let mut t2 = Transaction::new();
    t2.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();

    write_u32(t1.data_ptr().unwrap(), 0x1234_5678);
    assert!(t1.commit().is_ok());

    write_u32(t2.data_ptr().unwrap(), 0x8765_4321);
    let err = t2.commit().unwrap_err();
    assert!(matches!(err, Error::NotPermitted));

    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0x1234_5678);
}

#[test]
fn scenario_4_abort_succeeds_after_conflict() {
    let mut s1 = State::new();
    s1.subscribe(&unique("scenario4"), Permissions::READ | Permissions::WRITE).unwrap();

    let mut t1 = Transaction::new();
    t1.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();
    let mut t2 = Transaction::new();
    t2.start(&s1, Permissions::READ | Permissions::WRITE).unwrap();

    write_u32(t1.data_ptr().unwrap(), 0x1234_5678);
    assert!(t1.commit().is_ok());

    write_u32(t2.data_ptr().unwrap(), 0x8765_4321);
    assert!(t2.abort().is_ok());

    assert_eq!(read_u32(s1.data_ptr().unwrap()), 0x1234_5678);
}

#[test]
fn scenario_5_read_only_commit_forbidden() {
    let mut s1 = State::new();
    s1.subscribe(&unique("scenario5"), Permissions::READ | Permissions::WRITE).unwrap();

    let mut t = Transaction::new();
    t.start(&s1, Permissions::READ).unwrap();
    assert!(matches!(t.commit(), Err(Error::NotPermitted)));
    assert!(t.is_active());
    assert!(t.abort().is_ok());
}

#[test]
fn scenario_6_transaction_survives_state_teardown() {
    let mut s = State::new();
    s.subscribe(&unique("scenario6"), Permissions::READ | Permissions::WRITE).unwrap();

    let mut t = Transaction::new();
    t.start(&s, Permissions::READ | Permissions::WRITE).unwrap();

    drop(s);

    assert!(t.commit().is_ok());
}

#[test]
fn scenario_7_distinct_ids() {
    let mut a = State::new();
    let mut b = State::new();
    a.subscribe(&unique("scenario7a"), Permissions::READ | Permissions::WRITE).unwrap();
    b.subscribe(&unique("scenario7b"), Permissions::READ | Permissions::WRITE).unwrap();

    assert_ne!(a.id(), 0);
    assert_ne!(b.id(), 0);
    assert_ne!(a.id(), b.id());

    let id_a = a.id();
    a.unsubscribe();
    assert_eq!(a.id(), 0);
    assert_ne!(id_a, 0);
}

#[test]
fn boundary_name_lengths() {
    let ok_name = "a".repeat(kstate::MAX_NAME_LEN);
    let mut s = State::new();
    assert!(s.subscribe(&ok_name, Permissions::READ | Permissions::WRITE).is_ok());
    s.unsubscribe();

    let too_long = "a".repeat(kstate::MAX_NAME_LEN + 1);
    let mut s2 = State::new();
    assert!(matches!(
        s2.subscribe(&too_long, Permissions::READ | Permissions::WRITE),
        Err(Error::InvalidArgument)
    ));
}
