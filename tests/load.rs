//! Loading and translation properties over synthetic lumps.

mod common;

use acsvm::opcode::Op;
use acsvm::trace::trace;
use acsvm::translate::translate;
use acsvm::{load_unit, Pcode, ScriptKind, UnitId, WorldContext};
use common::LumpBuilder;
use pretty_assertions::assert_eq;

#[test]
fn empty_lump_loads() {
    let bytes = LumpBuilder::new().build();
    let mut world = WorldContext::new();
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert!(unit.loaded);
    assert!(unit.scripts.is_empty());
    // just the sentinel brackets
    assert_eq!(unit.code, vec![Op::Kill as i32, Op::Kill as i32]);
}

#[test]
fn short_lump_degrades_to_not_loaded() {
    let mut world = WorldContext::new();
    for len in 0..16 {
        let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &vec![0u8; len]).unwrap();
        assert!(!unit.loaded, "{len}-byte lump must not load");
    }
}

#[test]
fn entries_lie_within_code() {
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    b.op(Pcode::PushNumber).word(10).op(Pcode::Delay);
    b.op(Pcode::Terminate);
    b.script(2, 0);
    let back = b.here();
    b.op(Pcode::PushNumber).word(1).op(Pcode::Drop);
    b.op(Pcode::Goto).word(back);
    let bytes = b.build();

    let mut world = WorldContext::new();
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert!(unit.loaded);
    assert_eq!(unit.scripts.len(), 2);
    for s in &unit.scripts {
        assert!((s.entry as usize) < unit.code.len(), "script {}", s.number);
        assert_ne!(s.entry, 0, "script {} resolved to the kill word", s.number);
    }
}

#[test]
fn translated_words_match_trace() {
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    b.op(Pcode::PushNumber).word(3);
    b.op(Pcode::IfGoto).word(0); // patched below
    let patch_at = (b.here() - 4) as usize; // operand of the IfGoto
    b.op(Pcode::Lspec2Direct).word(80).word(1).word(2);
    let join = b.here();
    b.op(Pcode::Terminate);
    let mut bytes = b.build();
    bytes[patch_at..patch_at + 4].copy_from_slice(&join.to_le_bytes());

    let mut world = WorldContext::new();
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert!(unit.loaded);

    let traced = trace(&bytes, false, &[8]);
    assert_eq!(unit.code.len(), traced.words + 2);
}

#[test]
fn translation_is_idempotent() {
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    let top = b.here();
    b.op(Pcode::PushNumber).word(1).op(Pcode::Delay);
    b.op(Pcode::Goto).word(top);
    let bytes = b.build();

    let t = trace(&bytes, false, &[8]);
    let first = translate(&bytes, false, &t).unwrap();
    let second = translate(&bytes, false, &t).unwrap();
    assert_eq!(first.0, second.0);

    let mut w1 = WorldContext::new();
    let mut w2 = WorldContext::new();
    let u1 = load_unit(&mut w1, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    let u2 = load_unit(&mut w2, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert_eq!(u1.code, u2.code);
}

#[test]
fn case_table_relocates_every_target() {
    // sorted table with N cases, each jumping to its own terminate
    const N: usize = 4;
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    b.op(Pcode::PushNumber).word(2);
    b.op(Pcode::CaseGotoSorted).word(N as i32);
    let mut patch_slots = Vec::new();
    for i in 0..N {
        b.word(i as i32 * 2);
        patch_slots.push(b.here() as usize);
        b.word(0);
    }
    b.op(Pcode::Drop);
    b.op(Pcode::Terminate);
    let mut arms = Vec::new();
    for _ in 0..N {
        arms.push(b.here());
        b.op(Pcode::Terminate);
    }
    let mut bytes = b.build();
    for (slot, arm) in patch_slots.iter().zip(&arms) {
        bytes[*slot..*slot + 4].copy_from_slice(&arm.to_le_bytes());
    }

    let t = trace(&bytes, false, &[8]);
    assert_eq!(t.jumps, N);
    let (code, map) = translate(&bytes, false, &t).unwrap();
    // every arm resolved to a nonzero in-bounds word offset
    for arm in &arms {
        let word = map[*arm as usize];
        assert_ne!(word, 0);
        assert!((word as usize) < code.len());
    }
}

#[test]
fn open_scripts_are_normalized() {
    let mut b = LumpBuilder::new();
    b.script(1001, 0);
    b.op(Pcode::Terminate);
    b.script(4, 1);
    b.op(Pcode::Terminate);
    let bytes = b.build();

    let mut world = WorldContext::new();
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert_eq!(unit.scripts[0].number, 1);
    assert_eq!(unit.scripts[0].kind, ScriptKind::Open);
    assert_eq!(unit.scripts[1].number, 4);
    assert_eq!(unit.scripts[1].kind, ScriptKind::Closed);
    assert_eq!(unit.scripts[1].arg_count, 1);
}

#[test]
fn oversized_arg_count_is_clamped() {
    let mut b = LumpBuilder::new();
    b.script(1, 9);
    b.op(Pcode::Terminate);
    let bytes = b.build();
    let mut world = WorldContext::new();
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert_eq!(unit.scripts[0].arg_count, 3);
}

#[test]
fn strings_are_interned_per_unit() {
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    b.op(Pcode::Terminate);
    b.string("FLOOR01");
    b.string("hello");
    let bytes = b.build();

    let mut world = WorldContext::new();
    world.add_string("preexisting".into());
    let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", &bytes).unwrap();
    assert_eq!(unit.string_count, 2);
    assert_eq!(world.string(unit.string_base, 0), Some("FLOOR01"));
    assert_eq!(world.string(unit.string_base, 1), Some("hello"));
}

#[test]
fn truncated_directory_degrades_gracefully() {
    let mut b = LumpBuilder::new();
    b.script(1, 0);
    b.op(Pcode::Terminate);
    let bytes = b.build();
    let mut world = WorldContext::new();
    // chop the directory off mid-record
    let cut = &bytes[..bytes.len() - 6];
    if cut.len() >= 16 {
        let unit = load_unit(&mut world, UnitId(0), "BEHAVIOR", cut).unwrap();
        assert!(!unit.loaded);
    }
}
