//! Reachability pass over a legacy code region.
//!
//! Walks every control-flow path from the given entry offsets with an
//! explicit work list, marking instruction starts and counting exactly
//! how many internal words and jump slots the translator will emit. The
//! counting sink here and the emitting sink in `translate` both run on
//! [`emit_instr`](crate::opcode::emit_instr), so the two passes cannot
//! disagree on sizes.

use crate::opcode::{decode_at, emit_instr, successors, Decode, Sink};

pub struct TraceResult {
    /// True at each byte offset where a traced instruction starts. The
    /// translator emits exactly these instructions, in offset order.
    pub starts: Vec<bool>,
    /// True at each byte covered by a traced instruction.
    pub touched: Vec<bool>,
    /// Internal body words the translation will occupy, excluding the
    /// kill-sentinel brackets.
    pub words: usize,
    /// Jump-target slots needing relocation.
    pub jumps: usize,
}

struct Counter {
    words: usize,
    jumps: usize,
}

impl Sink for Counter {
    fn word(&mut self, _w: i32) {
        self.words += 1;
    }
    fn target(&mut self, _legacy: i32) {
        self.words += 1;
        self.jumps += 1;
    }
}

pub fn trace(buf: &[u8], compressed: bool, entries: &[usize]) -> TraceResult {
    let mut starts = vec![false; buf.len()];
    let mut touched = vec![false; buf.len()];
    let mut counter = Counter { words: 0, jumps: 0 };
    let mut work: Vec<usize> = entries
        .iter()
        .copied()
        .filter(|&o| o < buf.len())
        .collect();
    let mut succ = Vec::new();

    while let Some(offset) = work.pop() {
        if offset >= buf.len() || starts[offset] {
            continue;
        }
        match decode_at(buf, offset, compressed) {
            Decode::Instr(instr) => {
                starts[offset] = true;
                for b in &mut touched[instr.offset..instr.next] {
                    *b = true;
                }
                emit_instr(buf, compressed, &instr, &mut counter);
                succ.clear();
                let falls_through = successors(buf, &instr, &mut succ);
                if falls_through && instr.next < buf.len() {
                    work.push(instr.next);
                }
                work.extend(succ.iter().copied());
            }
            Decode::Unknown { size } => {
                // translates to a lone kill word; the path ends here
                starts[offset] = true;
                for b in &mut touched[offset..(offset + size).min(buf.len())] {
                    *b = true;
                }
                counter.words += 1;
            }
            Decode::Oob => {
                // truncated tail, nothing to emit
            }
        }
    }

    TraceResult {
        starts,
        touched,
        words: counter.words,
        jumps: counter.jumps,
    }
}
