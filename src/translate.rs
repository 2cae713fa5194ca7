//! Second pass: emit internal code into a buffer sized by the trace, then
//! patch jump targets from legacy byte offsets to internal word offsets.
//!
//! The size contract with the tracer is structural, but a desync is still
//! checked after emission and treated as a hard load failure rather than
//! letting a misaligned unit run.

use crate::error::AcsError;
use crate::opcode::{decode_at, emit_instr, Decode, Op, Sink};
use crate::trace::TraceResult;

struct Emitter {
    code: Vec<i32>,
    /// Word positions holding a raw legacy offset awaiting relocation.
    fixups: Vec<usize>,
}

impl Sink for Emitter {
    fn word(&mut self, w: i32) {
        self.code.push(w);
    }
    fn target(&mut self, legacy: i32) {
        self.fixups.push(self.code.len());
        self.code.push(legacy);
    }
}

/// Translate the traced instructions of `buf` into internal code.
///
/// Returns the code (bracketed by kill sentinels) and a byte-offset to
/// word-offset map for resolving script and function entry points. Entries
/// that map to 0 were unreachable or undecodable.
pub fn translate(
    buf: &[u8],
    compressed: bool,
    trace: &TraceResult,
) -> Result<(Vec<i32>, Vec<u32>), AcsError> {
    let mut em = Emitter {
        code: Vec::with_capacity(trace.words + 2),
        fixups: Vec::new(),
    };
    let mut offset_map = vec![0u32; buf.len()];

    em.code.push(Op::Kill as i32);
    for offset in 0..buf.len() {
        if !trace.starts[offset] {
            continue;
        }
        offset_map[offset] = em.code.len() as u32;
        match decode_at(buf, offset, compressed) {
            Decode::Instr(instr) => emit_instr(buf, compressed, &instr, &mut em),
            Decode::Unknown { .. } => em.code.push(Op::Kill as i32),
            // the tracer never marks a start it could not decode
            Decode::Oob => em.code.push(Op::Kill as i32),
        }
    }
    let emitted = em.code.len() - 1;
    em.code.push(Op::Kill as i32);

    if emitted != trace.words {
        return Err(AcsError::TranslationDesync {
            emitted,
            traced: trace.words,
        });
    }
    if em.fixups.len() != trace.jumps {
        return Err(AcsError::JumpCountDesync {
            patched: em.fixups.len(),
            traced: trace.jumps,
        });
    }

    // reverse order: a table's own slots are patched before any earlier
    // jump into the table could be misread
    for &pos in em.fixups.iter().rev() {
        let legacy = em.code[pos];
        let word = usize::try_from(legacy)
            .ok()
            .and_then(|o| offset_map.get(o).copied())
            .unwrap_or(0);
        em.code[pos] = word as i32;
    }

    Ok((em.code, offset_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::Pcode;
    use crate::trace::trace;
    use pretty_assertions::assert_eq;

    fn word_code(ops: &[i32]) -> Vec<u8> {
        let mut v = Vec::new();
        for w in ops {
            v.extend_from_slice(&w.to_le_bytes());
        }
        v
    }

    #[test]
    fn emitted_matches_traced() {
        let buf = word_code(&[
            Pcode::PushNumber as i32,
            7,
            Pcode::Drop as i32,
            Pcode::Terminate as i32,
        ]);
        let t = trace(&buf, false, &[0]);
        let (code, map) = translate(&buf, false, &t).unwrap();
        assert_eq!(code.len(), t.words + 2);
        assert_eq!(code[0], Op::Kill as i32);
        assert_eq!(*code.last().unwrap(), Op::Kill as i32);
        assert_eq!(map[0], 1);
        assert_eq!(
            code,
            vec![
                Op::Kill as i32,
                Op::Push as i32,
                7,
                Op::Drop as i32,
                Op::Terminate as i32,
                Op::Kill as i32,
            ]
        );
    }

    #[test]
    fn jumps_relocate_to_word_offsets() {
        // 0: Goto 8; 8: Terminate
        let buf = word_code(&[Pcode::Goto as i32, 8, Pcode::Terminate as i32]);
        let t = trace(&buf, false, &[0]);
        let (code, map) = translate(&buf, false, &t).unwrap();
        assert_eq!(map[8], 3);
        assert_eq!(code[2], 3);
    }

    #[test]
    fn unresolvable_target_patches_to_kill() {
        // jump into the middle of an instruction: no start there
        let buf = word_code(&[Pcode::Goto as i32, 4]);
        let t = trace(&buf, false, &[0]);
        let (code, _) = translate(&buf, false, &t).unwrap();
        // Goto operand falls back to word 0, the kill sentinel
        assert_eq!(code[2], 0);
    }

    #[test]
    fn translation_is_deterministic() {
        let buf = word_code(&[
            Pcode::IfGoto as i32,
            12,
            Pcode::Terminate as i32,
            Pcode::PushNumber as i32,
            3,
            Pcode::Terminate as i32,
        ]);
        let t1 = trace(&buf, false, &[0]);
        let t2 = trace(&buf, false, &[0]);
        let a = translate(&buf, false, &t1).unwrap();
        let b = translate(&buf, false, &t2).unwrap();
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }
}
