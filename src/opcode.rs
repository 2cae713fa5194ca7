//! Legacy p-code definitions, the internal instruction set, and the shared
//! decoder/emitter both translation passes run on.
//!
//! The tracer and the translator must agree byte for byte on how much
//! storage each legacy instruction occupies once translated. They do so by
//! construction: both call [`decode_at`] to walk the legacy stream and feed
//! the decoded instruction through [`emit_instr`] with a [`Sink`] of their
//! own (one counts, one writes). Neither pass carries a private size table.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

/// Legacy p-codes as they appear in object lumps.
///
/// 0..=101 is the original closed-format instruction set. The block from
/// 157 up covers the compressed-format extensions this engine accepts:
/// byte-operand immediates, packed pushes, sorted case tables, script
/// functions and the world/global array scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Pcode {
    Nop = 0,
    Terminate = 1,
    Suspend = 2,
    PushNumber = 3,
    Lspec1 = 4,
    Lspec2 = 5,
    Lspec3 = 6,
    Lspec4 = 7,
    Lspec5 = 8,
    Lspec1Direct = 9,
    Lspec2Direct = 10,
    Lspec3Direct = 11,
    Lspec4Direct = 12,
    Lspec5Direct = 13,
    Add = 14,
    Subtract = 15,
    Multiply = 16,
    Divide = 17,
    Modulus = 18,
    Eq = 19,
    Ne = 20,
    Lt = 21,
    Gt = 22,
    Le = 23,
    Ge = 24,
    AssignScriptVar = 25,
    AssignMapVar = 26,
    AssignWorldVar = 27,
    PushScriptVar = 28,
    PushMapVar = 29,
    PushWorldVar = 30,
    AddScriptVar = 31,
    AddMapVar = 32,
    AddWorldVar = 33,
    SubScriptVar = 34,
    SubMapVar = 35,
    SubWorldVar = 36,
    MulScriptVar = 37,
    MulMapVar = 38,
    MulWorldVar = 39,
    DivScriptVar = 40,
    DivMapVar = 41,
    DivWorldVar = 42,
    ModScriptVar = 43,
    ModMapVar = 44,
    ModWorldVar = 45,
    IncScriptVar = 46,
    IncMapVar = 47,
    IncWorldVar = 48,
    DecScriptVar = 49,
    DecMapVar = 50,
    DecWorldVar = 51,
    Goto = 52,
    IfGoto = 53,
    Drop = 54,
    Delay = 55,
    DelayDirect = 56,
    Random = 57,
    RandomDirect = 58,
    ThingCount = 59,
    ThingCountDirect = 60,
    TagWait = 61,
    TagWaitDirect = 62,
    PolyWait = 63,
    PolyWaitDirect = 64,
    ChangeFloor = 65,
    ChangeFloorDirect = 66,
    ChangeCeiling = 67,
    ChangeCeilingDirect = 68,
    Restart = 69,
    AndLogical = 70,
    OrLogical = 71,
    AndBitwise = 72,
    OrBitwise = 73,
    EorBitwise = 74,
    NegateLogical = 75,
    LShift = 76,
    RShift = 77,
    UnaryMinus = 78,
    IfNotGoto = 79,
    LineSide = 80,
    ScriptWait = 81,
    ScriptWaitDirect = 82,
    ClearLineSpecial = 83,
    CaseGoto = 84,
    BeginPrint = 85,
    EndPrint = 86,
    PrintString = 87,
    PrintNumber = 88,
    PrintCharacter = 89,
    PlayerCount = 90,
    GameType = 91,
    GameSkill = 92,
    Timer = 93,
    SectorSound = 94,
    AmbientSound = 95,
    SoundSequence = 96,
    SetLineTexture = 97,
    SetLineBlocking = 98,
    SetLineSpecial = 99,
    ThingSound = 100,
    EndPrintBold = 101,

    PushByte = 157,
    Lspec1DirectB = 158,
    Lspec2DirectB = 159,
    Lspec3DirectB = 160,
    Lspec4DirectB = 161,
    Lspec5DirectB = 162,
    DelayDirectB = 163,
    RandomDirectB = 164,
    PushBytes = 165,
    Push2Bytes = 166,
    Push3Bytes = 167,
    Push4Bytes = 168,
    Push5Bytes = 169,
    CaseGotoSorted = 170,
    ConstArrayB = 171,
    Call = 172,
    CallDiscard = 173,
    ReturnVoid = 174,
    ReturnVal = 175,
    PushMapArray = 176,
    AssignMapArray = 177,
    PushWorldArray = 178,
    AssignWorldArray = 179,
    PushGlobalVar = 180,
    AssignGlobalVar = 181,
    PushGlobalArray = 182,
    AssignGlobalArray = 183,
}

impl Pcode {
    /// Number of 4-byte operand words following the opcode. Direct forms
    /// keep full-width operands even inside compressed lumps.
    fn word_args(self) -> usize {
        use Pcode::*;
        match self {
            PushNumber | DelayDirect | TagWaitDirect | PolyWaitDirect | ScriptWaitDirect
            | ChangeFloorDirect | ChangeCeilingDirect | Goto | IfGoto | IfNotGoto => 1,
            Lspec1 | Lspec2 | Lspec3 | Lspec4 | Lspec5 => 1,
            AssignScriptVar | AssignMapVar | AssignWorldVar | PushScriptVar | PushMapVar
            | PushWorldVar | AddScriptVar | AddMapVar | AddWorldVar | SubScriptVar
            | SubMapVar | SubWorldVar | MulScriptVar | MulMapVar | MulWorldVar
            | DivScriptVar | DivMapVar | DivWorldVar | ModScriptVar | ModMapVar
            | ModWorldVar | IncScriptVar | IncMapVar | IncWorldVar | DecScriptVar
            | DecMapVar | DecWorldVar | PushMapArray | AssignMapArray | PushWorldArray
            | AssignWorldArray | PushGlobalVar | AssignGlobalVar | PushGlobalArray
            | AssignGlobalArray => 1,
            RandomDirect | ThingCountDirect | CaseGoto => 2,
            Lspec1Direct => 2,
            Lspec2Direct => 3,
            Lspec3Direct => 4,
            Lspec4Direct => 5,
            Lspec5Direct => 6,
            Call | CallDiscard => 1,
            _ => 0,
        }
    }

    /// Number of 1-byte operands. Only compressed-format extensions use
    /// byte operands; a pcode has word operands or byte operands, never
    /// both.
    fn byte_args(self) -> usize {
        use Pcode::*;
        match self {
            PushByte | DelayDirectB | RandomDirectB => 1,
            Lspec1DirectB => 2,
            Lspec2DirectB => 3,
            Lspec3DirectB => 4,
            Lspec4DirectB => 5,
            Lspec5DirectB => 6,
            Push2Bytes => 2,
            Push3Bytes => 3,
            Push4Bytes => 4,
            Push5Bytes => 5,
            _ => 0,
        }
    }

    /// Operands refer to script vars or line specials and fit a byte when
    /// the lump is compressed, even for pcodes that otherwise use words.
    fn shrinks_when_compressed(self) -> bool {
        use Pcode::*;
        matches!(
            self,
            Lspec1 | Lspec2 | Lspec3 | Lspec4 | Lspec5
                | AssignScriptVar | PushScriptVar | AddScriptVar | SubScriptVar
                | MulScriptVar | DivScriptVar | ModScriptVar | IncScriptVar | DecScriptVar
                | AssignMapVar | PushMapVar | AddMapVar | SubMapVar | MulMapVar
                | DivMapVar | ModMapVar | IncMapVar | DecMapVar
                | AssignWorldVar | PushWorldVar | AddWorldVar | SubWorldVar | MulWorldVar
                | DivWorldVar | ModWorldVar | IncWorldVar | DecWorldVar
                | PushMapArray | AssignMapArray | PushWorldArray | AssignWorldArray
                | PushGlobalVar | AssignGlobalVar | PushGlobalArray | AssignGlobalArray
        )
    }
}

/// Internal fixed-width instruction set the interpreter executes. One word
/// per opcode, operands inline in the following words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum Op {
    /// Word 0 of every translated unit, and the translation of anything
    /// undecodable. Executing it stops the thread.
    Kill = 0,
    Nop,
    Terminate,
    Suspend,
    /// operand: immediate value
    Push,
    /// operands: argc, special number; args are popped from the stack
    CallSpec,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    AssignLocal,
    AssignMap,
    AssignWorld,
    AssignGlobal,
    PushLocal,
    PushMap,
    PushWorld,
    PushGlobal,
    AddLocal,
    AddMap,
    AddWorld,
    AddGlobal,
    SubLocal,
    SubMap,
    SubWorld,
    SubGlobal,
    MulLocal,
    MulMap,
    MulWorld,
    MulGlobal,
    DivLocal,
    DivMap,
    DivWorld,
    DivGlobal,
    ModLocal,
    ModMap,
    ModWorld,
    ModGlobal,
    IncLocal,
    IncMap,
    IncWorld,
    IncGlobal,
    DecLocal,
    DecMap,
    DecWorld,
    DecGlobal,
    /// operand: word offset into the unit's internal code
    Goto,
    IfGoto,
    IfNotGoto,
    Drop,
    Delay,
    Random,
    ThingCount,
    TagWait,
    PolyWait,
    ScriptWait,
    ClearLineSpecial,
    LineSide,
    ChangeFloor,
    ChangeCeiling,
    /// Jump back to the running script's entry point.
    Restart,
    AndLogical,
    OrLogical,
    AndBitwise,
    OrBitwise,
    EorBitwise,
    NegateLogical,
    LShift,
    RShift,
    UnaryMinus,
    /// operands: case value, word target. Matches pop and jump, otherwise
    /// fall through leaving the value on the stack.
    CaseGoto,
    /// operands: count, then count (value, word target) pairs sorted by
    /// value. Binary searched at run time.
    CaseTable,
    BeginPrint,
    EndPrint,
    EndPrintBold,
    PrintString,
    PrintNumber,
    PrintCharacter,
    PlayerCount,
    GameType,
    GameSkill,
    Timer,
    SectorSound,
    AmbientSound,
    SoundSequence,
    ThingSound,
    SetLineTexture,
    SetLineBlocking,
    SetLineSpecial,
    /// operand: map array index; element index popped from the stack
    PushMapArray,
    AssignMapArray,
    PushWorldArray,
    AssignWorldArray,
    PushGlobalArray,
    AssignGlobalArray,
    /// operand: word offset of the function body entry
    Call,
    CallDiscard,
    ReturnVoid,
    ReturnVal,
}

/// A decoded legacy instruction: where it starts, where its operand bytes
/// begin, and where the next instruction starts.
#[derive(Debug, Clone, Copy)]
pub struct LegacyInstr {
    pub pcode: Pcode,
    pub offset: usize,
    pub operands: usize,
    pub next: usize,
}

/// Outcome of decoding one instruction.
pub enum Decode {
    Instr(LegacyInstr),
    /// Opcode number we do not implement; `size` covers the opcode bytes
    /// alone, operands are unknowable.
    Unknown { size: usize },
    /// The opcode or its operands run past the end of the code region.
    Oob,
}

fn read_i32(buf: &[u8], at: usize) -> Option<i32> {
    let b = buf.get(at..at + 4)?;
    Some(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode the single instruction starting at `offset`.
///
/// In compressed lumps the opcode is one byte, or two when the first byte
/// is >= 240 (raw = 240 + ((b0 - 240) << 8) + b1). Uncompressed lumps use
/// a 4-byte little-endian word.
pub fn decode_at(buf: &[u8], offset: usize, compressed: bool) -> Decode {
    let (raw, operands) = if compressed {
        let b0 = match buf.get(offset) {
            Some(&b) => b as i32,
            None => return Decode::Oob,
        };
        if b0 >= 240 {
            let b1 = match buf.get(offset + 1) {
                Some(&b) => b as i32,
                None => return Decode::Oob,
            };
            (240 + ((b0 - 240) << 8) + b1, offset + 2)
        } else {
            (b0, offset + 1)
        }
    } else {
        match read_i32(buf, offset) {
            Some(w) => (w, offset + 4),
            None => return Decode::Oob,
        }
    };

    let pcode = match Pcode::from_i32(raw) {
        Some(p) => p,
        None => {
            return Decode::Unknown {
                size: operands - offset,
            }
        }
    };

    let next = match pcode {
        // count byte, then count byte immediates
        Pcode::PushBytes => {
            let n = match buf.get(operands) {
                Some(&b) => b as usize,
                None => return Decode::Oob,
            };
            operands + 1 + n
        }
        // count byte, then count 4-byte words
        Pcode::ConstArrayB => {
            let n = match buf.get(operands) {
                Some(&b) => b as usize,
                None => return Decode::Oob,
            };
            operands + 1 + n * 4
        }
        // pad to 4, then an i32 count and count (value, target) pairs
        Pcode::CaseGotoSorted => {
            let aligned = (operands + 3) & !3;
            let n = match read_i32(buf, aligned) {
                Some(w) if w >= 0 => w as usize,
                _ => return Decode::Oob,
            };
            match n.checked_mul(8).and_then(|sz| (aligned + 4).checked_add(sz)) {
                Some(end) => end,
                None => return Decode::Oob,
            }
        }
        p => {
            let shrunk = compressed && p.shrinks_when_compressed();
            let words = p.word_args();
            let bytes = p.byte_args();
            if shrunk {
                // word-operand pcodes whose operands fit a byte
                operands + words.max(bytes).max(1)
            } else {
                operands + words * 4 + bytes
            }
        }
    };

    if next > buf.len() {
        return Decode::Oob;
    }
    Decode::Instr(LegacyInstr {
        pcode,
        offset,
        operands,
        next,
    })
}

/// Receives the internal words an instruction translates to.
///
/// `word` is a literal internal word. `target` is a word that holds a jump
/// destination still expressed as a legacy byte offset; the translator
/// records it for patching, the tracer just counts it.
pub trait Sink {
    fn word(&mut self, w: i32);
    fn target(&mut self, legacy: i32);
}

struct Operands<'a> {
    buf: &'a [u8],
    at: usize,
    byte_width: bool,
}

impl<'a> Operands<'a> {
    fn new(buf: &'a [u8], instr: &LegacyInstr, byte_width: bool) -> Self {
        Operands {
            buf,
            at: instr.operands,
            byte_width,
        }
    }

    fn next(&mut self) -> i32 {
        if self.byte_width {
            let v = self.buf.get(self.at).copied().unwrap_or(0) as i32;
            self.at += 1;
            v
        } else {
            let v = read_i32(self.buf, self.at).unwrap_or(0);
            self.at += 4;
            v
        }
    }

    fn word(&mut self) -> i32 {
        let v = read_i32(self.buf, self.at).unwrap_or(0);
        self.at += 4;
        v
    }
}

/// Emit the internal translation of one decoded instruction into `sink`.
/// Direct legacy forms expand to explicit pushes plus the stack form, so
/// the interpreter only ever sees one shape per operation.
pub fn emit_instr(buf: &[u8], compressed: bool, instr: &LegacyInstr, sink: &mut impl Sink) {
    use Pcode::*;

    let shrunk = compressed && instr.pcode.shrinks_when_compressed();
    let byte_ops = shrunk || instr.pcode.byte_args() > 0;
    let mut ops = Operands::new(buf, instr, byte_ops);

    // map a scoped-variable pcode family member straight across
    let simple = |p: Pcode| -> Option<Op> {
        Some(match p {
            Nop => Op::Nop,
            Terminate => Op::Terminate,
            Suspend => Op::Suspend,
            Add => Op::Add,
            Subtract => Op::Subtract,
            Multiply => Op::Multiply,
            Divide => Op::Divide,
            Modulus => Op::Modulus,
            Eq => Op::Eq,
            Ne => Op::Ne,
            Lt => Op::Lt,
            Gt => Op::Gt,
            Le => Op::Le,
            Ge => Op::Ge,
            Drop => Op::Drop,
            Delay => Op::Delay,
            Random => Op::Random,
            ThingCount => Op::ThingCount,
            TagWait => Op::TagWait,
            PolyWait => Op::PolyWait,
            ScriptWait => Op::ScriptWait,
            ClearLineSpecial => Op::ClearLineSpecial,
            LineSide => Op::LineSide,
            ChangeFloor => Op::ChangeFloor,
            ChangeCeiling => Op::ChangeCeiling,
            Restart => Op::Restart,
            AndLogical => Op::AndLogical,
            OrLogical => Op::OrLogical,
            AndBitwise => Op::AndBitwise,
            OrBitwise => Op::OrBitwise,
            EorBitwise => Op::EorBitwise,
            NegateLogical => Op::NegateLogical,
            LShift => Op::LShift,
            RShift => Op::RShift,
            UnaryMinus => Op::UnaryMinus,
            BeginPrint => Op::BeginPrint,
            EndPrint => Op::EndPrint,
            EndPrintBold => Op::EndPrintBold,
            PrintString => Op::PrintString,
            PrintNumber => Op::PrintNumber,
            PrintCharacter => Op::PrintCharacter,
            PlayerCount => Op::PlayerCount,
            GameType => Op::GameType,
            GameSkill => Op::GameSkill,
            Timer => Op::Timer,
            SectorSound => Op::SectorSound,
            AmbientSound => Op::AmbientSound,
            SoundSequence => Op::SoundSequence,
            ThingSound => Op::ThingSound,
            SetLineTexture => Op::SetLineTexture,
            SetLineBlocking => Op::SetLineBlocking,
            SetLineSpecial => Op::SetLineSpecial,
            ReturnVoid => Op::ReturnVoid,
            ReturnVal => Op::ReturnVal,
            _ => return None,
        })
    };

    // scoped-variable families: (base pcode, internal op), operand is the
    // variable index
    let scoped = |p: Pcode| -> Option<Op> {
        Some(match p {
            AssignScriptVar => Op::AssignLocal,
            AssignMapVar => Op::AssignMap,
            AssignWorldVar => Op::AssignWorld,
            AssignGlobalVar => Op::AssignGlobal,
            PushScriptVar => Op::PushLocal,
            PushMapVar => Op::PushMap,
            PushWorldVar => Op::PushWorld,
            PushGlobalVar => Op::PushGlobal,
            AddScriptVar => Op::AddLocal,
            AddMapVar => Op::AddMap,
            AddWorldVar => Op::AddWorld,
            SubScriptVar => Op::SubLocal,
            SubMapVar => Op::SubMap,
            SubWorldVar => Op::SubWorld,
            MulScriptVar => Op::MulLocal,
            MulMapVar => Op::MulMap,
            MulWorldVar => Op::MulWorld,
            DivScriptVar => Op::DivLocal,
            DivMapVar => Op::DivMap,
            DivWorldVar => Op::DivWorld,
            ModScriptVar => Op::ModLocal,
            ModMapVar => Op::ModMap,
            ModWorldVar => Op::ModWorld,
            IncScriptVar => Op::IncLocal,
            IncMapVar => Op::IncMap,
            IncWorldVar => Op::IncWorld,
            DecScriptVar => Op::DecLocal,
            DecMapVar => Op::DecMap,
            DecWorldVar => Op::DecWorld,
            PushMapArray => Op::PushMapArray,
            AssignMapArray => Op::AssignMapArray,
            PushWorldArray => Op::PushWorldArray,
            AssignWorldArray => Op::AssignWorldArray,
            PushGlobalArray => Op::PushGlobalArray,
            AssignGlobalArray => Op::AssignGlobalArray,
            _ => return None,
        })
    };

    match instr.pcode {
        PushNumber => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
        }
        PushByte => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
        }
        Push2Bytes | Push3Bytes | Push4Bytes | Push5Bytes => {
            for _ in 0..instr.pcode.byte_args() {
                sink.word(Op::Push as i32);
                sink.word(ops.next());
            }
        }
        PushBytes => {
            let n = buf.get(instr.operands).copied().unwrap_or(0) as usize;
            for i in 0..n {
                let v = buf.get(instr.operands + 1 + i).copied().unwrap_or(0) as i32;
                sink.word(Op::Push as i32);
                sink.word(v);
            }
        }
        ConstArrayB => {
            let n = buf.get(instr.operands).copied().unwrap_or(0) as usize;
            for i in 0..n {
                let v = read_i32(buf, instr.operands + 1 + i * 4).unwrap_or(0);
                sink.word(Op::Push as i32);
                sink.word(v);
            }
        }
        Lspec1 | Lspec2 | Lspec3 | Lspec4 | Lspec5 => {
            let argc = 1 + (instr.pcode as i32 - Lspec1 as i32);
            let special = ops.next();
            sink.word(Op::CallSpec as i32);
            sink.word(argc);
            sink.word(special);
        }
        Lspec1Direct | Lspec2Direct | Lspec3Direct | Lspec4Direct | Lspec5Direct => {
            let argc = 1 + (instr.pcode as i32 - Lspec1Direct as i32);
            let special = ops.next();
            for _ in 0..argc {
                sink.word(Op::Push as i32);
                sink.word(ops.next());
            }
            sink.word(Op::CallSpec as i32);
            sink.word(argc);
            sink.word(special);
        }
        Lspec1DirectB | Lspec2DirectB | Lspec3DirectB | Lspec4DirectB | Lspec5DirectB => {
            let argc = 1 + (instr.pcode as i32 - Lspec1DirectB as i32);
            let special = ops.next();
            for _ in 0..argc {
                sink.word(Op::Push as i32);
                sink.word(ops.next());
            }
            sink.word(Op::CallSpec as i32);
            sink.word(argc);
            sink.word(special);
        }
        DelayDirect | DelayDirectB => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::Delay as i32);
        }
        RandomDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::Random as i32);
        }
        // carries only the max; the implicit min of 0 becomes explicit
        RandomDirectB => {
            sink.word(Op::Push as i32);
            sink.word(0);
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::Random as i32);
        }
        ThingCountDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::ThingCount as i32);
        }
        TagWaitDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::TagWait as i32);
        }
        PolyWaitDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::PolyWait as i32);
        }
        ScriptWaitDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::ScriptWait as i32);
        }
        ChangeFloorDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::ChangeFloor as i32);
        }
        ChangeCeilingDirect => {
            sink.word(Op::Push as i32);
            sink.word(ops.next());
            sink.word(Op::ChangeCeiling as i32);
        }
        Goto => {
            sink.word(Op::Goto as i32);
            sink.target(ops.word());
        }
        IfGoto => {
            sink.word(Op::IfGoto as i32);
            sink.target(ops.word());
        }
        IfNotGoto => {
            sink.word(Op::IfNotGoto as i32);
            sink.target(ops.word());
        }
        CaseGoto => {
            sink.word(Op::CaseGoto as i32);
            sink.word(ops.word());
            sink.target(ops.word());
        }
        CaseGotoSorted => {
            let aligned = (instr.operands + 3) & !3;
            let n = read_i32(buf, aligned).unwrap_or(0).max(0) as usize;
            sink.word(Op::CaseTable as i32);
            sink.word(n as i32);
            for i in 0..n {
                sink.word(read_i32(buf, aligned + 4 + i * 8).unwrap_or(0));
                sink.target(read_i32(buf, aligned + 8 + i * 8).unwrap_or(0));
            }
        }
        Call | CallDiscard => {
            let op = if instr.pcode == Call {
                Op::Call
            } else {
                Op::CallDiscard
            };
            sink.word(op as i32);
            sink.target(ops.word());
        }
        p => {
            if let Some(op) = simple(p) {
                sink.word(op as i32);
            } else if let Some(op) = scoped(p) {
                sink.word(op as i32);
                sink.word(ops.next());
            } else {
                // every pcode is covered above; unreachable by construction
                sink.word(Op::Kill as i32);
            }
        }
    }
}

/// Collect the legacy byte offsets control can reach from `instr`. Returns
/// whether execution can also fall through to `instr.next`.
pub fn successors(buf: &[u8], instr: &LegacyInstr, out: &mut Vec<usize>) -> bool {
    use Pcode::*;
    let target = |at: usize, out: &mut Vec<usize>| {
        if let Some(t) = read_i32(buf, at) {
            if t >= 0 {
                out.push(t as usize);
            }
        }
    };
    match instr.pcode {
        Terminate | ReturnVoid | ReturnVal | Restart => false,
        Goto => {
            target(instr.operands, out);
            false
        }
        IfGoto | IfNotGoto => {
            target(instr.operands, out);
            true
        }
        CaseGoto => {
            target(instr.operands + 4, out);
            true
        }
        CaseGotoSorted => {
            let aligned = (instr.operands + 3) & !3;
            let n = read_i32(buf, aligned).unwrap_or(0).max(0) as usize;
            for i in 0..n {
                target(aligned + 8 + i * 8, out);
            }
            true
        }
        Call | CallDiscard => {
            target(instr.operands, out);
            true
        }
        _ => true,
    }
}
