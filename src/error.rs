use thiserror::Error;

/// Hard errors. These indicate the tracer and the translator disagreed about
/// the instruction stream; the resulting code buffer cannot be trusted, so the
/// embedder is expected to treat them as fatal rather than skip the lump.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AcsError {
    #[error("translated word count mismatch: emitted {emitted}, traced {traced}")]
    TranslationDesync { emitted: usize, traced: usize },

    #[error("jump fixup count mismatch: patched {patched}, traced {traced}")]
    JumpCountDesync { patched: usize, traced: usize },
}

/// Faults a running script can raise. Each one stops the offending thread
/// with a console diagnostic; the rest of the simulation keeps running.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptFault {
    #[error("divide by zero")]
    DivideByZero,

    #[error("modulus by zero")]
    ModulusByZero,

    #[error("runaway script (too many branches in one tic)")]
    Runaway,

    #[error("unknown opcode {0}")]
    UnknownOpcode(i32),

    #[error("value stack overflow")]
    StackOverflow,

    #[error("value stack underflow")]
    StackUnderflow,
}
