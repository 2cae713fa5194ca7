//! Execution state of one running script.

use crate::error::ScriptFault;
use crate::host::Trigger;
use crate::unit::{UnitId, SCRIPT_LOCALS};

pub const STACK_SIZE: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Running,
    /// Parked until explicitly resumed.
    Suspended,
    /// Parked until no sector with `wait_value` as its tag is moving.
    WaitingForTag,
    /// Parked until polyobject `wait_value` stops moving.
    WaitingForPoly,
    /// Parked until every thread of script `wait_value` has finished.
    WaitingForScript,
    /// Marked dead; the scheduler removes it on the next tick.
    PleaseRemove,
}

/// Saved caller state for a script-function call. Frames own their values
/// outright, so a thread can be moved or dropped without touching any
/// shared structure.
pub struct CallFrame {
    pub return_ip: u32,
    pub locals: Vec<i32>,
    pub print_buf: String,
    /// Discard the callee's return value instead of pushing it.
    pub discard: bool,
}

pub struct ScriptThread {
    pub unit: UnitId,
    /// Index into the unit's script directory.
    pub script: usize,
    /// Normalized script number, kept here so wake checks never need the
    /// unit.
    pub number: i32,
    pub state: ThreadState,
    /// Word offset of the next instruction.
    pub ip: u32,
    pub stack: Vec<i32>,
    pub locals: Vec<i32>,
    pub frames: Vec<CallFrame>,
    /// Tag, polyobject or script number this thread is waiting on.
    pub wait_value: i32,
    /// Remaining delay tics; the thread does not execute while nonzero.
    pub delay: u32,
    pub trigger: Trigger,
    pub print_buf: String,
}

impl ScriptThread {
    pub fn new(unit: UnitId, script: usize, number: i32, entry: u32, trigger: Trigger) -> Self {
        ScriptThread {
            unit,
            script,
            number,
            state: ThreadState::Running,
            ip: entry,
            stack: Vec::with_capacity(32),
            locals: vec![0; SCRIPT_LOCALS],
            frames: Vec::new(),
            wait_value: 0,
            delay: 0,
            trigger,
            print_buf: String::new(),
        }
    }

    pub fn push(&mut self, v: i32) -> Result<(), ScriptFault> {
        if self.stack.len() >= STACK_SIZE {
            return Err(ScriptFault::StackOverflow);
        }
        self.stack.push(v);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<i32, ScriptFault> {
        self.stack.pop().ok_or(ScriptFault::StackUnderflow)
    }

    pub fn peek(&self) -> Result<i32, ScriptFault> {
        self.stack.last().copied().ok_or(ScriptFault::StackUnderflow)
    }

    pub fn local(&self, idx: i32) -> i32 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.locals.get(i).copied())
            .unwrap_or(0)
    }

    pub fn set_local(&mut self, idx: i32, value: i32) {
        if let Ok(i) = usize::try_from(idx) {
            if let Some(slot) = self.locals.get_mut(i) {
                *slot = value;
            }
        }
    }
}
