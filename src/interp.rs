//! The instruction loop: runs one thread until it yields, stops or
//! faults.
//!
//! A fault kills only the offending thread. The interpreter never panics
//! on hostile code; undecodable words, wild jumps and stack misuse all
//! resolve to a fault or a kill.

use log::warn;
use num_traits::FromPrimitive;

use crate::error::ScriptFault;
use crate::host::Host;
use crate::opcode::Op;
use crate::thread::ScriptThread;
use crate::unit::{Unit, SCRIPT_LOCALS};
use crate::world::WorldContext;

/// Taken branches allowed in one tick before the thread is declared
/// runaway.
pub const RUNAWAY_LIMIT: u32 = 500_000;

/// Outcome of advancing one thread for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Yielded (delay, wait or suspend); the thread lives on.
    Continue,
    /// Ran to completion or hit a kill word.
    Stopped,
    Faulted(ScriptFault),
}

enum Flow {
    Yield,
    Stop,
}

#[inline]
fn fetch(code: &[i32], at: u32) -> i32 {
    code.get(at as usize).copied().unwrap_or(0)
}

pub fn advance(
    t: &mut ScriptThread,
    unit: &mut Unit,
    world: &mut WorldContext,
    host: &mut dyn Host,
) -> Advance {
    match run(t, unit, world, host) {
        Ok(Flow::Yield) => Advance::Continue,
        Ok(Flow::Stop) => Advance::Stopped,
        Err(fault) => Advance::Faulted(fault),
    }
}

fn run(
    t: &mut ScriptThread,
    unit: &mut Unit,
    world: &mut WorldContext,
    host: &mut dyn Host,
) -> Result<Flow, ScriptFault> {
    use crate::thread::ThreadState;

    let mut branches: u32 = 0;
    let mut branch = |ip: &mut u32, to: i32| -> Result<(), ScriptFault> {
        branches += 1;
        if branches > RUNAWAY_LIMIT {
            return Err(ScriptFault::Runaway);
        }
        *ip = to.max(0) as u32;
        Ok(())
    };

    loop {
        let raw = fetch(&unit.code, t.ip);
        let op = Op::from_i32(raw).ok_or(ScriptFault::UnknownOpcode(raw))?;
        let mut ip = t.ip.wrapping_add(1);

        match op {
            Op::Kill => {
                warn!(
                    "{}: script {} ran into a kill word at {}",
                    unit.lump_name, t.number, t.ip
                );
                return Ok(Flow::Stop);
            }
            Op::Nop => {}
            Op::Terminate => return Ok(Flow::Stop),
            Op::Suspend => {
                t.state = ThreadState::Suspended;
                t.ip = ip;
                return Ok(Flow::Yield);
            }
            Op::Push => {
                t.push(fetch(&unit.code, ip))?;
                ip = ip.wrapping_add(1);
            }
            Op::CallSpec => {
                let argc = fetch(&unit.code, ip).clamp(0, 5) as usize;
                let special = fetch(&unit.code, ip.wrapping_add(1));
                ip = ip.wrapping_add(2);
                let mut args = [0i32; 5];
                for i in (0..argc).rev() {
                    args[i] = t.pop()?;
                }
                host.execute_line_special(special, &args[..argc], &t.trigger);
            }

            Op::Add | Op::Subtract | Op::Multiply | Op::Eq | Op::Ne | Op::Lt | Op::Gt
            | Op::Le | Op::Ge | Op::AndLogical | Op::OrLogical | Op::AndBitwise
            | Op::OrBitwise | Op::EorBitwise | Op::LShift | Op::RShift => {
                let b = t.pop()?;
                let a = t.pop()?;
                let r = match op {
                    Op::Add => a.wrapping_add(b),
                    Op::Subtract => a.wrapping_sub(b),
                    Op::Multiply => a.wrapping_mul(b),
                    Op::Eq => (a == b) as i32,
                    Op::Ne => (a != b) as i32,
                    Op::Lt => (a < b) as i32,
                    Op::Gt => (a > b) as i32,
                    Op::Le => (a <= b) as i32,
                    Op::Ge => (a >= b) as i32,
                    Op::AndLogical => (a != 0 && b != 0) as i32,
                    Op::OrLogical => (a != 0 || b != 0) as i32,
                    Op::AndBitwise => a & b,
                    Op::OrBitwise => a | b,
                    Op::EorBitwise => a ^ b,
                    Op::LShift => a.wrapping_shl(b as u32),
                    Op::RShift => a.wrapping_shr(b as u32),
                    _ => unreachable!(),
                };
                t.push(r)?;
            }
            Op::Divide => {
                let b = t.pop()?;
                if b == 0 {
                    return Err(ScriptFault::DivideByZero);
                }
                let a = t.pop()?;
                t.push(a.wrapping_div(b))?;
            }
            Op::Modulus => {
                let b = t.pop()?;
                if b == 0 {
                    return Err(ScriptFault::ModulusByZero);
                }
                let a = t.pop()?;
                t.push(a.wrapping_rem(b))?;
            }
            Op::NegateLogical => {
                let a = t.pop()?;
                t.push((a == 0) as i32)?;
            }
            Op::UnaryMinus => {
                let a = t.pop()?;
                t.push(a.wrapping_neg())?;
            }
            Op::Drop => {
                t.pop()?;
            }

            Op::AssignLocal | Op::AssignMap | Op::AssignWorld | Op::AssignGlobal => {
                let idx = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let v = t.pop()?;
                match op {
                    Op::AssignLocal => t.set_local(idx, v),
                    Op::AssignMap => unit.set_map_var(idx, v),
                    Op::AssignWorld => world.set_world_var(idx, v),
                    _ => world.set_global_var(idx, v),
                }
            }
            Op::PushLocal | Op::PushMap | Op::PushWorld | Op::PushGlobal => {
                let idx = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let v = match op {
                    Op::PushLocal => t.local(idx),
                    Op::PushMap => unit.map_var(idx),
                    Op::PushWorld => world.world_var(idx),
                    _ => world.global_var(idx),
                };
                t.push(v)?;
            }
            Op::AddLocal | Op::AddMap | Op::AddWorld | Op::AddGlobal
            | Op::SubLocal | Op::SubMap | Op::SubWorld | Op::SubGlobal
            | Op::MulLocal | Op::MulMap | Op::MulWorld | Op::MulGlobal => {
                let idx = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let v = t.pop()?;
                let apply = |old: i32| match op {
                    Op::AddLocal | Op::AddMap | Op::AddWorld | Op::AddGlobal => {
                        old.wrapping_add(v)
                    }
                    Op::SubLocal | Op::SubMap | Op::SubWorld | Op::SubGlobal => {
                        old.wrapping_sub(v)
                    }
                    _ => old.wrapping_mul(v),
                };
                match op {
                    Op::AddLocal | Op::SubLocal | Op::MulLocal => {
                        t.set_local(idx, apply(t.local(idx)))
                    }
                    Op::AddMap | Op::SubMap | Op::MulMap => {
                        unit.set_map_var(idx, apply(unit.map_var(idx)))
                    }
                    Op::AddWorld | Op::SubWorld | Op::MulWorld => {
                        world.set_world_var(idx, apply(world.world_var(idx)))
                    }
                    _ => world.set_global_var(idx, apply(world.global_var(idx))),
                }
            }
            Op::DivLocal | Op::DivMap | Op::DivWorld | Op::DivGlobal
            | Op::ModLocal | Op::ModMap | Op::ModWorld | Op::ModGlobal => {
                let idx = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let v = t.pop()?;
                if v == 0 {
                    return Err(if matches!(
                        op,
                        Op::DivLocal | Op::DivMap | Op::DivWorld | Op::DivGlobal
                    ) {
                        ScriptFault::DivideByZero
                    } else {
                        ScriptFault::ModulusByZero
                    });
                }
                let div = matches!(op, Op::DivLocal | Op::DivMap | Op::DivWorld | Op::DivGlobal);
                let apply = |old: i32| {
                    if div {
                        old.wrapping_div(v)
                    } else {
                        old.wrapping_rem(v)
                    }
                };
                match op {
                    Op::DivLocal | Op::ModLocal => t.set_local(idx, apply(t.local(idx))),
                    Op::DivMap | Op::ModMap => unit.set_map_var(idx, apply(unit.map_var(idx))),
                    Op::DivWorld | Op::ModWorld => {
                        world.set_world_var(idx, apply(world.world_var(idx)))
                    }
                    _ => world.set_global_var(idx, apply(world.global_var(idx))),
                }
            }
            Op::IncLocal | Op::IncMap | Op::IncWorld | Op::IncGlobal
            | Op::DecLocal | Op::DecMap | Op::DecWorld | Op::DecGlobal => {
                let idx = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let delta = if matches!(
                    op,
                    Op::IncLocal | Op::IncMap | Op::IncWorld | Op::IncGlobal
                ) {
                    1
                } else {
                    -1
                };
                match op {
                    Op::IncLocal | Op::DecLocal => {
                        t.set_local(idx, t.local(idx).wrapping_add(delta))
                    }
                    Op::IncMap | Op::DecMap => {
                        unit.set_map_var(idx, unit.map_var(idx).wrapping_add(delta))
                    }
                    Op::IncWorld | Op::DecWorld => {
                        world.set_world_var(idx, world.world_var(idx).wrapping_add(delta))
                    }
                    _ => world.set_global_var(idx, world.global_var(idx).wrapping_add(delta)),
                }
            }

            Op::PushMapArray | Op::PushWorldArray | Op::PushGlobalArray => {
                let arr = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let element = t.pop()?;
                let v = match op {
                    Op::PushMapArray => unit.map_array(arr, element),
                    Op::PushWorldArray => world.world_array(arr, element),
                    _ => world.global_array(arr, element),
                };
                t.push(v)?;
            }
            Op::AssignMapArray | Op::AssignWorldArray | Op::AssignGlobalArray => {
                let arr = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                let v = t.pop()?;
                let element = t.pop()?;
                match op {
                    Op::AssignMapArray => unit.set_map_array(arr, element, v),
                    Op::AssignWorldArray => world.set_world_array(arr, element, v),
                    _ => world.set_global_array(arr, element, v),
                }
            }

            Op::Goto => {
                let target = fetch(&unit.code, ip);
                branch(&mut ip, target)?;
            }
            Op::IfGoto => {
                let target = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                if t.pop()? != 0 {
                    branch(&mut ip, target)?;
                }
            }
            Op::IfNotGoto => {
                let target = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                if t.pop()? == 0 {
                    branch(&mut ip, target)?;
                }
            }
            Op::CaseGoto => {
                let value = fetch(&unit.code, ip);
                let target = fetch(&unit.code, ip.wrapping_add(1));
                ip = ip.wrapping_add(2);
                if t.peek()? == value {
                    t.pop()?;
                    branch(&mut ip, target)?;
                }
            }
            Op::CaseTable => {
                let count = fetch(&unit.code, ip).max(0) as u32;
                let pairs = ip.wrapping_add(1);
                ip = ip.wrapping_add(1).wrapping_add(count.wrapping_mul(2));
                let needle = t.peek()?;
                let (mut lo, mut hi) = (0u32, count);
                while lo < hi {
                    let mid = lo + (hi - lo) / 2;
                    let v = fetch(&unit.code, pairs + mid * 2);
                    match v.cmp(&needle) {
                        std::cmp::Ordering::Less => lo = mid + 1,
                        std::cmp::Ordering::Greater => hi = mid,
                        std::cmp::Ordering::Equal => {
                            t.pop()?;
                            let target = fetch(&unit.code, pairs + mid * 2 + 1);
                            branch(&mut ip, target)?;
                            break;
                        }
                    }
                }
            }
            Op::Restart => {
                let entry = unit
                    .scripts
                    .get(t.script)
                    .map(|s| s.entry)
                    .unwrap_or(0);
                branch(&mut ip, entry as i32)?;
            }

            Op::Delay => {
                let tics = t.pop()?;
                if tics > 0 {
                    t.delay = tics as u32;
                    t.ip = ip;
                    return Ok(Flow::Yield);
                }
            }
            Op::TagWait => {
                t.wait_value = t.pop()?;
                t.state = ThreadState::WaitingForTag;
                t.ip = ip;
                return Ok(Flow::Yield);
            }
            Op::PolyWait => {
                t.wait_value = t.pop()?;
                t.state = ThreadState::WaitingForPoly;
                t.ip = ip;
                return Ok(Flow::Yield);
            }
            Op::ScriptWait => {
                t.wait_value = t.pop()?;
                t.state = ThreadState::WaitingForScript;
                t.ip = ip;
                return Ok(Flow::Yield);
            }

            Op::Random => {
                let max = t.pop()?;
                let min = t.pop()?;
                t.push(host.random(min, max))?;
            }
            Op::ThingCount => {
                let tid = t.pop()?;
                let kind = t.pop()?;
                t.push(host.thing_count(kind, tid))?;
            }
            Op::ChangeFloor | Op::ChangeCeiling => {
                let name = t.pop()?;
                let tag = t.pop()?;
                let flat = unit_string(unit, world, name);
                if op == Op::ChangeFloor {
                    host.change_floor(tag, &flat);
                } else {
                    host.change_ceiling(tag, &flat);
                }
            }
            Op::LineSide => {
                let v = host.line_side(&t.trigger);
                t.push(v)?;
            }
            Op::ClearLineSpecial => host.clear_line_special(&t.trigger),
            Op::SetLineTexture => {
                let texture = t.pop()?;
                let position = t.pop()?;
                let side = t.pop()?;
                let line = t.pop()?;
                let name = unit_string(unit, world, texture);
                host.set_line_texture(line, side, position, &name);
            }
            Op::SetLineBlocking => {
                let blocking = t.pop()?;
                let line = t.pop()?;
                host.set_line_blocking(line, blocking != 0);
            }
            Op::SetLineSpecial => {
                let mut args = [0i32; 5];
                for i in (0..5).rev() {
                    args[i] = t.pop()?;
                }
                let special = t.pop()?;
                let line = t.pop()?;
                host.set_line_special(line, special, &args);
            }
            Op::SectorSound => {
                let volume = t.pop()?;
                let name = t.pop()?;
                let s = unit_string(unit, world, name);
                host.sector_sound(&s, volume, &t.trigger);
            }
            Op::AmbientSound => {
                let volume = t.pop()?;
                let name = t.pop()?;
                let s = unit_string(unit, world, name);
                host.ambient_sound(&s, volume);
            }
            Op::SoundSequence => {
                let name = t.pop()?;
                let s = unit_string(unit, world, name);
                host.sound_sequence(&s, &t.trigger);
            }
            Op::ThingSound => {
                let volume = t.pop()?;
                let name = t.pop()?;
                let tid = t.pop()?;
                let s = unit_string(unit, world, name);
                host.thing_sound(tid, &s, volume);
            }
            Op::PlayerCount => {
                let v = host.player_count();
                t.push(v)?;
            }
            Op::GameType => {
                let v = host.game_type();
                t.push(v)?;
            }
            Op::GameSkill => {
                let v = host.game_skill();
                t.push(v)?;
            }
            Op::Timer => {
                let v = host.timer();
                t.push(v)?;
            }

            Op::BeginPrint => t.print_buf.clear(),
            Op::EndPrint | Op::EndPrintBold => {
                let msg = std::mem::take(&mut t.print_buf);
                host.print(&msg, op == Op::EndPrintBold);
            }
            Op::PrintString => {
                let idx = t.pop()?;
                let s = unit_string(unit, world, idx);
                t.print_buf.push_str(&s);
            }
            Op::PrintNumber => {
                let v = t.pop()?;
                t.print_buf.push_str(&v.to_string());
            }
            Op::PrintCharacter => {
                let v = t.pop()?;
                let c = u32::try_from(v).ok().and_then(char::from_u32).unwrap_or('?');
                t.print_buf.push(c);
            }

            Op::Call | Op::CallDiscard => {
                let target = fetch(&unit.code, ip);
                ip = ip.wrapping_add(1);
                if target <= 0 {
                    warn!(
                        "{}: script {} called an unmapped function",
                        unit.lump_name, t.number
                    );
                    return Ok(Flow::Stop);
                }
                t.frames.push(crate::thread::CallFrame {
                    return_ip: ip,
                    locals: std::mem::replace(&mut t.locals, vec![0; SCRIPT_LOCALS]),
                    print_buf: std::mem::take(&mut t.print_buf),
                    discard: op == Op::CallDiscard,
                });
                branch(&mut ip, target)?;
            }
            Op::ReturnVoid | Op::ReturnVal => {
                let value = if op == Op::ReturnVal { t.pop()? } else { 0 };
                let frame = match t.frames.pop() {
                    Some(f) => f,
                    None => return Ok(Flow::Stop),
                };
                t.locals = frame.locals;
                t.print_buf = frame.print_buf;
                if !frame.discard {
                    t.push(value)?;
                }
                ip = frame.return_ip;
            }
        }

        t.ip = ip;
    }
}

/// Unit-relative string lookup, copied out so host calls need no borrow of
/// the world. Indices outside the unit's own range resolve to the empty
/// string; the shared pool holds other units' strings right after ours.
fn unit_string(unit: &Unit, world: &WorldContext, idx: i32) -> String {
    match usize::try_from(idx) {
        Ok(i) if i < unit.string_count => world
            .string(unit.string_base, idx)
            .unwrap_or("")
            .to_owned(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{NullHost, Trigger};
    use crate::unit::{ScriptDef, ScriptKind, UnitId};

    fn unit_with(code: Vec<i32>) -> Unit {
        let mut u = Unit::unloaded(UnitId(0), "TEST");
        u.code = code;
        u.scripts.push(ScriptDef {
            number: 1,
            kind: ScriptKind::Closed,
            arg_count: 0,
            local_count: SCRIPT_LOCALS,
            entry: 1,
        });
        u.loaded = true;
        u
    }

    fn thread_at(entry: u32) -> ScriptThread {
        ScriptThread::new(UnitId(0), 0, 1, entry, Trigger::default())
    }

    #[test]
    fn arithmetic_and_terminate() {
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            6,
            Op::Push as i32,
            7,
            Op::Multiply as i32,
            Op::AssignMap as i32,
            0,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        let r = advance(&mut t, &mut u, &mut w, &mut NullHost);
        assert_eq!(r, Advance::Stopped);
        assert_eq!(u.map_var(0), 42);
    }

    #[test]
    fn divide_by_zero_faults() {
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            1,
            Op::Push as i32,
            0,
            Op::Divide as i32,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        let r = advance(&mut t, &mut u, &mut w, &mut NullHost);
        assert_eq!(r, Advance::Faulted(ScriptFault::DivideByZero));
    }

    #[test]
    fn goto_transfers_control() {
        // entry: Goto 5, skipping the assignment of 1; lands on map0 = 2
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Goto as i32,
            5,
            Op::Push as i32, // 3: skipped
            1,
            Op::Push as i32, // 5
            2,
            Op::AssignMap as i32,
            0,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
        assert_eq!(u.map_var(0), 2);
        assert!(t.stack.is_empty());
    }

    #[test]
    fn runaway_loop_faults() {
        // entry: Goto entry
        let mut u = unit_with(vec![Op::Kill as i32, Op::Goto as i32, 1, Op::Kill as i32]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        let r = advance(&mut t, &mut u, &mut w, &mut NullHost);
        assert_eq!(r, Advance::Faulted(ScriptFault::Runaway));
    }

    #[test]
    fn delay_yields_with_remaining_tics() {
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            35,
            Op::Delay as i32,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        let r = advance(&mut t, &mut u, &mut w, &mut NullHost);
        assert_eq!(r, Advance::Continue);
        assert_eq!(t.delay, 35);
        assert_eq!(t.ip, 4);
    }

    #[test]
    fn zero_delay_does_not_yield() {
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            0,
            Op::Delay as i32,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
    }

    #[test]
    fn case_table_binary_search_jumps() {
        // switch (7): 3 -> dead, 7 -> set map[1]=1, 9 -> dead
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            7,
            Op::CaseTable as i32,
            3,
            3,
            0,
            7,
            12,
            9,
            0,
            Op::Terminate as i32, // 11: fallthrough
            Op::Push as i32,      // 12: matched arm
            1,
            Op::AssignMap as i32,
            1,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
        assert_eq!(u.map_var(1), 1);
        assert!(t.stack.is_empty());
    }

    #[test]
    fn case_table_miss_falls_through_keeping_value() {
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32,
            5,
            Op::CaseTable as i32,
            1,
            3,
            0,
            Op::AssignMap as i32, // fallthrough: map[2] = 5
            2,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
        assert_eq!(u.map_var(2), 5);
    }

    #[test]
    fn function_call_restores_caller_locals() {
        // entry: local0 = 9; CallDiscard f; map0 = local0; Terminate
        // f: local0 = 1; ReturnVoid
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::Push as i32, // 1
            9,
            Op::AssignLocal as i32,
            0,
            Op::CallDiscard as i32, // 5
            12,
            Op::PushLocal as i32, // 7
            0,
            Op::AssignMap as i32,
            0,
            Op::Terminate as i32, // 11
            Op::Push as i32,      // 12: f
            1,
            Op::AssignLocal as i32,
            0,
            Op::ReturnVoid as i32,
            Op::Kill as i32,
        ]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
        assert_eq!(u.map_var(0), 9);
        assert!(t.stack.is_empty());
    }

    #[test]
    fn return_outside_function_stops() {
        let mut u = unit_with(vec![Op::Kill as i32, Op::ReturnVoid as i32, Op::Kill as i32]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut NullHost), Advance::Stopped);
    }

    #[test]
    fn stack_underflow_faults() {
        let mut u = unit_with(vec![Op::Kill as i32, Op::Drop as i32, Op::Kill as i32]);
        let mut t = thread_at(1);
        let mut w = WorldContext::new();
        assert_eq!(
            advance(&mut t, &mut u, &mut w, &mut NullHost),
            Advance::Faulted(ScriptFault::StackUnderflow)
        );
    }

    #[test]
    fn string_index_cannot_reach_a_neighbour_unit() {
        struct Capture(Vec<String>);
        impl Host for Capture {
            fn print(&mut self, msg: &str, _bold: bool) {
                self.0.push(msg.to_owned());
            }
        }
        let mut w = WorldContext::new();
        let base = w.string_pool_len();
        w.add_string("mine".into());
        w.add_string("someone else's".into()); // next unit's string
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::BeginPrint as i32,
            Op::Push as i32,
            1, // one past this unit's range
            Op::PrintString as i32,
            Op::EndPrint as i32,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        u.string_base = base;
        u.string_count = 1;
        let mut t = thread_at(1);
        let mut host = Capture(Vec::new());
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut host), Advance::Stopped);
        assert_eq!(host.0, vec![String::new()]);
    }

    #[test]
    fn print_pipeline_collects_message() {
        struct Capture(Vec<(String, bool)>);
        impl Host for Capture {
            fn print(&mut self, msg: &str, bold: bool) {
                self.0.push((msg.to_owned(), bold));
            }
        }
        let mut w = WorldContext::new();
        let base = w.string_pool_len();
        w.add_string("lives: ".into());
        let mut u = unit_with(vec![
            Op::Kill as i32,
            Op::BeginPrint as i32,
            Op::Push as i32,
            0,
            Op::PrintString as i32,
            Op::Push as i32,
            3,
            Op::PrintNumber as i32,
            Op::EndPrintBold as i32,
            Op::Terminate as i32,
            Op::Kill as i32,
        ]);
        u.string_base = base;
        u.string_count = 1;
        let mut t = thread_at(1);
        let mut host = Capture(Vec::new());
        assert_eq!(advance(&mut t, &mut u, &mut w, &mut host), Advance::Stopped);
        assert_eq!(host.0, vec![("lives: 3".to_owned(), true)]);
    }
}
