//! Script lifecycle: unit registry, the owned thread collection, the tick
//! loop and cross-map deferred actions.
//!
//! Threads are plain values keyed by id in a `BTreeMap`, so one tick
//! visits them in a stable order and dropping a thread is just removal.

use std::collections::BTreeMap;

use log::{error, warn};

use crate::error::AcsError;
use crate::host::{Host, Trigger};
use crate::interp::{advance, Advance};
use crate::loader::load_unit;
use crate::thread::{ScriptThread, ThreadState};
use crate::unit::{ScriptKind, Unit, UnitId, MAX_SCRIPT_ARGS};
use crate::world::WorldContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredKind {
    Execute {
        args: [i32; MAX_SCRIPT_ARGS],
        always: bool,
    },
    Suspend,
    Terminate,
}

/// An action aimed at a map that is not the current one, replayed when
/// that map becomes current.
#[derive(Debug, Clone)]
pub struct DeferredAction {
    pub script: i32,
    pub unit: UnitId,
    pub map: i32,
    pub kind: DeferredKind,
}

pub struct Scheduler {
    units: Vec<Unit>,
    threads: BTreeMap<u32, ScriptThread>,
    next_thread_id: u32,
    deferred: Vec<DeferredAction>,
    current_map: i32,
}

impl Scheduler {
    pub fn new(current_map: i32) -> Self {
        Scheduler {
            units: Vec::new(),
            threads: BTreeMap::new(),
            next_thread_id: 0,
            deferred: Vec::new(),
            current_map,
        }
    }

    pub fn current_map(&self) -> i32 {
        self.current_map
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(id.0 as usize)
    }

    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    pub fn threads(&self) -> impl Iterator<Item = &ScriptThread> {
        self.threads.values()
    }

    /// Load an object lump and auto-start its open scripts.
    pub fn load(
        &mut self,
        world: &mut WorldContext,
        lump_name: &str,
        bytes: &[u8],
    ) -> Result<UnitId, AcsError> {
        let id = UnitId(self.units.len() as u32);
        let unit = load_unit(world, id, lump_name, bytes)?;
        for (idx, script) in unit.scripts.iter().enumerate() {
            if script.kind == ScriptKind::Open {
                self.spawn(id, idx, script.number, script.entry, &[], Trigger::default());
            }
        }
        self.units.push(unit);
        Ok(id)
    }

    fn spawn(
        &mut self,
        unit: UnitId,
        script: usize,
        number: i32,
        entry: u32,
        args: &[i32],
        trigger: Trigger,
    ) -> u32 {
        let mut t = ScriptThread::new(unit, script, number, entry, trigger);
        for (slot, &arg) in t.locals.iter_mut().zip(args.iter().take(MAX_SCRIPT_ARGS)) {
            *slot = arg;
        }
        let id = self.next_thread_id;
        self.next_thread_id += 1;
        self.threads.insert(id, t);
        id
    }

    fn defer(&mut self, script: i32, unit: UnitId, map: i32, kind: DeferredKind) -> bool {
        let dup = self.deferred.iter().any(|d| {
            d.script == script
                && d.map == map
                && std::mem::discriminant(&d.kind) == std::mem::discriminant(&kind)
        });
        if !dup {
            self.deferred.push(DeferredAction {
                script,
                unit,
                map,
                kind,
            });
        }
        true
    }

    /// Start script `number` of `unit` on `map`.
    ///
    /// A foreign map defers the start. A suspended instance resumes
    /// instead of starting fresh unless `always` is set; a running
    /// instance blocks a fresh start under the same rule.
    pub fn start_script(
        &mut self,
        unit: UnitId,
        number: i32,
        map: i32,
        args: &[i32],
        trigger: Trigger,
        always: bool,
    ) -> bool {
        if map != self.current_map {
            let mut a = [0i32; MAX_SCRIPT_ARGS];
            for (slot, &arg) in a.iter_mut().zip(args.iter().take(MAX_SCRIPT_ARGS)) {
                *slot = arg;
            }
            return self.defer(number, unit, map, DeferredKind::Execute { args: a, always });
        }

        let Some(u) = self.units.get(unit.0 as usize) else {
            warn!("start of script {number} on missing unit {}", unit.0);
            return false;
        };
        let Some(script) = u.script_index(number) else {
            warn!("{}: unknown script number {number}", u.lump_name);
            return false;
        };
        let entry = u.scripts[script].entry;

        if !always {
            let mut blocked = false;
            for t in self.threads.values_mut() {
                if t.unit != unit || t.number != number {
                    continue;
                }
                match t.state {
                    ThreadState::Suspended => {
                        t.state = ThreadState::Running;
                        return true;
                    }
                    ThreadState::PleaseRemove => {}
                    _ => blocked = true,
                }
            }
            if blocked {
                return false;
            }
        }

        self.spawn(unit, script, number, entry, args, trigger);
        true
    }

    /// Suspend every instance of the script, or defer the suspend for a
    /// foreign map.
    pub fn suspend_script(&mut self, unit: UnitId, number: i32, map: i32) -> bool {
        if map != self.current_map {
            return self.defer(number, unit, map, DeferredKind::Suspend);
        }
        let mut hit = false;
        for t in self.threads.values_mut() {
            if t.unit == unit && t.number == number && t.state != ThreadState::PleaseRemove {
                t.state = ThreadState::Suspended;
                hit = true;
            }
        }
        hit
    }

    pub fn terminate_script(&mut self, unit: UnitId, number: i32, map: i32) -> bool {
        if map != self.current_map {
            return self.defer(number, unit, map, DeferredKind::Terminate);
        }
        let mut hit = false;
        for t in self.threads.values_mut() {
            if t.unit == unit && t.number == number && t.state != ThreadState::PleaseRemove {
                t.state = ThreadState::PleaseRemove;
                hit = true;
            }
        }
        hit
    }

    /// Make `map` current and replay every action deferred for it.
    pub fn run_deferred(&mut self, map: i32) {
        self.current_map = map;
        let due: Vec<DeferredAction> = {
            let mut due = Vec::new();
            let mut i = 0;
            while i < self.deferred.len() {
                if self.deferred[i].map == map {
                    due.push(self.deferred.remove(i));
                } else {
                    i += 1;
                }
            }
            due
        };
        for action in due {
            // units can have been torn down since the action was queued
            let live = self
                .units
                .get(action.unit.0 as usize)
                .is_some_and(|u| u.loaded);
            if !live {
                warn!(
                    "deferred action for script {} on unloaded unit {}",
                    action.script, action.unit.0
                );
                continue;
            }
            match action.kind {
                DeferredKind::Execute { args, always } => {
                    self.start_script(
                        action.unit,
                        action.script,
                        map,
                        &args,
                        Trigger::default(),
                        always,
                    );
                }
                DeferredKind::Suspend => {
                    self.suspend_script(action.unit, action.script, map);
                }
                DeferredKind::Terminate => {
                    self.terminate_script(action.unit, action.script, map);
                }
            }
        }
    }

    /// Advance every thread by one game tick.
    pub fn tick(&mut self, world: &mut WorldContext, host: &mut dyn Host) {
        let ids: Vec<u32> = self.threads.keys().copied().collect();
        let mut finished: Vec<i32> = Vec::new();

        for id in ids {
            let Some(mut t) = self.threads.remove(&id) else {
                continue;
            };
            match t.state {
                ThreadState::PleaseRemove => {
                    finished.push(t.number);
                    continue;
                }
                ThreadState::Suspended => {
                    self.threads.insert(id, t);
                    continue;
                }
                ThreadState::WaitingForTag => {
                    if host.tag_busy(t.wait_value) {
                        self.threads.insert(id, t);
                        continue;
                    }
                    t.state = ThreadState::Running;
                }
                ThreadState::WaitingForPoly => {
                    if host.poly_busy(t.wait_value) {
                        self.threads.insert(id, t);
                        continue;
                    }
                    t.state = ThreadState::Running;
                }
                ThreadState::WaitingForScript => {
                    // woken by script termination, below
                    self.threads.insert(id, t);
                    continue;
                }
                ThreadState::Running => {}
            }

            if t.delay > 0 {
                t.delay -= 1;
                self.threads.insert(id, t);
                continue;
            }

            let Some(unit) = self.units.get_mut(t.unit.0 as usize) else {
                finished.push(t.number);
                continue;
            };
            match advance(&mut t, unit, world, host) {
                Advance::Continue => {
                    self.threads.insert(id, t);
                }
                Advance::Stopped => {
                    finished.push(t.number);
                }
                Advance::Faulted(fault) => {
                    error!(
                        "{}: script {} terminated: {fault}",
                        unit.lump_name, t.number
                    );
                    host.print(&format!("script {} terminated: {fault}", t.number), false);
                    finished.push(t.number);
                }
            }
        }

        for number in finished {
            self.wake_waiters(number);
        }
    }

    /// Wake ScriptWait sleepers once no live instance of `number`
    /// remains.
    fn wake_waiters(&mut self, number: i32) {
        let still_live = self
            .threads
            .values()
            .any(|t| t.number == number && t.state != ThreadState::PleaseRemove);
        if still_live {
            return;
        }
        for t in self.threads.values_mut() {
            if t.state == ThreadState::WaitingForScript && t.wait_value == number {
                t.state = ThreadState::Running;
            }
        }
    }

    /// Level teardown: drop all threads and units. World and global
    /// scopes are untouched; deferred actions for other maps survive.
    pub fn unload(&mut self) {
        self.threads.clear();
        self.units.clear();
    }

    /// Reset one unit's map scope for a fresh visit.
    pub fn reset_unit(&mut self, id: UnitId) {
        if let Some(u) = self.units.get_mut(id.0 as usize) {
            u.reset();
        }
    }
}
