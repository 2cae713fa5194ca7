//! A loaded behavior unit: translated code, script directory and
//! map-scope state for one object lump.

use crate::sparse::SparseArray;

pub const MAX_MAP_VARS: usize = 32;
pub const MAX_MAP_ARRAYS: usize = 32;
pub const MAX_SCRIPT_ARGS: usize = 3;
pub const SCRIPT_LOCALS: usize = 10;

/// Index of a unit within its scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Runs when started by a line, thing or console.
    Closed,
    /// Started automatically when the unit loads.
    Open,
}

/// One entry of a unit's script directory.
#[derive(Debug, Clone)]
pub struct ScriptDef {
    pub number: i32,
    pub kind: ScriptKind,
    pub arg_count: usize,
    pub local_count: usize,
    /// Word offset of the first instruction in the unit's internal code.
    pub entry: u32,
}

/// One entry of a unit's function directory.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub arg_count: usize,
    pub local_count: usize,
    pub entry: u32,
}

pub struct Unit {
    pub id: UnitId,
    pub lump_name: String,
    /// False when the lump was absent, truncated or not a script lump.
    /// An unloaded unit is inert but safe to query.
    pub loaded: bool,
    /// Internal fixed-width code. Word 0 is always a kill sentinel so a
    /// zeroed or unresolved jump lands somewhere harmless.
    pub code: Vec<i32>,
    pub scripts: Vec<ScriptDef>,
    pub functions: Vec<FunctionDef>,
    pub map_vars: [i32; MAX_MAP_VARS],
    pub map_arrays: Vec<SparseArray>,
    /// First pool index of this unit's strings in the world context.
    pub string_base: usize,
    pub string_count: usize,
}

impl Unit {
    pub fn unloaded(id: UnitId, lump_name: &str) -> Self {
        Unit {
            id,
            lump_name: lump_name.to_owned(),
            loaded: false,
            code: Vec::new(),
            scripts: Vec::new(),
            functions: Vec::new(),
            map_vars: [0; MAX_MAP_VARS],
            map_arrays: (0..MAX_MAP_ARRAYS).map(|_| SparseArray::new()).collect(),
            string_base: 0,
            string_count: 0,
        }
    }

    pub fn script_index(&self, number: i32) -> Option<usize> {
        self.scripts.iter().position(|s| s.number == number)
    }

    /// Reset map scope for a fresh visit to this unit's map.
    pub fn reset(&mut self) {
        self.map_vars = [0; MAX_MAP_VARS];
        for a in &mut self.map_arrays {
            a.clear();
        }
    }

    pub fn map_var(&self, idx: i32) -> i32 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.map_vars.get(i).copied())
            .unwrap_or(0)
    }

    pub fn set_map_var(&mut self, idx: i32, value: i32) {
        if let Ok(i) = usize::try_from(idx) {
            if let Some(slot) = self.map_vars.get_mut(i) {
                *slot = value;
            }
        }
    }

    pub fn map_array(&self, idx: i32, element: i32) -> i32 {
        match usize::try_from(idx).ok().and_then(|i| self.map_arrays.get(i)) {
            Some(a) => a.get(element as u32),
            None => 0,
        }
    }

    pub fn set_map_array(&mut self, idx: i32, element: i32, value: i32) {
        if let Some(a) = usize::try_from(idx)
            .ok()
            .and_then(|i| self.map_arrays.get_mut(i))
        {
            a.set(element as u32, value);
        }
    }
}
