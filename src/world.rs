//! Process-wide script state: world and global scopes plus the string
//! pool.
//!
//! Nothing here is static. The context is created by the embedder and
//! threaded through loading and execution explicitly, so two independent
//! games can coexist in one process.

use crate::sparse::SparseArray;

pub const WORLD_VAR_COUNT: usize = 64;
pub const GLOBAL_VAR_COUNT: usize = 64;
pub const WORLD_ARRAY_COUNT: usize = 64;
pub const GLOBAL_ARRAY_COUNT: usize = 64;

/// State shared by every unit and thread of one game.
pub struct WorldContext {
    pub world_vars: [i32; WORLD_VAR_COUNT],
    pub global_vars: [i32; GLOBAL_VAR_COUNT],
    world_arrays: Vec<SparseArray>,
    global_arrays: Vec<SparseArray>,
    /// Append-only. Units hold a base index into it; indices stay valid
    /// for the life of the context.
    strings: Vec<String>,
}

impl Default for WorldContext {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldContext {
    pub fn new() -> Self {
        WorldContext {
            world_vars: [0; WORLD_VAR_COUNT],
            global_vars: [0; GLOBAL_VAR_COUNT],
            world_arrays: (0..WORLD_ARRAY_COUNT).map(|_| SparseArray::new()).collect(),
            global_arrays: (0..GLOBAL_ARRAY_COUNT)
                .map(|_| SparseArray::new())
                .collect(),
            strings: Vec::new(),
        }
    }

    /// Reset world-scope state for a fresh game. Global scope survives;
    /// call [`clear_global`](Self::clear_global) separately for a full
    /// wipe.
    pub fn new_game(&mut self) {
        self.world_vars = [0; WORLD_VAR_COUNT];
        for a in &mut self.world_arrays {
            a.clear();
        }
    }

    pub fn clear_global(&mut self) {
        self.global_vars = [0; GLOBAL_VAR_COUNT];
        for a in &mut self.global_arrays {
            a.clear();
        }
    }

    pub fn world_var(&self, idx: i32) -> i32 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.world_vars.get(i).copied())
            .unwrap_or(0)
    }

    pub fn set_world_var(&mut self, idx: i32, value: i32) {
        if let Ok(i) = usize::try_from(idx) {
            if let Some(slot) = self.world_vars.get_mut(i) {
                *slot = value;
            }
        }
    }

    pub fn global_var(&self, idx: i32) -> i32 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| self.global_vars.get(i).copied())
            .unwrap_or(0)
    }

    pub fn set_global_var(&mut self, idx: i32, value: i32) {
        if let Ok(i) = usize::try_from(idx) {
            if let Some(slot) = self.global_vars.get_mut(i) {
                *slot = value;
            }
        }
    }

    pub fn world_array(&self, idx: i32, element: i32) -> i32 {
        match usize::try_from(idx).ok().and_then(|i| self.world_arrays.get(i)) {
            Some(a) => a.get(element as u32),
            None => 0,
        }
    }

    pub fn set_world_array(&mut self, idx: i32, element: i32, value: i32) {
        if let Some(a) = usize::try_from(idx)
            .ok()
            .and_then(|i| self.world_arrays.get_mut(i))
        {
            a.set(element as u32, value);
        }
    }

    pub fn global_array(&self, idx: i32, element: i32) -> i32 {
        match usize::try_from(idx)
            .ok()
            .and_then(|i| self.global_arrays.get(i))
        {
            Some(a) => a.get(element as u32),
            None => 0,
        }
    }

    pub fn set_global_array(&mut self, idx: i32, element: i32, value: i32) {
        if let Some(a) = usize::try_from(idx)
            .ok()
            .and_then(|i| self.global_arrays.get_mut(i))
        {
            a.set(element as u32, value);
        }
    }

    pub fn string_pool_len(&self) -> usize {
        self.strings.len()
    }

    /// Intern a string, returning its pool index.
    pub fn add_string(&mut self, s: String) -> usize {
        self.strings.push(s);
        self.strings.len() - 1
    }

    /// Look up a unit-relative string: `base` is the unit's first pool
    /// index, `idx` the script-supplied string number.
    pub fn string(&self, base: usize, idx: i32) -> Option<&str> {
        let i = usize::try_from(idx).ok()?;
        self.strings.get(base.checked_add(i)?).map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_game_preserves_global_scope() {
        let mut w = WorldContext::new();
        w.set_world_var(3, 7);
        w.set_global_var(3, 9);
        w.set_world_array(0, 100, 1);
        w.set_global_array(0, 100, 2);
        w.new_game();
        assert_eq!(w.world_var(3), 0);
        assert_eq!(w.world_array(0, 100), 0);
        assert_eq!(w.global_var(3), 9);
        assert_eq!(w.global_array(0, 100), 2);
    }

    #[test]
    fn out_of_range_scope_access_is_inert() {
        let mut w = WorldContext::new();
        w.set_world_var(-1, 5);
        w.set_world_var(1000, 5);
        assert_eq!(w.world_var(-1), 0);
        assert_eq!(w.world_var(1000), 0);
    }

    #[test]
    fn strings_resolve_relative_to_base() {
        let mut w = WorldContext::new();
        let base = w.add_string("first".into());
        w.add_string("second".into());
        assert_eq!(w.string(base, 1), Some("second"));
        assert_eq!(w.string(base, 2), None);
        assert_eq!(w.string(base, -1), None);
    }
}
