//! Seam between the interpreter and the surrounding engine.
//!
//! Every world-visible effect a script can cause goes through [`Host`].
//! Defaults are inert so a harness only overrides what it observes.

use log::info;

/// Opaque handle for the map object that triggered a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActorId(pub u32);

/// Opaque handle for the map line that triggered a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineId(pub u32);

/// Activation context captured when a script starts and carried by its
/// thread for the thread's whole life.
#[derive(Debug, Clone, Copy, Default)]
pub struct Trigger {
    pub activator: Option<ActorId>,
    pub line: Option<LineId>,
    pub side: i32,
}

/// Engine services scripts call out to.
#[allow(unused_variables)]
pub trait Host {
    /// Run a line special. The return value is pushed when the caller
    /// expects one.
    fn execute_line_special(&mut self, special: i32, args: &[i32], trigger: &Trigger) -> i32 {
        0
    }

    fn thing_count(&mut self, kind: i32, tid: i32) -> i32 {
        0
    }

    /// True while any sector with this tag is still moving.
    fn tag_busy(&mut self, tag: i32) -> bool {
        false
    }

    /// True while the polyobject is still moving.
    fn poly_busy(&mut self, po: i32) -> bool {
        false
    }

    fn change_floor(&mut self, tag: i32, flat: &str) {}
    fn change_ceiling(&mut self, tag: i32, flat: &str) {}

    fn set_line_texture(&mut self, line: i32, side: i32, position: i32, texture: &str) {}
    fn set_line_blocking(&mut self, line: i32, blocking: bool) {}
    fn set_line_special(&mut self, line: i32, special: i32, args: &[i32; 5]) {}
    fn clear_line_special(&mut self, trigger: &Trigger) {}

    fn sector_sound(&mut self, name: &str, volume: i32, trigger: &Trigger) {}
    fn ambient_sound(&mut self, name: &str, volume: i32) {}
    fn sound_sequence(&mut self, name: &str, trigger: &Trigger) {}
    fn thing_sound(&mut self, tid: i32, name: &str, volume: i32) {}

    fn line_side(&mut self, trigger: &Trigger) -> i32 {
        trigger.side
    }

    /// Elapsed game tics.
    fn timer(&mut self) -> i32 {
        0
    }

    fn game_type(&mut self) -> i32 {
        0
    }

    fn game_skill(&mut self) -> i32 {
        0
    }

    fn player_count(&mut self) -> i32 {
        0
    }

    /// Inclusive on both ends.
    fn random(&mut self, min: i32, max: i32) -> i32 {
        min.min(max)
    }

    /// A finished print statement.
    fn print(&mut self, msg: &str, bold: bool) {
        if bold {
            info!("script print (bold): {msg}");
        } else {
            info!("script print: {msg}");
        }
    }
}

/// Host that does nothing. Used by tests and headless loading.
#[derive(Default)]
pub struct NullHost;

impl Host for NullHost {}
