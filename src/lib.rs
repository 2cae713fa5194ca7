//! Loader, translator and cooperative interpreter for legacy map-script
//! object lumps.
//!
//! A raw lump goes through three stages: the [`loader`] validates the
//! header and directory, the [`trace`]/[`translate`] pair rewrites the
//! variable-width legacy bytecode into fixed-width internal words, and the
//! [`scheduler`] runs the resulting scripts as cooperative threads, one
//! slice per game tick. The embedding engine supplies a [`Host`]
//! implementation for everything that touches the world.
//!
//! ```no_run
//! use acsvm::{NullHost, Scheduler, WorldContext};
//!
//! let mut world = WorldContext::new();
//! let mut host = NullHost;
//! let mut scheduler = Scheduler::new(1);
//! let lump = std::fs::read("BEHAVIOR.lmp").unwrap();
//! scheduler.load(&mut world, "BEHAVIOR", &lump).unwrap();
//! loop {
//!     scheduler.tick(&mut world, &mut host);
//! }
//! ```

pub mod error;
pub mod host;
pub mod interp;
pub mod loader;
pub mod opcode;
pub mod scheduler;
pub mod sparse;
pub mod thread;
pub mod trace;
pub mod translate;
pub mod unit;
pub mod world;

pub use error::{AcsError, ScriptFault};
pub use host::{ActorId, Host, LineId, NullHost, Trigger};
pub use interp::Advance;
pub use loader::load_unit;
pub use opcode::{Op, Pcode};
pub use scheduler::{DeferredAction, DeferredKind, Scheduler};
pub use sparse::SparseArray;
pub use thread::{ScriptThread, ThreadState};
pub use unit::{ScriptDef, ScriptKind, Unit, UnitId};
pub use world::WorldContext;
