//! Object-lump loader: header and directory validation, string interning,
//! then handoff to the trace/translate pipeline.
//!
//! Malformed input never fails the load. A short, foreign or corrupt lump
//! yields an unloaded unit the rest of the engine can hold without
//! special-casing. The only hard error is a translation desync, which
//! means the pipeline itself is broken.

use anyhow::{bail, Context, Result};
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::error::AcsError;
use crate::trace::trace;
use crate::translate::translate;
use crate::unit::{ScriptDef, ScriptKind, Unit, UnitId, MAX_SCRIPT_ARGS};
use crate::world::WorldContext;

/// Magic + directory offset + the directory's two count words.
const MIN_LUMP: usize = 16;
const SCRIPT_RECORD: usize = 12;

struct Directory {
    scripts: Vec<RawScript>,
    string_offsets: Vec<usize>,
}

struct RawScript {
    number: i32,
    offset: usize,
    argc: u32,
}

fn parse_directory(bytes: &[u8]) -> Result<Option<Directory>> {
    if &bytes[0..4] != b"ACS\0" {
        bail!("bad magic {:02x?}", &bytes[0..4]);
    }
    let dir_offset = LittleEndian::read_u32(&bytes[4..8]) as usize;

    // an extended-format container carries its real magic just before the
    // directory; those lumps belong to a sibling loader
    if dir_offset >= 8 && dir_offset <= bytes.len() {
        let tag = &bytes[dir_offset - 4..dir_offset];
        if tag == b"ACSE" || tag == b"ACSe" {
            return Ok(None);
        }
    }

    // all bounds by subtraction from len, so a huge offset cannot wrap
    let len = bytes.len();
    if dir_offset > len.saturating_sub(4) {
        bail!("directory offset {dir_offset} out of range for {len}-byte lump");
    }
    let script_count = LittleEndian::read_i32(&bytes[dir_offset..dir_offset + 4]);
    let script_count =
        usize::try_from(script_count).with_context(|| format!("script count {script_count}"))?;
    if script_count > (len - dir_offset - 4) / SCRIPT_RECORD {
        bail!("script table of {script_count} records overruns lump");
    }
    let scripts_end = dir_offset + 4 + script_count * SCRIPT_RECORD;

    let mut scripts = Vec::with_capacity(script_count);
    for i in 0..script_count {
        let rec = dir_offset + 4 + i * SCRIPT_RECORD;
        scripts.push(RawScript {
            number: LittleEndian::read_i32(&bytes[rec..rec + 4]),
            offset: LittleEndian::read_u32(&bytes[rec + 4..rec + 8]) as usize,
            argc: LittleEndian::read_u32(&bytes[rec + 8..rec + 12]),
        });
    }

    if scripts_end > len.saturating_sub(4) {
        bail!("no room for string count");
    }
    let string_count = LittleEndian::read_i32(&bytes[scripts_end..scripts_end + 4]);
    let string_count =
        usize::try_from(string_count).with_context(|| format!("string count {string_count}"))?;
    if string_count > (len - scripts_end - 4) / 4 {
        bail!("string table of {string_count} offsets overruns lump");
    }
    let mut string_offsets = Vec::with_capacity(string_count);
    for i in 0..string_count {
        let at = scripts_end + 4 + i * 4;
        string_offsets.push(LittleEndian::read_u32(&bytes[at..at + 4]) as usize);
    }

    Ok(Some(Directory {
        scripts,
        string_offsets,
    }))
}

fn read_string(bytes: &[u8], offset: usize) -> Option<String> {
    let tail = bytes.get(offset..)?;
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Some(String::from_utf8_lossy(&tail[..end]).into_owned())
}

/// Load one object lump into a [`Unit`].
///
/// Returns an unloaded unit for anything the parser rejects; propagates
/// only internal translation errors.
pub fn load_unit(
    world: &mut WorldContext,
    id: UnitId,
    lump_name: &str,
    bytes: &[u8],
) -> Result<Unit, AcsError> {
    let mut unit = Unit::unloaded(id, lump_name);
    if bytes.len() < MIN_LUMP {
        debug!("{lump_name}: {} bytes, no scripts", bytes.len());
        return Ok(unit);
    }

    let dir = match parse_directory(bytes) {
        Ok(Some(dir)) => dir,
        Ok(None) => {
            // TODO: route extended-format lumps to the chunked loader once
            // it exists
            debug!("{lump_name}: extended-format lump, skipping");
            return Ok(unit);
        }
        Err(e) => {
            warn!("{lump_name}: malformed object lump: {e:#}");
            return Ok(unit);
        }
    };

    unit.string_base = world.string_pool_len();
    unit.string_count = dir.string_offsets.len();
    for &off in &dir.string_offsets {
        match read_string(bytes, off) {
            Some(s) => {
                world.add_string(s);
            }
            None => {
                // keep indices aligned even when one offset is garbage
                warn!("{lump_name}: string offset {off} out of range");
                world.add_string(String::new());
            }
        }
    }

    for raw in &dir.scripts {
        let (number, kind) = if raw.number >= 1000 {
            (raw.number - 1000, ScriptKind::Open)
        } else {
            (raw.number, ScriptKind::Closed)
        };
        let argc = raw.argc as usize;
        let argc = if argc > MAX_SCRIPT_ARGS {
            warn!(
                "{lump_name}: script {number} declares {argc} args, clamping to {MAX_SCRIPT_ARGS}"
            );
            MAX_SCRIPT_ARGS
        } else {
            argc
        };
        unit.scripts.push(ScriptDef {
            number,
            kind,
            arg_count: argc,
            local_count: crate::unit::SCRIPT_LOCALS,
            entry: 0,
        });
    }

    let compressed = false; // baseline lumps always use word opcodes
    let entries: Vec<usize> = dir.scripts.iter().map(|s| s.offset).collect();
    let traced = trace(bytes, compressed, &entries);
    let (code, offset_map) = translate(bytes, compressed, &traced)?;

    for (def, raw) in unit.scripts.iter_mut().zip(&dir.scripts) {
        def.entry = offset_map.get(raw.offset).copied().unwrap_or(0);
        if def.entry == 0 {
            warn!(
                "{lump_name}: script {} entry offset {} is unmapped",
                def.number, raw.offset
            );
        }
    }

    unit.code = code;
    unit.loaded = true;
    Ok(unit)
}
