//! Builds synthetic object lumps for the loader tests.

use acsvm::Pcode;

/// Assembles a baseline (word-opcode) object lump: magic, directory
/// offset, code, then the script and string tables.
pub struct LumpBuilder {
    code: Vec<u8>,
    scripts: Vec<(i32, u32, u32)>,
    strings: Vec<Vec<u8>>,
}

impl Default for LumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LumpBuilder {
    pub fn new() -> Self {
        LumpBuilder {
            code: Vec::new(),
            scripts: Vec::new(),
            strings: Vec::new(),
        }
    }

    /// Byte offset the next emitted instruction will land at.
    pub fn here(&self) -> i32 {
        (8 + self.code.len()) as i32
    }

    pub fn op(&mut self, p: Pcode) -> &mut Self {
        self.word(p as i32)
    }

    pub fn word(&mut self, w: i32) -> &mut Self {
        self.code.extend_from_slice(&w.to_le_bytes());
        self
    }

    /// Declare a script whose code starts at the current position.
    pub fn script(&mut self, number: i32, argc: u32) -> &mut Self {
        let offset = self.here() as u32;
        self.scripts.push((number, offset, argc));
        self
    }

    /// Intern a string, returning its script-visible index.
    pub fn string(&mut self, s: &str) -> i32 {
        self.strings.push(s.as_bytes().to_vec());
        (self.strings.len() - 1) as i32
    }

    pub fn build(&self) -> Vec<u8> {
        let dir_offset = 8 + self.code.len();
        let mut out = Vec::new();
        out.extend_from_slice(b"ACS\0");
        out.extend_from_slice(&(dir_offset as u32).to_le_bytes());
        out.extend_from_slice(&self.code);

        out.extend_from_slice(&(self.scripts.len() as i32).to_le_bytes());
        for &(number, offset, argc) in &self.scripts {
            out.extend_from_slice(&number.to_le_bytes());
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&argc.to_le_bytes());
        }

        out.extend_from_slice(&(self.strings.len() as i32).to_le_bytes());
        let mut data_at = out.len() + 4 * self.strings.len();
        for s in &self.strings {
            out.extend_from_slice(&(data_at as u32).to_le_bytes());
            data_at += s.len() + 1;
        }
        for s in &self.strings {
            out.extend_from_slice(s);
            out.push(0);
        }
        out
    }
}
