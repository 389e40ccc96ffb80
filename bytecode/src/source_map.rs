//! Delta-encoded VLQ source map: maps bytecode PCs to source lines.
//!
//! Each entry is 2 VLQ values:
//! - `delta_pc` (unsigned VLQ)
//! - `delta_line` (signed, zigzag + VLQ)

/// Accumulates source map entries during compilation.
#[derive(Debug, Default)]
pub struct SourceMapBuilder {
    entries: Vec<(u32, u32)>, // (pc, line)
}

impl SourceMapBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record that the instruction at `pc` came from `line`. Consecutive
    /// instructions on the same line share one entry.
    pub fn add(&mut self, pc: u32, line: u32) {
        if self.entries.last().is_some_and(|&(_, last)| last == line) {
            return;
        }
        self.entries.push((pc, line));
    }

    /// Produce the delta-encoded VLQ byte stream.
    pub fn finish(self) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut prev_pc: u32 = 0;
        let mut prev_line: i64 = 0;

        for &(pc, line) in &self.entries {
            encode_unsigned_vlq(pc - prev_pc, &mut buf);
            encode_unsigned_vlq(zigzag_encode(line as i64 - prev_line), &mut buf);
            prev_pc = pc;
            prev_line = line as i64;
        }

        buf
    }
}

/// Look up the source line for `target_pc` in a delta-encoded source map:
/// the line of the last entry with `pc <= target_pc`.
pub fn source_map_lookup(encoded: &[u8], target_pc: u32) -> Option<u32> {
    let mut pos = 0;
    let mut pc: u32 = 0;
    let mut line: i64 = 0;
    let mut best = None;

    while pos < encoded.len() {
        let delta_pc = decode_unsigned_vlq(encoded, &mut pos)?;
        let delta_line = zigzag_decode(decode_unsigned_vlq(encoded, &mut pos)?);

        pc += delta_pc;
        line += delta_line;

        if pc > target_pc {
            break;
        }
        best = Some(line as u32);
    }

    best
}

// ── VLQ helpers ─────────────────────────────────────────────────────

/// Each byte uses 7 data bits + 1 continuation bit (MSB).
fn encode_unsigned_vlq(mut value: u32, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Advances `pos` past the consumed bytes.
fn decode_unsigned_vlq(encoded: &[u8], pos: &mut usize) -> Option<u32> {
    let mut result: u32 = 0;
    let mut shift = 0;
    loop {
        let byte = *encoded.get(*pos)?;
        *pos += 1;
        result |= ((byte & 0x7F) as u32) << shift;
        if byte & 0x80 == 0 {
            return Some(result);
        }
        shift += 7;
        if shift >= 35 {
            return None; // overflow
        }
    }
}

fn zigzag_encode(value: i64) -> u32 {
    ((value << 1) ^ (value >> 63)) as u32
}

fn zigzag_decode(value: u32) -> i64 {
    ((value >> 1) as i64) ^ (-((value & 1) as i64))
}
