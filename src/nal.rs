//! NAL unit location and per-unit block decryption inside a reassembled
//! PES buffer.

use crate::constants::{
    CIPHER_BLOCK_LEN, CIPHER_BLOCK_STRIDE, NAL_SLICE_EXT, NAL_SLICE_IDR, NAL_SLICE_NON_IDR,
    UNIT_BLOCKS_OFFSET, UNIT_KEY_LEN, UNIT_KEY_OFFSET,
};
use crate::tea;

/// Counters accumulated while walking one reassembled PES buffer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NalStats {
    /// Units delimited by Annex-B start codes
    pub nal_units: u64,
    /// Units whose type gated them into the decryption path
    pub slice_units: u64,
    /// 8-byte cipher blocks decrypted
    pub decrypted_blocks: u64,
}

impl NalStats {
    pub fn accumulate(&mut self, other: NalStats) {
        self.nal_units += other.nal_units;
        self.slice_units += other.slice_units;
        self.decrypted_blocks += other.decrypted_blocks;
    }
}

/// Remove emulation prevention bytes: `00 00 03` becomes `00 00`.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut v = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if i + 2 < data.len() && data[i] == 0 && data[i + 1] == 0 && data[i + 2] == 3 {
            v.push(0);
            v.push(0);
            i += 3;
        } else {
            v.push(data[i]);
            i += 1;
        }
    }
    v
}

/// Find the next Annex-B start code (`00 00 01`, tolerating the 4-byte
/// `00 00 00 01` form) at or after `from`; returns `data.len()` if none.
///
/// The stride depends on the third byte of the window: 0x00 may prefix a
/// later code (+2 after probing the +1 position), 0x01 either confirms a
/// code at the current position or rules the window out (+3), anything
/// else rules it out (+3).
pub fn find_nal_unit_start(data: &[u8], from: usize) -> usize {
    let total = data.len();
    let mut pos = from;
    while pos + 2 < total {
        match data[pos + 2] {
            0x00 => {
                if pos + 3 < total && data[pos + 1] == 0x00 && data[pos + 3] == 0x01 {
                    return pos + 1;
                }
                pos += 2;
            }
            0x01 => {
                if data[pos] == 0x00 && data[pos + 1] == 0x00 {
                    return pos;
                }
                pos += 3;
            }
            _ => pos += 3,
        }
    }
    total
}

/// De-stuff one NAL unit (header byte included) and decrypt its cipher
/// blocks: the key is read from bytes [16, 32) of the filtered unit, and
/// one 8-byte block every 80 bytes from offset 32 is decrypted in place.
///
/// Units too short to hold the key region plus one block come back with
/// only the stuffing removed.
pub fn decrypt_nal_unit(unit: &[u8]) -> Vec<u8> {
    let mut out = remove_emulation_prevention(unit);

    let iterations = out.len().saturating_sub(UNIT_BLOCKS_OFFSET) / CIPHER_BLOCK_STRIDE;
    if iterations == 0 {
        return out;
    }

    let key = read_key(&out[UNIT_KEY_OFFSET..UNIT_KEY_OFFSET + UNIT_KEY_LEN]);
    for i in 0..iterations {
        let offset = UNIT_BLOCKS_OFFSET + i * CIPHER_BLOCK_STRIDE;
        let block = [read_u32_le(&out, offset), read_u32_le(&out, offset + 4)];
        let plain = tea::decrypt_block(block, key);
        out[offset..offset + 4].copy_from_slice(&plain[0].to_le_bytes());
        out[offset + 4..offset + CIPHER_BLOCK_LEN].copy_from_slice(&plain[1].to_le_bytes());
    }

    out
}

/// Walk the NAL units of a reassembled PES buffer and decrypt the slice
/// units (types 1, 5, 25) in place.
///
/// The filtered unit may be shorter than its original span; only
/// `len(filtered)` bytes are written back, and the original trailing bytes
/// of the span keep their previous values.
pub fn process_nal_array(data: &mut [u8]) -> NalStats {
    let mut stats = NalStats::default();
    let total = data.len();
    let mut begin = 0;

    while begin < total {
        // skip the 3-byte start-code marker; the header byte sits right after
        begin += 3;
        if begin >= total {
            break;
        }
        let end = find_nal_unit_start(data, begin + 1);
        stats.nal_units += 1;

        let nal_unit_type = data[begin] & 0x1F;
        if matches!(
            nal_unit_type,
            NAL_SLICE_NON_IDR | NAL_SLICE_IDR | NAL_SLICE_EXT
        ) {
            let processed = decrypt_nal_unit(&data[begin..end]);
            stats.slice_units += 1;
            stats.decrypted_blocks +=
                (processed.len().saturating_sub(UNIT_BLOCKS_OFFSET) / CIPHER_BLOCK_STRIDE) as u64;
            data[begin..begin + processed.len()].copy_from_slice(&processed);
        }

        begin = end;
    }

    stats
}

fn read_u32_le(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn read_key(bytes: &[u8]) -> [u32; 4] {
    [
        read_u32_le(bytes, 0),
        read_u32_le(bytes, 4),
        read_u32_le(bytes, 8),
        read_u32_le(bytes, 12),
    ]
}
