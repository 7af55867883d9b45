//! Constants for MPEG-TS framing and the per-unit cipher layout

/// MPEG-TS packet constants
pub const TS_PACKET_SIZE: usize = 188;
pub const TS_SYNC_BYTE: u8 = 0x47;

/// Elementary stream PID carrying the protected video, unless overridden
pub const DEFAULT_VIDEO_PID: u16 = 0x100;

/// H.264 NAL unit types subject to decryption
pub const NAL_SLICE_NON_IDR: u8 = 1;
pub const NAL_SLICE_IDR: u8 = 5;
pub const NAL_SLICE_EXT: u8 = 25;

/// Cipher layout inside one de-stuffed NAL unit: the 128-bit key sits at
/// bytes [16, 32); one 8-byte block is decrypted every 80 bytes from
/// offset 32 on.
pub const UNIT_KEY_OFFSET: usize = 16;
pub const UNIT_KEY_LEN: usize = 16;
pub const UNIT_BLOCKS_OFFSET: usize = 32;
pub const CIPHER_BLOCK_LEN: usize = 8;
pub const CIPHER_BLOCK_STRIDE: usize = 80;
