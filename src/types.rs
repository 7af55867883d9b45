use thiserror::Error;

/// Fatal conditions raised while walking a transport-stream buffer.
///
/// Every variant aborts the run; a segment whose framing is broken cannot
/// be decrypted any further, so there is no skip-and-continue path.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TsError {
    #[error("invalid ts packet: expected sync byte 0x47, found 0x{found:02X} at packet {packet}")]
    SyncLoss { packet: usize, found: u8 },

    /// Adaptation-field-control 2 carries no payload at all.
    #[error("afc 2 = no payload at packet {packet}")]
    NoPayload { packet: usize },

    #[error("invalid afc {afc} at packet {packet}")]
    InvalidAfc { afc: u8, packet: usize },

    #[error("segment length {len} is not a multiple of 188")]
    UnalignedLength { len: usize },
}
