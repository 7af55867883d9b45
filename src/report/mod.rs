//! Processing summary for one decrypted segment

use serde::Serialize;

use crate::nal::NalStats;

/// Counters gathered over one full segment run, for operators comparing
/// input fragments or debugging a stream that comes out still scrambled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecryptReport {
    pub ts_time: String,
    /// TS packets walked, any PID
    pub packets: u64,
    /// Packets on the target elementary-stream PID
    pub video_packets: u64,
    /// PES accumulation runs flushed
    pub runs: u64,
    pub nal_units: u64,
    pub slice_units: u64,
    pub decrypted_blocks: u64,
}

impl DecryptReport {
    pub fn new(packets: u64, video_packets: u64, runs: u64, nal: NalStats) -> Self {
        Self {
            ts_time: chrono::Utc::now().to_rfc3339(),
            packets,
            video_packets,
            runs,
            nal_units: nal.nal_units,
            slice_units: nal.slice_units,
            decrypted_blocks: nal.decrypted_blocks,
        }
    }
}
