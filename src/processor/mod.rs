//! TS demultiplexing, PES reassembly, and in-place scatter of the
//! decrypted bytes.

use bytes::BytesMut;
use tracing::{debug, warn};

use crate::constants::{TS_PACKET_SIZE, TS_SYNC_BYTE};
use crate::nal::{self, NalStats};
use crate::report::DecryptReport;
use crate::types::TsError;

/// One PES accumulation run: the consecutive target-PID packets between
/// two payload-unit-start boundaries.
///
/// `packet_indices[i]` and `payload_offsets[i]` are recorded pairwise, and
/// `pes` holds exactly the bytes of the spans they describe, in packet
/// order; the scatter step depends on both invariants.
struct PesRun {
    packet_indices: Vec<usize>,
    payload_offsets: Vec<usize>,
    pes: BytesMut,
}

impl PesRun {
    fn seed(index: usize, payload_offset: usize, payload: &[u8]) -> Self {
        Self {
            packet_indices: vec![index],
            payload_offsets: vec![payload_offset],
            pes: BytesMut::from(payload),
        }
    }

    fn append(&mut self, index: usize, payload_offset: usize, payload: &[u8]) {
        self.packet_indices.push(index);
        self.payload_offsets.push(payload_offset);
        self.pes.extend_from_slice(payload);
    }
}

/// Per-packet state machine over one transport-stream buffer.
///
/// `run` is `None` while idle and `Some` while a PES run is accumulating;
/// a payload-unit-start boundary (or the end of the buffer) flushes the
/// open run through the NAL decryption stage and scatters the result back
/// into the buffer before a new run opens.
pub struct PacketProcessor {
    target_pid: u16,
    run: Option<PesRun>,
    packets: u64,
    video_packets: u64,
    runs: u64,
    nal_stats: NalStats,
}

impl PacketProcessor {
    pub fn new(target_pid: u16) -> Self {
        Self {
            target_pid,
            run: None,
            packets: 0,
            video_packets: 0,
            runs: 0,
            nal_stats: NalStats::default(),
        }
    }

    /// Process the 188-byte packet starting at `index`.
    pub fn process_packet(&mut self, data: &mut [u8], index: usize) -> Result<(), TsError> {
        let packet = index / TS_PACKET_SIZE;
        self.packets += 1;

        let chunk = &data[index..index + TS_PACKET_SIZE];
        if chunk[0] != TS_SYNC_BYTE {
            return Err(TsError::SyncLoss {
                packet,
                found: chunk[0],
            });
        }

        let pid = (((chunk[1] & 0x1F) as u16) << 8) | chunk[2] as u16;
        if pid != self.target_pid {
            return Ok(());
        }
        self.video_packets += 1;

        let payload_unit_start = chunk[1] & 0x40 != 0;
        let afc = (chunk[3] & 0x30) >> 4;
        let payload_offset = match afc {
            1 => index + 4,
            3 => index + 4 + 1 + chunk[4] as usize,
            2 => return Err(TsError::NoPayload { packet }),
            other => return Err(TsError::InvalidAfc { afc: other, packet }),
        };
        // an oversized adaptation field leaves an empty payload span
        let payload_start = payload_offset.min(index + TS_PACKET_SIZE);

        if payload_unit_start {
            self.flush(data);
            let payload = &data[payload_start..index + TS_PACKET_SIZE];
            self.run = Some(PesRun::seed(index, payload_start, payload));
        } else if let Some(run) = self.run.as_mut() {
            run.append(index, payload_start, &data[payload_start..index + TS_PACKET_SIZE]);
        } else {
            warn!(packet, "continuation packet with no open pes run, ignoring");
        }

        Ok(())
    }

    /// Flush the run left open by the last packet, if any.
    pub fn finish(&mut self, data: &mut [u8]) {
        self.flush(data);
    }

    pub fn into_report(self) -> DecryptReport {
        DecryptReport::new(self.packets, self.video_packets, self.runs, self.nal_stats)
    }

    fn flush(&mut self, data: &mut [u8]) {
        if let Some(mut run) = self.run.take() {
            debug!(
                packets = run.packet_indices.len(),
                bytes = run.pes.len(),
                "flushing pes run"
            );
            let stats = nal::process_nal_array(&mut run.pes);
            self.nal_stats.accumulate(stats);
            scatter_pes(data, &run);
            self.runs += 1;
        }
    }
}

/// Write the processed PES bytes back into their original packet
/// positions, consuming the PES sequence contiguously.
fn scatter_pes(data: &mut [u8], run: &PesRun) {
    let mut cursor = 0;
    for (&index, &start) in run.packet_indices.iter().zip(&run.payload_offsets) {
        let end = index + TS_PACKET_SIZE;
        let len = end - start;
        data[start..end].copy_from_slice(&run.pes[cursor..cursor + len]);
        cursor += len;
    }
}

/// Decrypt one transport-stream segment in place.
///
/// `data` must hold whole 188-byte packets; the targeted NAL units on
/// `target_pid` come back decrypted and every other byte keeps its value.
pub fn decrypt_segment(data: &mut [u8], target_pid: u16) -> Result<DecryptReport, TsError> {
    if data.len() % TS_PACKET_SIZE != 0 {
        return Err(TsError::UnalignedLength { len: data.len() });
    }

    let mut processor = PacketProcessor::new(target_pid);
    for index in (0..data.len()).step_by(TS_PACKET_SIZE) {
        processor.process_packet(data, index)?;
    }
    processor.finish(data);

    Ok(processor.into_report())
}
