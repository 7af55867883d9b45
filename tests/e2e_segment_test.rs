//! Full-pipeline checks over a synthetic two-run transport-stream fragment.

use mpegts_decryptor::constants::{DEFAULT_VIDEO_PID, TS_PACKET_SIZE};
use mpegts_decryptor::{decrypt_segment, nal, tea};

fn ts_packet(pid: u16, pusi: bool, payload: &[u8]) -> [u8; 188] {
    assert!(payload.len() <= 184);
    let mut pkt = [0xFFu8; 188];
    pkt[0] = 0x47;
    pkt[1] = ((pusi as u8) << 6) | ((pid >> 8) as u8 & 0x1F);
    pkt[2] = (pid & 0xFF) as u8;
    if payload.len() == 184 {
        pkt[3] = 0x10;
        pkt[4..].copy_from_slice(payload);
    } else {
        pkt[3] = 0x30;
        pkt[4] = (183 - payload.len()) as u8;
        pkt[5] = 0x00;
        pkt[188 - payload.len()..].copy_from_slice(payload);
    }
    pkt
}

/// Vary the plaintext until its ciphertext contains no zero byte, keeping
/// the crafted stream free of accidental start codes and stuffing.
fn zero_free_ciphertext(key: [u32; 4], seed: [u32; 2]) -> ([u32; 2], [u8; 8]) {
    let mut plain = seed;
    loop {
        let cipher = tea::encrypt_block(plain, key);
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&cipher[0].to_le_bytes());
        bytes[4..].copy_from_slice(&cipher[1].to_le_bytes());
        if bytes.iter().all(|&b| b != 0) {
            return (plain, bytes);
        }
        plain[0] = plain[0].wrapping_add(1);
    }
}

fn read_key(bytes: &[u8]) -> [u32; 4] {
    let w = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    [w(0), w(4), w(8), w(12)]
}

/// PES of one encrypted IDR slice: start code, header 0x65, then a 196-byte
/// body laid out for two cipher blocks (key at unit bytes [16, 32), blocks
/// at [32, 40) and [112, 120)). Returns the PES plus the two plaintexts.
fn build_slice_pes() -> (Vec<u8>, [u32; 2], [u32; 2]) {
    let mut unit: Vec<u8> = (0..197u32).map(|i| ((i * 7) % 250 + 1) as u8).collect();
    unit[0] = 0x65;

    let key = read_key(&unit[16..32]);
    let (plain_a, cipher_a) = zero_free_ciphertext(key, [0x1111_2222, 0x3333_4444]);
    let (plain_b, cipher_b) = zero_free_ciphertext(key, [0x5555_6666, 0x7777_8888]);
    unit[32..40].copy_from_slice(&cipher_a);
    unit[112..120].copy_from_slice(&cipher_b);

    // the crafted unit must scan as a single span
    assert_eq!(nal::find_nal_unit_start(&unit, 0), unit.len());
    assert_eq!(nal::remove_emulation_prevention(&unit), unit);

    let mut pes = vec![0x00, 0x00, 0x01];
    pes.extend_from_slice(&unit);
    (pes, plain_a, plain_b)
}

#[test]
fn pipeline_matches_manual_stage_composition() {
    let (pes, plain_a, plain_b) = build_slice_pes();
    assert_eq!(pes.len(), 200);

    // second run: one access-unit-delimiter NAL, not a slice type
    let mut trailer_payload = vec![0x00, 0x00, 0x01, 0x09];
    trailer_payload.resize(20, 0x50);

    let p0 = ts_packet(DEFAULT_VIDEO_PID, true, &pes[..184]);
    let p1 = ts_packet(0x101, false, &[0x5A; 184]);
    let p2 = ts_packet(DEFAULT_VIDEO_PID, false, &pes[184..]);
    let p3 = ts_packet(DEFAULT_VIDEO_PID, true, &trailer_payload);

    let mut data: Vec<u8> = [p0, p1, p2, p3].iter().flatten().copied().collect();
    let original = data.clone();

    let report = decrypt_segment(&mut data, DEFAULT_VIDEO_PID).unwrap();

    // manual composition of the stages over the same bytes
    let mut manual_pes = pes.clone();
    nal::process_nal_array(&mut manual_pes);
    let mut expected = original.clone();
    expected[4..188].copy_from_slice(&manual_pes[..184]);
    let p2_payload_start = 2 * TS_PACKET_SIZE + 4 + 1 + 167;
    expected[p2_payload_start..3 * TS_PACKET_SIZE].copy_from_slice(&manual_pes[184..]);
    assert_eq!(data, expected);

    // the two blocks hold the recovered plaintext
    assert_eq!(&data[4 + 35..4 + 39], &plain_a[0].to_le_bytes());
    assert_eq!(&data[4 + 39..4 + 43], &plain_a[1].to_le_bytes());
    assert_eq!(&data[4 + 115..4 + 119], &plain_b[0].to_le_bytes());
    assert_eq!(&data[4 + 119..4 + 123], &plain_b[1].to_le_bytes());

    // packet framing and everything off the target PID survives untouched
    for index in (0..data.len()).step_by(TS_PACKET_SIZE) {
        assert_eq!(data[index], 0x47);
        assert_eq!(data[index..index + 4], original[index..index + 4]);
    }
    assert_eq!(
        &data[TS_PACKET_SIZE..2 * TS_PACKET_SIZE],
        &original[TS_PACKET_SIZE..2 * TS_PACKET_SIZE]
    );
    // the trailer run carries no slice unit and comes back unchanged
    assert_eq!(
        &data[3 * TS_PACKET_SIZE..],
        &original[3 * TS_PACKET_SIZE..]
    );

    assert_eq!(report.packets, 4);
    assert_eq!(report.video_packets, 3);
    assert_eq!(report.runs, 2);
    assert_eq!(report.nal_units, 2);
    assert_eq!(report.slice_units, 1);
    assert_eq!(report.decrypted_blocks, 2);
}

#[test]
fn non_slice_units_cross_the_pipeline_unchanged() {
    // a type-2 unit (partition A) must not be decrypted even at slice size
    let mut payload = vec![0x00, 0x00, 0x01, 0x42];
    payload.extend((0..180u32).map(|i| ((i * 11) % 250 + 1) as u8));
    let p0 = ts_packet(DEFAULT_VIDEO_PID, true, &payload);
    let p1 = ts_packet(DEFAULT_VIDEO_PID, true, &[0x11; 20]);

    let mut data: Vec<u8> = [p0, p1].iter().flatten().copied().collect();
    let original = data.clone();

    let report = decrypt_segment(&mut data, DEFAULT_VIDEO_PID).unwrap();
    assert_eq!(data, original);
    assert_eq!(report.slice_units, 0);
}

#[test]
fn file_entry_point_roundtrips() {
    use mpegts_decryptor::decryptor::{Options, run};

    let (pes, plain_a, _) = build_slice_pes();
    let p0 = ts_packet(DEFAULT_VIDEO_PID, true, &pes[..184]);
    let p1 = ts_packet(DEFAULT_VIDEO_PID, false, &pes[184..]);
    let data: Vec<u8> = [p0, p1].iter().flatten().copied().collect();

    let dir = std::env::temp_dir();
    let input = dir.join("mpegts_decryptor_e2e_in.ts");
    let output = dir.join("mpegts_decryptor_e2e_out.ts");
    std::fs::write(&input, &data).unwrap();

    let report = run(Options {
        input: input.clone(),
        output: output.clone(),
        pid: DEFAULT_VIDEO_PID,
    })
    .unwrap();
    assert_eq!(report.runs, 1);
    assert_eq!(report.decrypted_blocks, 2);

    let out = std::fs::read(&output).unwrap();
    assert_eq!(out.len(), data.len());
    assert_eq!(&out[4 + 35..4 + 39], &plain_a[0].to_le_bytes());

    let _ = std::fs::remove_file(&input);
    let _ = std::fs::remove_file(&output);
}
