//! Sender side of XMODEM: 128-byte blocks, 8-bit checksum or CRC-16 as the
//! receiver requests, retransmit on NAK or silence.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::programmer::TransferError;

pub const SOH: u8 = 0x01;
pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const CAN: u8 = 0x18;
pub const CRC_REQUEST: u8 = b'C';
pub const PAD: u8 = 0x1a;

pub const BLOCK_SIZE: usize = 128;

/// Errors tolerated per phase (start, each block, end) before giving up.
pub const MAX_ERRORS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Checksum {
    Additive,
    Crc16,
}

pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// CRC-16/XMODEM (poly 0x1021, init 0).
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= (byte as u16) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Build a complete packet for block `seq`. Short data is padded.
pub fn frame(seq: u8, data: &[u8], mode: Checksum) -> Vec<u8> {
    let mut payload = [PAD; BLOCK_SIZE];
    payload[..data.len()].copy_from_slice(data);

    let mut packet = Vec::with_capacity(BLOCK_SIZE + 5);
    packet.extend_from_slice(&[SOH, seq, 0xff - seq]);
    packet.extend_from_slice(&payload);
    match mode {
        Checksum::Additive => packet.push(checksum(&payload)),
        Checksum::Crc16 => packet.extend_from_slice(&crc16(&payload).to_be_bytes()),
    }
    packet
}

/// Running totals for one transfer, threaded through every block.
#[derive(Clone, Debug)]
pub struct TransferSession {
    pub bytes_sent: usize,
    pub blocks: usize,
    pub retransmits: usize,
    started: Instant,
}

impl Default for TransferSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferSession {
    pub fn new() -> Self {
        Self {
            bytes_sent: 0,
            blocks: 0,
            retransmits: 0,
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn progress(&self) -> String {
        format!(
            "{:.1}kB sent in {:.1} seconds",
            self.bytes_sent as f64 / 1024.0,
            self.elapsed().as_secs_f64()
        )
    }
}

/// Read one byte, treating a timeout or end of stream as silence.
fn read_byte<P: Read>(port: &mut P) -> io::Result<Option<u8>> {
    let mut buf = [0; 1];
    match port.read(&mut buf) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(buf[0])),
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// A second CAN right after the first confirms the cancel.
fn cancelled<P: Read>(port: &mut P) -> io::Result<bool> {
    Ok(read_byte(port)? == Some(CAN))
}

fn wait_for_start<P: Read>(port: &mut P) -> Result<Checksum, TransferError> {
    let mut errors = 0;
    while errors < MAX_ERRORS {
        match read_byte(port)? {
            Some(NAK) => return Ok(Checksum::Additive),
            Some(CRC_REQUEST) => return Ok(Checksum::Crc16),
            Some(CAN) if cancelled(port)? => return Err(TransferError::Cancelled),
            other => {
                trace!("Waiting for receiver, got {other:02X?}");
                errors += 1;
            }
        }
    }
    Err(TransferError::NoStart)
}

fn send_block<P: Read + Write>(
    port: &mut P,
    session: &mut TransferSession,
    index: usize,
    packet: &[u8],
) -> Result<(), TransferError> {
    let mut errors = 0;
    while errors < MAX_ERRORS {
        port.write_all(packet)?;
        port.flush()?;
        match read_byte(port)? {
            Some(ACK) => {
                session.blocks += 1;
                session.bytes_sent += BLOCK_SIZE;
                return Ok(());
            }
            Some(CAN) if cancelled(port)? => return Err(TransferError::Cancelled),
            other => {
                debug!("Block {index} not acknowledged ({other:02X?}), resending");
                session.retransmits += 1;
                errors += 1;
            }
        }
    }
    Err(TransferError::TooManyErrors { block: index })
}

fn finish<P: Read + Write>(port: &mut P) -> Result<(), TransferError> {
    for _ in 0..MAX_ERRORS {
        port.write_all(&[EOT])?;
        port.flush()?;
        if read_byte(port)? == Some(ACK) {
            return Ok(());
        }
    }
    Err(TransferError::EotNotAcknowledged)
}

/// Send `data` to a receiver that is about to request an XMODEM transfer.
pub fn send<P: Read + Write>(
    port: &mut P,
    data: &[u8],
    session: &mut TransferSession,
) -> Result<(), TransferError> {
    let mode = wait_for_start(port)?;
    debug!("Receiver requested {mode:?} mode");

    for (index, chunk) in data.chunks(BLOCK_SIZE).enumerate() {
        let seq = (index + 1) as u8;
        let packet = frame(seq, chunk, mode);
        send_block(port, session, index, &packet)?;
        if session.blocks % 32 == 0 {
            info!("{}", session.progress());
        }
    }

    finish(port)?;
    if session.retransmits > 0 {
        warn!("{} blocks were retransmitted", session.retransmits);
    }
    info!("{}", session.progress());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use hex_literal::hex;

    use super::*;

    /// Replays scripted receiver bytes and records everything sent.
    #[derive(Default)]
    struct ScriptedReceiver {
        replies: VecDeque<u8>,
        sent: Vec<u8>,
    }

    impl ScriptedReceiver {
        fn new(replies: &[u8]) -> Self {
            Self {
                replies: replies.iter().copied().collect(),
                sent: Vec::new(),
            }
        }
    }

    impl Read for ScriptedReceiver {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.replies.pop_front() {
                Some(b) => {
                    buf[0] = b;
                    Ok(1)
                }
                None => Ok(0),
            }
        }
    }

    impl Write for ScriptedReceiver {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.sent.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_checksums() {
        assert_eq!(crc16(b"123456789"), 0x31c3);
        assert_eq!(checksum(b"123456789"), 0xdd);
    }

    #[test]
    fn test_frame_additive() {
        let packet = frame(1, &[0x41], Checksum::Additive);
        assert_eq!(packet.len(), 132);
        assert_eq!(packet[..5], hex!("01 01 fe 41 1a"));
        assert_eq!(packet[131], 0x27);
    }

    #[test]
    fn test_frame_crc() {
        let packet = frame(0xff, &[0x41], Checksum::Crc16);
        assert_eq!(packet.len(), 133);
        assert_eq!(packet[..4], hex!("01 ff 00 41"));
        assert_eq!(packet[131..], hex!("f2 dd"));
    }

    #[test]
    fn test_send_crc() {
        let data: Vec<u8> = (0..=255).collect();
        let mut port = ScriptedReceiver::new(&[CRC_REQUEST, ACK, ACK, ACK]);
        let mut session = TransferSession::new();
        send(&mut port, &data, &mut session).unwrap();

        assert_eq!(port.sent.len(), 2 * 133 + 1);
        assert_eq!(port.sent[..3], hex!("01 01 fe"));
        assert_eq!(port.sent[133..136], hex!("01 02 fd"));
        assert_eq!(port.sent[136], 0x80);
        assert_eq!(port.sent.last(), Some(&EOT));
        assert_eq!(session.blocks, 2);
        assert_eq!(session.bytes_sent, 256);
        assert_eq!(session.retransmits, 0);
    }

    #[test]
    fn test_resend_on_nak() {
        let mut port = ScriptedReceiver::new(&[NAK, NAK, ACK, ACK]);
        let mut session = TransferSession::new();
        send(&mut port, b"hello", &mut session).unwrap();

        assert_eq!(port.sent.len(), 2 * 132 + 1);
        assert_eq!(port.sent[..132], port.sent[132..264]);
        assert_eq!(session.blocks, 1);
        assert_eq!(session.retransmits, 1);
    }

    #[test]
    fn test_cancel() {
        let mut port = ScriptedReceiver::new(&[CAN, CAN]);
        let mut session = TransferSession::new();
        assert!(matches!(
            send(&mut port, b"hello", &mut session),
            Err(TransferError::Cancelled)
        ));
        assert!(port.sent.is_empty());
    }

    #[test]
    fn test_silent_receiver() {
        let mut port = ScriptedReceiver::new(&[]);
        let mut session = TransferSession::new();
        assert!(matches!(
            send(&mut port, b"hello", &mut session),
            Err(TransferError::NoStart)
        ));

        let mut port = ScriptedReceiver::new(&[NAK]);
        assert!(matches!(
            send(&mut port, b"hello", &mut session),
            Err(TransferError::TooManyErrors { block: 0 })
        ));
        assert_eq!(port.sent.len(), MAX_ERRORS * 132);
        assert_eq!(session.retransmits, MAX_ERRORS);
    }

    #[test]
    fn test_sequence_wraps() {
        let data = vec![0u8; 256 * BLOCK_SIZE];
        let mut replies = vec![NAK];
        replies.extend(std::iter::repeat_n(ACK, 257));
        let mut port = ScriptedReceiver::new(&replies);
        let mut session = TransferSession::new();
        send(&mut port, &data, &mut session).unwrap();

        assert_eq!(port.sent[254 * 132 + 1], 0xff);
        assert_eq!(port.sent[255 * 132 + 1], 0x00);
        assert_eq!(session.blocks, 256);
    }
}
