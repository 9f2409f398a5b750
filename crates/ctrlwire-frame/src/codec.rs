use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Frame header: a single big-endian `u16` payload length.
pub const HEADER_SIZE: usize = 2;

/// Largest payload the length prefix can describe.
pub const MAX_PAYLOAD: usize = u16::MAX as usize;

/// One complete frame taken off the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a payload into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────────────┐
/// │ Length (2B)  │ Payload          │
/// │ big-endian   │ (Length bytes)   │
/// └──────────────┴──────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    Ok(())
}

/// Take the next complete frame off the front of `src`.
///
/// Returns `None` if the buffer does not yet hold a whole frame; the buffer
/// is left untouched so more bytes can be appended and the call repeated.
/// On success exactly one frame is consumed and any following bytes remain.
pub fn extract_frame(src: &mut BytesMut) -> Option<Frame> {
    let payload_len = peek_len(src)?;
    if src.len() < HEADER_SIZE + payload_len {
        return None;
    }

    src.advance(HEADER_SIZE);
    Some(Frame {
        payload: src.split_to(payload_len).freeze(),
    })
}

/// Split the first complete frame off a borrowed buffer snapshot.
///
/// Returns the first frame's payload and the unconsumed tail, or `None` when
/// the head of `buf` is only a partial frame.
pub fn split_combined(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let payload_len = peek_len(buf)?;
    let total = HEADER_SIZE + payload_len;
    if buf.len() < total {
        return None;
    }
    Some((&buf[HEADER_SIZE..total], &buf[total..]))
}

fn peek_len(buf: &[u8]) -> Option<usize> {
    match buf {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo]) as usize),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payload: &[u8]) -> BytesMut {
        let mut buf = BytesMut::new();
        encode_frame(payload, &mut buf).unwrap();
        buf
    }

    #[test]
    fn test_encode_extract_roundtrip() {
        let payload = b"1 GET foo.bar";
        let mut buf = framed(payload);

        assert_eq!(buf.len(), HEADER_SIZE + payload.len());
        assert_eq!(&buf[..2], &[0x00, payload.len() as u8]);

        let frame = extract_frame(&mut buf).unwrap();
        assert_eq!(frame.payload.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_extract_incomplete_header() {
        let mut buf = BytesMut::from(&[0x00][..]);
        assert!(extract_frame(&mut buf).is_none());
        assert_eq!(buf.len(), 1, "partial header must be preserved");
    }

    #[test]
    fn test_extract_incomplete_payload() {
        let mut buf = framed(b"hello");
        buf.truncate(HEADER_SIZE + 2);

        assert!(extract_frame(&mut buf).is_none());
        assert_eq!(buf.len(), HEADER_SIZE + 2, "partial payload must be preserved");
    }

    #[test]
    fn test_every_split_point_yields_same_frame() {
        let payload = b"7 GET_REPLY subscriber.by-imsi-001010000000001.msisdn 1234";
        let wire = framed(payload).freeze();

        for cut in 0..=wire.len() {
            let mut buf = BytesMut::new();
            buf.extend_from_slice(&wire[..cut]);

            let early = extract_frame(&mut buf);
            if cut < wire.len() {
                assert!(early.is_none(), "frame reported complete at byte {cut}");
                buf.extend_from_slice(&wire[cut..]);
                let frame = extract_frame(&mut buf).unwrap();
                assert_eq!(frame.payload.as_ref(), payload);
            } else {
                assert_eq!(early.unwrap().payload.as_ref(), payload);
            }
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn test_byte_by_byte_feed() {
        let wire = framed(b"0 TRAP subscriber.alarm raised").freeze();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();

        for byte in wire.iter() {
            buf.put_u8(*byte);
            if let Some(frame) = extract_frame(&mut buf) {
                frames.push(frame);
            }
        }

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_ref(), b"0 TRAP subscriber.alarm raised");
    }

    #[test]
    fn test_split_combined_multiple_frames() {
        let payloads: [&[u8]; 3] = [b"0 TRAP a.b 1", b"0 TRAP a.c 2", b"3 SET_REPLY x 5"];
        let mut wire = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, &mut wire).unwrap();
        }

        let mut tail: &[u8] = &wire;
        let mut seen = Vec::new();
        while let Some((head, rest)) = split_combined(tail) {
            seen.push(head.to_vec());
            tail = rest;
        }

        assert_eq!(seen, payloads.iter().map(|p| p.to_vec()).collect::<Vec<_>>());
        assert!(tail.is_empty());
    }

    #[test]
    fn test_split_combined_keeps_partial_tail() {
        let mut wire = framed(b"0 TRAP a.b 1");
        let second = framed(b"0 TRAP a.c 2");
        wire.extend_from_slice(&second[..5]);

        let (head, tail) = split_combined(&wire).unwrap();
        assert_eq!(head, b"0 TRAP a.b 1");
        assert_eq!(tail, &second[..5]);
        assert!(split_combined(tail).is_none());
    }

    #[test]
    fn test_empty_payload() {
        let mut buf = framed(b"");
        let frame = extract_frame(&mut buf).unwrap();
        assert!(frame.payload.is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_payload_too_large() {
        let payload = vec![b'x'; MAX_PAYLOAD + 1];
        let mut buf = BytesMut::new();
        let err = encode_frame(&payload, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_max_payload_fits() {
        let payload = vec![b'x'; MAX_PAYLOAD];
        let mut buf = framed(&payload);
        assert_eq!(&buf[..2], &[0xFF, 0xFF]);
        assert_eq!(extract_frame(&mut buf).unwrap().payload.len(), MAX_PAYLOAD);
    }

    #[test]
    fn test_frame_wire_size() {
        let frame = Frame::new(Bytes::from_static(b"test"));
        assert_eq!(frame.wire_size(), HEADER_SIZE + 4);
    }
}
