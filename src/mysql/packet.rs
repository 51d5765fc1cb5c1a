//! MySQL packet framing
//!
//! Every packet on the wire is a 3-byte little-endian payload length, a
//! one-byte sequence id, and the payload. The codec yields raw payloads and
//! keeps the sequence id in step: decoding a frame pins the counter to the
//! client's value plus one, so responses continue the client's numbering.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::AdapterError;

/// Largest payload a single frame may carry (`0xffffff` marks a
/// multi-frame payload, which the whitelist has no use for)
const MAX_PAYLOAD: usize = 0x00ff_ffff;

/// Codec for MySQL packet frames
#[derive(Debug, Default)]
pub struct PacketCodec {
    seq: u8,
}

impl PacketCodec {
    /// Codec with sequence id 0, ready for a server-first exchange
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for PacketCodec {
    type Item = Bytes;
    type Error = AdapterError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Bytes>, AdapterError> {
        if src.len() < 4 {
            return Ok(None);
        }

        let len = u32::from_le_bytes([src[0], src[1], src[2], 0]) as usize;
        if len >= MAX_PAYLOAD {
            return Err(AdapterError::Protocol(format!(
                "frame of {} bytes exceeds the packet limit",
                len
            )));
        }
        if src.len() < 4 + len {
            src.reserve(4 + len - src.len());
            return Ok(None);
        }

        let seq = src[3];
        src.advance(4);
        let payload = src.split_to(len).freeze();
        self.seq = seq.wrapping_add(1);
        Ok(Some(payload))
    }
}

impl Encoder<Bytes> for PacketCodec {
    type Error = AdapterError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), AdapterError> {
        if item.len() >= MAX_PAYLOAD {
            return Err(AdapterError::Protocol(format!(
                "response payload of {} bytes exceeds the packet limit",
                item.len()
            )));
        }

        dst.reserve(4 + item.len());
        dst.put_uint_le(item.len() as u64, 3);
        dst.put_u8(self.seq);
        self.seq = self.seq.wrapping_add(1);
        dst.extend_from_slice(&item);
        Ok(())
    }
}
