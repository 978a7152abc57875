//! The MessagePack hub protocol (`"messagepack"`).
//!
//! Each message is a varint length prefix followed by a msgpack array:
//!
//! ```text
//! ┌────────┬──────────────────────────────────────────────────────┐
//! │ varint │ [1, {headers}, invocation_id, target, [args], [ids]] │
//! └────────┴──────────────────────────────────────────────────────┘
//! ```
//!
//! Broadcasts are fire-and-forget, so the headers map is empty, the
//! invocation id is `nil`, and there are no stream ids.

use std::collections::BTreeMap;

use hubcast_transport::TransferFormat;

use crate::{HubProtocol, InvocationMessage, ProtocolError};

/// Registry key of the MessagePack protocol.
pub const MESSAGEPACK_PROTOCOL_NAME: &str = "messagepack";

/// Message type tag for invocations.
const INVOCATION_MESSAGE_TYPE: u8 = 1;

/// The length prefix is at most five 7-bit groups, so bodies are capped at
/// `i32::MAX` bytes.
const MAX_BODY_LEN: usize = i32::MAX as usize;

/// Compact binary protocol built on `rmp-serde`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackHubProtocol;

impl MessagePackHubProtocol {
    /// Creates the MessagePack protocol.
    pub fn new() -> Self {
        Self
    }
}

/// Appends `len` as an unsigned LEB128 varint.
fn write_length_prefix(mut len: usize, out: &mut Vec<u8>) {
    loop {
        let mut byte = (len & 0x7f) as u8;
        len >>= 7;
        if len > 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if len == 0 {
            break;
        }
    }
}

impl HubProtocol for MessagePackHubProtocol {
    fn name(&self) -> &str {
        MESSAGEPACK_PROTOCOL_NAME
    }

    fn version(&self) -> u32 {
        1
    }

    fn transfer_format(&self) -> TransferFormat {
        TransferFormat::Binary
    }

    fn write_message(
        &self,
        message: &InvocationMessage,
    ) -> Result<Vec<u8>, ProtocolError> {
        let headers: BTreeMap<String, String> = BTreeMap::new();
        let invocation_id: Option<&str> = None;
        let stream_ids: Vec<String> = Vec::new();
        let frame = (
            INVOCATION_MESSAGE_TYPE,
            headers,
            invocation_id,
            message.target(),
            message.arguments(),
            stream_ids,
        );

        let body = rmp_serde::to_vec(&frame)
            .map_err(|e| ProtocolError::serialize(self.name(), e))?;
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::serialize(
                self.name(),
                format!("message body of {} bytes exceeds the frame limit", body.len()),
            ));
        }

        let mut out = Vec::with_capacity(body.len() + 5);
        write_length_prefix(body.len(), &mut out);
        out.extend_from_slice(&body);
        Ok(out)
    }
}
