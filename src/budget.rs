//! Negotiated message size limits and protocol framing overheads.

use serde::{Deserialize, Serialize};

/// Fixed byte overheads of a protocol's request and response messages.
///
/// The `empty_*` fields size a message carrying no items; the `*_item`
/// fields size the per-item parameter or header bytes, excluding payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framing {
    pub empty_read_request: u32,
    pub empty_read_response: u32,
    pub empty_write_request: u32,
    pub empty_write_response: u32,
    /// Address specification of one read item.
    pub read_request_item: u32,
    /// Return code, transport size and length preceding each response payload.
    pub response_item_header: u32,
    /// Address specification plus payload header of one write item.
    pub write_request_item_header: u32,
    /// Return code of one write item.
    pub write_response_item: u32,
}

impl Framing {
    /// S7 job/ack-data framing: a 10-byte job header or 12-byte ack header
    /// followed by the 2-byte function/item-count parameter block.
    pub const S7: Self = Self {
        empty_read_request: 12,
        empty_read_response: 14,
        empty_write_request: 12,
        empty_write_response: 14,
        read_request_item: 12,
        response_item_header: 4,
        write_request_item_header: 16,
        write_response_item: 1,
    };
}

impl Default for Framing {
    fn default() -> Self { Self::S7 }
}

/// Size limits every fragment must respect.
///
/// Budgets are snapshotted per logical request, so a renegotiated PDU size
/// only affects requests submitted afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportBudget {
    max_pdu_bytes: u32,
    #[serde(default)]
    framing: Framing,
}

impl TransportBudget {
    /// Create a budget for `max_pdu_bytes` with the given framing.
    #[must_use]
    pub const fn new(max_pdu_bytes: u32, framing: Framing) -> Self {
        Self {
            max_pdu_bytes,
            framing,
        }
    }

    /// Create a budget using [`Framing::S7`].
    #[must_use]
    pub const fn s7(max_pdu_bytes: u32) -> Self { Self::new(max_pdu_bytes, Framing::S7) }

    /// Largest message, in bytes, either direction may carry.
    #[must_use]
    pub const fn max_pdu_bytes(&self) -> u32 { self.max_pdu_bytes }

    /// Framing overheads.
    #[must_use]
    pub const fn framing(&self) -> &Framing { &self.framing }
}
