//! Typed messages for the transfer protocol.
//!
//! Frame format: `len:u32 | kind:u32 | payload` where the payload is the
//! JSON encoding of the variant's record. Requests and responses are
//! disjoint subsets of one closed set; every dispatch over [`Message`] is
//! an exhaustive match so a new variant fails to compile until each
//! dispatch point handles it.

use std::io;

use serde::{Deserialize, Serialize};

// =============================================================================
// Message Kinds
// =============================================================================

/// Stable wire discriminators. These values never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageKind {
    GetFileRequest = 1,
    GetFileResponse = 2,
    PutFileRequest = 3,
    PutFileResponse = 4,
    DeleteFileRequest = 5,
    DeleteFileResponse = 6,
    ListFilenamesRequest = 7,
    ListFilenamesResponse = 8,
}

impl MessageKind {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(Self::GetFileRequest),
            2 => Some(Self::GetFileResponse),
            3 => Some(Self::PutFileRequest),
            4 => Some(Self::PutFileResponse),
            5 => Some(Self::DeleteFileRequest),
            6 => Some(Self::DeleteFileResponse),
            7 => Some(Self::ListFilenamesRequest),
            8 => Some(Self::ListFilenamesResponse),
            _ => None,
        }
    }
}

// =============================================================================
// Payload records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFileRequest {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetFileResponse {
    pub status: u16,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutFileRequest {
    pub filename: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutFileResponse {
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileRequest {
    pub filename: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileResponse {
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilenamesRequest {
    pub match_pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilenamesResponse {
    pub status: u16,
    pub filenames: Vec<String>,
}

// =============================================================================
// Message
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    GetFileRequest(GetFileRequest),
    GetFileResponse(GetFileResponse),
    PutFileRequest(PutFileRequest),
    PutFileResponse(PutFileResponse),
    DeleteFileRequest(DeleteFileRequest),
    DeleteFileResponse(DeleteFileResponse),
    ListFilenamesRequest(ListFilenamesRequest),
    ListFilenamesResponse(ListFilenamesResponse),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::GetFileRequest(_) => MessageKind::GetFileRequest,
            Message::GetFileResponse(_) => MessageKind::GetFileResponse,
            Message::PutFileRequest(_) => MessageKind::PutFileRequest,
            Message::PutFileResponse(_) => MessageKind::PutFileResponse,
            Message::DeleteFileRequest(_) => MessageKind::DeleteFileRequest,
            Message::DeleteFileResponse(_) => MessageKind::DeleteFileResponse,
            Message::ListFilenamesRequest(_) => MessageKind::ListFilenamesRequest,
            Message::ListFilenamesResponse(_) => MessageKind::ListFilenamesResponse,
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            Message::GetFileRequest(_)
                | Message::PutFileRequest(_)
                | Message::DeleteFileRequest(_)
                | Message::ListFilenamesRequest(_)
        )
    }

    /// Serializes the payload record (not the header) into `out`.
    pub(crate) fn encode_payload<W: io::Write>(&self, out: W) -> serde_json::Result<()> {
        match self {
            Message::GetFileRequest(p) => serde_json::to_writer(out, p),
            Message::GetFileResponse(p) => serde_json::to_writer(out, p),
            Message::PutFileRequest(p) => serde_json::to_writer(out, p),
            Message::PutFileResponse(p) => serde_json::to_writer(out, p),
            Message::DeleteFileRequest(p) => serde_json::to_writer(out, p),
            Message::DeleteFileResponse(p) => serde_json::to_writer(out, p),
            Message::ListFilenamesRequest(p) => serde_json::to_writer(out, p),
            Message::ListFilenamesResponse(p) => serde_json::to_writer(out, p),
        }
    }

    /// Reconstructs the variant matching `kind` from its payload bytes.
    pub(crate) fn decode_payload(kind: MessageKind, payload: &[u8]) -> serde_json::Result<Message> {
        Ok(match kind {
            MessageKind::GetFileRequest => Message::GetFileRequest(serde_json::from_slice(payload)?),
            MessageKind::GetFileResponse => {
                Message::GetFileResponse(serde_json::from_slice(payload)?)
            }
            MessageKind::PutFileRequest => Message::PutFileRequest(serde_json::from_slice(payload)?),
            MessageKind::PutFileResponse => {
                Message::PutFileResponse(serde_json::from_slice(payload)?)
            }
            MessageKind::DeleteFileRequest => {
                Message::DeleteFileRequest(serde_json::from_slice(payload)?)
            }
            MessageKind::DeleteFileResponse => {
                Message::DeleteFileResponse(serde_json::from_slice(payload)?)
            }
            MessageKind::ListFilenamesRequest => {
                Message::ListFilenamesRequest(serde_json::from_slice(payload)?)
            }
            MessageKind::ListFilenamesResponse => {
                Message::ListFilenamesResponse(serde_json::from_slice(payload)?)
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
