//! Wire container for one delivery request.
//!
//! Small batches travel as a plain list of entries (`type` 1). Batches over
//! the compression threshold are JSON encoded, zlib compressed and base64
//! encoded into a single string (`type` 2). Compression is only an
//! optimization: if it fails the raw form is sent instead.

use crate::buffer::Batch;
use crate::domain::FormattedEntry;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_COMPRESS_THRESHOLD: usize = 1000;

#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Compression failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Base64 decoding failed: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Unknown envelope type: {0}")]
    UnknownKind(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeKind {
    Raw = 1,
    Compressed = 2,
}

/// Exactly one payload form per envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireEnvelope", try_from = "WireEnvelope")]
pub enum DeliveryEnvelope {
    Raw(Vec<FormattedEntry>),
    Compressed(String),
}

/// JSON body shape expected by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data1: Vec<String>,
    #[serde(default)]
    pub data2: String,
}

impl DeliveryEnvelope {
    /// Picks the encoding for a sealed batch.
    pub fn for_batch(batch: &Batch, compress_threshold: usize) -> Self {
        if batch.total_length() <= compress_threshold {
            return DeliveryEnvelope::Raw(batch.entries().to_vec());
        }

        match compress_entries(batch.entries()) {
            Ok(payload) => DeliveryEnvelope::Compressed(payload),
            Err(e) => {
                warn!(
                    batch_id = batch.id(),
                    "Compression failed, sending batch uncompressed: {e}"
                );
                DeliveryEnvelope::Raw(batch.entries().to_vec())
            }
        }
    }

    pub fn kind(&self) -> EnvelopeKind {
        match self {
            DeliveryEnvelope::Raw(_) => EnvelopeKind::Raw,
            DeliveryEnvelope::Compressed(_) => EnvelopeKind::Compressed,
        }
    }

    /// Recovers the entry list regardless of encoding.
    pub fn entries(&self) -> Result<Vec<FormattedEntry>, EncodingError> {
        match self {
            DeliveryEnvelope::Raw(entries) => Ok(entries.clone()),
            DeliveryEnvelope::Compressed(payload) => decode_compressed(payload),
        }
    }
}

impl From<DeliveryEnvelope> for WireEnvelope {
    fn from(envelope: DeliveryEnvelope) -> Self {
        match envelope {
            DeliveryEnvelope::Raw(entries) => WireEnvelope {
                kind: EnvelopeKind::Raw as u8,
                data1: entries,
                data2: String::new(),
            },
            DeliveryEnvelope::Compressed(payload) => WireEnvelope {
                kind: EnvelopeKind::Compressed as u8,
                data1: Vec::new(),
                data2: payload,
            },
        }
    }
}

impl TryFrom<WireEnvelope> for DeliveryEnvelope {
    type Error = EncodingError;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        match wire.kind {
            1 => Ok(DeliveryEnvelope::Raw(wire.data1)),
            2 => Ok(DeliveryEnvelope::Compressed(wire.data2)),
            other => Err(EncodingError::UnknownKind(other)),
        }
    }
}

/// JSON array -> zlib -> base64.
pub fn compress_entries(entries: &[FormattedEntry]) -> Result<String, EncodingError> {
    let json = serde_json::to_vec(entries)?;

    let mut encoder = ZlibEncoder::new(Vec::with_capacity(json.len() / 2), Compression::default());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;

    Ok(STANDARD.encode(compressed))
}

/// Inverse of [`compress_entries`].
pub fn decode_compressed(payload: &str) -> Result<Vec<FormattedEntry>, EncodingError> {
    let compressed = STANDARD.decode(payload)?;

    let mut json = Vec::new();
    ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;

    Ok(serde_json::from_slice(&json)?)
}
