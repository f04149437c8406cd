//! Coordinator/worker wire protocol
//!
//! One similarity request and one response per TCP connection, each encoded as
//! a length-framed JSON document: a big-endian `u32` byte length followed by
//! the JSON payload. A connection closed without a valid response frame means
//! the shard is unavailable for that query.

use crate::types::{MovieId, UserId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Upper bound on a single frame. A 5 000-user sample with k=30 produces
/// responses in the low kilobytes; anything near this limit is malformed.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Errors raised by the framed RPC layer.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("frame of {0} bytes exceeds the {MAX_FRAME_BYTES} byte limit")]
    FrameTooLarge(usize),

    #[error("deadline elapsed")]
    Deadline,
}

impl RpcError {
    /// True when the peer closed the connection before a complete frame.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self,
            RpcError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof
        )
    }
}

/// Similarity request sent from the coordinator to every worker.
///
/// The target profile travels with the query; workers never look the target
/// up in their own shard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityRequest {
    pub target_user_id: UserId,
    /// Movie id -> score. A BTreeMap keeps the JSON encoding deterministic.
    pub target_ratings: BTreeMap<MovieId, f64>,
    pub target_avg: f64,
    pub k: usize,
    pub sample_size: usize,
}

/// One neighbor emitted by a shard: similarity is mean-centered cosine over
/// the co-rated movies, in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityRecord {
    pub user_id: UserId,
    pub similarity: f64,
}

/// Shard-local top-k response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityResponse {
    pub worker_id: String,
    /// Descending similarity, at most k records.
    pub similarities: Vec<SimilarityRecord>,
    pub process_time_ms: f64,
    pub users_checked: usize,
    /// Best-effort; 0.0 when unavailable.
    pub cpu_usage: f32,
    /// Best-effort resident memory in MiB; 0 when unavailable.
    pub memory_mb: u64,
}

/// Write one length-framed JSON payload.
pub async fn write_frame<W, T>(writer: &mut W, payload: &T) -> Result<(), RpcError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = serde_json::to_vec(payload)?;
    if bytes.len() > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge(bytes.len()));
    }

    writer.write_all(&(bytes.len() as u32).to_be_bytes()).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-framed JSON payload.
///
/// A peer that closes the connection before a complete frame yields an
/// `RpcError::Io` with `UnexpectedEof` (see [`RpcError::is_disconnect`]).
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T, RpcError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(RpcError::FrameTooLarge(len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    Ok(serde_json::from_slice(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> SimilarityRequest {
        SimilarityRequest {
            target_user_id: 42,
            target_ratings: BTreeMap::from([(10, 5.0), (20, 4.0), (30, 3.5)]),
            target_avg: 4.1666,
            k: 30,
            sample_size: 5000,
        }
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        let request = sample_request();
        write_frame(&mut client, &request).await.unwrap();

        let decoded: SimilarityRequest = read_frame(&mut server).await.unwrap();
        assert_eq!(decoded.target_user_id, 42);
        assert_eq!(decoded.k, 30);
        assert_eq!(decoded.sample_size, 5000);
        assert_eq!(decoded.target_ratings.get(&20), Some(&4.0));
    }

    #[tokio::test]
    async fn test_response_round_trip_preserves_order() {
        let (mut client, mut server) = tokio::io::duplex(64 * 1024);

        let response = SimilarityResponse {
            worker_id: "worker-1".to_string(),
            similarities: vec![
                SimilarityRecord {
                    user_id: 7,
                    similarity: 0.91,
                },
                SimilarityRecord {
                    user_id: 3,
                    similarity: 0.88,
                },
            ],
            process_time_ms: 12.5,
            users_checked: 4800,
            cpu_usage: 35.0,
            memory_mb: 512,
        };
        write_frame(&mut server, &response).await.unwrap();

        let decoded: SimilarityResponse = read_frame(&mut client).await.unwrap();
        assert_eq!(decoded.worker_id, "worker-1");
        assert_eq!(decoded.similarities.len(), 2);
        assert_eq!(decoded.similarities[0].user_id, 7);
        assert_eq!(decoded.similarities[1].user_id, 3);
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let (mut client, mut server) = tokio::io::duplex(64);

        let len = (MAX_FRAME_BYTES as u32 + 1).to_be_bytes();
        client.write_all(&len).await.unwrap();

        let result: Result<SimilarityRequest, _> = read_frame(&mut server).await;
        assert!(matches!(result, Err(RpcError::FrameTooLarge(_))));
    }

    #[tokio::test]
    async fn test_read_frame_truncated_payload_is_disconnect() {
        let (mut client, mut server) = tokio::io::duplex(64);

        client.write_all(&100u32.to_be_bytes()).await.unwrap();
        client.write_all(b"{\"partial").await.unwrap();
        drop(client);

        let result: Result<SimilarityRequest, _> = read_frame(&mut server).await;
        match result {
            Err(e) => assert!(e.is_disconnect()),
            Ok(_) => panic!("truncated frame must not decode"),
        }
    }

    #[tokio::test]
    async fn test_read_frame_empty_connection_is_disconnect() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);

        let result: Result<SimilarityRequest, _> = read_frame(&mut server).await;
        match result {
            Err(e) => assert!(e.is_disconnect()),
            Ok(_) => panic!("empty connection must not decode"),
        }
    }

    #[test]
    fn test_request_wire_field_names() {
        let json = serde_json::to_value(sample_request()).unwrap();
        assert!(json.get("target_user_id").is_some());
        assert!(json.get("target_ratings").is_some());
        assert!(json.get("target_avg").is_some());
        assert!(json.get("k").is_some());
        assert!(json.get("sample_size").is_some());
        // Integer map keys encode as JSON strings.
        assert!(json["target_ratings"].get("10").is_some());
    }
}
