// Chunked feed streaming utilities
use crate::domain::chart::FeedMessage;
use async_compression::tokio::bufread::BrotliEncoder;
use axum::body::Body;
use axum::http::{Response, StatusCode, header};
use axum::response::IntoResponse;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::Stream;
use std::pin::Pin;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Header telling the client how individual frames are encoded.
pub const FRAME_ENCODING_HEADER: &str = "x-frame-encoding";

/// Respond with the view's feed: one length-prefixed frame per message,
/// streamed until every sender of `rx` is gone.
pub fn feed_response(mut rx: mpsc::Receiver<FeedMessage>, compress: bool) -> Response<Body> {
    let frames = async_stream::try_stream! {
        while let Some(message) = rx.recv().await {
            yield serialize_frame(&message, compress).await?;
        }
    };
    let frames: Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>> = Box::pin(frames);

    // Frames are compressed one by one, so Content-Encoding stays unset;
    // a client decoding the whole body would break the framing.
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(FRAME_ENCODING_HEADER, if compress { "br" } else { "identity" })
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(frames))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Serialize a single FeedMessage to a frame
pub async fn serialize_frame(msg: &FeedMessage, compress: bool) -> Result<Bytes, std::io::Error> {
    // 1. Serialize to JSON
    let buffer = serde_json::to_vec(msg)?;

    // 2. Optionally compress
    let payload = if compress {
        let cursor = std::io::Cursor::new(buffer);
        let mut encoder = BrotliEncoder::new(cursor);
        let mut compressed = Vec::new();
        encoder.read_to_end(&mut compressed).await?;
        compressed
    } else {
        buffer
    };

    // 3. Prepend length (4 bytes, big-endian)
    let length = u32::try_from(payload.len())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidData, "frame too large"))?;
    let mut chunk = BytesMut::with_capacity(4 + payload.len());
    chunk.put_u32(length);
    chunk.put_slice(&payload);

    Ok(chunk.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_compression::tokio::bufread::BrotliDecoder;
    use bytes::Buf;

    fn error_frame() -> FeedMessage {
        FeedMessage::Error {
            message: "Error retrieving metrics".to_string(),
        }
    }

    #[tokio::test]
    async fn test_plain_frame() {
        let mut frame = serialize_frame(&error_frame(), false).await.unwrap();
        let length = frame.get_u32() as usize;
        assert_eq!(length, frame.len());

        let json: serde_json::Value = serde_json::from_slice(&frame).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Error retrieving metrics");
    }

    #[tokio::test]
    async fn test_compressed_frame() {
        let mut frame = serialize_frame(&error_frame(), true).await.unwrap();
        let length = frame.get_u32() as usize;
        assert_eq!(length, frame.len());

        let mut decoder = BrotliDecoder::new(std::io::Cursor::new(frame.to_vec()));
        let mut json = Vec::new();
        decoder.read_to_end(&mut json).await.unwrap();
        assert_eq!(json, serde_json::to_vec(&error_frame()).unwrap());
    }

    #[tokio::test]
    async fn test_response_streams_all_frames() {
        let (tx, rx) = tokio::sync::mpsc::channel(4);
        tx.send(error_frame()).await.unwrap();
        tx.send(error_frame()).await.unwrap();
        drop(tx);

        let response = feed_response(rx, false);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[FRAME_ENCODING_HEADER], "identity");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let single = serialize_frame(&error_frame(), false).await.unwrap();
        assert_eq!(body.len(), single.len() * 2);
    }
}
