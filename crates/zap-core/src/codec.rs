use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{FrameError, Result};

/// Serialize one value as a single newline-terminated JSON line.
///
/// The line is written with one `write_all`, so callers that funnel all
/// frames for a connection through one writer never interleave bytes.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_string(value)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Read exactly one frame, consuming its bytes from the stream.
///
/// EOF before any byte of a new frame is `FrameError::Closed`; anything that
/// is not a full JSON value on the line is `FrameError::Malformed`.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let read = reader.read_line(&mut line).await?;
    if read == 0 {
        return Err(FrameError::Closed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientCommand, ServerResponse};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn frame_round_trip() {
        let response = ServerResponse {
            success: true,
            message: "olá".to_string(),
        };

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &response).await.unwrap();
        assert!(buffer.ends_with(b"\n"));

        let mut reader = BufReader::new(buffer.as_slice());
        let decoded: ServerResponse = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn consecutive_frames_decode_in_a_tight_loop() {
        let mut buffer = Vec::new();
        for n in 0..3 {
            let frame = ServerResponse {
                success: true,
                message: format!("frame {n}"),
            };
            write_frame(&mut buffer, &frame).await.unwrap();
        }

        let mut reader = BufReader::new(buffer.as_slice());
        for n in 0..3 {
            let frame: ServerResponse = read_frame(&mut reader).await.unwrap();
            assert_eq!(frame.message, format!("frame {n}"));
        }
        assert!(matches!(
            read_frame::<_, ServerResponse>(&mut reader).await,
            Err(FrameError::Closed)
        ));
    }

    #[tokio::test]
    async fn newline_in_payload_stays_escaped() {
        let response = ServerResponse {
            success: true,
            message: "line one\nline two".to_string(),
        };

        let mut buffer = Vec::new();
        write_frame(&mut buffer, &response).await.unwrap();
        // one terminator only: the embedded newline is escaped by JSON
        assert_eq!(buffer.iter().filter(|b| **b == b'\n').count(), 1);

        let mut reader = BufReader::new(buffer.as_slice());
        let decoded: ServerResponse = read_frame(&mut reader).await.unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn malformed_line_is_a_protocol_error() {
        let mut reader = BufReader::new(&b"not json at all\n"[..]);
        let err = read_frame::<_, ClientCommand>(&mut reader)
            .await
            .unwrap_err();
        assert!(err.is_protocol());
    }
}
