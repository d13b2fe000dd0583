use fcode_types::{FRAME_HEADER_LEN, MAX_FRAME_LEN};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use super::envelope::Envelope;
use super::error::{IpcError, IpcResult};

/// Prefixes `payload` with its length as a 4-byte big-endian integer.
pub fn frame_message(payload: &[u8]) -> IpcResult<Vec<u8>> {
    let len = checked_len(payload.len() as u64)?;
    let mut framed = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    framed.extend_from_slice(&len.to_be_bytes());
    framed.extend_from_slice(payload);
    Ok(framed)
}

/// Decodes a length prefix. Zero and anything above `MAX_FRAME_LEN` (which
/// includes every value with the sign bit set) are rejected.
pub fn parse_frame_length(header: [u8; FRAME_HEADER_LEN]) -> IpcResult<usize> {
    let len = u32::from_be_bytes(header);
    checked_len(len as u64).map(|len| len as usize)
}

fn checked_len(len: u64) -> IpcResult<u32> {
    if len == 0 || len > MAX_FRAME_LEN as u64 {
        return Err(IpcError::InvalidFrameLength(len));
    }
    Ok(len as u32)
}

/// Reads one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_frame<R>(reader: &mut R) -> IpcResult<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; FRAME_HEADER_LEN];
    let received = read_full(reader, &mut header).await?;
    if received == 0 {
        return Ok(None);
    }
    if received < FRAME_HEADER_LEN {
        return Err(IpcError::TruncatedFrame {
            expected: FRAME_HEADER_LEN,
            received,
        });
    }

    let len = parse_frame_length(header)?;
    let mut payload = vec![0u8; len];
    let received = read_full(reader, &mut payload).await?;
    if received < len {
        return Err(IpcError::TruncatedFrame {
            expected: len,
            received,
        });
    }

    trace!("Read frame of {} bytes", len);
    Ok(Some(payload))
}

/// Fills `buf` unless EOF comes first; returns how many bytes arrived.
async fn read_full<R>(reader: &mut R, buf: &mut [u8]) -> IpcResult<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Writes prefix and payload with a single write, then flushes.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
{
    let framed = frame_message(payload)?;
    writer.write_all(&framed).await?;
    writer.flush().await?;
    trace!("Wrote frame of {} bytes", payload.len());
    Ok(())
}

pub async fn write_message<W, T>(writer: &mut W, envelope: &Envelope<T>) -> IpcResult<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    write_frame(writer, &envelope.to_bytes()?).await
}

pub async fn read_message<R, T>(reader: &mut R) -> IpcResult<Option<Envelope<T>>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    match read_frame(reader).await? {
        Some(payload) => Envelope::from_bytes(&payload).map(Some),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[test]
    fn test_frame_message() {
        let framed = frame_message(b"hello").unwrap();
        assert_eq!(&framed[..4], &[0, 0, 0, 5]);
        assert_eq!(&framed[4..], b"hello");
    }

    #[test]
    fn test_parse_frame_length_bounds() {
        assert_eq!(parse_frame_length([0, 0, 1, 0]).unwrap(), 256);
        assert_eq!(
            parse_frame_length(MAX_FRAME_LEN.to_be_bytes()).unwrap(),
            MAX_FRAME_LEN as usize
        );
        assert!(matches!(
            parse_frame_length([0, 0, 0, 0]),
            Err(IpcError::InvalidFrameLength(0))
        ));
        assert!(parse_frame_length((MAX_FRAME_LEN + 1).to_be_bytes()).is_err());
        assert!(parse_frame_length([0x80, 0, 0, 1]).is_err());
    }

    #[tokio::test]
    async fn test_message_round_trip() {
        let mut buf = Vec::new();
        let sent = Envelope::new("payload".to_string());
        write_message(&mut buf, &sent).await.unwrap();

        let mut reader = buf.as_slice();
        let received: Envelope<String> = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(received.message_id, sent.message_id);
        assert_eq!(received.timestamp, sent.timestamp);
        assert_eq!(received.data, "payload");

        let next: Option<Envelope<String>> = read_message(&mut reader).await.unwrap();
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn test_reads_across_partial_chunks() {
        let mut reader = Builder::new()
            .read(&[0, 0])
            .read(&[0, 3, b'a'])
            .read(b"bc")
            .build();
        assert_eq!(read_frame(&mut reader).await.unwrap().unwrap(), b"abc");
    }

    #[tokio::test]
    async fn test_oversized_prefix_rejected_before_payload() {
        // No payload bytes are scripted; reading any would fail the mock.
        let mut reader = Builder::new().read(&(MAX_FRAME_LEN + 1).to_be_bytes()).build();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(IpcError::InvalidFrameLength(_))
        ));

        let mut reader = Builder::new().read(&[0xff, 0xff, 0xff, 0xff]).build();
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(IpcError::InvalidFrameLength(_))
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_header_is_fatal() {
        let mut reader: &[u8] = &[0, 0];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(IpcError::TruncatedFrame { expected: 4, received: 2 })
        ));
    }

    #[tokio::test]
    async fn test_eof_inside_payload_is_fatal() {
        let mut reader: &[u8] = &[0, 0, 0, 10, b'x', b'y'];
        assert!(matches!(
            read_frame(&mut reader).await,
            Err(IpcError::TruncatedFrame { expected: 10, received: 2 })
        ));
    }

    #[tokio::test]
    async fn test_write_is_single_frame() {
        let mut writer = Builder::new().write(&[0, 0, 0, 2, b'o', b'k']).build();
        write_frame(&mut writer, b"ok").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_payload_rejected_on_write() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_frame(&mut buf, b"").await,
            Err(IpcError::InvalidFrameLength(0))
        ));
        assert!(buf.is_empty());
    }
}
