//! Chunked byte copying that honours a `TransferControl`.

use crate::fs::error::{FsError, FsResult};
use crate::fs::types::display_path;
use crate::transport::control::TransferControl;
use std::io::SeekFrom;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

/// Copy `src` into `dst` from byte `offset` to EOF.
///
/// Both streams are positioned at `offset` first. Pause and cancel are
/// honoured between chunks; the absolute position is reported after each.
pub async fn stream_copy<R, W>(
    src: &mut R,
    dst: &mut W,
    offset: u64,
    ctl: &TransferControl,
) -> std::io::Result<StreamOutcome>
where
    R: AsyncRead + AsyncSeek + Unpin,
    W: AsyncWrite + AsyncSeek + Unpin,
{
    if offset > 0 {
        src.seek(SeekFrom::Start(offset)).await?;
        dst.seek(SeekFrom::Start(offset)).await?;
    }

    let mut buffer = vec![0u8; ctl.chunk_size()];
    let mut position = offset;

    loop {
        if ctl.checkpoint().await.is_err() {
            dst.flush().await?;
            return Ok(StreamOutcome::Cancelled(position));
        }

        let n = src.read(&mut buffer).await?;
        if n == 0 {
            break;
        }

        ctl.limiter().wait_for_bytes(n).await;
        dst.write_all(&buffer[..n]).await?;
        position += n as u64;
        ctl.report(position);
    }

    dst.flush().await?;
    Ok(StreamOutcome::Finished(position))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Finished(u64),
    /// Stopped at a checkpoint; partial bytes stay in place.
    Cancelled(u64),
}

/// Copy one regular file, resuming at `offset` when it is non-zero.
///
/// With `offset == 0` the destination is created or truncated; otherwise it is
/// cut back to `offset` and appended to.
pub async fn transfer_file(
    src: &Path,
    dst: &Path,
    offset: u64,
    ctl: &TransferControl,
) -> FsResult<u64> {
    let src_label = display_path(src);
    let dst_label = display_path(dst);

    let mut reader = tokio::fs::File::open(src)
        .await
        .map_err(|e| FsError::from_io("open", &src_label, e))?;

    let mut writer = if offset == 0 {
        tokio::fs::File::create(dst).await
    } else {
        tokio::fs::OpenOptions::new().write(true).open(dst).await
    }
    .map_err(|e| FsError::from_io("open", &dst_label, e))?;

    if offset > 0 {
        writer
            .set_len(offset)
            .await
            .map_err(|e| FsError::from_io("truncate", &dst_label, e))?;
    }

    let outcome = stream_copy(&mut reader, &mut writer, offset, ctl)
        .await
        .map_err(|e| FsError::from_io("transfer", &src_label, e))?;

    match outcome {
        StreamOutcome::Finished(total) => {
            writer
                .sync_all()
                .await
                .map_err(|e| FsError::from_io("sync", &dst_label, e))?;
            Ok(total)
        }
        StreamOutcome::Cancelled(_) => Err(FsError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 253) as u8).collect()
    }

    #[tokio::test]
    async fn test_full_copy_reports_progress() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        let data = payload(10_000);
        tokio::fs::write(&src, &data).await.unwrap();

        let last = Arc::new(AtomicU64::new(0));
        let seen = last.clone();
        let ctl = TransferControl::new()
            .with_chunk_size(1024)
            .with_progress(move |pos| seen.store(pos, Ordering::SeqCst));

        let total = transfer_file(&src, &dst, 0, &ctl).await.unwrap();
        assert_eq!(total, 10_000);
        assert_eq!(last.load(Ordering::SeqCst), 10_000);
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_resume_from_offset() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        let data = payload(5_000);
        tokio::fs::write(&src, &data).await.unwrap();
        // A partial copy with a garbage tail beyond the resume point.
        let mut partial = data[..2_000].to_vec();
        partial.extend_from_slice(&[0xFF; 500]);
        tokio::fs::write(&dst, &partial).await.unwrap();

        let ctl = TransferControl::new().with_chunk_size(700);
        let total = transfer_file(&src, &dst, 2_000, &ctl).await.unwrap();
        assert_eq!(total, 5_000);
        assert_eq!(tokio::fs::read(&dst).await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        tokio::fs::write(&src, payload(100)).await.unwrap();

        let ctl = TransferControl::new();
        ctl.cancel();

        let result = transfer_file(&src, &dst, 0, &ctl).await;
        assert!(matches!(result, Err(FsError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let result = transfer_file(
            &temp_dir.path().join("nope"),
            &temp_dir.path().join("out"),
            0,
            &TransferControl::new(),
        )
        .await;
        assert!(result.unwrap_err().is_not_found());
    }
}
