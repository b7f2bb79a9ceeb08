//! The top-level read loop: sources, then an optional codec, then a writer.

use std::io;

use dataphile_core::emit;
use dataphile_core::metrics::events::BytesWritten;
use futures::TryStreamExt;
use snafu::ResultExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::codec::{CodecSpec, Direction, compress, decompress};
use crate::error::{PipelineError, WriteSnafu};
use crate::source::SourceSet;

/// Totals for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// Non-empty chunks written.
    pub chunks: u64,
}

/// Copy every buffer from `sources` through `codec` (if any) into `writer`.
///
/// Sources are closed when the run ends, whatever the outcome. Cancellation
/// of the source set ends the run normally, and so does a reader hanging up
/// on the output (broken pipe). A decompressor that only saw part of its
/// input before cancellation does not turn the run into an error.
pub async fn run_pipeline<W>(
    sources: &mut SourceSet,
    codec: Option<CodecSpec>,
    buffer_size: usize,
    writer: &mut W,
) -> Result<PipelineStats, PipelineError>
where
    W: AsyncWrite + Unpin,
{
    match &codec {
        Some(spec) => info!(
            algorithm = %spec.algorithm,
            direction = ?spec.direction,
            buffer_size,
            "Starting pipeline"
        ),
        None => info!(buffer_size, "Starting pipeline"),
    }

    let mut stats = PipelineStats::default();
    let read_before = sources.bytes_read();
    let result = copy_buffers(sources, codec, buffer_size, writer, &mut stats).await;
    stats.bytes_read = sources.bytes_read() - read_before;
    sources.close_all();

    match result {
        Ok(()) => {}
        Err(PipelineError::Write { source }) if source.kind() == io::ErrorKind::BrokenPipe => {
            info!("Output closed by reader, stopping");
        }
        // Cut short by cancellation; the codec saw a truncated input
        Err(PipelineError::Codec { source }) if sources.is_cancelled() => {
            info!(error = %source, "Interrupted mid-stream, output is incomplete");
        }
        Err(e) => return Err(e),
    }

    info!(
        bytes_read = stats.bytes_read,
        bytes_written = stats.bytes_written,
        chunks = stats.chunks,
        "Pipeline finished"
    );
    Ok(stats)
}

async fn copy_buffers<W>(
    sources: &mut SourceSet,
    codec: Option<CodecSpec>,
    buffer_size: usize,
    writer: &mut W,
    stats: &mut PipelineStats,
) -> Result<(), PipelineError>
where
    W: AsyncWrite + Unpin,
{
    let input = sources.iter_buffers(buffer_size);

    match codec {
        None => {
            futures::pin_mut!(input);
            while let Some(chunk) = input.try_next().await? {
                write_chunk(writer, &chunk, stats).await?;
            }
        }
        Some(spec) => match spec.direction {
            Direction::Compress => {
                let output = compress(input, spec.algorithm, spec.encoding, spec.level)?;
                futures::pin_mut!(output);
                while let Some(chunk) = output.try_next().await? {
                    write_chunk(writer, &chunk, stats).await?;
                }
            }
            Direction::Decompress => {
                let output = decompress(input, spec.algorithm, spec.encoding)?;
                futures::pin_mut!(output);
                while let Some(buffer) = output.try_next().await? {
                    write_chunk(writer, buffer.as_bytes(), stats).await?;
                }
            }
        },
    }

    writer.flush().await.context(WriteSnafu)?;
    Ok(())
}

async fn write_chunk<W>(
    writer: &mut W,
    chunk: &[u8],
    stats: &mut PipelineStats,
) -> Result<(), PipelineError>
where
    W: AsyncWrite + Unpin,
{
    if chunk.is_empty() {
        return Ok(());
    }
    writer.write_all(chunk).await.context(WriteSnafu)?;
    stats.bytes_written += chunk.len() as u64;
    stats.chunks += 1;
    emit!(BytesWritten {
        bytes: chunk.len() as u64
    });
    debug!(bytes = chunk.len(), "Wrote chunk");
    Ok(())
}
