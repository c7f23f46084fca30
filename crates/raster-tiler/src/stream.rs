//! Asynchronous tile sequence.
//!
//! The parallel pipeline runs on a blocking task and feeds an unbounded
//! channel. The consumer sees a [`futures::Stream`] of tiles; a failure or
//! panic of the producer arrives as the last item. Dropping the stream
//! cancels the producer.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::config::TilerConfig;
use crate::error::{TilerError, TilerResult};
use crate::pipeline::TilePipeline;
use crate::progress::ProgressReceiver;
use crate::raster::Raster;
use crate::sink::TileSink;
use crate::tile::RasterTile;

/// Stream of rendered tiles produced in the background.
pub struct TileStream {
    receiver: UnboundedReceiver<TilerResult<RasterTile>>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl TileStream {
    /// Stop the producer; tiles already queued are still delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Stream for TileStream {
    type Item = TilerResult<RasterTile>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

impl std::fmt::Debug for TileStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Forwards valid tiles into the stream channel.
struct StreamSink {
    sender: UnboundedSender<TilerResult<RasterTile>>,
}

impl TileSink for StreamSink {
    fn accept(&self, tile: RasterTile) -> TilerResult<bool> {
        if !tile.validate(false) {
            debug!(tile = %tile.coord().cache_key(), "Dropping tile below the size threshold");
            return Ok(false);
        }
        self.sender
            .send(Ok(tile))
            .map_err(|_| TilerError::QueueClosed)?;
        Ok(true)
    }
}

/// Start generating `raster` in the background and stream the tiles.
///
/// Must be called from within a tokio runtime. Configuration errors are
/// returned immediately; everything else arrives through the stream.
pub fn spawn_tile_stream(
    raster: Arc<Raster>,
    config: TilerConfig,
    progress: Option<ProgressReceiver>,
) -> TilerResult<TileStream> {
    config.validate().map_err(TilerError::Config)?;

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();

    let sink = StreamSink { sender: tx.clone() };
    let token = cancel.clone();
    let producer = tokio::task::spawn_blocking(move || {
        let mut pipeline = TilePipeline::new(&raster, config)?.with_cancellation(token);
        if let Some(receiver) = progress {
            pipeline = pipeline.with_progress(receiver);
        }
        pipeline.run(&sink)
    });

    tokio::spawn(async move {
        let err = match producer.await {
            Ok(Ok(report)) => {
                debug!(
                    produced = report.produced,
                    dropped = report.dropped,
                    "Tile stream finished"
                );
                return;
            }
            Ok(Err(e)) => e,
            Err(join) => TilerError::Worker(format!("tile producer failed: {}", join)),
        };

        // Nobody is listening after the consumer went away
        if tx.is_closed() && matches!(err, TilerError::Cancelled | TilerError::QueueClosed) {
            debug!("Tile stream consumer dropped");
            return;
        }
        warn!(error = %err, "Tile stream failed");
        if tx.send(Err(err)).is_err() {
            debug!("Tile stream consumer dropped before the error was delivered");
        }
    });

    Ok(TileStream {
        receiver: rx,
        _guard: cancel.clone().drop_guard(),
        cancel,
    })
}
