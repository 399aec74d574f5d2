//! Streaming conversion API: observe progress as a `Stream`.
//!
//! [`convert_stream`] runs the same conversion as [`crate::convert::convert`]
//! but hands back a stream that yields one [`ConversionEvent::Progress`] per
//! completed page followed by a single [`ConversionEvent::Finished`] carrying
//! the document. A failure is yielded as the final `Err` item.
//!
//! Dropping the stream cancels the conversion at the next page boundary.

use crate::config::ConversionConfig;
use crate::convert::convert_blocking;
use crate::error::Pdf2BwError;
use crate::output::ConversionOutput;
use crate::pipeline::input;
use crate::progress::{
    CancelFlag, ConversionProgress, ConversionProgressCallback, ProgressCallback,
};
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tracing::{debug, info};

/// Buffered events before the converter blocks on a slow consumer.
const EVENT_BUFFER: usize = 16;

/// One item of a conversion stream.
#[derive(Debug)]
pub enum ConversionEvent {
    Progress(ConversionProgress),
    Finished(Box<ConversionOutput>),
}

/// A boxed stream of conversion events.
pub type ConversionStream =
    Pin<Box<dyn Stream<Item = Result<ConversionEvent, Pdf2BwError>> + Send>>;

/// Convert a PDF, streaming progress as pages complete.
///
/// # Returns
/// - `Ok(ConversionStream)` — progress events, then the finished document
/// - `Err(Pdf2BwError)` — input rejected before conversion started
///
/// # Example
/// ```rust,no_run
/// use edgequake_pdf2bw::{convert_stream, ConversionConfig, ConversionEvent};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut stream = convert_stream("document.pdf", &ConversionConfig::default()).await?;
/// while let Some(event) = stream.next().await {
///     match event? {
///         ConversionEvent::Progress(p) => eprintln!("{}/{}", p.pages_completed, p.pages_total),
///         ConversionEvent::Finished(out) => std::fs::write("document_bw.pdf", &out.pdf)?,
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    input_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionStream, Pdf2BwError> {
    let path = input::resolve_local(input_path)?;
    info!("Starting streaming conversion: {}", path.display());
    Ok(spawn_stream(config, move |cfg| convert_blocking(&path, &cfg)))
}

/// Run `job` on the blocking pool with a config whose progress callback also
/// feeds the returned stream.
pub(crate) fn spawn_stream<F>(config: &ConversionConfig, job: F) -> ConversionStream
where
    F: FnOnce(ConversionConfig) -> Result<ConversionOutput, Pdf2BwError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    let mut cfg = config.clone();
    let forwarder = ChannelCallback {
        tx: tx.clone(),
        inner: cfg.progress_callback.take(),
        cancel: cfg.cancel.clone(),
    };
    cfg.progress_callback = Some(Arc::new(forwarder) as ProgressCallback);

    tokio::task::spawn_blocking(move || {
        let item = job(cfg).map(|out| ConversionEvent::Finished(Box::new(out)));
        if tx.blocking_send(item).is_err() {
            debug!("Stream consumer gone before the final event");
        }
    });

    Box::pin(ReceiverStream::new(rx))
}

/// Forwards page completions into the stream channel and to the caller's own
/// callback, if any.
struct ChannelCallback {
    tx: mpsc::Sender<Result<ConversionEvent, Pdf2BwError>>,
    inner: Option<ProgressCallback>,
    cancel: CancelFlag,
}

impl ConversionProgressCallback for ChannelCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        if let Some(cb) = &self.inner {
            cb.on_conversion_start(total_pages);
        }
    }

    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        if let Some(cb) = &self.inner {
            cb.on_page_start(page_num, total_pages);
        }
    }

    fn on_page_complete(&self, progress: ConversionProgress) {
        if let Some(cb) = &self.inner {
            cb.on_page_complete(progress);
        }
        if self
            .tx
            .blocking_send(Ok(ConversionEvent::Progress(progress)))
            .is_err()
        {
            // Receiver dropped: stop at the next page boundary.
            self.cancel.cancel();
        }
    }

    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        if let Some(cb) = &self.inner {
            cb.on_page_error(page_num, total_pages, error);
        }
    }

    fn on_conversion_complete(&self, total_pages: usize) {
        if let Some(cb) = &self.inner {
            cb.on_conversion_complete(total_pages);
        }
    }
}
