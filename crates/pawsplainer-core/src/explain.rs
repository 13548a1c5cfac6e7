use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::assembler::assemble;
use crate::fragment::{Fragment, Slide};
use crate::session::{ExplainEvent, ExplainRequest};

pub type FragmentStream = BoxStream<'static, Result<Fragment>>;

/// Anything that can answer a prompt with a stream of fragments
#[async_trait]
pub trait FragmentSource: Send + Sync {
    async fn stream(&self, prompt: &str) -> Result<FragmentStream>;
}

/// Receives each slide as soon as it is assembled
pub trait SlideSink: Send {
    fn on_slide(&mut self, index: usize, slide: &Slide) -> Result<()>;

    fn on_finished(&mut self, _slides: usize) -> Result<()> {
        Ok(())
    }
}

/// Sink that keeps nothing
pub struct NoopSink;

impl SlideSink for NoopSink {
    fn on_slide(&mut self, _index: usize, _slide: &Slide) -> Result<()> {
        Ok(())
    }
}

/// Drive one request to completion, reporting progress over `events`.
///
/// Always ends with exactly one `Finished` or `Failed` event, whatever goes
/// wrong along the way. A closed receiver is not an error.
pub async fn explain<S, K>(
    source: &S,
    request: &ExplainRequest,
    sink: &mut K,
    events: &UnboundedSender<ExplainEvent>,
) where
    S: FragmentSource + ?Sized,
    K: SlideSink + ?Sized,
{
    let terminal = match stream_slides(source, request, sink, events).await {
        Ok(count) => {
            info!(slides = count, "stream complete");
            ExplainEvent::Finished
        }
        Err(e) => ExplainEvent::Failed(format!("{:#}", e)),
    };

    if events.send(terminal).is_err() {
        debug!("explain receiver dropped before completion");
    }
}

/// Run [`explain`] on a background task.
///
/// A second task watches the first so that a panic still produces a `Failed`
/// event and the caller's input gets re-enabled.
pub fn spawn_explain(
    source: Arc<dyn FragmentSource>,
    request: ExplainRequest,
    mut sink: Box<dyn SlideSink>,
    events: UnboundedSender<ExplainEvent>,
) -> JoinHandle<()> {
    let task_events = events.clone();
    let task = tokio::spawn(async move {
        explain(source.as_ref(), &request, sink.as_mut(), &task_events).await;
    });

    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!("explain task died: {}", e);
            let _ = events.send(ExplainEvent::Failed(format!("explain task died: {}", e)));
        }
    })
}

async fn stream_slides<S, K>(
    source: &S,
    request: &ExplainRequest,
    sink: &mut K,
    events: &UnboundedSender<ExplainEvent>,
) -> Result<usize>
where
    S: FragmentSource + ?Sized,
    K: SlideSink + ?Sized,
{
    let fragments = source.stream(&request.prompt).await?;
    let _ = events.send(ExplainEvent::StreamStarted);

    let mut slides = Box::pin(assemble(fragments));
    let mut count = 0;
    while let Some(slide) = slides.next().await {
        let slide = slide?;
        sink.on_slide(count, &slide)?;
        count += 1;
        let _ = events.send(ExplainEvent::Slide(slide));
    }

    sink.on_finished(count)?;
    Ok(count)
}
