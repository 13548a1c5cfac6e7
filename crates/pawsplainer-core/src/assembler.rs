//! Pairs streamed text and image fragments into slides
//!
//! The model interleaves captions and illustrations roughly one to one but
//! gives no framing, so we keep two slots: the caption text accumulated so far
//! and the most recent unpaired image. As soon as both are filled a slide is
//! emitted and the slots reset.

use anyhow::Result;
use futures_util::stream::{self, Stream, StreamExt};
use tracing::debug;

use crate::fragment::{Fragment, ImageData, Slide};

/// Two-slot reducer turning fragments into slides
#[derive(Debug, Default)]
pub struct SlideAssembler {
    text: String,
    pending_image: Option<ImageData>,
}

impl SlideAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment, returning a slide if this fragment completed a pair
    pub fn push(&mut self, fragment: Fragment) -> Option<Slide> {
        match fragment {
            Fragment::Text(text) => self.text.push_str(&text),
            Fragment::Image(image) => {
                if let Some(previous) = self.pending_image.replace(image) {
                    debug!(
                        bytes = previous.bytes.len(),
                        "replacing unpaired image with a newer one"
                    );
                }
            }
        }

        if self.text.is_empty() || self.pending_image.is_none() {
            return None;
        }

        let image = self.pending_image.take()?;
        Some(Slide {
            caption: std::mem::take(&mut self.text),
            image,
        })
    }

    /// Drain whatever is left once the stream has ended.
    ///
    /// A dangling image becomes a final slide carrying any accumulated text,
    /// which may be empty. Trailing text with no image is discarded.
    pub fn flush(&mut self) -> Option<Slide> {
        let text = std::mem::take(&mut self.text);
        match self.pending_image.take() {
            Some(image) => Some(Slide {
                caption: text,
                image,
            }),
            None => {
                if !text.is_empty() {
                    debug!(chars = text.chars().count(), "dropping trailing caption with no image");
                }
                None
            }
        }
    }

    pub fn pending_text(&self) -> &str {
        &self.text
    }

    pub fn has_pending_image(&self) -> bool {
        self.pending_image.is_some()
    }
}

/// Assemble a complete sequence of fragments, flushing at the end
pub fn assemble_all<I>(fragments: I) -> Vec<Slide>
where
    I: IntoIterator<Item = Fragment>,
{
    let mut assembler = SlideAssembler::new();
    let mut slides: Vec<Slide> = fragments
        .into_iter()
        .filter_map(|fragment| assembler.push(fragment))
        .collect();
    slides.extend(assembler.flush());
    slides
}

struct AssembleState<S> {
    fragments: S,
    assembler: SlideAssembler,
    finished: bool,
}

/// Lazily turn a fragment stream into a slide stream.
///
/// Slides come out in arrival order. The first error ends the stream without
/// flushing, since a half-received response has no trustworthy tail.
pub fn assemble<S>(fragments: S) -> impl Stream<Item = Result<Slide>>
where
    S: Stream<Item = Result<Fragment>> + Unpin,
{
    let state = AssembleState {
        fragments,
        assembler: SlideAssembler::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }
        loop {
            match state.fragments.next().await {
                Some(Ok(fragment)) => {
                    if let Some(slide) = state.assembler.push(fragment) {
                        return Some((Ok(slide), state));
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    let slide = state.assembler.flush()?;
                    return Some((Ok(slide), state));
                }
            }
        }
    })
}
