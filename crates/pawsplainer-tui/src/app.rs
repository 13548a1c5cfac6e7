use std::path::PathBuf;
use std::sync::Arc;

use pawsplainer_core::export::slide_file_name;
use pawsplainer_core::prompt::EXAMPLES;
use pawsplainer_core::{
    spawn_explain, ConfigError, ExplainEvent, ExplainSession, FragmentSource, NoopSink, Phase,
    RequestState, SlideExporter, SlideSink,
};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::ui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Input,
    Examples,
    Slides,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Input => FocusPane::Examples,
            FocusPane::Examples => FocusPane::Slides,
            FocusPane::Slides => FocusPane::Input,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,

    // Question input
    pub input: String,
    pub cursor: usize, // cursor position in chars

    // Request lifecycle, transcript and slides
    pub session: ExplainSession,
    pub examples_state: ListState,
    pub slides_state: ListState,
    pub slide_paths: Vec<PathBuf>,
    pub export_dir: Option<PathBuf>,
    pub slides_scroll: u16,
    pub slides_height: u16,
    pub slides_width: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Panel areas for mouse hit-testing (updated during render)
    pub examples_area: Option<Rect>,
    pub input_area: Option<Rect>,
    pub slides_area: Option<Rect>,

    // Generation
    pub source: Option<Arc<dyn FragmentSource>>,
    pub config_error: Option<ConfigError>,
    pub model: String,
    pub slides_root: Option<PathBuf>,
    explain_tx: UnboundedSender<ExplainEvent>,
}

impl App {
    /// `source` is `None` when the API key is missing; `config_error` says why
    pub fn new(
        source: Option<Arc<dyn FragmentSource>>,
        config_error: Option<ConfigError>,
        model: String,
        slides_root: Option<PathBuf>,
        explain_tx: UnboundedSender<ExplainEvent>,
    ) -> Self {
        let mut examples_state = ListState::default();
        examples_state.select(Some(0));

        Self {
            should_quit: false,
            focus: FocusPane::Input,

            input: String::new(),
            cursor: 0,

            session: ExplainSession::new(),
            examples_state,
            slides_state: ListState::default(),
            slide_paths: Vec::new(),
            export_dir: None,
            slides_scroll: 0,
            slides_height: 0,
            slides_width: 0,

            animation_frame: 0,

            examples_area: None,
            input_area: None,
            slides_area: None,

            source,
            config_error,
            model,
            slides_root,
            explain_tx,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    pub fn input_enabled(&self) -> bool {
        self.is_configured() && self.session.input_enabled()
    }

    /// Submit a question; blank input and busy sessions are silently ignored
    pub fn submit(&mut self, question: &str) {
        let Some(source) = self.source.clone() else {
            return;
        };

        let request = match self.session.submit(question) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                debug!("submit ignored: {}", e);
                return;
            }
        };

        self.input.clear();
        self.cursor = 0;
        self.slide_paths.clear();
        self.slides_state.select(None);
        self.slides_scroll = 0;
        self.export_dir = None;

        let sink: Box<dyn SlideSink> = match &self.slides_root {
            Some(root) => match SlideExporter::create(root, &request.question) {
                Ok(exporter) => {
                    self.export_dir = Some(exporter.dir().to_path_buf());
                    Box::new(exporter)
                }
                Err(e) => {
                    warn!("slide export disabled for this request: {:#}", e);
                    Box::new(NoopSink)
                }
            },
            None => Box::new(NoopSink),
        };

        spawn_explain(source, request, sink, self.explain_tx.clone());
    }

    pub fn submit_input(&mut self) {
        let question = self.input.clone();
        self.submit(&question);
    }

    pub fn submit_selected_example(&mut self) {
        if let Some(example) = self.examples_state.selected().and_then(|i| EXAMPLES.get(i)) {
            self.submit(example);
        }
    }

    /// Fold one progress event from the request task into the UI state
    pub fn apply_explain_event(&mut self, event: ExplainEvent) {
        let terminal = event.is_terminal();

        if let ExplainEvent::Slide(slide) = &event {
            if self.session.state().is_in_flight() {
                if let Some(dir) = &self.export_dir {
                    let index = self.session.slides().len();
                    self.slide_paths.push(dir.join(slide_file_name(index, &slide.image)));
                }
            }
        }

        self.session.apply(event);

        if self.slides_state.selected().is_none() && !self.session.slides().is_empty() {
            self.slides_state.select(Some(0));
        }

        if terminal {
            self.focus = FocusPane::Input;
            self.cursor = self.input.chars().count();
        }
    }

    /// Status line text while a request runs
    pub fn progress_label(&self) -> Option<String> {
        let dots = ".".repeat((self.animation_frame as usize) + 1);
        match self.session.state() {
            RequestState::InFlight(Phase::Sending) => Some(format!("Rounding up the puppies{}", dots)),
            RequestState::InFlight(Phase::Streaming) => Some(format!(
                "Drawing slide {}{}",
                self.session.slides().len() + 1,
                dots
            )),
            _ => None,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.session.state().is_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Example list navigation
    pub fn examples_nav_down(&mut self) {
        let i = self.examples_state.selected().unwrap_or(0);
        self.examples_state.select(Some((i + 1).min(EXAMPLES.len() - 1)));
    }

    pub fn examples_nav_up(&mut self) {
        let i = self.examples_state.selected().unwrap_or(0);
        self.examples_state.select(Some(i.saturating_sub(1)));
    }

    // Slide navigation
    pub fn slides_nav_down(&mut self) {
        let len = self.session.slides().len();
        if len > 0 {
            let i = self.slides_state.selected().unwrap_or(0);
            self.slides_state.select(Some((i + 1).min(len - 1)));
            self.scroll_to_selected_slide();
        }
    }

    pub fn slides_nav_up(&mut self) {
        if !self.session.slides().is_empty() {
            let i = self.slides_state.selected().unwrap_or(0);
            self.slides_state.select(Some(i.saturating_sub(1)));
            self.scroll_to_selected_slide();
        }
    }

    pub fn slides_first(&mut self) {
        if !self.session.slides().is_empty() {
            self.slides_state.select(Some(0));
            self.slides_scroll = 0;
        }
    }

    pub fn slides_last(&mut self) {
        let len = self.session.slides().len();
        if len > 0 {
            self.slides_state.select(Some(len - 1));
            self.scroll_to_selected_slide();
        }
    }

    pub fn selected_slide_path(&self) -> Option<&PathBuf> {
        self.slides_state.selected().and_then(|i| self.slide_paths.get(i))
    }

    /// Rows a slide takes in the slides pane once wrapped to the pane width
    pub fn slide_height(&self, index: usize) -> u16 {
        // Use actual pane width for wrap calculation, default to 50 if not set
        let wrap_width = if self.slides_width > 0 {
            self.slides_width as usize
        } else {
            50
        };

        let Some(slide) = self.session.slides().get(index) else {
            return 0;
        };

        // Display width, so bullets, stripped heading markers and wide glyphs count right
        let rows: usize = ui::slide_lines(self, index, slide)
            .iter()
            .map(|line| line.width().div_ceil(wrap_width).max(1))
            .sum();
        u16::try_from(rows).unwrap_or(u16::MAX)
    }

    /// Scroll just enough to keep the selected slide fully visible
    pub fn scroll_to_selected_slide(&mut self) {
        let Some(selected) = self.slides_state.selected() else {
            return;
        };
        let top = (0..selected).fold(0u16, |acc, i| acc.saturating_add(self.slide_height(i)));
        let bottom = top.saturating_add(self.slide_height(selected));

        let visible_height = if self.slides_height > 0 {
            self.slides_height
        } else {
            20
        };

        if top < self.slides_scroll {
            self.slides_scroll = top;
        } else if bottom > self.slides_scroll.saturating_add(visible_height) {
            self.slides_scroll = bottom.saturating_sub(visible_height);
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    pub fn delete_before_cursor(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete_at_cursor(&mut self) {
        if self.cursor < self.input.chars().count() {
            let byte_pos = char_to_byte_index(&self.input, self.cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use futures_util::stream::{self, StreamExt};
    use pawsplainer_core::{Fragment, FragmentStream, ImageData};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Replays fragments; the stream stays open until `release` is notified
    pub(crate) struct GatedSource {
        pub fragments: Vec<Fragment>,
        pub release: Arc<tokio::sync::Notify>,
    }

    #[async_trait]
    impl FragmentSource for GatedSource {
        async fn stream(&self, _prompt: &str) -> Result<FragmentStream> {
            self.release.notified().await;
            let items: Vec<Result<Fragment>> = self.fragments.iter().cloned().map(Ok).collect();
            Ok(stream::iter(items).boxed())
        }
    }

    pub(crate) fn test_app(
        fragments: Vec<Fragment>,
        slides_root: Option<PathBuf>,
    ) -> (App, UnboundedReceiver<ExplainEvent>, Arc<tokio::sync::Notify>) {
        let release = Arc::new(tokio::sync::Notify::new());
        let source = GatedSource {
            fragments,
            release: release.clone(),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            Some(Arc::new(source)),
            None,
            "test-model".to_string(),
            slides_root,
            tx,
        );
        (app, rx, release)
    }

    pub(crate) async fn drain_until_done(app: &mut App, rx: &mut UnboundedReceiver<ExplainEvent>) {
        while let Some(event) = rx.recv().await {
            let terminal = event.is_terminal();
            app.apply_explain_event(event);
            if terminal {
                break;
            }
        }
    }

    pub(crate) fn png(tag: u8) -> Fragment {
        Fragment::Image(ImageData::new(vec![tag], "image/png"))
    }

    #[tokio::test]
    async fn test_whitespace_submit_does_nothing() {
        let (mut app, mut rx, _release) = test_app(Vec::new(), None);
        app.input = "   ".to_string();
        app.submit_input();

        assert_eq!(app.session.state(), &RequestState::Idle);
        assert_eq!(app.input, "   ");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_second_submit_rejected_until_done() {
        let (mut app, mut rx, release) =
            test_app(vec![Fragment::text("a"), png(1)], None);

        app.submit("first question");
        assert!(!app.input_enabled());
        assert!(app.progress_label().unwrap().starts_with("Rounding up the puppies"));

        app.submit("second question");
        assert_eq!(app.session.transcript(), ["first question".to_string()]);

        release.notify_one();
        drain_until_done(&mut app, &mut rx).await;

        assert!(app.input_enabled());
        assert_eq!(app.focus, FocusPane::Input);
        assert_eq!(app.session.slides().len(), 1);
        assert_eq!(app.slides_state.selected(), Some(0));
        assert_eq!(app.progress_label(), None);

        app.submit("second question");
        assert_eq!(app.session.transcript(), ["second question".to_string()]);
        assert!(app.session.slides().is_empty());
    }

    #[tokio::test]
    async fn test_missing_key_disables_submission() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut app = App::new(
            None,
            Some(ConfigError::MissingApiKey),
            "test-model".to_string(),
            None,
            tx,
        );
        app.submit("hello");
        assert!(!app.input_enabled());
        assert!(app.session.transcript().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_example_submission_uses_literal_text() {
        let (mut app, mut rx, release) = test_app(Vec::new(), None);
        app.examples_nav_down();
        app.submit_selected_example();
        assert_eq!(app.session.transcript(), [EXAMPLES[1].to_string()]);

        release.notify_one();
        drain_until_done(&mut app, &mut rx).await;
        assert!(app.session.slides().is_empty());
        assert_eq!(app.session.state(), &RequestState::Idle);
    }

    #[tokio::test]
    async fn test_exported_slide_paths_follow_slides() {
        let root = tempfile::tempdir().unwrap();
        let (mut app, mut rx, release) = test_app(
            vec![Fragment::text("a"), png(1), Fragment::text("b"), png(2)],
            Some(root.path().to_path_buf()),
        );

        app.submit("What is a tree?");
        release.notify_one();
        drain_until_done(&mut app, &mut rx).await;

        assert_eq!(app.slide_paths.len(), 2);
        assert!(app.slide_paths[0].ends_with("slide-01.png"));
        assert!(app.slide_paths[1].exists());
        assert_eq!(app.selected_slide_path(), Some(&app.slide_paths[0]));
        app.slides_nav_down();
        assert_eq!(app.selected_slide_path(), Some(&app.slide_paths[1]));
    }

    #[test]
    fn test_utf8_input_editing() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, None, String::new(), None, tx);
        app.insert_str("pupé");
        app.cursor_left();
        app.delete_before_cursor();
        assert_eq!(app.input, "pué");
        app.cursor_home();
        app.delete_at_cursor();
        assert_eq!(app.input, "ué");
        app.cursor_end();
        app.insert_char('🐶');
        assert_eq!(app.input, "ué🐶");
        assert_eq!(app.cursor, 3);
    }

    #[test]
    fn test_scroll_keeps_selected_slide_visible() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, None, String::new(), None, tx);
        app.slides_height = 8;
        app.slides_width = 40;

        app.session.submit("q").unwrap();
        for i in 0..5u8 {
            app.apply_explain_event(ExplainEvent::Slide(pawsplainer_core::Slide {
                caption: format!("caption {}", i),
                image: ImageData::new(vec![i], "image/png"),
            }));
        }
        // title, one caption line, image line, blank
        assert_eq!(app.slide_height(0), 4);
        assert_eq!(app.slides_state.selected(), Some(0));

        app.slides_last();
        assert_eq!(app.slides_state.selected(), Some(4));
        assert_eq!(app.slides_scroll, 12);

        app.slides_nav_up();
        app.slides_nav_up();
        app.slides_nav_up();
        assert_eq!(app.slides_state.selected(), Some(1));
        assert_eq!(app.slides_scroll, 4);

        app.slides_first();
        assert_eq!(app.slides_scroll, 0);
    }

    fn app_with_captions(captions: &[String], width: u16) -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut app = App::new(None, None, String::new(), None, tx);
        app.slides_width = width;
        app.slides_height = 8;
        app.session.submit("q").unwrap();
        for caption in captions {
            app.apply_explain_event(ExplainEvent::Slide(pawsplainer_core::Slide {
                caption: caption.clone(),
                image: ImageData::new(vec![0], "image/png"),
            }));
        }
        app
    }

    #[test]
    fn test_slide_height_counts_display_width() {
        let ascii = app_with_captions(&["abcdef".to_string()], 10);
        let wide = app_with_captions(&["🐶🐶🐶🐶🐶🐶".to_string()], 10);
        // Six wide glyphs need two rows at width 10
        assert_eq!(wide.slide_height(0), ascii.slide_height(0) + 1);

        // The bullet prefix pushes "- abcdefgh" past ten columns
        let bullet = app_with_captions(&["- abcdefgh".to_string()], 10);
        let plain = app_with_captions(&["abcdefghij".to_string()], 10);
        assert_eq!(bullet.slide_height(0), plain.slide_height(0) + 1);
    }

    #[test]
    fn test_huge_slides_saturate_instead_of_overflowing() {
        let huge = "pup\n".repeat(70_000);
        let mut app = app_with_captions(&[huge.clone(), huge, "small".to_string()], 40);
        assert_eq!(app.slide_height(0), u16::MAX);

        app.slides_last();
        assert_eq!(app.slides_state.selected(), Some(2));
        assert_eq!(app.slides_scroll, u16::MAX - 8);
    }
}
