use std::path::Path;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::warn;

use crate::app::{App, FocusPane};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => {
            if app.focus == FocusPane::Input && app.input_enabled() {
                app.insert_str(&text);
            }
        }
        AppEvent::Resize(_, _) => app.scroll_to_selected_slide(),
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Nothing works without an API key except leaving
    if !app.is_configured() {
        if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
            app.should_quit = true;
        }
        return;
    }

    if key.code == KeyCode::Tab {
        app.focus = app.focus.next();
        return;
    }
    if key.code == KeyCode::BackTab {
        app.focus = app.focus.next().next();
        return;
    }

    match app.focus {
        FocusPane::Input => handle_input(app, key),
        FocusPane::Examples => handle_examples(app, key),
        FocusPane::Slides => handle_slides(app, key),
    }
}

fn handle_input(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Esc {
        app.focus = FocusPane::Examples;
        return;
    }

    // The input box is disabled while a request runs
    if !app.input_enabled() {
        return;
    }

    match key.code {
        KeyCode::Enter
            if key.modifiers.intersects(KeyModifiers::ALT | KeyModifiers::SHIFT) =>
        {
            app.insert_char('\n');
        }
        KeyCode::Enter if key.modifiers.is_empty() => app.submit_input(),
        KeyCode::Backspace => app.delete_before_cursor(),
        KeyCode::Delete => app.delete_at_cursor(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Char(c)
            if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            app.insert_char(c);
        }
        _ => {}
    }
}

fn handle_examples(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.examples_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.examples_nav_up(),
        KeyCode::Enter => app.submit_selected_example(),
        KeyCode::Char('i') => app.focus = FocusPane::Input,
        _ => {}
    }
}

fn handle_slides(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('j') | KeyCode::Down => app.slides_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.slides_nav_up(),
        KeyCode::Char('g') => app.slides_first(),
        KeyCode::Char('G') => app.slides_last(),
        KeyCode::Char('o') | KeyCode::Enter => {
            if let Some(path) = app.selected_slide_path() {
                open_in_viewer(path);
            }
        }
        KeyCode::Char('i') => app.focus = FocusPane::Input,
        _ => {}
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if !app.is_configured() {
        return;
    }

    let x = mouse.column;
    let y = mouse.row;

    let in_examples = app.examples_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_input = app.input_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_slides = app.slides_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if in_examples {
                if let Some(area) = app.examples_area {
                    // First row is the border
                    let row = y.saturating_sub(area.y + 1) as usize;
                    if y > area.y && row < pawsplainer_core::prompt::EXAMPLES.len() {
                        app.focus = FocusPane::Examples;
                        app.examples_state.select(Some(row));
                        app.submit_selected_example();
                    }
                }
            } else if in_input {
                app.focus = FocusPane::Input;
            } else if in_slides {
                app.focus = FocusPane::Slides;
            }
        }
        MouseEventKind::ScrollDown if in_slides => app.slides_nav_down(),
        MouseEventKind::ScrollUp if in_slides => app.slides_nav_up(),
        MouseEventKind::ScrollDown if in_examples => app.examples_nav_down(),
        MouseEventKind::ScrollUp if in_examples => app.examples_nav_up(),
        _ => {}
    }
}

fn open_in_viewer(path: &Path) {
    use std::process::{Command, Stdio};

    let mut command = if cfg!(target_os = "macos") {
        Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else {
        Command::new("xdg-open")
    };

    if let Err(e) = command
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        warn!(path = %path.display(), "could not open slide image: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{drain_until_done, png, test_app};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use pawsplainer_core::prompt::EXAMPLES;
    use pawsplainer_core::{Fragment, RequestState};

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn test_enter_submits_typed_question() {
        let (mut app, mut rx, release) = test_app(vec![Fragment::text("a"), png(1)], None);
        type_text(&mut app, "Why do cats purr?");
        handle_event(&mut app, key(KeyCode::Enter));

        assert_eq!(app.session.transcript(), ["Why do cats purr?".to_string()]);
        assert!(app.input.is_empty());
        assert!(!app.input_enabled());

        release.notify_one();
        drain_until_done(&mut app, &mut rx).await;
        assert_eq!(app.session.slides().len(), 1);
    }

    #[tokio::test]
    async fn test_typing_ignored_while_in_flight() {
        let (mut app, mut rx, release) = test_app(Vec::new(), None);
        type_text(&mut app, "first");
        handle_event(&mut app, key(KeyCode::Enter));

        type_text(&mut app, "second");
        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.input.is_empty());
        assert_eq!(app.session.transcript(), ["first".to_string()]);

        release.notify_one();
        drain_until_done(&mut app, &mut rx).await;
        assert_eq!(app.session.state(), &RequestState::Idle);

        type_text(&mut app, "second");
        assert_eq!(app.input, "second");
    }

    #[tokio::test]
    async fn test_modified_enter_inserts_newline() {
        let (mut app, _rx, _release) = test_app(Vec::new(), None);
        type_text(&mut app, "line one");
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut app, "line two");

        assert_eq!(app.input, "line one\nline two");
        assert_eq!(app.session.state(), &RequestState::Idle);
    }

    #[tokio::test]
    async fn test_blank_enter_is_a_noop() {
        let (mut app, mut rx, _release) = test_app(Vec::new(), None);
        type_text(&mut app, "  ");
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.state(), &RequestState::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_example_enter_submits_example() {
        let (mut app, _rx, _release) = test_app(Vec::new(), None);
        handle_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focus, FocusPane::Examples);
        handle_event(&mut app, key(KeyCode::Char('j')));
        handle_event(&mut app, key(KeyCode::Char('j')));
        handle_event(&mut app, key(KeyCode::Enter));
        assert_eq!(app.session.transcript(), [EXAMPLES[2].to_string()]);
    }

    #[tokio::test]
    async fn test_clicking_example_submits_it() {
        let (mut app, _rx, _release) = test_app(Vec::new(), None);
        app.examples_area = Some(Rect::new(0, 5, 40, 5));
        handle_event(
            &mut app,
            AppEvent::Mouse(MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column: 3,
                row: 6,
                modifiers: KeyModifiers::NONE,
            }),
        );
        assert_eq!(app.session.transcript(), [EXAMPLES[0].to_string()]);
    }

    #[tokio::test]
    async fn test_paste_goes_into_input() {
        let (mut app, _rx, _release) = test_app(Vec::new(), None);
        handle_event(&mut app, AppEvent::Paste("How do vaccines work?".to_string()));
        assert_eq!(app.input, "How do vaccines work?");
        assert_eq!(app.cursor, 21);
    }

    #[test]
    fn test_only_quit_works_without_api_key() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(
            None,
            Some(pawsplainer_core::ConfigError::MissingApiKey),
            String::new(),
            None,
            tx,
        );
        handle_event(&mut app, key(KeyCode::Char('x')));
        handle_event(&mut app, key(KeyCode::Tab));
        assert!(app.input.is_empty());
        assert_eq!(app.focus, FocusPane::Input);
        assert!(!app.should_quit);

        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut app = App::new(None, None, String::new(), None, tx);
        handle_event(&mut app, key_with(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }
}
