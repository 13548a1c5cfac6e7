use pawsplainer_core::prompt::EXAMPLES;
use pawsplainer_core::Slide;
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, FocusPane};

/// Render a block of markdown into styled lines.
///
/// Handles `#` headings, `-`/`*` bullets and inline `**bold**` / `*italic*`.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    text.lines().map(render_markdown_block_line).collect()
}

fn render_markdown_block_line(line: &str) -> Line<'static> {
    let trimmed = line.trim_start();

    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes > 0 && trimmed[hashes..].starts_with(' ') {
        return Line::from(Span::styled(
            trimmed[hashes..].trim().to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    if let Some(rest) = trimmed
        .strip_prefix("- ")
        .or_else(|| trimmed.strip_prefix("* "))
    {
        let mut spans = vec![Span::styled("  • ", Style::default().fg(Color::Yellow))];
        spans.extend(parse_markdown_line(rest).spans);
        return Line::from(spans);
    }

    parse_markdown_line(line)
}

/// Parse a line of text and convert **bold** and *italic* markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c != '*' {
            current_text.push(c);
            continue;
        }

        let bold = chars.peek() == Some(&'*');
        if bold {
            chars.next();
        }

        // Find the matching closer
        let mut inner = String::new();
        let mut found_close = false;
        while let Some(c) = chars.next() {
            if c == '*' {
                if !bold {
                    found_close = true;
                    break;
                }
                if chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
            }
            inner.push(c);
        }

        if found_close && !inner.is_empty() {
            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }
            let modifier = if bold { Modifier::BOLD } else { Modifier::ITALIC };
            spans.push(Span::styled(inner, Style::default().add_modifier(modifier)));
        } else {
            // No closer, keep the markers as literal text
            current_text.push_str(if bold { "**" } else { "*" });
            current_text.push_str(&inner);
            if found_close {
                current_text.push_str(if bold { "**" } else { "*" });
            }
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.is_configured() {
        render_explain_screen(app, frame, body_area);
    } else {
        render_missing_key(frame, body_area);
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " 🐶 Pawsplainer ",
        Style::default().fg(Color::Cyan).bold(),
    )];
    if !app.model.is_empty() {
        spans.push(Span::styled(
            format!("[{}]", app.model),
            Style::default().fg(Color::Gray),
        ));
    }
    spans.push(Span::raw(" "));
    spans.push(Span::styled(
        format!("v{}", env!("CARGO_PKG_VERSION")),
        Style::default().fg(Color::Gray),
    ));

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if !app.is_configured() {
        vec![Span::styled(" q ", key_style), Span::styled(" quit ", label_style)]
    } else {
        let mut hints = match app.focus {
            FocusPane::Input => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" Alt+Enter ", key_style),
                Span::styled(" newline ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" examples ", label_style),
            ],
            FocusPane::Examples => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" nav ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" ask ", label_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
            ],
            FocusPane::Slides => vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" slide ", label_style),
                Span::styled(" g/G ", key_style),
                Span::styled(" first/last ", label_style),
                Span::styled(" o ", key_style),
                Span::styled(" open image ", label_style),
            ],
        };
        hints.extend(vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" focus ", label_style),
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" quit ", label_style),
        ]);
        hints
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn border_color(app: &App, pane: FocusPane) -> Color {
    if app.focus == pane {
        Color::Cyan
    } else {
        Color::DarkGray
    }
}

fn render_explain_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [left_area, slides_area] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let input_lines = app.input.split('\n').count().clamp(1, 5) as u16;
    let error_height = match app.session.error() {
        Some(_) => 4,
        None => 0,
    };

    let [examples_area, input_area, error_area, transcript_area] = Layout::vertical([
        Constraint::Length(EXAMPLES.len() as u16 + 2),
        Constraint::Length(input_lines + 2),
        Constraint::Length(error_height),
        Constraint::Min(0),
    ])
    .areas(left_area);

    // Store areas for mouse hit-testing
    app.examples_area = Some(examples_area);
    app.input_area = Some(input_area);
    app.slides_area = Some(slides_area);

    render_examples(app, frame, examples_area);
    render_input(app, frame, input_area);
    if error_height > 0 {
        render_error(app, frame, error_area);
    }
    render_transcript(app, frame, transcript_area);
    render_slides(app, frame, slides_area);
}

fn render_examples(app: &mut App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let items: Vec<ListItem> = EXAMPLES
        .iter()
        .map(|example| {
            let style = if enabled {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Span::styled(format!(" {} ", example), style))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, FocusPane::Examples)))
        .title(" Try an example ");

    let list = List::new(items).block(block).highlight_style(
        Style::default()
            .bg(Color::Blue)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    if app.focus == FocusPane::Examples {
        frame.render_stateful_widget(list, area, &mut app.examples_state);
    } else {
        frame.render_widget(list, area);
    }
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.input_enabled();
    let focused = app.focus == FocusPane::Input;

    let title = if enabled {
        " Ask anything "
    } else {
        " Waiting for the puppies "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, FocusPane::Input)))
        .title(title);

    let text = if app.input.is_empty() && !focused {
        Text::from(Span::styled(
            "Type your question here...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::from(app.input.as_str())
    };

    let style = if enabled {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let inner = block.inner(area);

    // Keep the cursor row on screen for long multi-line input
    let (cursor_row, cursor_col) = cursor_row_col(&app.input, app.cursor);
    let scroll = cursor_row.saturating_sub(inner.height.saturating_sub(1));

    let input = Paragraph::new(text)
        .block(block)
        .style(style)
        .scroll((scroll, 0));
    frame.render_widget(input, area);

    if focused && enabled {
        let x = inner.x + cursor_col.min(inner.width.saturating_sub(1));
        let y = inner.y + cursor_row - scroll;
        frame.set_cursor_position((x, y));
    }
}

/// Row and column (in chars) of a char-indexed cursor within multi-line input
fn cursor_row_col(input: &str, cursor: usize) -> (u16, u16) {
    let before: String = input.chars().take(cursor).collect();
    let row = before.matches('\n').count();
    let col = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0);
    (row as u16, col as u16)
}

fn render_error(app: &App, frame: &mut Frame, area: Rect) {
    let Some(message) = app.session.error() else {
        return;
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error ");

    let error = Paragraph::new(format!("Something went wrong: {}", message))
        .style(Style::default().fg(Color::Red))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(error, area);
}

fn render_transcript(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Question ");

    let text = match app.session.transcript().last() {
        None => Text::from(Span::styled(
            "Ask a question and the puppies will explain it, one slide at a time.",
            Style::default().fg(Color::DarkGray),
        )),
        Some(question) => {
            let mut lines = vec![Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))];
            lines.extend(render_markdown(question));
            Text::from(lines)
        }
    };

    let transcript = Paragraph::new(text).block(block).wrap(Wrap { trim: false });
    frame.render_widget(transcript, area);
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// The lines for one slide; must agree with `App::slide_height`
pub(crate) fn slide_lines(app: &App, index: usize, slide: &Slide) -> Vec<Line<'static>> {
    let selected = app.slides_state.selected() == Some(index);
    let title_style = if selected && app.focus == FocusPane::Slides {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else if selected {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let mut lines = vec![Line::from(Span::styled(
        format!(" Slide {} ", index + 1),
        title_style,
    ))];
    lines.extend(render_markdown(slide.caption.trim()));

    let location = match app.slide_paths.get(index) {
        Some(path) => path.display().to_string(),
        None => "not saved".to_string(),
    };
    lines.push(Line::from(vec![
        Span::styled("🖼  ", Style::default().fg(Color::Magenta)),
        Span::styled(location, Style::default().fg(Color::Magenta)),
        Span::styled(
            format!("  ({}, {})", slide.image.mime_type, format_size(slide.image.bytes.len())),
            Style::default().fg(Color::DarkGray),
        ),
    ]));
    lines.push(Line::default());
    lines
}

fn render_slides(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store pane dimensions for scroll calculations (inner size minus borders)
    app.slides_height = area.height.saturating_sub(2);
    app.slides_width = area.width.saturating_sub(2);

    let count = app.session.slides().len();
    let title = match &app.export_dir {
        Some(dir) if count > 0 => format!(" Slides ({}) → {} ", count, dir.display()),
        _ if count > 0 => format!(" Slides ({}) ", count),
        _ => " Slides ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color(app, FocusPane::Slides)))
        .title(title);

    let mut lines: Vec<Line> = Vec::new();
    for (i, slide) in app.session.slides().iter().enumerate() {
        lines.extend(slide_lines(app, i, slide));
    }

    if let Some(label) = app.progress_label() {
        lines.push(Line::from(Span::styled(
            label,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    } else if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "No slides yet.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let slides = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.slides_scroll, 0));
    frame.render_widget(slides, area);
}

fn render_missing_key(frame: &mut Frame, area: Rect) {
    let popup_width = 64.min(area.width.saturating_sub(4));
    let popup_height = 12.min(area.height);
    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;
    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" ⚠️ API Key Missing ");

    let lines = vec![
        Line::from("Pawsplainer needs a Gemini API key to fetch its puppies."),
        Line::default(),
        Line::from("Add this line to a .env file in the working directory:"),
        Line::from(Span::styled(
            "  GEMINI_API_KEY=your_gemini_api_key_here",
            Style::default().fg(Color::Cyan),
        )),
        Line::default(),
        Line::from("Get a key at:"),
        Line::from(Span::styled(
            "  https://makersuite.google.com/app/apikey",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::UNDERLINED),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Press q to quit.",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let panel = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(panel, popup_area);
}
