pub mod data;

use std::io::stdout;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use dedupe_core::Column;
use dedupe_session::{Command, EditSession, Outcome, SessionError, SessionState, HELP};

use crate::util;
use crate::CliError;
use data::GridData;

const PAGE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusKind {
    Info,
    Error,
}

struct TuiApp {
    session: EditSession,
    input: String,
    status: Option<(StatusKind, String)>,
    scroll_row: usize,
    scroll_col: usize,
    file_name: String,
    should_quit: bool,
}

impl TuiApp {
    fn new(session: EditSession, file_name: String) -> Self {
        Self {
            session,
            input: String::new(),
            status: None,
            scroll_row: 0,
            scroll_col: 0,
            file_name,
            should_quit: false,
        }
    }

    /// Only state-corrupting errors escape; everything else goes to the status line.
    fn handle_key(&mut self, key: KeyEvent) -> Result<(), SessionError> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        if self.session.state() == SessionState::Help {
            // Any key dismisses help
            self.session.dismiss_help();
            return Ok(());
        }

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return self.submit(Command::Quit);
        }

        match key.code {
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                match Command::parse(&line) {
                    Some(cmd) => self.submit(cmd)?,
                    None => {
                        log::debug!("ignored input {:?}", line.trim());
                        self.set_status(StatusKind::Error, format!("unknown command {:?} (h for help)", line.trim()));
                    }
                }
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => self.input.clear(),
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Up => self.scroll(-1, 0),
            KeyCode::Down => self.scroll(1, 0),
            KeyCode::PageUp => self.scroll(-(PAGE as isize), 0),
            KeyCode::PageDown => self.scroll(PAGE as isize, 0),
            KeyCode::Left => self.scroll(0, -1),
            KeyCode::Right => self.scroll(0, 1),
            KeyCode::Home => {
                self.scroll_row = 0;
                self.scroll_col = 0;
            }
            _ => {}
        }
        Ok(())
    }

    fn submit(&mut self, cmd: Command) -> Result<(), SessionError> {
        let group_before = self.session.cursor();

        match self.session.apply(cmd) {
            Ok(Outcome::ShowHelp) => self.status = None,
            Ok(outcome) => self.set_status(StatusKind::Info, outcome.to_string()),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("{e}");
                self.set_status(StatusKind::Error, e.to_string());
            }
        }

        if self.session.cursor() != group_before {
            self.scroll_row = 0;
            self.scroll_col = 0;
        }
        if self.session.is_finished() {
            self.should_quit = true;
        }
        Ok(())
    }

    fn set_status(&mut self, kind: StatusKind, message: String) {
        self.status = Some((kind, message));
    }

    fn scroll(&mut self, drow: isize, dcol: isize) {
        let members = self.session.view().map(|v| v.rows.len()).unwrap_or(0);
        let fields = Column::all().count();
        self.scroll_row = self
            .scroll_row
            .saturating_add_signed(drow)
            .min(fields.saturating_sub(1));
        self.scroll_col = self
            .scroll_col
            .saturating_add_signed(dcol)
            .min(members.saturating_sub(1));
    }

    fn visible_columns(grid: &GridData, start_col: usize, available: usize) -> Vec<usize> {
        let mut cols = Vec::new();
        let mut used = 0usize;
        for c in start_col..grid.num_cols() {
            let w = grid.col_widths[c] + 1;
            if used + w > available && !cols.is_empty() {
                break;
            }
            used += w;
            cols.push(c);
        }
        cols
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        let grid = self.session.view().map(|v| GridData::from_view(&v));

        self.draw_title(frame, chunks[0]);
        match &grid {
            Some(grid) => self.draw_grid(frame, chunks[1], grid),
            None => {
                let msg = Paragraph::new("(no group under review)").style(Style::default().fg(Color::DarkGray));
                frame.render_widget(msg, chunks[1]);
            }
        }
        self.draw_status(frame, chunks[2]);
        self.draw_input(frame, chunks[3]);

        if self.session.state() == SessionState::Help {
            self.draw_help(frame, area);
        }
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let group_info = match (self.session.progress(), self.session.current_group()) {
            (Some(progress), Some(group)) => {
                let ids: Vec<String> = group.members().iter().map(|id| id.to_string()).collect();
                format!("group {} | ids {}", progress, ids.join(", "))
            }
            _ => "done".to_string(),
        };

        let title = format!(" dedupe: {} | {} ", self.file_name, group_info);
        let para = Paragraph::new(Line::from(vec![Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )]))
        .style(Style::default().bg(Color::Cyan));
        frame.render_widget(para, area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect, grid: &GridData) {
        if grid.num_cols() == 0 {
            let msg = Paragraph::new("(every record in this group was deleted; u to undo, n to move on)")
                .style(Style::default().fg(Color::DarkGray));
            frame.render_widget(msg, area);
            return;
        }

        let available = (area.width as usize).saturating_sub(grid.label_width + 1);
        let vis_cols = Self::visible_columns(grid, self.scroll_col, available);

        // Header line
        let mut header_spans = vec![Span::styled(
            format!("{} ", " ".repeat(grid.label_width)),
            Style::default().fg(Color::DarkGray),
        )];
        for &c in &vis_cols {
            let w = grid.col_widths[c];
            header_spans.push(Span::styled(
                format!("{} ", util::pad_right(&grid.col_names[c], w)),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        }

        let visible_rows = area.height.saturating_sub(1) as usize;
        let end_row = (self.scroll_row + visible_rows).min(grid.num_rows());

        let mut lines: Vec<Line> = Vec::with_capacity(visible_rows + 1);
        lines.push(Line::from(header_spans));
        let mut links: Vec<(u16, u16, String, &str)> = Vec::new();

        for (line, r) in (self.scroll_row..end_row).enumerate() {
            let mut spans = vec![Span::styled(
                format!("{} ", util::pad_right(&grid.row_labels[r], grid.label_width)),
                Style::default().fg(Color::DarkGray),
            )];

            let mut x = area.x as usize + grid.label_width + 1;
            for &c in &vis_cols {
                let cell = &grid.rows[r][c];
                let w = grid.col_widths[c];
                let display = util::pad_right(&cell.text, w);
                if let Some(url) = &cell.url {
                    // Pad odd text into the trailing blank so no chunk is half empty
                    let mut text = display.trim_end().to_string();
                    if text.len() % 2 == 1 {
                        text.push(' ');
                    }
                    links.push((x as u16, area.y + 1 + line as u16, text, url.as_str()));
                }
                x += w + 1;

                let style = if cell.highlighted {
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD | Modifier::REVERSED)
                } else if cell.url.is_some() {
                    Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED)
                } else {
                    Style::default().fg(Color::Gray)
                };

                spans.push(Span::styled(display, style));
                spans.push(Span::raw(" "));
            }

            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), area);
        let right = area.right();
        let buf = frame.buffer_mut();
        for (x, y, text, url) in links {
            hyperlink(buf, x, y, right, &text, url);
        }
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let (left, fg) = match &self.status {
            Some((StatusKind::Error, msg)) => (format!(" error: {}", msg), Color::Red),
            Some((StatusKind::Info, msg)) => (format!(" {}", msg), Color::Black),
            None => (String::new(), Color::Black),
        };

        let undo = if self.session.can_undo() { "u: undo  " } else { "" };
        let right = format!(
            "{}s: save to {}  h: help ",
            undo,
            self.session.destination().display()
        );

        let padding = (area.width as usize)
            .saturating_sub(util::display_width(&left) + util::display_width(&right));
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);

        let para = Paragraph::new(Line::from(vec![Span::styled(
            status,
            Style::default().fg(fg).bg(Color::DarkGray),
        )]))
        .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(para, area);
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let line = Line::from(vec![
            Span::styled("> ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(self.input.as_str()),
            Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let key_width = HELP.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut help_lines: Vec<String> = vec![String::new()];
        for (key, text) in HELP {
            help_lines.push(format!("  {:<w$}  {}", key, text, w = key_width));
        }
        help_lines.push(String::new());
        help_lines.push("  Arrows / PgUp / PgDn scroll the table".to_string());
        help_lines.push("  Any key closes this help".to_string());
        help_lines.push(String::new());

        let help_width = help_lines
            .iter()
            .map(|s| util::display_width(s))
            .max()
            .unwrap_or(0) as u16
            + 4;
        let help_height = help_lines.len() as u16 + 2;

        let x = area.width.saturating_sub(help_width) / 2;
        let y = area.height.saturating_sub(help_height) / 2;
        let popup = Rect::new(
            area.x + x,
            area.y + y,
            help_width.min(area.width),
            help_height.min(area.height),
        );

        let lines: Vec<Line> = help_lines
            .into_iter()
            .map(|s| Line::from(Span::styled(s, Style::default().fg(Color::White))))
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Commands ")
            .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .style(Style::default().bg(Color::Black));

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(lines).block(block), popup);
    }
}

/// Wrap already-rendered cells in an OSC 8 hyperlink to `url`.
///
/// Each buffer cell carries two characters of `text`: ratatui counts the
/// escape sequence as a wide symbol and skips exactly the next cell.
fn hyperlink(buf: &mut Buffer, x: u16, y: u16, right: u16, text: &str, url: &str) {
    if !text.is_ascii() || url.chars().any(char::is_control) {
        return;
    }
    let bytes = text.as_bytes();
    for (i, pair) in bytes.chunks(2).enumerate() {
        let cx = x.saturating_add(i as u16 * 2);
        if cx.saturating_add(pair.len() as u16) > right {
            break;
        }
        let chunk = std::str::from_utf8(pair).unwrap_or(" ");
        buf[(cx, y)].set_symbol(&format!("\x1B]8;;{}\x07{}\x1B]8;;\x07", url, chunk));
    }
}

/// Run the full-screen review until the operator quits or passes the last group.
pub fn run(session: EditSession, file_name: String) -> Result<(), CliError> {
    run_app(TuiApp::new(session, file_name))
}

fn run_app(mut app: TuiApp) -> Result<(), CliError> {
    terminal::enable_raw_mode()
        .map_err(|e| CliError::terminal(format!("failed to enable raw mode: {}", e)))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| CliError::terminal(format!("failed to enter alternate screen: {}", e)))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| CliError::terminal(format!("failed to create terminal: {}", e)))?;

    loop {
        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| CliError::terminal(format!("draw error: {}", e)))?;

        // Block until the operator does something
        if let Event::Key(key) =
            event::read().map_err(|e| CliError::terminal(format!("event read error: {}", e)))?
        {
            app.handle_key(key).map_err(CliError::session)?;
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}
