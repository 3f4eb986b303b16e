use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::search_list::{ListPhase, PaginatedSearchList, ScrollMetrics, SearchItem, Selection};
use crate::search_tasks::SearchController;

const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const HIGHLIGHT_PREFIX: &str = "> ";
const ROW_PREFIX: &str = "  ";

/// Key press mapped onto a picker action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerInput {
    Type(char),
    Erase,
    Up,
    Down,
    PageUp,
    PageDown,
    Retry,
    Select,
    Cancel,
    Ignore,
}

pub fn route_key(key: KeyEvent) -> PickerInput {
    if key.kind != KeyEventKind::Press {
        return PickerInput::Ignore;
    }
    let control = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if control => PickerInput::Cancel,
        KeyCode::Char('r') if control => PickerInput::Retry,
        KeyCode::Char('n') if control => PickerInput::Down,
        KeyCode::Char('p') if control => PickerInput::Up,
        KeyCode::Char(ch) if !control => PickerInput::Type(ch),
        KeyCode::Backspace => PickerInput::Erase,
        KeyCode::Up => PickerInput::Up,
        KeyCode::Down => PickerInput::Down,
        KeyCode::PageUp => PickerInput::PageUp,
        KeyCode::PageDown => PickerInput::PageDown,
        KeyCode::Enter => PickerInput::Select,
        KeyCode::Esc => PickerInput::Cancel,
        _ => PickerInput::Ignore,
    }
}

/// Highlighted row and first visible row of the picker list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PickerCursor {
    highlighted: usize,
    offset: usize,
}

impl PickerCursor {
    pub fn highlighted(&self) -> usize {
        self.highlighted
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Moves the highlight and keeps it inside the viewport.
    pub fn move_by(&mut self, delta: isize, len: usize, viewport: usize) {
        if len == 0 {
            self.reset();
            return;
        }
        let target = self.highlighted.saturating_add_signed(delta);
        self.highlighted = target.min(len - 1);
        let viewport = viewport.max(1);
        if self.highlighted < self.offset {
            self.offset = self.highlighted;
        } else if self.highlighted >= self.offset + viewport {
            self.offset = self.highlighted + 1 - viewport;
        }
    }

    pub fn metrics(&self, len: usize, viewport: usize) -> ScrollMetrics {
        ScrollMetrics {
            offset: to_u32(self.offset),
            viewport: to_u32(viewport),
            content: to_u32(len),
        }
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Visible rows followed by the list's status line, if any.
pub fn picker_lines<T: SearchItem>(
    list: &PaginatedSearchList<T>,
    cursor: &PickerCursor,
    viewport: usize,
) -> Vec<String> {
    let mut lines: Vec<String> = list
        .items()
        .iter()
        .enumerate()
        .skip(cursor.offset())
        .take(viewport.max(1))
        .map(|(index, item)| {
            let prefix = if index == cursor.highlighted() {
                HIGHLIGHT_PREFIX
            } else {
                ROW_PREFIX
            };
            match item.subtitle() {
                Some(subtitle) => format!("{prefix}{}  ({subtitle})", item.label()),
                None => format!("{prefix}{}", item.label()),
            }
        })
        .collect();
    match list.phase() {
        ListPhase::Loading => lines.push("Loading...".to_owned()),
        ListPhase::LoadingMore => lines.push("Loading more...".to_owned()),
        ListPhase::Error { message, .. } => {
            lines.push(format!("Error: {message} (ctrl-r to retry)"));
        }
        ListPhase::Idle | ListPhase::Loaded => {}
    }
    if let Some(empty) = list.empty_state_text() {
        lines.push(empty);
    }
    lines
}

/// Full-screen workspace picker. Restores the terminal on drop.
pub struct TerminalPicker {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalPicker {
    pub fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    /// Runs until the operator picks a row (`Some`) or cancels (`None`).
    ///
    /// The next page is requested once at most `threshold_rows` loaded rows
    /// remain below the viewport.
    pub fn run<T: SearchItem>(
        &mut self,
        title: &str,
        controller: &mut SearchController<T>,
        threshold_rows: u32,
    ) -> io::Result<Option<Selection>> {
        let mut cursor = PickerCursor::default();
        let mut viewport = 1usize;
        controller.open();
        loop {
            controller.tick();
            self.terminal.draw(|frame| {
                let [input_area, list_area, footer_area] = Layout::vertical([
                    Constraint::Length(3),
                    Constraint::Min(3),
                    Constraint::Length(1),
                ])
                .areas(frame.area());
                viewport = usize::from(list_area.height.saturating_sub(2).max(1));

                let input = Paragraph::new(controller.list().input().to_owned())
                    .block(Block::default().title(title.to_owned()).borders(Borders::ALL));
                frame.render_widget(input, input_area);

                let lines: Vec<Line> = picker_lines(controller.list(), &cursor, viewport)
                    .into_iter()
                    .map(|line| {
                        if line.starts_with(HIGHLIGHT_PREFIX) {
                            Line::styled(line, Style::default().add_modifier(Modifier::BOLD))
                        } else {
                            Line::raw(line)
                        }
                    })
                    .collect();
                let list = Paragraph::new(Text::from(lines))
                    .block(Block::default().borders(Borders::ALL));
                frame.render_widget(list, list_area);

                let footer = controller
                    .status_warning()
                    .map(str::to_owned)
                    .unwrap_or_else(|| "enter select | esc cancel | up/down move".to_owned());
                frame.render_widget(
                    Paragraph::new(footer).style(Style::default().fg(Color::DarkGray)),
                    footer_area,
                );
            })?;

            if !event::poll(EVENT_POLL_INTERVAL)? {
                continue;
            }
            let Event::Key(key) = event::read()? else {
                continue;
            };
            let len = controller.list().items().len();
            let page = isize::try_from(viewport).unwrap_or(1);
            match route_key(key) {
                PickerInput::Type(ch) => {
                    let mut text = controller.list().input().to_owned();
                    text.push(ch);
                    controller.set_query(text);
                    cursor.reset();
                }
                PickerInput::Erase => {
                    let mut text = controller.list().input().to_owned();
                    if text.pop().is_some() {
                        controller.set_query(text);
                        cursor.reset();
                    }
                }
                PickerInput::Up => cursor.move_by(-1, len, viewport),
                PickerInput::PageUp => cursor.move_by(-page, len, viewport),
                PickerInput::Down => {
                    cursor.move_by(1, len, viewport);
                    controller.on_scroll(cursor.metrics(len, viewport), threshold_rows);
                }
                PickerInput::PageDown => {
                    cursor.move_by(page, len, viewport);
                    controller.on_scroll(cursor.metrics(len, viewport), threshold_rows);
                }
                PickerInput::Retry => {
                    controller.retry();
                }
                PickerInput::Select => {
                    let id = controller
                        .list()
                        .items()
                        .get(cursor.highlighted())
                        .map(|item| item.item_id().to_owned());
                    if let Some(id) = id {
                        return Ok(controller.list_mut().select(&id));
                    }
                }
                PickerInput::Cancel => return Ok(None),
                PickerInput::Ignore => {}
            }
        }
    }
}

impl Drop for TerminalPicker {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}
