use std::collections::VecDeque;
use std::io::{self, Stdout};

use crossterm::event::KeyCode;
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph};

use crate::events::{ServerEvent, Severity};
use crate::server::{ClientInfo, ServerStats};

const MAX_LOG_LINES: usize = 200;

/// Raw-mode alternate screen for the lifetime of the value; the terminal is restored on drop,
/// including when the loop bails out with an error.
pub struct TerminalSession {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, cursor::Hide)?;
        Ok(Self {
            terminal: Terminal::new(CrosstermBackend::new(stdout))?,
        })
    }

    pub fn draw(
        &mut self,
        state: &TuiState,
        stats: &ServerStats,
        clients: &[ClientInfo],
    ) -> io::Result<()> {
        self.terminal
            .draw(|frame| render(frame, state, stats, clients))?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
        let _ = execute!(
            self.terminal.backend_mut(),
            LeaveAlternateScreen,
            cursor::Show
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Kick(u32),
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Debug => Color::DarkGray,
        Severity::Info => Color::White,
        Severity::Warn => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

pub struct TuiState {
    log: VecDeque<(Severity, String)>,
    log_scroll: usize,
    selected_client: usize,
}

impl Default for TuiState {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_LINES),
            log_scroll: 0,
            selected_client: 0,
        }
    }

    fn push_log(&mut self, severity: Severity, message: String) {
        if self.log.len() >= MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back((severity, message));
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push_log(Severity::Info, message.into());
    }

    pub fn push_event(&mut self, event: &ServerEvent) {
        self.push_log(event.severity(), event.to_string());
    }

    pub fn handle_key(&mut self, code: KeyCode, clients: &[ClientInfo]) -> KeyAction {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return KeyAction::Quit,
            KeyCode::PageUp => self.scroll_up(),
            KeyCode::PageDown => self.scroll_down(),
            KeyCode::End => self.scroll_to_bottom(),
            KeyCode::Up => self.select_prev_client(clients.len()),
            KeyCode::Down => self.select_next_client(clients.len()),
            KeyCode::Char('k') | KeyCode::Char('K') => {
                if let Some(client) = clients.get(self.selected_client) {
                    return KeyAction::Kick(client.client_id);
                }
            }
            _ => {}
        }
        KeyAction::None
    }

    pub fn scroll_up(&mut self) {
        self.log_scroll = (self.log_scroll + 5).min(self.log.len().saturating_sub(1));
    }

    pub fn scroll_down(&mut self) {
        self.log_scroll = self.log_scroll.saturating_sub(5);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.log_scroll = 0;
    }

    pub fn select_next_client(&mut self, count: usize) {
        if count > 0 {
            self.selected_client = (self.selected_client + 1) % count;
        }
    }

    pub fn select_prev_client(&mut self, count: usize) {
        if count > 0 {
            self.selected_client = (self.selected_client + count - 1) % count;
        }
    }

    /// Lines visible in a window of `height`, newest at the bottom, honouring the scroll offset.
    fn visible_log(&self, height: usize) -> impl Iterator<Item = &(Severity, String)> {
        let end = self.log.len().saturating_sub(self.log_scroll);
        let start = end.saturating_sub(height);
        self.log.range(start..end)
    }
}

fn render(frame: &mut Frame, state: &TuiState, stats: &ServerStats, clients: &[ClientInfo]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[3]);

    render_header(frame, chunks[0], stats);
    render_capacity(frame, chunks[1], stats);
    render_network(frame, chunks[2], stats);
    render_clients(frame, middle[0], state, clients);
    render_log(frame, middle[1], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" netmesh relay - Uptime: {} ", format_duration(stats.uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Clients: {}  |  Handshaking: {}  |  Entities: {}  |  Relayed: {}",
        stats.client_count, stats.pending_count, stats.entity_count, stats.relayed_transforms
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_capacity(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Capacity ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let ratio = if stats.max_clients == 0 {
        1.0
    } else {
        stats.client_count as f64 / stats.max_clients as f64
    };
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} clients", stats.client_count, stats.max_clients));

    frame.render_widget(gauge, area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let net = &stats.network_stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", net.packets_sent, net.packets_received),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rejected: ", Style::default().fg(Color::Gray)),
            Span::styled(
                net.packets_rejected.to_string(),
                Style::default().fg(if net.packets_rejected > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Duplicates: ", Style::default().fg(Color::Gray)),
            Span::styled(
                net.duplicates_dropped.to_string(),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_clients(frame: &mut Frame, area: Rect, state: &TuiState, clients: &[ClientInfo]) {
    let block = Block::default()
        .title(" Clients ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let items: Vec<ListItem> = clients
        .iter()
        .map(|client| {
            let entity = client
                .entity_id
                .map_or_else(|| "-".to_string(), |id| id.to_string());
            let position = client.position.map_or_else(
                || "-".to_string(),
                |p| format!("({:.1}, {:.1}, {:.1})", p.x, p.y, p.z),
            );
            ListItem::new(format!(
                "{:>3} {:<21} {:>5} {} {}s idle {}ms",
                client.client_id,
                client.addr,
                entity,
                position,
                client.connected_secs,
                client.idle_ms
            ))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut list_state = ListState::default();
    if !clients.is_empty() {
        list_state.select(Some(state.selected_client.min(clients.len() - 1)));
    }

    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let height = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = state
        .visible_log(height)
        .map(|(severity, message)| {
            Line::from(Span::styled(
                message.as_str(),
                Style::default().fg(severity_color(*severity)),
            ))
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("q/ESC quit  |  Up/Down select  |  k kick  |  PgUp/PgDn/End scroll log")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
