use crate::client::{
    AppSnapshot,
    ResultView,
};
use color_eyre::eyre::Result;
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEventKind,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use lucky_ten::{
    Guess,
    PlayState,
    game::MAX_GUESS,
};
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;

pub type InputEvents = EventStream;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UserEvent {
    Quit,
    Redraw,
    Connect,
    Select(Guess),
    NextNumber,
    PrevNumber,
    Play,
    DismissResult,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

#[derive(Default)]
pub struct UiState {
    mode: Mode,
    result_open: bool,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

pub fn input_events() -> InputEvents {
    EventStream::new()
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout());
    state.terminal = Some(Terminal::new(backend)?);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(
        std::io::stdout(),
        crossterm::event::DisableMouseCapture,
        crossterm::terminal::LeaveAlternateScreen
    )?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.result_open = snap.result.is_some();
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub async fn next_user_event(state: &mut UiState, input: &mut InputEvents) -> Result<UserEvent> {
    loop {
        match input.next().await {
            Some(Ok(Event::Key(k))) => {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                if let Some(event) = map_key(state, k.code) {
                    return Ok(event);
                }
            }
            Some(Ok(Event::Resize(..))) => return Ok(UserEvent::Redraw),
            Some(Ok(_)) => {}
            Some(Err(err)) => return Err(err.into()),
            None => return Ok(UserEvent::Quit),
        }
    }
}

fn map_key(state: &mut UiState, code: KeyCode) -> Option<UserEvent> {
    match state.mode {
        Mode::QuitModal => {
            return match code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(UserEvent::Quit),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    state.mode = Mode::Normal;
                    Some(UserEvent::Redraw)
                }
                _ => None,
            };
        }
        Mode::Normal => {}
    }
    if state.result_open {
        return match code {
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                state.result_open = false;
                Some(UserEvent::DismissResult)
            }
            _ => None,
        };
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc => {
            state.mode = Mode::QuitModal;
            Some(UserEvent::Redraw)
        }
        KeyCode::Char('c') => Some(UserEvent::Connect),
        KeyCode::Right => Some(UserEvent::NextNumber),
        KeyCode::Left => Some(UserEvent::PrevNumber),
        KeyCode::Enter | KeyCode::Char('p') => Some(UserEvent::Play),
        // 0 stands in for 10
        KeyCode::Char('0') => Guess::new(MAX_GUESS).ok().map(UserEvent::Select),
        KeyCode::Char(c) => c
            .to_digit(10)
            .and_then(|d| Guess::new(d as u8).ok())
            .map(UserEvent::Select),
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),  // wallet
            Constraint::Length(3),  // pool
            Constraint::Length(5),  // numbers
            Constraint::Length(3),  // play progress
            Constraint::Min(6),     // history
            Constraint::Length(6),  // errors + help
        ])
        .split(f.area());
    draw_wallet(f, chunks[0], snap);
    draw_pool(f, chunks[1], snap);
    draw_numbers(f, chunks[2], snap);
    draw_progress(f, chunks[3], snap);
    draw_history(f, chunks[4], snap);
    draw_bottom(f, chunks[5], snap);
    draw_modals(f, state, snap);
}

fn draw_wallet(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let wallet = match (&snap.address, snap.balance) {
        (Some(address), Some(balance)) => format!("{address} | {balance} ETH"),
        (Some(address), None) => address.clone(),
        _ => String::from("not connected"),
    };
    let network = match snap.network {
        Some(_) if snap.on_target_network => String::from("Base"),
        Some(chain_id) => format!("wrong network ({chain_id})"),
        None => String::from("-"),
    };
    let p = Paragraph::new(format!(
        "Wallet: {} | Network: {}\n{}",
        wallet, network, snap.status
    ))
    .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

fn draw_pool(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let p = Paragraph::new(format!(
        "Prize pool: {} ETH | Entry: {} ETH",
        snap.pool,
        snap.entry_fee.format_fixed(6)
    ))
    .block(Block::default().borders(Borders::ALL).title("Lucky Ten"));
    f.render_widget(p, area);
}

fn draw_numbers(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = MAX_GUESS as u16;
    let col_w = area.width / cols;
    for (i, guess) in Guess::all().enumerate() {
        let rect = Rect::new(area.x + i as u16 * col_w, area.y, col_w, area.height);
        let selected = snap.selected == Some(guess);
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else if snap.connected {
            Style::default()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let block = Block::default().borders(Borders::ALL).border_style(style);
        let label = Paragraph::new(Line::styled(guess.to_string(), style))
            .alignment(Alignment::Center);
        f.render_widget(&block, rect);
        f.render_widget(label, block.inner(rect));
    }
}

fn draw_progress(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let text = match &snap.play {
        PlayState::Idle => match snap.selected {
            Some(guess) if snap.connected => format!("Press Enter to play {guess}"),
            Some(_) => String::from("Connect a wallet to play"),
            None => String::from("Pick a number"),
        },
        other => crate::client::status_for(other),
    };
    let style = if snap.play.is_in_flight() {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let p = Paragraph::new(text)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title("Play"));
    f.render_widget(p, area);
}

fn draw_history(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines = Vec::new();
    if snap.history.is_empty() {
        lines.push(Line::styled("No games yet", Style::default().fg(Color::DarkGray)));
    }
    for entry in &snap.history {
        let winning = entry
            .winning_number
            .map_or_else(|| String::from("?"), |n| n.to_string());
        let (label, color) = if entry.won {
            ("WON", Color::Green)
        } else {
            ("LOST", Color::Red)
        };
        lines.push(Line::from(vec![
            Span::raw(format!(
                "{} Guessed {} -> {} ",
                entry.timestamp.format("%H:%M:%S"),
                entry.guess,
                winning
            )),
            Span::styled(label, Style::default().fg(color)),
        ]));
    }
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Recent Games"));
    f.render_widget(p, area);
}

fn draw_bottom(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Length(3)])
        .split(area);
    let (line, color) = match snap.errors.last() {
        Some(err) => (err.clone(), Color::Red),
        None => (String::from("No errors"), Color::DarkGray),
    };
    let errors = Paragraph::new(line)
        .style(Style::default().fg(color))
        .block(Block::default().borders(Borders::ALL).title("Errors"));
    f.render_widget(errors, chunks[0]);
    let help = Paragraph::new(
        "c connect | ←/→ or 1-9,0 pick | Enter play | q/Esc quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[1]);
}

fn draw_modals(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    if let Some(result) = &snap.result {
        draw_result(f, result);
    }
    if state.mode == Mode::QuitModal {
        let area = centered_rect(40, 20, f.area());
        let block = Block::default().borders(Borders::ALL).title("Confirm Quit");
        let p = Paragraph::new("Quit the game? (Y/N)");
        f.render_widget(Clear, area);
        f.render_widget(block.clone(), area);
        f.render_widget(p, block.inner(area));
    }
}

fn draw_result(f: &mut Frame, result: &ResultView) {
    let area = centered_rect(50, 30, f.area());
    let color = if result.won { Color::Green } else { Color::Yellow };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(Span::styled(
            result.title.clone(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ));
    let p = Paragraph::new(vec![
        Line::from(result.message.clone()),
        Line::from(""),
        Line::styled("Enter to continue", Style::default().fg(Color::DarkGray)),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(Clear, area);
    f.render_widget(block.clone(), area);
    f.render_widget(p, block.inner(area));
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]

    use super::*;

    #[test]
    fn map_key__digits_select_and_zero_means_ten() {
        let mut state = UiState::default();
        assert_eq!(
            Some(UserEvent::Select(Guess::new(3).unwrap())),
            map_key(&mut state, KeyCode::Char('3'))
        );
        assert_eq!(
            Some(UserEvent::Select(Guess::new(10).unwrap())),
            map_key(&mut state, KeyCode::Char('0'))
        );
    }

    #[test]
    fn map_key__quit_needs_confirmation() {
        let mut state = UiState::default();

        assert_eq!(Some(UserEvent::Redraw), map_key(&mut state, KeyCode::Char('q')));
        assert_eq!(Mode::QuitModal, state.mode);
        assert_eq!(None, map_key(&mut state, KeyCode::Enter));
        assert_eq!(Some(UserEvent::Quit), map_key(&mut state, KeyCode::Char('y')));
    }

    #[test]
    fn map_key__open_result_swallows_play_until_dismissed() {
        let mut state = UiState {
            result_open: true,
            ..UiState::default()
        };

        assert_eq!(None, map_key(&mut state, KeyCode::Char('5')));
        assert_eq!(Some(UserEvent::DismissResult), map_key(&mut state, KeyCode::Enter));
        assert_eq!(Some(UserEvent::Play), map_key(&mut state, KeyCode::Enter));
    }
}
