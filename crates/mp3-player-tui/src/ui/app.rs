use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::{
    event::{self, Event as CEvent, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use mp3_player::{PlayerStatus, TrackController, TrackDecoder};
use ratatui::{Terminal, backend::CrosstermBackend, widgets::ListState};

use super::render;

const VOLUME_STEP: u8 = 5;
const LOG_CAP: usize = 500;

/// Launch the TUI and drive the event loop until the user quits.
pub(crate) fn run_tui<D: TrackDecoder>(
    controller: TrackController<D>,
    volume: u8,
    log_rx: Receiver<String>,
) -> Result<()> {
    let mut app = App::new(controller, volume, log_rx);

    let mut term = init_terminal()?;
    let result = ui_loop(&mut term, &mut app);

    restore_terminal(&mut term)?;
    app.controller.stop();
    result
}

/// In-memory UI state for rendering + interaction.
pub(crate) struct App<D: TrackDecoder> {
    pub(crate) controller: TrackController<D>,
    pub(crate) list_state: ListState,
    /// Slider value, 0-100.
    pub(crate) volume: u8,
    pub(crate) status: String,
    pub(crate) snapshot: PlayerStatus,

    pub(crate) logs_open: bool,
    pub(crate) logs: VecDeque<String>,
    pub(crate) logs_scroll: usize,
    last_status_snapshot: String,
    log_rx: Receiver<String>,
}

impl<D: TrackDecoder> App<D> {
    pub(crate) fn new(controller: TrackController<D>, volume: u8, log_rx: Receiver<String>) -> Self {
        let mut list_state = ListState::default();
        if !controller.library().is_empty() {
            list_state.select(Some(controller.selected_index()));
        }
        let status = if controller.library().is_empty() {
            "No music files found".to_string()
        } else {
            "Ready".to_string()
        };
        let snapshot = controller.status();

        Self {
            controller,
            list_state,
            volume: volume.min(100),
            status,
            snapshot,
            logs_open: false,
            logs: VecDeque::new(),
            logs_scroll: 0,
            last_status_snapshot: String::new(),
            log_rx,
        }
    }

    /// Handle one key press. Returns `false` when the app should exit.
    pub(crate) fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.logs_open {
            match code {
                KeyCode::Char('q') => return false,
                KeyCode::Esc | KeyCode::Char('l') => self.toggle_logs(),
                KeyCode::Up => self.scroll_logs_up(),
                KeyCode::Down => self.scroll_logs_down(),
                _ => {}
            }
            return true;
        }

        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Up => self.move_cursor(|c| c.select_prev()),
            KeyCode::Down => self.move_cursor(|c| c.select_next()),
            KeyCode::Enter => {
                let result = self.controller.change_track();
                self.report(result, "Playing");
            }
            KeyCode::Char('p') => {
                let result = self.controller.play_button_pressed();
                self.report(result, "Playing");
            }
            KeyCode::Char(' ') => {
                self.controller.pause_button_pressed();
                if self.controller.is_paused() {
                    self.status = "Paused".into();
                }
            }
            KeyCode::Char('n') | KeyCode::Right => {
                let result = self.controller.next();
                self.report(result, "Next");
                self.sync_cursor();
            }
            KeyCode::Char('b') | KeyCode::Left => {
                let result = self.controller.previous();
                self.report(result, "Previous");
                self.sync_cursor();
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.set_volume(self.volume.saturating_add(VOLUME_STEP))
            }
            KeyCode::Char('-') => self.set_volume(self.volume.saturating_sub(VOLUME_STEP)),
            KeyCode::Char('s') => {
                self.controller.stop();
                self.status = "Stopped".into();
            }
            KeyCode::Char('l') => self.toggle_logs(),
            _ => {}
        }
        true
    }

    pub(crate) fn refresh(&mut self) {
        self.snapshot = self.controller.status();
    }

    fn move_cursor(&mut self, step: impl FnOnce(&mut TrackController<D>) -> usize) {
        if self.controller.library().is_empty() {
            return;
        }
        let index = step(&mut self.controller);
        self.list_state.select(Some(index));
    }

    fn sync_cursor(&mut self) {
        if !self.controller.library().is_empty() {
            self.list_state.select(Some(self.controller.selected_index()));
        }
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
        self.controller.set_volume(f32::from(self.volume) / 100.0);
        self.status = format!("Volume {}%", self.volume);
    }

    fn report(&mut self, result: Result<(), mp3_player::PlaybackError>, ok: &str) {
        match result {
            Ok(()) => {
                if self.controller.is_playing() {
                    let name = self
                        .controller
                        .current_index()
                        .and_then(|i| self.controller.library().name(i))
                        .unwrap_or("-");
                    self.status = format!("{ok}: {name}");
                }
            }
            Err(e) => self.status = format!("Error: {e}"),
        }
    }

    fn toggle_logs(&mut self) {
        self.logs_open = !self.logs_open;
        if !self.logs_open {
            self.logs_scroll = 0;
        }
    }

    fn scroll_logs_up(&mut self) {
        let max = self.logs.len().saturating_sub(1);
        self.logs_scroll = (self.logs_scroll + 1).min(max);
    }

    fn scroll_logs_down(&mut self) {
        self.logs_scroll = self.logs_scroll.saturating_sub(1);
    }

    fn push_log_line(&mut self, line: String) {
        if self.logs.len() >= LOG_CAP {
            self.logs.pop_front();
        }
        self.logs.push_back(line);
    }

    fn note_status_change(&mut self) {
        if self.last_status_snapshot == self.status {
            return;
        }
        self.last_status_snapshot = self.status.clone();
        self.push_log_line(format!("status: {}", self.status));
    }

    fn drain_logs(&mut self) {
        while let Ok(line) = self.log_rx.try_recv() {
            self.push_log_line(line);
        }
    }
}

fn ui_loop<D: TrackDecoder>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App<D>,
) -> Result<()> {
    let tick = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        app.drain_logs();
        app.refresh();
        terminal.draw(|f| render::draw(f, app))?;

        let timeout = tick.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).context("poll terminal events")? {
            if let CEvent::Key(k) = event::read().context("read terminal event")? {
                if k.kind == KeyEventKind::Press && !app.handle_key(k.code) {
                    return Ok(());
                }
            }
        }

        app.note_status_change();

        if last_tick.elapsed() >= tick {
            last_tick = Instant::now();
        }
    }
}

fn init_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();
    Ok(())
}
