//! App: terminal setup, the UI event loop and dispatch of actions.
//!
//! Snapshots arrive from the core loop over a broadcast channel; keys turn
//! into `Action`s, and `Action::Send` forwards commands back to the core.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, warn};

use tuner_core::protocol::{Broadcast, Command, TunerSnapshot};

use crate::action::{Action, ComponentId};
use crate::app_state::AppState;
use crate::component::Component;
use crate::components::{
    card_list::CardList, choice_prompt::ChoicePrompt, help_overlay::HelpOverlay,
    narrative_panel::NarrativePanel, spectrum_panel::SpectrumPanel, tuner_panel::TunerPanel,
};
use crate::core::CoreEvent;
use crate::focus::FocusRing;
use crate::widgets::status_bar::{draw_keys_bar, draw_log_bar};
use crate::widgets::toast::ToastManager;

/// Volume step for `-` / `+`, in percent.
const VOLUME_STEP: u8 = 5;

/// Focus order; F1..F4 jump straight to a pane.
const PANES: [ComponentId; 4] = [
    ComponentId::Tuner,
    ComponentId::Spectrum,
    ComponentId::Cards,
    ComponentId::Narrative,
];

/// Inputs into the UI loop.
#[derive(Debug)]
enum AppMessage {
    Event(Event),
    State(Box<TunerSnapshot>),
    Log(String),
}

pub struct App {
    event_tx: mpsc::Sender<CoreEvent>,
    spectrum_interval: Duration,
    state: AppState,
    focus: FocusRing,
    tuner: TunerPanel,
    spectrum: SpectrumPanel,
    cards: CardList,
    narrative: NarrativePanel,
    prompt: ChoicePrompt,
    help: HelpOverlay,
    toast: ToastManager,
    /// A bare gesture was already sent for the first key press.
    gesture_sent: bool,
    should_quit: bool,
}

impl App {
    pub fn new(event_tx: mpsc::Sender<CoreEvent>, spectrum_interval: Duration) -> Self {
        Self {
            event_tx,
            spectrum_interval,
            state: AppState::new(),
            focus: FocusRing::new(PANES.to_vec()),
            tuner: TunerPanel::new(),
            spectrum: SpectrumPanel::new(),
            cards: CardList::new(),
            narrative: NarrativePanel::new(),
            prompt: ChoicePrompt::new(),
            help: HelpOverlay::new(),
            toast: ToastManager::new(),
            gesture_sent: false,
            should_quit: false,
        }
    }

    pub async fn run(mut self, mut broadcast_rx: broadcast::Receiver<Broadcast>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;
        debug!("run(): terminal ready, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);

        // ── Background task: keyboard events ──────────────────────────────────
        let key_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if key_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: broadcast receiver (TunerCore → AppMessage) ──────
        let bc_tx = tx.clone();
        tokio::spawn(async move {
            loop {
                match broadcast_rx.recv().await {
                    Ok(msg) => {
                        let app_msg = match msg {
                            Broadcast::State { data } => AppMessage::State(Box::new(data)),
                            Broadcast::Log { message } => AppMessage::Log(message),
                        };
                        if bc_tx.send(app_msg).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("broadcast receiver lagged by {} messages", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        // ── Periodic timers ───────────────────────────────────────────────────
        let mut ui_tick = tokio::time::interval(Duration::from_millis(100));
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut spectrum_tick = tokio::time::interval(self.spectrum_interval);
        spectrum_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            tokio::select! {
                Some(msg) = rx.recv() => {
                    let mut redraw = self.handle_message(msg).await;
                    // Collapse bursts of snapshots into one redraw.
                    while let Ok(next) = rx.try_recv() {
                        redraw |= self.handle_message(next).await;
                    }
                    needs_redraw = redraw;
                }

                _ = ui_tick.tick() => {
                    let tick_actions: Vec<Action> = {
                        let s = &self.state;
                        let mut all = Vec::new();
                        all.extend(self.tuner.tick(s));
                        all.extend(self.cards.tick(s));
                        all.extend(self.narrative.tick(s));
                        all
                    };
                    for action in tick_actions {
                        self.dispatch(action).await;
                    }
                    needs_redraw = self.toast.tick();
                }

                _ = spectrum_tick.tick() => {
                    needs_redraw = self.spectrum.advance(&self.state);
                }
            }

            if self.should_quit {
                break;
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        let _ = self.event_tx.send(CoreEvent::Shutdown).await;
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        Ok(())
    }

    /// Returns true when the screen needs a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(Event::Key(key)) => {
                if key.kind == KeyEventKind::Release {
                    return false;
                }
                let actions = self.key_actions(key);
                for a in actions {
                    self.dispatch(a).await;
                }
            }
            AppMessage::Event(Event::Resize(_, _)) => {}
            AppMessage::Event(_) => return false,
            AppMessage::State(snapshot) => self.on_snapshot(*snapshot),
            AppMessage::Log(message) => {
                if message.contains("[ERROR]") {
                    self.toast.error(strip_log_prefix(&message));
                } else {
                    self.toast.warning(strip_log_prefix(&message));
                }
                self.state.last_log = Some(message);
            }
        }
        true
    }

    fn on_snapshot(&mut self, snapshot: TunerSnapshot) {
        if let Some(prev) = self.state.snapshot.as_ref() {
            if !prev.prompt_open && snapshot.prompt_open {
                self.toast.info("choose a love to tune in");
            }
            if prev.love_choice.is_none() {
                if let Some(choice) = snapshot.love_choice {
                    self.toast.success(format!("tuned to {}", choice.label().to_lowercase()));
                }
            }
            if !prev.scanning && snapshot.scanning {
                self.toast.info("scanning…");
            }
        }
        self.state.snapshot = Some(snapshot);
    }

    /// Key → actions, with the first key press also counting as a gesture.
    fn key_actions(&mut self, key: KeyEvent) -> Vec<Action> {
        let mut actions = self.handle_key(key);
        let has_gesture = actions
            .iter()
            .any(|a| matches!(a, Action::Send(cmd) if cmd.is_gesture()));
        if has_gesture {
            self.gesture_sent = true;
        } else if !self.gesture_sent && !self.state.gesture_seen() {
            self.gesture_sent = true;
            actions.insert(0, Action::Send(Command::Gesture));
        }
        actions
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return vec![Action::Quit];
        }

        // Help overlay captures all keys when visible
        if self.help.visible {
            let actions = self.help.handle_key(key, &self.state);
            if actions.is_empty() {
                return vec![Action::ToggleHelp];
            }
            return actions;
        }

        // So does the choice prompt
        if self.state.prompt_open() {
            return self.prompt.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('K') => return vec![Action::ToggleKeys],
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::F(n @ 1..=4) => {
                let pane = PANES[(n - 1) as usize];
                return vec![Action::FocusPane(pane)];
            }
            KeyCode::Char('x') => return vec![Action::Send(Command::StopAll)],
            KeyCode::Char('s') => return vec![Action::Send(Command::ToggleScan)],
            KeyCode::Char('-') => {
                let percent = self.state.volume_percent().saturating_sub(VOLUME_STEP);
                return vec![Action::Send(Command::Volume { percent })];
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                let percent = self.state.volume_percent().saturating_add(VOLUME_STEP).min(100);
                return vec![Action::Send(Command::Volume { percent })];
            }
            _ => {}
        }

        let state = &self.state;
        match self.focus.current() {
            Some(ComponentId::Tuner) => self.tuner.handle_key(key, state),
            Some(ComponentId::Spectrum) => self.spectrum.handle_key(key, state),
            Some(ComponentId::Cards) => self.cards.handle_key(key, state),
            Some(ComponentId::Narrative) => self.narrative.handle_key(key, state),
            _ => vec![],
        }
    }

    async fn dispatch(&mut self, action: Action) {
        let secondary: Vec<Action> = {
            let s = &self.state;
            let mut out = Vec::new();
            out.extend(self.tuner.on_action(&action, s));
            out.extend(self.spectrum.on_action(&action, s));
            out.extend(self.cards.on_action(&action, s));
            out.extend(self.narrative.on_action(&action, s));
            out.extend(self.help.on_action(&action, s));
            out
        };

        self.apply_action(action).await;

        for a in secondary {
            self.apply_action(a).await;
        }
    }

    async fn apply_action(&mut self, action: Action) {
        match action {
            Action::Send(cmd) => self.send_cmd(cmd).await,
            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => self.focus.set(id),
            Action::ToggleKeys => self.state.show_keys = !self.state.show_keys,
            Action::Quit => self.should_quit = true,
            Action::ToggleHelp
            | Action::ToggleSpectrumFreeze
            | Action::SelectUp
            | Action::SelectDown => {}
        }
    }

    async fn send_cmd(&mut self, cmd: Command) {
        debug!("send_cmd: {:?}", cmd);
        if self.event_tx.send(CoreEvent::ClientCommand(cmd)).await.is_err() {
            self.toast.error("tuner core is gone");
        }
    }

    /// The component whose key hints the footer shows.
    fn footer_focus(&self) -> ComponentId {
        if self.help.visible {
            ComponentId::HelpOverlay
        } else if self.state.prompt_open() {
            ComponentId::ChoicePrompt
        } else {
            self.focus.current().unwrap_or(ComponentId::Tuner)
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        let footer = if self.state.show_keys { 2 } else { 1 };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(8), Constraint::Length(footer)])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(rows[0]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(self.tuner.min_height()),
                Constraint::Min(self.spectrum.min_height()),
            ])
            .split(columns[0]);
        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(self.cards.min_height()),
                Constraint::Length(self.narrative.min_height()),
            ])
            .split(columns[1]);

        let state = &self.state;
        let focus = &self.focus;
        self.tuner
            .draw(frame, left[0], focus.is_focused(ComponentId::Tuner), state);
        self.spectrum
            .draw(frame, left[1], focus.is_focused(ComponentId::Spectrum), state);
        self.cards
            .draw(frame, right[0], focus.is_focused(ComponentId::Cards), state);
        self.narrative
            .draw(frame, right[1], focus.is_focused(ComponentId::Narrative), state);

        let footer_rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(rows[1]);
        draw_log_bar(frame, footer_rows[0], state.last_log.as_deref(), state.is_playing());
        if state.show_keys {
            draw_keys_bar(frame, footer_rows[1], self.footer_focus());
        }

        self.prompt.draw(frame, area, true, state);
        self.help.draw(frame, area, true, state);
        self.toast.draw(frame, area);
    }
}

/// "12:00:01 [WARN] text" → "text".
fn strip_log_prefix(message: &str) -> &str {
    message
        .split_once("] ")
        .map_or(message, |(_, rest)| rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::sample_snapshot;

    fn app() -> (App, mpsc::Receiver<CoreEvent>) {
        let (tx, rx) = mpsc::channel(16);
        (App::new(tx, Duration::from_millis(100)), rx)
    }

    fn press(app: &mut App, code: KeyCode) -> Vec<Action> {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn global_keys_win_over_focus() {
        let (mut app, _rx) = app();
        app.focus.set(ComponentId::Cards);
        assert_eq!(
            press(&mut app, KeyCode::Char('x')),
            vec![Action::Send(Command::StopAll)]
        );
        assert_eq!(
            press(&mut app, KeyCode::Char('s')),
            vec![Action::Send(Command::ToggleScan)]
        );
    }

    #[test]
    fn volume_keys_step_from_snapshot() {
        let (mut app, _rx) = app();
        let mut snap = sample_snapshot();
        snap.volume = 0.7;
        app.state.snapshot = Some(snap);
        assert_eq!(
            press(&mut app, KeyCode::Char('+')),
            vec![Action::Send(Command::Volume { percent: 75 })]
        );
        assert_eq!(
            press(&mut app, KeyCode::Char('-')),
            vec![Action::Send(Command::Volume { percent: 65 })]
        );
    }

    #[test]
    fn open_prompt_swallows_other_keys() {
        let (mut app, _rx) = app();
        let mut snap = sample_snapshot();
        snap.prompt_open = true;
        app.state.snapshot = Some(snap);
        assert!(press(&mut app, KeyCode::Char('x')).is_empty());
        assert_eq!(
            press(&mut app, KeyCode::Esc),
            vec![Action::Send(Command::DismissChoicePrompt)]
        );
    }

    #[test]
    fn first_key_also_sends_a_gesture() {
        let (mut app, _rx) = app();
        let first = app.key_actions(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(
            first,
            vec![
                Action::Send(Command::Gesture),
                Action::Send(Command::StopAll)
            ]
        );
        let second = app.key_actions(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        assert_eq!(second, vec![Action::Send(Command::StopAll)]);
    }

    #[test]
    fn function_keys_jump_to_panes() {
        let (mut app, _rx) = app();
        assert_eq!(
            press(&mut app, KeyCode::F(3)),
            vec![Action::FocusPane(ComponentId::Cards)]
        );
    }

    #[test]
    fn focused_pane_gets_the_key() {
        let (mut app, _rx) = app();
        assert_eq!(
            press(&mut app, KeyCode::Right),
            vec![Action::Send(Command::NextStation)]
        );
        app.focus.set(ComponentId::Narrative);
        assert_eq!(
            press(&mut app, KeyCode::Right),
            vec![Action::Send(Command::NarrativeTuneForward)]
        );
    }

    #[tokio::test]
    async fn dispatched_commands_reach_the_core() {
        let (mut app, mut rx) = app();
        app.dispatch(Action::Send(Command::TuneKnob)).await;
        match rx.recv().await {
            Some(CoreEvent::ClientCommand(Command::TuneKnob)) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn log_prefix_is_stripped() {
        assert_eq!(
            strip_log_prefix("12:00:01 [WARN] playback not allowed"),
            "playback not allowed"
        );
        assert_eq!(strip_log_prefix("bare"), "bare");
    }
}
