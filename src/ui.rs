// ============================================================================
// Terminal view: form state, key handling and drawing
// ============================================================================
//
// The view owns only what the user is typing and where the focus is. Every
// state change goes out as an `Action` through `Flow::Dispatch`; outcomes
// come back through `App::absorb`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Gauge, Paragraph, Wrap},
};
use tracing::{info, warn};
use tui_textarea::{CursorMove, Input, Key, TextArea};

use crate::ambient::{self, NoiseTrack, PomodoroPhase, PomodoroSettings};
use crate::daily::{HYDRATION_INTERVAL, QuizVerdict, SLEEP_QUIZ};
use crate::error::WellnessError;
use crate::export;
use crate::profile::{self, ActivityLevel, Diet, Gender, UserProfile};
use crate::prompt::sanitize;
use crate::session::{Action, Feedback, GratitudeItems, Role, State};
use crate::surface::TerminalSurface;

const PRIMARY: Color = Color::Rgb(245, 129, 37);
const SELECTED: Color = Color::Blue;

const PLAN_PLACEHOLDER: &str =
    "Tell me your goal above, then press Ctrl+G (Generate My Wellness Plan) to get started.";
const CHAT_LOCKED: &str = "Chat will be available after generating a wellness plan.";
const DISCLAIMER: &str = "This is not medical advice. Always consult a healthcare professional.";

const GRATITUDE_PROMPTS: [&str; 3] = [
    "Something I'm grateful for",
    "Another thing I'm grateful for",
    "One small win today",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tab {
    Plan,
    Tools,
    Chat,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Plan, Tab::Tools, Tab::Chat];

    fn label(&self) -> &'static str {
        match self {
            Tab::Plan => "F2 Your Plan",
            Tab::Tools => "F3 Wellness Tools",
            Tab::Chat => "F4 Chat",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Goal,
    Reason,
    Country,
    State,
    Region,
    Age,
    Gender,
    Diet,
    Activity,
    Health,
    Noise,
    WorkMins,
    BreakMins,
    Rounds,
    Gratitude(usize),
    Quiz,
    Question,
}

impl Field {
    fn is_single_line(&self) -> bool {
        !matches!(self, Field::Goal | Field::Reason | Field::Question)
    }
}

/// Fields reachable with Tab on the given tab, in visiting order.
fn focus_order(tab: Tab) -> Vec<Field> {
    let mut order = vec![
        Field::Goal,
        Field::Reason,
        Field::Country,
        Field::State,
        Field::Region,
        Field::Age,
        Field::Gender,
        Field::Diet,
        Field::Activity,
        Field::Health,
        Field::Noise,
    ];
    match tab {
        Tab::Plan => {}
        Tab::Tools => {
            order.extend([Field::WorkMins, Field::BreakMins, Field::Rounds]);
            order.extend((0..3).map(Field::Gratitude));
            order.push(Field::Quiz);
        }
        Tab::Chat => order.push(Field::Question),
    }
    order
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupKind {
    Error,
    Success,
    Reminder,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Popup {
    pub kind: PopupKind,
    pub title: String,
    pub message: String,
}

impl Popup {
    fn error(err: &WellnessError) -> Self {
        Self {
            kind: PopupKind::Error,
            title: err.title().to_string(),
            message: err.to_string(),
        }
    }

    fn success(title: &str, message: impl Into<String>) -> Self {
        Self {
            kind: PopupKind::Success,
            title: title.to_string(),
            message: message.into(),
        }
    }
}

/// What the event loop should do after a key.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
    Dispatch(Action),
    Export,
    OpenExport,
}

struct HelpTopic {
    title: &'static str,
    detail: &'static str,
}

const HELP_TOPICS: &[HelpTopic] = &[
    HelpTopic {
        title: "Moving around",
        detail: "Tab / Shift+Tab walk the fields. F2, F3 and F4 (or a mouse click) switch between Plan, Tools and Chat.",
    },
    HelpTopic {
        title: "Profile",
        detail: "Type into Country, State and City. Use Left/Right on Age, Gender, Diet, Activity and Noise to change them.",
    },
    HelpTopic {
        title: "Your plan",
        detail: "Write your goal, then Ctrl+G generates a plan. A new plan clears the chat and the local info. Ctrl+E downloads it as a PDF and Ctrl+O opens the last download.",
    },
    HelpTopic {
        title: "Chat",
        detail: "Once a plan exists, type a question on the Chat tab and press Enter.",
    },
    HelpTopic {
        title: "Focus helpers",
        detail: "Ctrl+N toggles background noise, Ctrl+B toggles the mindful chime and Ctrl+P starts or stops a Pomodoro with the minutes set on the Tools tab.",
    },
    HelpTopic {
        title: "Daily wellness",
        detail: "Ctrl+S saves today's three gratitude lines, Ctrl+L fetches seasonal produce and a myth buster for your city, Enter on the quiz checks your answer.",
    },
    HelpTopic {
        title: "Quit",
        detail: "Ctrl+C or Ctrl+Q leaves the app.",
    },
];

fn text_field(initial: &str) -> TextArea<'static> {
    let mut area = TextArea::new(vec![initial.to_string()]);
    area.move_cursor(CursorMove::End);
    area
}

fn text_of(area: &TextArea) -> String {
    area.lines().join("\n")
}

pub struct App {
    pub tab: Tab,
    pub focus: Field,
    country: TextArea<'static>,
    state: TextArea<'static>,
    region: TextArea<'static>,
    health: TextArea<'static>,
    goal: TextArea<'static>,
    reason: TextArea<'static>,
    question: TextArea<'static>,
    gratitude: [TextArea<'static>; 3],
    pub gratitude_date: NaiveDate,
    age: u8,
    gender: Gender,
    diet: Diet,
    activity: ActivityLevel,
    noise_track: NoiseTrack,
    pomodoro: PomodoroSettings,
    quiz_selected: Option<usize>,
    quiz_verdict: Option<QuizVerdict>,
    /// Label of the generation request currently in flight.
    pub busy: Option<&'static str>,
    pub popup: Option<Popup>,
    pub show_help: bool,
    scroll: u16,
    started: Instant,
    last_hydration: Instant,
    last_export: Option<PathBuf>,
    tab_btns: Vec<(Tab, Rect)>,
}

impl App {
    pub fn new(today: NaiveDate, now: Instant) -> Self {
        let defaults = UserProfile::default();
        Self {
            tab: Tab::Plan,
            focus: Field::Goal,
            country: text_field(&defaults.country),
            state: text_field(&defaults.state),
            region: text_field(&defaults.region),
            health: TextArea::default(),
            goal: TextArea::default(),
            reason: TextArea::default(),
            question: TextArea::default(),
            gratitude: std::array::from_fn(|_| TextArea::default()),
            gratitude_date: today,
            age: defaults.age,
            gender: defaults.gender,
            diet: defaults.diet,
            activity: defaults.activity,
            noise_track: NoiseTrack::WhiteNoise,
            pomodoro: PomodoroSettings::default(),
            quiz_selected: None,
            quiz_verdict: None,
            busy: None,
            popup: None,
            show_help: false,
            scroll: 0,
            started: now,
            last_hydration: now,
            last_export: None,
            tab_btns: Vec::new(),
        }
    }

    /// Profile as it stands in the form, free text sanitized.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            country: text_of(&self.country).trim().to_string(),
            state: text_of(&self.state).trim().to_string(),
            region: text_of(&self.region).trim().to_string(),
            age: self.age,
            gender: self.gender,
            diet: self.diet,
            activity: self.activity,
            health: sanitize(&text_of(&self.health)),
            goal: sanitize(&text_of(&self.goal)),
            reason: sanitize(&text_of(&self.reason)),
        }
        .with_age(self.age)
    }

    pub fn gratitude_items(&self) -> GratitudeItems {
        std::array::from_fn(|i| text_of(&self.gratitude[i]).trim().to_string())
    }

    fn textarea(&self, field: Field) -> Option<&TextArea<'static>> {
        match field {
            Field::Country => Some(&self.country),
            Field::State => Some(&self.state),
            Field::Region => Some(&self.region),
            Field::Health => Some(&self.health),
            Field::Goal => Some(&self.goal),
            Field::Reason => Some(&self.reason),
            Field::Question => Some(&self.question),
            Field::Gratitude(i) => self.gratitude.get(i),
            _ => None,
        }
    }

    fn textarea_mut(&mut self, field: Field) -> Option<&mut TextArea<'static>> {
        match field {
            Field::Country => Some(&mut self.country),
            Field::State => Some(&mut self.state),
            Field::Region => Some(&mut self.region),
            Field::Health => Some(&mut self.health),
            Field::Goal => Some(&mut self.goal),
            Field::Reason => Some(&mut self.reason),
            Field::Question => Some(&mut self.question),
            Field::Gratitude(i) => self.gratitude.get_mut(i),
            _ => None,
        }
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
        self.scroll = 0;
        if tab == Tab::Chat {
            self.focus = Field::Question;
        } else if !focus_order(tab).contains(&self.focus) {
            self.focus = Field::Goal;
        }
    }

    fn cycle_focus(&mut self, forward: bool) {
        let order = focus_order(self.tab);
        self.focus = profile::cycle(&order, self.focus, forward);
    }

    /// Fold a dispatch outcome into the view.
    pub fn absorb(&mut self, outcome: Result<Feedback, WellnessError>) {
        match outcome {
            Err(err) => self.popup = Some(Popup::error(&err)),
            Ok(Feedback::PlanReady) => {
                self.tab = Tab::Plan;
                self.scroll = 0;
                self.popup = Some(Popup::success("[OK] Plan Ready", "Your personalized wellness plan is ready."));
            }
            Ok(Feedback::Answered) => {
                self.question = TextArea::default();
                self.scroll = u16::MAX;
            }
            Ok(Feedback::GratitudeSaved(_)) => {
                self.popup = Some(Popup::success("[OK] Gratitude Saved", "Saved! Come back tomorrow for more."));
            }
            Ok(Feedback::Quiz(verdict)) => self.quiz_verdict = Some(verdict),
            Ok(_) => {}
        }
    }

    /// Raise the hydration reminder once per interval.
    pub fn check_hydration(&mut self, now: Instant) {
        if now.saturating_duration_since(self.last_hydration) < HYDRATION_INTERVAL {
            return;
        }
        self.last_hydration = now;
        if self.popup.is_none() {
            self.popup = Some(Popup {
                kind: PopupKind::Reminder,
                title: "Hydration".to_string(),
                message: "💧 Time for a few sips of water.".to_string(),
            });
        }
    }

    /// New calendar day: the gratitude form starts empty for it.
    pub fn roll_day(&mut self, today: NaiveDate) {
        if today != self.gratitude_date {
            self.gratitude_date = today;
            self.gratitude = std::array::from_fn(|_| TextArea::default());
        }
    }

    pub fn export_plan(&mut self, state: &State, dir: &Path) {
        let Some(plan) = &state.plan else {
            self.popup = Some(Popup::error(&WellnessError::validation(
                "Generate a wellness plan before downloading it.",
            )));
            return;
        };
        match export::write_document(dir, &plan.raw_text) {
            Ok(path) => {
                info!(path = %path.display(), "plan exported");
                self.popup = Some(Popup::success(
                    "[OK] Plan Downloaded",
                    format!(
                        "Saved {} ({}). Press Ctrl+O to open it.",
                        path.display(),
                        export::CONTENT_TYPE
                    ),
                ));
                self.last_export = Some(path);
            }
            Err(err) => self.popup = Some(Popup::error(&WellnessError::from(err))),
        }
    }

    pub fn open_export(&mut self) {
        let Some(path) = &self.last_export else {
            self.popup = Some(Popup::error(&WellnessError::validation(
                "Nothing downloaded yet. Press Ctrl+E first.",
            )));
            return;
        };
        if let Err(err) = open::that(path) {
            warn!(error = %err, "could not open exported plan");
            self.popup = Some(Popup::error(&WellnessError::ResourceUnavailable(format!(
                "could not open {}: {err}",
                path.display()
            ))));
        }
    }

    fn adjust_selector(&mut self, field: Field, forward: bool) {
        match field {
            Field::Age => {
                let next = if forward { self.age.saturating_add(1) } else { self.age.saturating_sub(1) };
                self.age = next.clamp(profile::MIN_AGE, profile::MAX_AGE);
            }
            Field::Gender => self.gender = profile::cycle(&Gender::ALL, self.gender, forward),
            Field::Diet => self.diet = profile::cycle(&Diet::ALL, self.diet, forward),
            Field::Activity => self.activity = profile::cycle(&ActivityLevel::ALL, self.activity, forward),
            Field::Noise => self.noise_track = profile::cycle(&NoiseTrack::ALL, self.noise_track, forward),
            Field::WorkMins => step(&mut self.pomodoro.work_mins, PomodoroSettings::WORK_RANGE, forward),
            Field::BreakMins => step(&mut self.pomodoro.break_mins, PomodoroSettings::BREAK_RANGE, forward),
            Field::Rounds => step(&mut self.pomodoro.rounds, PomodoroSettings::ROUNDS_RANGE, forward),
            Field::Quiz => {
                let len = SLEEP_QUIZ.options.len();
                self.quiz_selected = Some(match (self.quiz_selected, forward) {
                    (None, _) => 0,
                    (Some(i), true) => (i + 1) % len,
                    (Some(i), false) => (i + len - 1) % len,
                });
                self.quiz_verdict = None;
            }
            _ => {}
        }
    }
}

fn step(value: &mut u32, (lo, hi): (u32, u32), forward: bool) {
    let next = if forward { value.saturating_add(1) } else { value.saturating_sub(1) };
    *value = next.clamp(lo, hi);
}

fn is_selector(field: Field) -> bool {
    matches!(
        field,
        Field::Age
            | Field::Gender
            | Field::Diet
            | Field::Activity
            | Field::Noise
            | Field::WorkMins
            | Field::BreakMins
            | Field::Rounds
            | Field::Quiz
    )
}

fn to_input(key: KeyEvent) -> Input {
    Input {
        key: match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            _ => Key::Null,
        },
        ctrl: key.modifiers.contains(KeyModifiers::CONTROL),
        alt: key.modifiers.contains(KeyModifiers::ALT),
    }
}

pub fn handle_key(app: &mut App, key: KeyEvent, state: &State) -> Flow {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
        return Flow::Quit;
    }

    if app.popup.is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            app.popup = None;
        }
        return Flow::Continue;
    }
    if app.show_help {
        if matches!(key.code, KeyCode::Esc | KeyCode::F(1)) {
            app.show_help = false;
        }
        return Flow::Continue;
    }

    match key.code {
        KeyCode::F(1) => {
            app.show_help = true;
            return Flow::Continue;
        }
        KeyCode::F(2) => {
            app.select_tab(Tab::Plan);
            return Flow::Continue;
        }
        KeyCode::F(3) => {
            app.select_tab(Tab::Tools);
            return Flow::Continue;
        }
        KeyCode::F(4) => {
            app.select_tab(Tab::Chat);
            return Flow::Continue;
        }
        KeyCode::Tab => {
            app.cycle_focus(true);
            return Flow::Continue;
        }
        KeyCode::BackTab => {
            app.cycle_focus(false);
            return Flow::Continue;
        }
        KeyCode::PageUp => {
            app.scroll = app.scroll.saturating_sub(10);
            return Flow::Continue;
        }
        KeyCode::PageDown => {
            app.scroll = app.scroll.saturating_add(10);
            return Flow::Continue;
        }
        _ => {}
    }

    if ctrl {
        if let KeyCode::Char(c) = key.code {
            let action = match c.to_ascii_lowercase() {
                'g' => Some(Action::GeneratePlan(app.profile())),
                'l' => Some(Action::FetchLocalInfo(app.profile().local_info_location())),
                's' => Some(Action::SaveGratitude(app.gratitude_date, app.gratitude_items())),
                'n' => Some(Action::ToggleNoise {
                    on: !state.ambient.noise_playing,
                    track: app.noise_track,
                }),
                'b' => Some(Action::ToggleChime(!state.ambient.chime_playing)),
                'p' => Some(Action::TogglePomodoro(match state.ambient.pomodoro {
                    Some(_) => None,
                    None => Some(app.pomodoro),
                })),
                'e' => return Flow::Export,
                'o' => return Flow::OpenExport,
                _ => None,
            };
            if let Some(action) = action {
                return Flow::Dispatch(action);
            }
        }
    }

    let focus = app.focus;
    if is_selector(focus) {
        match key.code {
            KeyCode::Left | KeyCode::Up => app.adjust_selector(focus, false),
            KeyCode::Right | KeyCode::Down => app.adjust_selector(focus, true),
            KeyCode::Enter if focus == Field::Quiz => {
                return Flow::Dispatch(Action::CheckQuizAnswer(app.quiz_selected));
            }
            _ => {}
        }
        return Flow::Continue;
    }

    if key.code == KeyCode::Enter && focus == Field::Question && !key.modifiers.contains(KeyModifiers::ALT) {
        return Flow::Dispatch(Action::AskQuestion(text_of(&app.question).trim().to_string()));
    }
    if key.code == KeyCode::Enter && focus.is_single_line() {
        app.cycle_focus(true);
        return Flow::Continue;
    }

    if let Some(area) = app.textarea_mut(focus) {
        area.input(to_input(key));
    }
    Flow::Continue
}

fn inside_rect(mouse: MouseEvent, rect: Rect) -> bool {
    mouse.row >= rect.y
        && mouse.row < rect.y + rect.height
        && mouse.column >= rect.x
        && mouse.column < rect.x + rect.width
}

pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if app.popup.is_none() && !app.show_help => {
            let clicked = app
                .tab_btns
                .iter()
                .find(|(_, rect)| inside_rect(mouse, *rect))
                .map(|(tab, _)| *tab);
            if let Some(tab) = clicked {
                app.select_tab(tab);
            }
        }
        MouseEventKind::ScrollUp => app.scroll = app.scroll.saturating_sub(3),
        MouseEventKind::ScrollDown => app.scroll = app.scroll.saturating_add(3),
        _ => {}
    }
}

/// Get centered popup area for overlays
fn get_popup_area(frame_width: u16, frame_height: u16, width_percent: u16, height_percent: u16) -> Rect {
    let width = frame_width.saturating_mul(width_percent) / 100;
    let height = frame_height.saturating_mul(height_percent) / 100;
    let x = (frame_width.saturating_sub(width)) / 2;
    let y = (frame_height.saturating_sub(height)) / 2;
    Rect { x, y, width, height }
}

fn focus_style(focused: bool) -> Style {
    if focused {
        Style::default().bg(SELECTED).fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    }
}

/// Textarea contents with a `|` at the cursor when focused, scrolled so the
/// cursor row stays in view.
fn textarea_lines_with_cursor(area: &TextArea, focused: bool, height: u16) -> Vec<Line<'static>> {
    let text_lines = area.lines();
    if !focused {
        return text_lines.iter().map(|l| Line::from(l.clone())).collect();
    }
    let (cursor_row, cursor_col) = area.cursor();
    let mut lines = Vec::with_capacity(text_lines.len().max(1));
    if text_lines.is_empty() {
        lines.push(Line::from("|"));
        return lines;
    }
    for (idx, line) in text_lines.iter().enumerate() {
        if idx == cursor_row {
            let char_col = cursor_col.min(line.chars().count());
            let mut marked: String = line.chars().take(char_col).collect();
            marked.push('|');
            marked.extend(line.chars().skip(char_col));
            lines.push(Line::from(Span::styled(
                marked,
                Style::default().fg(Color::Yellow).bg(Color::Rgb(30, 30, 40)),
            )));
        } else {
            lines.push(Line::from(line.clone()));
        }
    }
    let view_height = height.max(1) as usize;
    if lines.len() > view_height {
        let start = cursor_row.saturating_sub(view_height.saturating_sub(1));
        let end = (start + view_height).min(lines.len());
        lines[start..end].to_vec()
    } else {
        lines
    }
}

fn single_line_value(app: &App, field: Field) -> String {
    let Some(area) = app.textarea(field) else {
        return String::new();
    };
    let focused = app.focus == field;
    textarea_lines_with_cursor(area, focused, 1)
        .into_iter()
        .next()
        .map(|line| line.spans.into_iter().map(|s| s.content.into_owned()).collect())
        .unwrap_or_default()
}

fn labeled(label: &str, value: String, focused: bool) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<13}"), focus_style(focused)),
        Span::raw(" "),
        Span::raw(value),
    ])
}

fn selector(label: &str, value: impl std::fmt::Display, focused: bool) -> Line<'static> {
    let shown = if focused { format!("< {value} >") } else { value.to_string() };
    labeled(label, shown, focused)
}

pub fn draw(frame: &mut Frame, app: &mut App, state: &State, surface: &TerminalSurface, now_unix: i64) {
    let size = frame.size();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(10), Constraint::Length(1)])
        .split(size);

    draw_header(frame, state, rows[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);
    draw_sidebar(frame, app, state, surface, body[0]);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Length(3), Constraint::Min(5)])
        .split(body[1]);
    draw_goal_form(frame, app, main[0]);
    draw_tab_selector(frame, app, main[1]);
    match app.tab {
        Tab::Plan => draw_plan_tab(frame, app, state, main[2]),
        Tab::Tools => draw_tools_tab(frame, app, state, surface, now_unix, main[2]),
        Tab::Chat => draw_chat_tab(frame, app, state, main[2]),
    }

    let hints = Paragraph::new(
        "F1 Help | Tab Next field | Ctrl+G Generate plan | Ctrl+E Download PDF | Ctrl+C Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(hints, rows[2]);

    if let Some(label) = app.busy {
        draw_busy_overlay(frame, label);
    }
    if app.show_help {
        draw_help_overlay(frame);
    }
    if let Some(popup) = &app.popup {
        draw_popup(frame, popup);
    }
}

fn draw_header(frame: &mut Frame, state: &State, area: Rect) {
    let lines = vec![
        Line::from(Span::styled(
            "GlobalWell AI",
            Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Your personal AI wellness buddy, aligned with UN SDG 3: Good Health and Well-being.",
            Style::default().fg(Color::Gray),
        )),
        Line::from(vec![
            Span::styled("💡 Daily Tip: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(state.daily_tip.clone()),
        ]),
    ];
    let header = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, area);
}

fn draw_sidebar(frame: &mut Frame, app: &App, state: &State, surface: &TerminalSurface, area: Rect) {
    let f = app.focus;
    let ambient = &state.ambient;
    let noise_status = if ambient.noise_playing && surface.noise_running() {
        Span::styled(" [playing]", Style::default().fg(Color::Green))
    } else {
        Span::styled(" [off]", Style::default().fg(Color::DarkGray))
    };
    let mut noise_line = selector("Noise", app.noise_track.label(), f == Field::Noise);
    noise_line.spans.push(noise_status);

    let chime = if ambient.chime_playing {
        format!("on, every {}s (Ctrl+B)", ambient.chime_duration_secs)
    } else {
        "off (Ctrl+B)".to_string()
    };
    let pomodoro = match &ambient.pomodoro {
        Some(s) => format!("{}/{} x{} (Ctrl+P)", s.work_mins, s.break_mins, s.rounds),
        None => "off (Ctrl+P)".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled("Your Profile", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD))),
        labeled("Country", single_line_value(app, Field::Country), f == Field::Country),
        labeled("State", single_line_value(app, Field::State), f == Field::State),
        labeled("City/Region", single_line_value(app, Field::Region), f == Field::Region),
        selector("Age", app.age, f == Field::Age),
        selector("Gender", app.gender, f == Field::Gender),
        selector("Diet", app.diet, f == Field::Diet),
        selector("Activity", app.activity, f == Field::Activity),
        labeled("Health", single_line_value(app, Field::Health), f == Field::Health),
        Line::from(""),
        Line::from(Span::styled("Focus & Calm", Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD))),
        noise_line,
        labeled("Chime", chime, false),
        labeled("Pomodoro", pomodoro, false),
    ];
    let sidebar = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Profile"))
        .wrap(Wrap { trim: false });
    frame.render_widget(sidebar, area);
}

fn draw_goal_form(frame: &mut Frame, app: &App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let inner_height = area.height.saturating_sub(2);

    for (field, title, rect) in [
        (Field::Goal, "What is your main wellness goal? (Ctrl+G)", cols[0]),
        (Field::Reason, "Any context or reason? (Optional)", cols[1]),
    ] {
        let focused = app.focus == field;
        let lines = app
            .textarea(field)
            .map(|t| textarea_lines_with_cursor(t, focused, inner_height))
            .unwrap_or_default();
        let border = if focused { Style::default().fg(PRIMARY) } else { Style::default() };
        let widget = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(title).border_style(border))
            .wrap(Wrap { trim: false });
        frame.render_widget(widget, rect);
    }
}

fn draw_tab_selector(frame: &mut Frame, app: &mut App, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
        .split(area);
    app.tab_btns.clear();
    for (tab, rect) in Tab::ALL.into_iter().zip(cols.iter().copied()) {
        let style = if app.tab == tab {
            Style::default().bg(SELECTED).fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Gray)
        };
        let btn = Paragraph::new(tab.label())
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center)
            .style(style);
        frame.render_widget(btn, rect);
        app.tab_btns.push((tab, rect));
    }
}

fn plan_line(raw: &str) -> Line<'static> {
    let text = raw.replace("**", "");
    if let Some(heading) = text.strip_prefix("## ") {
        Line::from(Span::styled(
            heading.to_string(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(sub) = text.strip_prefix("### ") {
        Line::from(Span::styled(sub.to_string(), Style::default().add_modifier(Modifier::BOLD)))
    } else if let Some(item) = text.trim_start().strip_prefix("* ") {
        Line::from(format!("  • {item}"))
    } else {
        Line::from(text)
    }
}

fn draw_plan_tab(frame: &mut Frame, app: &App, state: &State, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Your Wellness Plan (PgUp/PgDn to scroll, Ctrl+E to download)");
    let Some(plan) = &state.plan else {
        let placeholder = Paragraph::new(PLAN_PLACEHOLDER)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(placeholder, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Disclaimer: ", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)),
            Span::raw(DISCLAIMER),
        ]),
        Line::from(""),
    ];
    for (idx, section) in plan.sections().into_iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(Span::styled("─".repeat(40), Style::default().fg(Color::DarkGray))));
        }
        lines.extend(section.lines().map(plan_line));
    }
    let widget = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));
    frame.render_widget(widget, area);
}

fn mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn draw_tools_tab(
    frame: &mut Frame,
    app: &App,
    state: &State,
    surface: &TerminalSurface,
    now_unix: i64,
    area: Rect,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(6), Constraint::Length(4)])
        .split(cols[0]);
    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(10)])
        .split(cols[1]);

    draw_pomodoro(frame, app, surface, left[0]);
    draw_gratitude(frame, app, state, left[1]);

    let fact = Paragraph::new(format!("🧠 {}", state.daily_fact(now_unix)))
        .block(Block::default().borders(Borders::ALL).title("Fact of the Day"))
        .wrap(Wrap { trim: true });
    frame.render_widget(fact, left[2]);

    let local = match &state.local_info {
        Some(info) => info.lines().map(plan_line).collect::<Vec<_>>(),
        None => vec![Line::from(Span::styled(
            format!(
                "Press Ctrl+L for seasonal produce and a myth buster for {}.",
                app.profile().local_info_location()
            ),
            Style::default().fg(Color::Gray),
        ))],
    };
    let local = Paragraph::new(local)
        .block(Block::default().borders(Borders::ALL).title("Local Wellness Info"))
        .wrap(Wrap { trim: false });
    frame.render_widget(local, right[0]);

    draw_quiz(frame, app, right[1]);
}

fn setting_spans(label: &str, value: u32, focused: bool) -> Vec<Span<'static>> {
    vec![
        Span::raw(format!("{label} ")),
        Span::styled(format!("[{value}]"), focus_style(focused)),
        Span::raw("  "),
    ]
}

fn draw_pomodoro(frame: &mut Frame, app: &App, surface: &TerminalSurface, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("Pomodoro & Breathing (Ctrl+P)");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);

    let now = Instant::now();
    let f = app.focus;
    let mut settings = setting_spans("Work min", app.pomodoro.work_mins, f == Field::WorkMins);
    settings.extend(setting_spans("Break min", app.pomodoro.break_mins, f == Field::BreakMins));
    settings.extend(setting_spans("Rounds", app.pomodoro.rounds, f == Field::Rounds));

    let (status, period, elapsed) = match surface.pomodoro_status(now) {
        None => (
            "Press Ctrl+P to start a focus session.".to_string(),
            Duration::from_secs(5),
            now.saturating_duration_since(app.started),
        ),
        Some((phase, elapsed)) => {
            let text = match phase {
                PomodoroPhase::Work { remaining_secs, round } => {
                    format!("🧑‍💻 Work {} (round {round}/{})", mmss(remaining_secs), app.pomodoro.rounds)
                }
                PomodoroPhase::Break { remaining_secs, round } => {
                    format!("☕ Break {} (round {round})", mmss(remaining_secs))
                }
                PomodoroPhase::Complete => "✅ Pomodoro complete, great job!".to_string(),
            };
            (text, phase.breath_period(), elapsed)
        }
    };
    let lines = vec![Line::from(settings), Line::from(""), Line::from(status)];
    frame.render_widget(Paragraph::new(lines), rows[0]);

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(PRIMARY).bg(Color::Black))
        .ratio(ambient::breath_ratio(period, elapsed).clamp(0.0, 1.0))
        .label("breathe");
    frame.render_widget(gauge, rows[1]);
}

fn draw_gratitude(frame: &mut Frame, app: &App, state: &State, area: Rect) {
    let mut lines = Vec::new();
    for (idx, prompt) in GRATITUDE_PROMPTS.iter().enumerate() {
        let field = Field::Gratitude(idx);
        lines.push(Line::from(Span::styled(
            format!("{}) {prompt}", idx + 1),
            focus_style(app.focus == field),
        )));
        lines.push(Line::from(format!("   {}", single_line_value(app, field))));
    }
    lines.push(Line::from(Span::styled(
        format!("Ctrl+S: Save gratitude for {}", app.gratitude_date),
        Style::default().fg(Color::DarkGray),
    )));

    let mut history = state.gratitude_history().peekable();
    if history.peek().is_some() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("History", Style::default().add_modifier(Modifier::BOLD))));
    }
    for (date, items) in history {
        lines.push(Line::from(Span::styled(date.to_string(), Style::default().fg(Color::Cyan))));
        for item in items.iter().filter(|i| !i.trim().is_empty()) {
            lines.push(Line::from(format!("  - {item}")));
        }
    }

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Gratitude Journal"))
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_quiz(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Field::Quiz;
    let mut lines = vec![Line::from(Span::styled(
        SLEEP_QUIZ.question,
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    for (idx, option) in SLEEP_QUIZ.options.iter().enumerate() {
        let chosen = app.quiz_selected == Some(idx);
        let marker = if chosen { "(•)" } else { "( )" };
        let style = if chosen && focused { focus_style(true) } else { Style::default() };
        lines.push(Line::from(Span::styled(format!("{marker} {option}"), style)));
    }
    match app.quiz_verdict {
        Some(QuizVerdict::Correct) => lines.push(Line::from(Span::styled(
            format!("Correct! {}", SLEEP_QUIZ.explanation),
            Style::default().fg(Color::Green),
        ))),
        Some(QuizVerdict::Incorrect) => lines.push(Line::from(Span::styled(
            "Not quite. Try again!",
            Style::default().fg(Color::Red),
        ))),
        Some(QuizVerdict::NoSelection) => lines.push(Line::from(Span::styled(
            "Pick an option first 😊",
            Style::default().fg(Color::Yellow),
        ))),
        None => {}
    }
    let border = if focused { Style::default().fg(PRIMARY) } else { Style::default() };
    let widget = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Quick Quiz (←/→ choose, Enter check)")
                .border_style(border),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(widget, area);
}

fn draw_chat_tab(frame: &mut Frame, app: &App, state: &State, area: Rect) {
    if state.plan.is_none() {
        let locked = Paragraph::new(CHAT_LOCKED)
            .block(Block::default().borders(Borders::ALL).title("Chat"))
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        frame.render_widget(locked, area);
        return;
    }

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(5)])
        .split(area);

    let mut lines = Vec::new();
    for message in &state.transcript {
        let (who, color) = match message.role {
            Role::User => ("You", Color::Cyan),
            Role::Assistant => ("GlobalWell", Color::Green),
        };
        lines.push(Line::from(Span::styled(
            format!("{who}:"),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )));
        lines.extend(message.content.lines().map(plan_line));
        lines.push(Line::from(""));
    }
    let max_scroll = (lines.len() as u16).saturating_sub(rows[0].height.saturating_sub(2));
    let transcript = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Conversation"))
        .wrap(Wrap { trim: false })
        .scroll((app.scroll.min(max_scroll), 0));
    frame.render_widget(transcript, rows[0]);

    let focused = app.focus == Field::Question;
    let input = Paragraph::new(textarea_lines_with_cursor(&app.question, focused, rows[1].height.saturating_sub(2)))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Have a question about your plan? (Enter to ask)"),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(input, rows[1]);
}

fn draw_busy_overlay(frame: &mut Frame, label: &str) {
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 40, 15);
    frame.render_widget(Clear, area);
    let widget = Paragraph::new(label)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title("Please wait"),
        )
        .alignment(Alignment::Center)
        .style(Style::default().fg(PRIMARY).bg(Color::Black));
    frame.render_widget(widget, area);
}

fn draw_popup(frame: &mut Frame, popup: &Popup) {
    let size = frame.size();
    let (area, color) = match popup.kind {
        PopupKind::Error => (get_popup_area(size.width, size.height, 70, 38), Color::Red),
        PopupKind::Success => (get_popup_area(size.width, size.height, 55, 28), Color::Green),
        PopupKind::Reminder => (get_popup_area(size.width, size.height, 45, 20), Color::Cyan),
    };

    let block = Block::default()
        .title(popup.title.as_str())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(color).bg(Color::Black));

    let inner = block.inner(area);
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(2), Constraint::Length(1)])
        .split(inner);

    let para = Paragraph::new(popup.message.as_str())
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White));
    frame.render_widget(para, chunks[0]);

    let hint = Paragraph::new("Press Esc to dismiss")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::DarkGray).italic());
    frame.render_widget(hint, chunks[1]);
}

fn draw_help_overlay(frame: &mut Frame) {
    let size = frame.size();
    let area = get_popup_area(size.width, size.height, 75, 75);
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = Vec::new();
    for topic in HELP_TOPICS {
        lines.push(Line::from(Span::styled(
            topic.title,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(topic.detail));
        lines.push(Line::from(""));
    }

    let help = Paragraph::new(lines)
        .block(Block::default().title("Quick Help (Esc to close)").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
        .style(Style::default().fg(Color::White).bg(Color::Black));
    frame.render_widget(help, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{GenerationError, Generator};
    use crate::session::{Session, WellnessPlan};
    use ratatui::{Terminal, backend::TestBackend};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn app() -> App {
        App::new(today(), Instant::now())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut App, state: &State, text: &str) {
        for c in text.chars() {
            assert_eq!(handle_key(app, key(KeyCode::Char(c)), state), Flow::Continue);
        }
    }

    fn render(app: &mut App, state: &State) -> String {
        let dir = tempfile::tempdir().unwrap();
        let surface = TerminalSurface::new(dir.path().to_path_buf(), Vec::new());
        let mut terminal = Terminal::new(TestBackend::new(140, 48)).unwrap();
        terminal.draw(|f| draw(f, app, state, &surface, 0)).unwrap();
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn placeholder_shows_until_a_plan_exists() {
        let mut app = app();
        let state = State::new(0);
        let screen = render(&mut app, &state);
        assert!(screen.contains("Tell me your goal above"));
        assert!(!screen.contains("Disclaimer"));
    }

    #[test]
    fn plan_renders_sections_with_disclaimer() {
        let mut app = app();
        let mut state = State::new(0);
        state.plan = Some(WellnessPlan {
            raw_text: "## Nutrition\nEat greens\n## Alignment with SDG 3\nHealthy lives".into(),
        });
        let screen = render(&mut app, &state);
        assert!(screen.contains("Disclaimer"));
        assert!(screen.contains("Nutrition"));
        assert!(screen.contains("Alignment with SDG 3"));
        assert!(!screen.contains("Tell me your goal above"));
    }

    #[test]
    fn chat_tab_is_locked_without_plan() {
        let mut app = app();
        let state = State::new(0);
        handle_key(&mut app, key(KeyCode::F(4)), &state);
        assert_eq!(app.focus, Field::Question);
        assert!(render(&mut app, &state).contains(CHAT_LOCKED));
    }

    #[test]
    fn ctrl_g_sends_the_typed_goal() {
        let mut app = app();
        let state = State::new(0);
        type_text(&mut app, &state, "sleep **better**");
        match handle_key(&mut app, ctrl('g'), &state) {
            Flow::Dispatch(Action::GeneratePlan(profile)) => {
                assert_eq!(profile.goal, "sleep better");
                assert_eq!(profile.region, "Bharuch");
                assert_eq!(profile.age, 30);
            }
            other => panic!("unexpected flow {other:?}"),
        }
    }

    #[test]
    fn enter_on_question_asks() {
        let mut app = app();
        let state = State::new(0);
        app.select_tab(Tab::Chat);
        type_text(&mut app, &state, "Can I nap?");
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter), &state),
            Flow::Dispatch(Action::AskQuestion("Can I nap?".into()))
        );
    }

    #[test]
    fn selectors_cycle_with_arrows() {
        let mut app = app();
        let state = State::new(0);
        app.focus = Field::Diet;
        handle_key(&mut app, key(KeyCode::Left), &state);
        assert_eq!(app.profile().diet, Diet::Vegan);

        app.focus = Field::Age;
        for _ in 0..200 {
            handle_key(&mut app, key(KeyCode::Right), &state);
        }
        assert_eq!(app.profile().age, profile::MAX_AGE);
    }

    #[test]
    fn tab_walks_fields_of_current_tab() {
        let mut app = app();
        let state = State::new(0);
        assert_eq!(app.focus, Field::Goal);
        handle_key(&mut app, key(KeyCode::Tab), &state);
        assert_eq!(app.focus, Field::Reason);
        handle_key(&mut app, key(KeyCode::BackTab), &state);
        handle_key(&mut app, key(KeyCode::BackTab), &state);
        assert_eq!(app.focus, Field::Noise);
    }

    #[test]
    fn toggles_follow_session_state() {
        let mut app = app();
        let mut state = State::new(0);
        assert_eq!(
            handle_key(&mut app, ctrl('n'), &state),
            Flow::Dispatch(Action::ToggleNoise { on: true, track: NoiseTrack::WhiteNoise })
        );
        state.ambient.noise_playing = true;
        assert_eq!(
            handle_key(&mut app, ctrl('n'), &state),
            Flow::Dispatch(Action::ToggleNoise { on: false, track: NoiseTrack::WhiteNoise })
        );
        assert_eq!(
            handle_key(&mut app, ctrl('p'), &state),
            Flow::Dispatch(Action::TogglePomodoro(Some(PomodoroSettings::default())))
        );
        state.ambient.pomodoro = Some(PomodoroSettings::default());
        assert_eq!(handle_key(&mut app, ctrl('p'), &state), Flow::Dispatch(Action::TogglePomodoro(None)));
    }

    #[test]
    fn gratitude_save_carries_date_and_items() {
        let mut app = app();
        let state = State::new(0);
        app.select_tab(Tab::Tools);
        app.focus = Field::Gratitude(0);
        type_text(&mut app, &state, "tea");
        app.focus = Field::Gratitude(2);
        type_text(&mut app, &state, "ran 2k");
        assert_eq!(
            handle_key(&mut app, ctrl('s'), &state),
            Flow::Dispatch(Action::SaveGratitude(
                today(),
                ["tea".to_string(), String::new(), "ran 2k".to_string()]
            ))
        );
    }

    #[test]
    fn quiz_enter_checks_selection() {
        let mut app = app();
        let state = State::new(0);
        app.select_tab(Tab::Tools);
        app.focus = Field::Quiz;
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter), &state),
            Flow::Dispatch(Action::CheckQuizAnswer(None))
        );
        handle_key(&mut app, key(KeyCode::Right), &state);
        handle_key(&mut app, key(KeyCode::Right), &state);
        assert_eq!(
            handle_key(&mut app, key(KeyCode::Enter), &state),
            Flow::Dispatch(Action::CheckQuizAnswer(Some(1)))
        );
    }

    #[test]
    fn errors_pop_up_and_block_keys_until_dismissed() {
        let mut app = app();
        let state = State::new(0);
        app.absorb(Err(WellnessError::validation("Please specify your wellness goal.")));
        let popup = app.popup.clone().unwrap();
        assert_eq!(popup.kind, PopupKind::Error);
        assert_eq!(popup.title, "[!] Validation Error");

        assert_eq!(handle_key(&mut app, ctrl('g'), &state), Flow::Continue);
        handle_key(&mut app, key(KeyCode::Esc), &state);
        assert!(app.popup.is_none());
        assert!(matches!(handle_key(&mut app, ctrl('g'), &state), Flow::Dispatch(_)));
    }

    struct ServiceDown;

    impl Generator for ServiceDown {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Err(GenerationError::Transport("service unavailable".into()))
        }
    }

    #[test]
    fn failed_generation_shows_error_and_keeps_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let surface = TerminalSurface::new(dir.path().to_path_buf(), Vec::new());
        let mut session = Session::new(ServiceDown, surface, 0);
        let mut app = app();

        type_text(&mut app, session.state(), "sleep better");
        let Flow::Dispatch(action) = handle_key(&mut app, ctrl('g'), session.state()) else {
            panic!("Ctrl+G should dispatch a plan request");
        };
        let outcome = session.dispatch(action);
        app.absorb(outcome);

        assert!(session.state().plan.is_none());
        assert_eq!(app.popup.as_ref().map(|p| p.kind), Some(PopupKind::Error));
        let screen = render(&mut app, session.state());
        assert!(screen.contains("[!] Generation Error"));
        assert!(screen.contains("service unavailable"));

        handle_key(&mut app, key(KeyCode::Esc), session.state());
        let screen = render(&mut app, session.state());
        assert!(!screen.contains("[!] Generation Error"));
        assert!(screen.contains("Tell me your goal above"));
        assert!(!screen.contains("Disclaimer"));
    }

    #[test]
    fn quit_works_even_under_a_popup() {
        let mut app = app();
        let state = State::new(0);
        app.absorb(Err(WellnessError::validation("x")));
        assert_eq!(handle_key(&mut app, ctrl('c'), &state), Flow::Quit);
    }

    #[test]
    fn hydration_reminder_fires_once_per_interval() {
        let start = Instant::now();
        let mut app = App::new(today(), start);
        app.check_hydration(start + Duration::from_secs(60));
        assert!(app.popup.is_none());
        app.check_hydration(start + HYDRATION_INTERVAL);
        assert_eq!(app.popup.as_ref().map(|p| p.kind), Some(PopupKind::Reminder));
    }

    #[test]
    fn new_day_clears_gratitude_form() {
        let mut app = app();
        let state = State::new(0);
        app.focus = Field::Gratitude(1);
        type_text(&mut app, &state, "sun");
        app.roll_day(today());
        assert_eq!(app.gratitude_items()[1], "sun");
        let tomorrow = today().succ_opt().unwrap();
        app.roll_day(tomorrow);
        assert_eq!(app.gratitude_date, tomorrow);
        assert!(app.gratitude_items().iter().all(String::is_empty));
    }

    #[test]
    fn export_without_plan_is_a_validation_error() {
        let mut app = app();
        let dir = tempfile::tempdir().unwrap();
        app.export_plan(&State::new(0), dir.path());
        assert_eq!(app.popup.as_ref().map(|p| p.kind), Some(PopupKind::Error));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn export_writes_pdf_and_remembers_path() {
        let mut app = app();
        let dir = tempfile::tempdir().unwrap();
        let mut state = State::new(0);
        state.plan = Some(WellnessPlan { raw_text: "## Sleep\nBed by 10".into() });
        app.export_plan(&state, dir.path());
        assert_eq!(app.popup.as_ref().map(|p| p.kind), Some(PopupKind::Success));
        let path = app.last_export.clone().unwrap();
        assert!(path.ends_with(export::FILE_NAME));
        assert!(std::fs::read(path).unwrap().starts_with(b"%PDF"));
    }
}
