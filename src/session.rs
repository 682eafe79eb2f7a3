//! Session state store.
//!
//! All state of one session lives in [`State`]. Transitions go through the
//! pure [`reduce`] function; [`Session::dispatch`] is the thin effect layer
//! that performs the single call a transition may ask for (a generation
//! request or a playback cue) and feeds its outcome back as a follow-up
//! [`Action`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::{info, warn};

use crate::ambient::{AmbientError, AmbientState, Cue, CueKind, NoiseTrack, PlaybackSurface, PomodoroSettings};
use crate::daily::{self, QuizVerdict, SLEEP_QUIZ};
use crate::error::WellnessError;
use crate::generation::{GenerationError, Generator};
use crate::profile::UserProfile;
use crate::prompt;

static SECTION_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^## ").expect("section pattern is valid"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellnessPlan {
    pub raw_text: String,
}

impl WellnessPlan {
    /// Plan text split before every line that starts with `## `.
    pub fn sections(&self) -> Vec<&str> {
        let text = self.raw_text.as_str();
        let mut starts: Vec<usize> = SECTION_START
            .find_iter(text)
            .map(|m| m.start())
            .filter(|&pos| pos > 0)
            .collect();
        starts.push(text.len());

        let mut sections = Vec::with_capacity(starts.len());
        let mut from = 0;
        for end in starts {
            let section = text[from..end].trim_end_matches('\n');
            if !section.trim().is_empty() {
                sections.push(section);
            }
            from = end;
        }
        sections
    }
}

pub type GratitudeItems = [String; 3];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct State {
    pub plan: Option<WellnessPlan>,
    pub transcript: Vec<ChatMessage>,
    pub local_info: Option<String>,
    pub gratitude: BTreeMap<NaiveDate, GratitudeItems>,
    /// Chosen once at session start.
    pub daily_tip: String,
    pub ambient: AmbientState,
}

impl State {
    pub fn new(session_start_unix: i64) -> Self {
        Self {
            daily_tip: daily::tip_for(session_start_unix).to_string(),
            ..Self::default()
        }
    }

    /// Fact of the day for the given clock reading.
    pub fn daily_fact(&self, now_unix: i64) -> &'static str {
        daily::fact_for(now_unix)
    }

    /// Follow-up for a noise player that stopped by itself; `None` when
    /// noise is already off.
    pub fn noise_ended(&self, reason: String) -> Option<Action> {
        self.ambient
            .noise_playing
            .then(|| Action::CueFailed(Cue::Noise(self.ambient.noise_track), AmbientError::Player(reason)))
    }

    /// Gratitude history, newest date first.
    pub fn gratitude_history(&self) -> impl Iterator<Item = (&NaiveDate, &GratitudeItems)> {
        self.gratitude.iter().rev()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Purpose {
    Plan,
    Answer,
    LocalInfo,
}

impl Purpose {
    fn completion(self, result: Result<String, GenerationError>) -> Action {
        match self {
            Purpose::Plan => Action::PlanGenerated(result),
            Purpose::Answer => Action::AnswerReceived(result),
            Purpose::LocalInfo => Action::LocalInfoReceived(result),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    GeneratePlan(UserProfile),
    PlanGenerated(Result<String, GenerationError>),
    AskQuestion(String),
    AnswerReceived(Result<String, GenerationError>),
    FetchLocalInfo(String),
    LocalInfoReceived(Result<String, GenerationError>),
    SaveGratitude(NaiveDate, GratitudeItems),
    ToggleNoise { on: bool, track: NoiseTrack },
    ToggleChime(bool),
    TogglePomodoro(Option<PomodoroSettings>),
    CueStarted(Cue),
    CueFailed(Cue, AmbientError),
    CheckQuizAnswer(Option<usize>),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::GeneratePlan(_) => "generate_plan",
            Action::PlanGenerated(_) => "plan_generated",
            Action::AskQuestion(_) => "ask_question",
            Action::AnswerReceived(_) => "answer_received",
            Action::FetchLocalInfo(_) => "fetch_local_info",
            Action::LocalInfoReceived(_) => "local_info_received",
            Action::SaveGratitude(..) => "save_gratitude",
            Action::ToggleNoise { .. } => "toggle_noise",
            Action::ToggleChime(_) => "toggle_chime",
            Action::TogglePomodoro(_) => "toggle_pomodoro",
            Action::CueStarted(_) => "cue_started",
            Action::CueFailed(..) => "cue_failed",
            Action::CheckQuizAnswer(_) => "check_quiz_answer",
        }
    }

    /// Banner shown while this action waits on the generation service.
    pub fn busy_label(&self) -> Option<&'static str> {
        match self {
            Action::GeneratePlan(_) => Some("Crafting your unique plan..."),
            Action::AskQuestion(_) => Some("Thinking..."),
            Action::FetchLocalInfo(_) => Some("Finding local insights..."),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Feedback {
    PlanReady,
    Answered,
    LocalInfoReady,
    GratitudeSaved(NaiveDate),
    Quiz(QuizVerdict),
    Started(CueKind),
    Stopped(CueKind),
    Ignored,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Done(Feedback),
    Fail(WellnessError),
    Generate { purpose: Purpose, prompt: String },
    Start(Cue),
    Stop(CueKind),
}

pub fn reduce(mut state: State, action: Action) -> (State, Command) {
    let command = match action {
        Action::GeneratePlan(profile) => {
            if profile.goal.trim().is_empty() {
                Command::Fail(WellnessError::validation("Please specify your wellness goal."))
            } else {
                Command::Generate {
                    purpose: Purpose::Plan,
                    prompt: prompt::build_plan_prompt(&profile),
                }
            }
        }
        Action::PlanGenerated(Ok(text)) => {
            state.plan = Some(WellnessPlan { raw_text: text });
            state.transcript.clear();
            state.local_info = None;
            Command::Done(Feedback::PlanReady)
        }
        Action::PlanGenerated(Err(err)) => Command::Fail(err.into()),

        Action::AskQuestion(question) => match &state.plan {
            None => Command::Fail(WellnessError::validation(
                "Chat will be available after generating a wellness plan.",
            )),
            Some(_) if question.trim().is_empty() => {
                Command::Fail(WellnessError::validation("Please type a question about your plan."))
            }
            Some(plan) => {
                let prompt = prompt::build_chat_prompt(&plan.raw_text, &question);
                state.transcript.push(ChatMessage::user(question));
                Command::Generate { purpose: Purpose::Answer, prompt }
            }
        },
        Action::AnswerReceived(_) if state.plan.is_none() => Command::Done(Feedback::Ignored),
        Action::AnswerReceived(Ok(answer)) => {
            state.transcript.push(ChatMessage::assistant(answer));
            Command::Done(Feedback::Answered)
        }
        Action::AnswerReceived(Err(err)) => {
            let err = WellnessError::from(err);
            state.transcript.push(ChatMessage::assistant(err.to_string()));
            Command::Fail(err)
        }

        Action::FetchLocalInfo(location) => Command::Generate {
            purpose: Purpose::LocalInfo,
            prompt: prompt::build_local_info_prompt(&location),
        },
        Action::LocalInfoReceived(Ok(info)) => {
            state.local_info = Some(info);
            Command::Done(Feedback::LocalInfoReady)
        }
        Action::LocalInfoReceived(Err(err)) => Command::Fail(err.into()),

        Action::SaveGratitude(date, items) => {
            state.gratitude.insert(date, items);
            Command::Done(Feedback::GratitudeSaved(date))
        }

        Action::ToggleNoise { on: true, track } => Command::Start(Cue::Noise(track)),
        Action::ToggleNoise { on: false, track } => {
            state.ambient.noise_playing = false;
            state.ambient.noise_track = track;
            Command::Stop(CueKind::Noise)
        }
        Action::ToggleChime(true) => Command::Start(Cue::Chime {
            duration_secs: state.ambient.chime_duration_secs,
        }),
        Action::ToggleChime(false) => {
            state.ambient.chime_playing = false;
            Command::Stop(CueKind::Chime)
        }
        Action::TogglePomodoro(Some(settings)) => match settings.validate() {
            Ok(()) => Command::Start(Cue::Pomodoro(settings)),
            Err(msg) => Command::Fail(WellnessError::validation(msg)),
        },
        Action::TogglePomodoro(None) => {
            state.ambient.pomodoro = None;
            Command::Stop(CueKind::Pomodoro)
        }
        Action::CueStarted(cue) => {
            let kind = cue.kind();
            match cue {
                Cue::Noise(track) => {
                    state.ambient.noise_playing = true;
                    state.ambient.noise_track = track;
                }
                Cue::Chime { duration_secs } => {
                    state.ambient.chime_playing = true;
                    state.ambient.chime_duration_secs = duration_secs;
                }
                Cue::Pomodoro(settings) => state.ambient.pomodoro = Some(settings),
            }
            Command::Done(Feedback::Started(kind))
        }
        Action::CueFailed(cue, err) => {
            match cue {
                Cue::Noise(track) => {
                    state.ambient.noise_playing = false;
                    state.ambient.noise_track = track;
                }
                Cue::Chime { .. } => state.ambient.chime_playing = false,
                Cue::Pomodoro(_) => state.ambient.pomodoro = None,
            }
            Command::Fail(err.into())
        }

        Action::CheckQuizAnswer(selected) => Command::Done(Feedback::Quiz(SLEEP_QUIZ.check(selected))),
    };
    (state, command)
}

pub struct Session<G, P> {
    state: State,
    generator: G,
    surface: P,
}

impl<G: Generator, P: PlaybackSurface> Session<G, P> {
    pub fn new(generator: G, surface: P, session_start_unix: i64) -> Self {
        Self {
            state: State::new(session_start_unix),
            generator,
            surface,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn surface(&self) -> &P {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut P {
        &mut self.surface
    }

    /// Run one user action to completion.
    pub fn dispatch(&mut self, action: Action) -> Result<Feedback, WellnessError> {
        info!(action = action.name(), "dispatch");
        let mut action = action;
        loop {
            let (state, command) = reduce(std::mem::take(&mut self.state), action);
            self.state = state;

            action = match command {
                Command::Done(feedback) => return Ok(feedback),
                Command::Fail(err) => {
                    warn!(error = %err, "action failed");
                    return Err(err);
                }
                Command::Generate { purpose, prompt } => {
                    let result = self.generator.generate(&prompt);
                    info!(?purpose, ok = result.is_ok(), "generation finished");
                    purpose.completion(result)
                }
                Command::Start(cue) => match self.surface.start(cue.clone()) {
                    Ok(()) => Action::CueStarted(cue),
                    Err(err) => Action::CueFailed(cue, err),
                },
                Command::Stop(kind) => {
                    self.surface.stop(kind);
                    return Ok(Feedback::Stopped(kind));
                }
            };
        }
    }
}
