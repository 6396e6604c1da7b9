//! Per-phase action dispatch.
//!
//! `handle_action` is the single entry point: it checks the action against
//! the current phase, delegates turn work to [`crate::turn`], and returns the
//! outbound events. Illegal actions return an `error` event and leave the
//! session untouched.

use tracing::{debug, warn};

use crate::core::anchor::{AnchorSet, Milestone};
use crate::core::intent::{self, ChoiceIntent, QUIT_CHOICE_ID};
use crate::core::scoring;
use crate::core::types::{AnchorKind, Ending, Phase};
use crate::core::window::{self, WindowDecisionKind, WindowTick};
use crate::eras::{EraPicker, Region, select_era};
use crate::narrator::PromptKind;
use crate::session::{Event, Session, VisitedEra};
use crate::turn::{EngineDeps, Luck, resolve_arrival, resolve_ending, resolve_turn};

use super::Action;

const TITLE: &str = "E V E R W H E N";

fn invalid(message: impl Into<String>) -> Vec<Event> {
    vec![Event::Error {
        message: message.into(),
    }]
}

fn intro_paragraphs() -> Vec<String> {
    [
        "One moment you are walking home. The next, the ground is gone and \
         the centuries are pouring past you like water.",
        "When it stops, you are somewhere else. Some*when* else. In your \
         pockets: a few objects from a world that does not exist yet.",
        "A small device is strapped to your wrist. Its face is dark. \
         Sometimes, after you have lived in a place long enough, it wakes, \
         and for a little while the way out stands open.",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

fn device_status_event(session: &Session, deps: &EngineDeps) -> Event {
    let tuning = &deps.config.window;
    let display = session
        .era()
        .map(|era| era.display())
        .unwrap_or_else(|| "----".to_string());
    Event::DeviceStatus {
        device: window::device_state(&session.window, session.turns_in_era, tuning),
        indicator: window::indicator(&session.window, session.turns_in_era, tuning),
        display,
    }
}

fn journey_progress_event(anchors: &AnchorSet) -> Event {
    let belonging = anchors.get(AnchorKind::Belonging);
    let legacy = anchors.get(AnchorKind::Legacy);
    let freedom = anchors.get(AnchorKind::Freedom);
    Event::JourneyProgress {
        belonging_level: belonging.level(),
        belonging_trend: belonging.trend(),
        legacy_level: legacy.level(),
        legacy_trend: legacy.trend(),
        freedom_level: freedom.level(),
        freedom_trend: freedom.trend(),
        dominant: anchors.dominant(),
        journey_phase: anchors.journey_phase(),
        can_stay: anchors.can_stay(),
    }
}

fn milestone_events(milestones: &[Milestone]) -> Vec<Event> {
    milestones
        .iter()
        .map(|m| Event::ProgressMilestone {
            anchor: m.anchor,
            old_level: m.old_level,
            new_level: m.new_level,
            message: m.message.to_string(),
        })
        .collect()
}

fn choices_event(session: &Session) -> Event {
    let decision = window::evaluate(&session.window, session.anchors.can_stay());
    let choices = intent::filter_choices(session.pending_choices.clone(), decision);
    Event::Choices {
        choices,
        can_quit: true,
        window_open: decision != WindowDecisionKind::NotOpen,
        can_stay_forever: decision == WindowDecisionKind::OpenCanStay,
    }
}

fn final_events(session: &Session) -> Vec<Event> {
    let ending = session.ending.unwrap_or(Ending::Quit);
    let score = scoring::score(
        session.total_turns,
        session.eras_visited(),
        &session.anchors,
        ending,
    );
    vec![Event::FinalScore { score }, Event::GameEnd]
}

/// Pick the next era, enter it, and resolve the arrival scene. Moves the
/// session into `gameplay`.
fn enter_era(
    session: &mut Session,
    deps: &EngineDeps,
    picker: &mut dyn EraPicker,
) -> Vec<Event> {
    let region = session.region.unwrap_or(Region::Worldwide);
    let visited: Vec<String> = session.visited.iter().map(|v| v.id.clone()).collect();
    let era = select_era(region, &visited, picker);
    session.enter_era(era);
    session.phase = Phase::Gameplay;
    debug!(session = %session.id, era = era.id, "entering era");

    let mut events = vec![
        Event::Loading {
            message: "The centuries blur past...".to_string(),
        },
        Event::EraArrival {
            era_name: era.name.to_string(),
            year_display: crate::eras::year_display(era.year),
            location: era.location.to_string(),
            era_number: session.eras_visited(),
        },
    ];
    match resolve_arrival(session, deps) {
        Ok(outcome) => {
            events.push(Event::Narrative {
                text: outcome.narrative,
            });
        }
        Err(err) => {
            warn!(session = %session.id, error = %err, "arrival resolution failed");
            events.push(Event::Error {
                message: "arrival could not be narrated".to_string(),
            });
        }
    }
    events.push(device_status_event(session, deps));
    events.push(choices_event(session));
    events
}

/// Close out the current era: record it, decay anchors, return to the
/// between-era interlude.
fn depart_era(session: &mut Session, deps: &EngineDeps) -> Vec<Event> {
    let Some(era) = session.era() else {
        return invalid("no era to depart");
    };
    let summary = Event::EraSummary {
        era_name: era.name.to_string(),
        key_events: era.key_events.iter().map(|e| (*e).to_string()).collect(),
        turns_spent: session.turns_in_era,
    };
    session.visited.push(VisitedEra {
        id: era.id.to_string(),
        name: era.name.to_string(),
        turns: session.turns_in_era,
    });
    session.anchors.era_transition(&deps.config.retention);
    session.era_id = None;
    session.pending_choices.clear();
    session.phase = Phase::Intro;
    vec![
        Event::Departure {
            message: "You step through. The world tears away behind you.".to_string(),
        },
        summary,
    ]
}

/// End the session with a settled or quit ending and emit the closing
/// narrative plus the score.
fn terminate(
    session: &mut Session,
    deps: &EngineDeps,
    ending: Ending,
    kind: PromptKind,
) -> Vec<Event> {
    let narrative = resolve_ending(session, deps, kind);
    session.history.push(narrative.clone());
    session.ending = Some(ending);
    session.phase = Phase::Ended;
    session.pending_choices.clear();

    let mut events = Vec::new();
    if ending.is_settled() {
        events.push(Event::StayingForever);
    }
    events.push(Event::Narrative { text: narrative });
    events.extend(final_events(session));
    events
}

fn resolve_choice(
    session: &mut Session,
    choice_id: &str,
    deps: &EngineDeps,
    luck: &mut dyn Luck,
    picker: &mut dyn EraPicker,
) -> Vec<Event> {
    let normalized = choice_id.trim().to_ascii_uppercase();
    if normalized == QUIT_CHOICE_ID {
        return terminate(session, deps, Ending::Quit, PromptKind::EndingQuit);
    }
    let Some(choice) = session
        .pending_choices
        .iter()
        .find(|c| c.id.eq_ignore_ascii_case(&normalized))
        .cloned()
    else {
        return invalid(format!("unknown choice id {choice_id:?}"));
    };

    let can_stay = session.anchors.can_stay();
    match intent::detect(&choice.text, session.window.open) {
        ChoiceIntent::LeaveEra => {
            let events = depart_era(session, deps);
            return events;
        }
        ChoiceIntent::StayForever if can_stay => {
            let ending = session.anchors.settled_ending();
            return terminate(session, deps, ending, PromptKind::EndingStay);
        }
        ChoiceIntent::StayForever | ChoiceIntent::Continue => {}
    }

    let resolved = match resolve_turn(session, &choice.text, deps, luck) {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(session = %session.id, error = %err, "turn resolution failed");
            return invalid("turn could not be resolved");
        }
    };

    let mut events = vec![Event::Narrative {
        text: resolved.outcome.narrative.clone(),
    }];
    events.extend(milestone_events(&resolved.milestones));
    if let Some(wisdom) = &resolved.outcome.wisdom {
        events.push(Event::HistoricalWisdom {
            insight: wisdom.clone(),
        });
    }
    events.push(journey_progress_event(&session.anchors));
    events.push(device_status_event(session, deps));

    match resolved.window_tick {
        WindowTick::Opened => {
            session.phase = Phase::WindowDecision;
            events.push(Event::WindowOpen {
                message: window::status_line(&session.window, &deps.config.window)
                    .unwrap_or_else(|| "The window has opened.".to_string()),
            });
        }
        WindowTick::Closing => {
            session.phase = Phase::WindowDecision;
            events.push(Event::WindowClosing {
                message: window::status_line(&session.window, &deps.config.window)
                    .unwrap_or_else(|| "The window is closing.".to_string()),
            });
        }
        WindowTick::ForcedClosed => {
            // No decision was made in time: the current drags the traveler
            // onward. Counts as neither settling nor quitting.
            events.push(Event::WindowClosed);
            events.extend(depart_era(session, deps));
            events.extend(enter_era(session, deps, picker));
            return events;
        }
        WindowTick::Unchanged => {
            session.phase = if session.window.open {
                Phase::WindowDecision
            } else {
                Phase::Gameplay
            };
        }
    }

    events.push(choices_event(session));
    events
}

/// Events that reconstruct the caller-visible view of a session restored
/// from a save, without advancing any state.
pub fn resume_events(session: &Session, deps: &EngineDeps) -> Vec<Event> {
    let mut events = Vec::new();
    if let Some(era) = session.era() {
        events.push(Event::EraArrival {
            era_name: era.name.to_string(),
            year_display: crate::eras::year_display(era.year),
            location: era.location.to_string(),
            era_number: session.eras_visited(),
        });
    }
    if let Some(last) = session.history.last() {
        events.push(Event::Narrative { text: last.clone() });
    }
    events.push(journey_progress_event(&session.anchors));
    events.push(device_status_event(session, deps));
    if session.is_terminal() {
        events.extend(final_events(session));
    } else {
        events.push(choices_event(session));
    }
    events
}

/// Validate and apply one inbound action.
///
/// Persistence actions (`load`, `resume`, `save`, `list_saves`,
/// `leaderboard`) are handled by the session store, which owns the I/O; if
/// one reaches the machine it is rejected like any other illegal action.
pub fn handle_action(
    session: &mut Session,
    action: &Action,
    deps: &EngineDeps,
    luck: &mut dyn Luck,
    picker: &mut dyn EraPicker,
) -> Vec<Event> {
    match (session.phase, action) {
        (Phase::Connecting, Action::Init { user_id }) => {
            session.user_id = user_id.clone();
            session.phase = Phase::Menu;
            vec![
                Event::Ready,
                Event::Title {
                    text: TITLE.to_string(),
                },
            ]
        }
        (Phase::Menu, Action::NewGame) => {
            session.phase = Phase::SetupName;
            vec![Event::SetupName]
        }
        (Phase::SetupName, Action::SetName { name }) => {
            let name = name.trim();
            if name.is_empty() {
                return invalid("name must not be empty");
            }
            session.player_name = Some(name.to_string());
            session.phase = Phase::SetupRegion;
            vec![Event::SetupRegion {
                options: vec!["european".to_string(), "worldwide".to_string()],
            }]
        }
        (Phase::SetupRegion, Action::SetRegion { region }) => {
            let Some(parsed) = Region::parse(region) else {
                return invalid(format!("unknown region {region:?}"));
            };
            session.region = Some(parsed);
            session.phase = Phase::Intro;
            vec![
                Event::IntroStory {
                    paragraphs: intro_paragraphs(),
                },
                Event::IntroItems {
                    items: session
                        .inventory
                        .items()
                        .iter()
                        .map(|item| item.name.clone())
                        .collect(),
                },
                Event::IntroDevice,
            ]
        }
        (Phase::Intro, Action::EnterFirstEra | Action::ContinueToNextEra) => {
            enter_era(session, deps, picker)
        }
        (Phase::Gameplay | Phase::WindowDecision, Action::Choose { choice_id }) => {
            resolve_choice(session, choice_id, deps, luck, picker)
        }
        (Phase::Ended, Action::ContinueToScore) => final_events(session),
        (phase, action) => invalid(format!(
            "action {} is not legal in phase {}",
            action_name(action),
            phase_name(phase)
        )),
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::Init { .. } => "init",
        Action::NewGame => "new_game",
        Action::Load { .. } => "load",
        Action::Resume => "resume",
        Action::ListSaves => "list_saves",
        Action::Leaderboard => "leaderboard",
        Action::SetName { .. } => "set_name",
        Action::SetRegion { .. } => "set_region",
        Action::EnterFirstEra => "enter_first_era",
        Action::ContinueToNextEra => "continue_to_next_era",
        Action::Choose { .. } => "choose",
        Action::ContinueToScore => "continue_to_score",
        Action::Save => "save",
    }
}

fn phase_name(phase: Phase) -> &'static str {
    match phase {
        Phase::Connecting => "connecting",
        Phase::Menu => "menu",
        Phase::SetupName => "setup_name",
        Phase::SetupRegion => "setup_region",
        Phase::Intro => "intro",
        Phase::Gameplay => "gameplay",
        Phase::WindowDecision => "window_decision",
        Phase::Ended => "ended",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::narrator::FallbackNarrator;
    use crate::test_support::{FirstEraPicker, FixedLuck};
    use std::sync::Arc;

    fn deps() -> EngineDeps {
        EngineDeps::new(GameConfig::default(), Arc::new(FallbackNarrator))
    }

    fn run(session: &mut Session, action: Action, deps: &EngineDeps) -> Vec<Event> {
        let mut luck = FixedLuck::new(10, 0.99);
        let mut picker = FirstEraPicker;
        handle_action(session, &action, deps, &mut luck, &mut picker)
    }

    #[test]
    fn setup_flow_reaches_gameplay() {
        let deps = deps();
        let mut session = Session::new("s1");

        let events = run(&mut session, Action::Init { user_id: None }, &deps);
        assert!(matches!(events[0], Event::Ready));
        assert_eq!(session.phase, Phase::Menu);

        run(&mut session, Action::NewGame, &deps);
        assert_eq!(session.phase, Phase::SetupName);

        run(&mut session, Action::SetName { name: "Ada".into() }, &deps);
        assert_eq!(session.phase, Phase::SetupRegion);

        let events = run(&mut session, Action::SetRegion { region: "worldwide".into() }, &deps);
        assert_eq!(session.phase, Phase::Intro);
        assert!(matches!(events[0], Event::IntroStory { .. }));

        let events = run(&mut session, Action::EnterFirstEra, &deps);
        assert_eq!(session.phase, Phase::Gameplay);
        assert!(session.era_id.is_some());
        assert!(events.iter().any(|e| matches!(e, Event::EraArrival { .. })));
        assert!(events.iter().any(|e| matches!(e, Event::Choices { .. })));
        assert!(!session.pending_choices.is_empty());
    }

    #[test]
    fn illegal_action_leaves_state_unchanged() {
        let deps = deps();
        let mut session = Session::new("s1");
        let events = run(&mut session, Action::Choose { choice_id: "A".into() }, &deps);
        assert!(matches!(events[0], Event::Error { .. }));
        assert_eq!(session.phase, Phase::Connecting);
        assert_eq!(session.total_turns, 0);
    }

    #[test]
    fn unknown_choice_id_is_rejected_without_a_turn() {
        let deps = deps();
        let mut session = Session::new("s1");
        run(&mut session, Action::Init { user_id: None }, &deps);
        run(&mut session, Action::NewGame, &deps);
        run(&mut session, Action::SetName { name: "Ada".into() }, &deps);
        run(&mut session, Action::SetRegion { region: "worldwide".into() }, &deps);
        run(&mut session, Action::EnterFirstEra, &deps);

        let events = run(&mut session, Action::Choose { choice_id: "Z".into() }, &deps);
        assert!(matches!(events[0], Event::Error { .. }));
        assert_eq!(session.total_turns, 0);
    }

    #[test]
    fn quit_choice_ends_with_neutral_bonus() {
        let deps = deps();
        let mut session = Session::new("s1");
        run(&mut session, Action::Init { user_id: None }, &deps);
        run(&mut session, Action::NewGame, &deps);
        run(&mut session, Action::SetName { name: "Ada".into() }, &deps);
        run(&mut session, Action::SetRegion { region: "worldwide".into() }, &deps);
        run(&mut session, Action::EnterFirstEra, &deps);
        run(&mut session, Action::Choose { choice_id: "A".into() }, &deps);

        let events = run(&mut session, Action::Choose { choice_id: "Q".into() }, &deps);
        assert_eq!(session.phase, Phase::Ended);
        assert_eq!(session.ending, Some(Ending::Quit));
        let score = events.iter().find_map(|e| match e {
            Event::FinalScore { score } => Some(score.clone()),
            _ => None,
        });
        let score = score.expect("final score event");
        assert_eq!(score.ending_bonus, 0);
        assert_eq!(score.survival_points, 10);
    }

    #[test]
    fn continue_to_score_is_idempotent_after_ending() {
        let deps = deps();
        let mut session = Session::new("s1");
        run(&mut session, Action::Init { user_id: None }, &deps);
        run(&mut session, Action::NewGame, &deps);
        run(&mut session, Action::SetName { name: "Ada".into() }, &deps);
        run(&mut session, Action::SetRegion { region: "worldwide".into() }, &deps);
        run(&mut session, Action::EnterFirstEra, &deps);
        run(&mut session, Action::Choose { choice_id: "Q".into() }, &deps);

        let first = run(&mut session, Action::ContinueToScore, &deps);
        let second = run(&mut session, Action::ContinueToScore, &deps);
        assert_eq!(first, second);
    }
}
