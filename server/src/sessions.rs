use crate::protocol::{HistoryView, PlayView, SeatAction, SeatInfo, TableSnapshot};
use game_core::{Action, Card, Decision, Engine, GameError, LastPlay, Shape, TurnState, SEATS};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// The seat played through the socket; every other seat is an engine player.
pub const HUMAN_SEAT: usize = 0;

const SEAT_NAMES: [&str; SEATS] = ["You", "Bot B", "Bot C", "Bot D"];

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("game not found")]
    NotFound,
    #[error(transparent)]
    Rejected(#[from] GameError),
}

#[derive(Clone, Debug)]
pub struct Session {
    pub state: TurnState,
}

/// Result of one human action and the engine moves that followed it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnReport {
    pub human: SeatAction,
    pub bots: Vec<SeatAction>,
    pub winner: Option<usize>,
}

impl TurnReport {
    pub fn actions(&self) -> Vec<SeatAction> {
        std::iter::once(self.human.clone())
            .chain(self.bots.iter().cloned())
            .collect()
    }
}

#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    rng: StdRng,
    engine: Engine,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
            engine: Engine::new(),
        }
    }

    /// Deals a new game and plays the engine seats up to the human's first
    /// turn. Returns the session id and the moves made so far.
    pub fn create_session(&mut self, seed: u64) -> (String, Vec<SeatAction>) {
        let id = self.new_session_id();
        let mut state = TurnState::deal(seed);
        info!(session = %id, starter = state.current(), "new game dealt");
        let actions = advance_bots(&mut state, engine_move(self.engine));
        self.sessions.insert(id.clone(), Session { state });
        (id, actions)
    }

    pub fn play(&mut self, session_id: &str, cards: Vec<Card>) -> Result<TurnReport, SessionError> {
        let engine = self.engine;
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SessionError::NotFound)?;
        let outcome = session.state.play(HUMAN_SEAT, cards)?;
        let human = played_action(&session.state, HUMAN_SEAT, outcome.shape, Vec::new());
        debug!(session = %session_id, kind = ?outcome.shape.kind, "human played");
        let bots = advance_bots(&mut session.state, engine_move(engine));
        Ok(TurnReport {
            human,
            bots,
            winner: session.state.winner(),
        })
    }

    pub fn pass(&mut self, session_id: &str) -> Result<TurnReport, SessionError> {
        let engine = self.engine;
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SessionError::NotFound)?;
        session.state.pass(HUMAN_SEAT)?;
        let human = passed_action(&session.state, HUMAN_SEAT, Vec::new());
        let bots = advance_bots(&mut session.state, engine_move(engine));
        Ok(TurnReport {
            human,
            bots,
            winner: session.state.winner(),
        })
    }

    pub fn state(&self, session_id: &str) -> Option<&TurnState> {
        self.sessions.get(session_id).map(|session| &session.state)
    }

    pub fn snapshot(&self, session_id: &str) -> Option<TableSnapshot> {
        let state = self.state(session_id)?;
        let view = state.view_for(HUMAN_SEAT)?;
        let seats = view
            .counts
            .iter()
            .enumerate()
            .map(|(seat, count)| SeatInfo {
                seat,
                name: seat_name(seat),
                hand_count: *count,
                is_human: seat == HUMAN_SEAT,
            })
            .collect();
        let history = view
            .history
            .iter()
            .map(|entry| HistoryView {
                seat: entry.seat,
                name: seat_name(entry.seat),
                passed: matches!(entry.action, Action::Pass),
                cards: match &entry.action {
                    Action::Play { cards } => codes(cards),
                    Action::Pass => Vec::new(),
                },
            })
            .collect();
        Some(TableSnapshot {
            session_id: session_id.to_string(),
            seats,
            turn: view.current,
            last_play: view.last_play.as_ref().map(play_to_view),
            your_hand: codes(&view.hand),
            winner: view.winner,
            history,
            is_free: view.is_free,
            first_turn: view.first_turn,
        })
    }

    pub fn remove_session(&mut self, session_id: &str) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn new_session_id(&mut self) -> String {
        loop {
            let id = format!("{:016x}", self.rng.gen::<u64>());
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}

/// Lets `decide` move for every computer seat until the human is up or the
/// game is over. A move the table rejects stops the loop; whatever was
/// applied before it stands.
fn advance_bots(
    state: &mut TurnState,
    decide: impl Fn(&TurnState, usize) -> Decision,
) -> Vec<SeatAction> {
    let mut actions = Vec::new();
    while state.winner().is_none() && state.current() != HUMAN_SEAT {
        let seat = state.current();
        let decision = decide(state, seat);
        let applied = match decision.cards {
            Some(cards) => state.play(seat, cards).map(|outcome| Some(outcome.shape)),
            None => state.pass(seat).map(|_| None),
        };
        match applied {
            Ok(Some(shape)) => actions.push(played_action(state, seat, shape, decision.trace)),
            Ok(None) => actions.push(passed_action(state, seat, decision.trace)),
            Err(err) => {
                warn!(seat, %err, "engine move rejected, handing the turn back");
                break;
            }
        }
    }
    actions
}

fn engine_move(engine: Engine) -> impl Fn(&TurnState, usize) -> Decision {
    move |state, seat| engine.decide(state.hand(seat), &state.context_for(seat))
}

fn played_action(state: &TurnState, seat: usize, shape: Shape, reasoning: Vec<String>) -> SeatAction {
    let cards = state
        .last_play()
        .map(|last| codes(&last.cards))
        .unwrap_or_default();
    SeatAction {
        seat,
        name: seat_name(seat),
        passed: false,
        cards,
        shape: Some(shape.kind.label().to_string()),
        counts: state.counts().to_vec(),
        reasoning,
    }
}

fn passed_action(state: &TurnState, seat: usize, reasoning: Vec<String>) -> SeatAction {
    SeatAction {
        seat,
        name: seat_name(seat),
        passed: true,
        cards: Vec::new(),
        shape: None,
        counts: state.counts().to_vec(),
        reasoning,
    }
}

fn codes(cards: &[Card]) -> Vec<String> {
    cards.iter().map(|card| card.code()).collect()
}

fn play_to_view(last: &LastPlay) -> PlayView {
    PlayView {
        seat: last.seat,
        cards: codes(&last.cards),
        kind: last.shape.kind.label().to_string(),
        rank: last.shape.rank.to_string(),
        size: last.shape.size,
    }
}

pub fn seat_name(seat: usize) -> String {
    SEAT_NAMES
        .get(seat)
        .map(|name| name.to_string())
        .unwrap_or_else(|| format!("Seat {seat}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::parse_cards;

    fn cards(codes: &str) -> Vec<Card> {
        parse_cards(codes).unwrap()
    }

    #[test]
    fn rejected_engine_move_stops_the_loop_and_keeps_earlier_moves() {
        let mut state = TurnState::new([
            cards("D4 C9"),
            cards("D3 H9"),
            cards("D5 S9"),
            cards("D6 C10"),
        ])
        .unwrap();
        let scripted = |_: &TurnState, seat: usize| Decision {
            cards: Some(if seat == 1 { cards("D3") } else { cards("SA") }),
            trace: vec!["scripted".to_string()],
        };

        let actions = advance_bots(&mut state, scripted);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].seat, 1);
        assert_eq!(actions[0].cards, vec!["D3".to_string()]);
        assert_eq!(state.current(), 2);
        assert_eq!(state.hand(1), cards("H9").as_slice());
        assert_eq!(state.hand(2), cards("D5 S9").as_slice());
    }

    #[test]
    fn engine_seats_hand_control_back_to_the_human() {
        let mut state = TurnState::new([
            cards("D4 C9 DK"),
            cards("D3 H9 CK"),
            cards("D5 S9 HK"),
            cards("D6 C10 SK"),
        ])
        .unwrap();
        let actions = advance_bots(&mut state, engine_move(Engine::new()));
        assert_eq!(actions.len(), 3);
        assert!(actions[0].cards.contains(&"D3".to_string()));
        assert_eq!(state.current(), HUMAN_SEAT);
    }
}
