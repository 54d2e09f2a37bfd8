use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::card::{remove_cards, sort_hand, Card, OPENING_CARD};
use crate::deal::{deal, Deal};
use crate::engine::TableContext;
use crate::shape::{can_beat, classify, Shape};

pub const SEATS: usize = 4;

/// Passes in a row that hand the lead to the next seat.
const PASSES_TO_CLEAR: u8 = 3;

/// How many history entries a [`TableView`] carries.
pub const HISTORY_WINDOW: usize = 20;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("you do not hold those cards")]
    CardsNotOwned,
    #[error("the first play must include the 3 of diamonds")]
    MissingOpeningCard,
    #[error("those cards do not form a legal shape")]
    IllegalShape,
    #[error("that play does not beat the cards on the table")]
    TooSmall,
    #[error("you must play when leading")]
    MustPlay,
    #[error("the game is over")]
    GameOver,
}

/// The play currently on the table, which the next play has to beat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastPlay {
    pub seat: usize,
    pub cards: Vec<Card>,
    pub shape: Shape,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Play { cards: Vec<Card> },
    Pass,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seat: usize,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase<'a> {
    FreeLead { seat: usize },
    MustBeat { seat: usize, last: &'a LastPlay },
    Terminal { winner: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayOutcome {
    /// Seat that made the play.
    pub seat: usize,
    pub shape: Shape,
    pub winner: Option<usize>,
    /// `None` once the game is over.
    pub next_turn: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PassOutcome {
    pub seat: usize,
    pub next_turn: usize,
    /// The pass completed a round of passes and the table is free again.
    pub cleared: bool,
}

/// What one seat may see of the table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub seat: usize,
    pub hand: Vec<Card>,
    pub current: usize,
    pub last_play: Option<LastPlay>,
    pub counts: [usize; SEATS],
    pub winner: Option<usize>,
    pub history: Vec<HistoryEntry>,
    pub is_free: bool,
    pub first_turn: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnState {
    hands: [Vec<Card>; SEATS],
    current: usize,
    last_play: Option<LastPlay>,
    pass_count: u8,
    first_turn: bool,
    winner: Option<usize>,
    history: Vec<HistoryEntry>,
}

impl TurnState {
    /// Starts a game from dealt hands. The holder of the opening card leads.
    pub fn new(mut hands: [Vec<Card>; SEATS]) -> Result<Self, GameError> {
        for hand in hands.iter_mut() {
            sort_hand(hand);
        }
        let starter = hands
            .iter()
            .position(|hand| hand.contains(&OPENING_CARD))
            .ok_or(GameError::MissingOpeningCard)?;
        Ok(TurnState {
            hands,
            current: starter,
            last_play: None,
            pass_count: 0,
            first_turn: true,
            winner: None,
            history: Vec::new(),
        })
    }

    pub fn from_deal(deal: Deal) -> Self {
        let Deal { hands, starter } = deal;
        TurnState {
            hands,
            current: starter,
            last_play: None,
            pass_count: 0,
            first_turn: true,
            winner: None,
            history: Vec::new(),
        }
    }

    pub fn deal(seed: u64) -> Self {
        Self::from_deal(deal(seed))
    }

    pub fn current(&self) -> usize {
        self.current
    }

    /// The seat's cards; empty for a seat that is not at the table.
    pub fn hand(&self, seat: usize) -> &[Card] {
        self.hands.get(seat).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn counts(&self) -> [usize; SEATS] {
        [
            self.hands[0].len(),
            self.hands[1].len(),
            self.hands[2].len(),
            self.hands[3].len(),
        ]
    }

    pub fn last_play(&self) -> Option<&LastPlay> {
        self.last_play.as_ref()
    }

    pub fn pass_count(&self) -> u8 {
        self.pass_count
    }

    pub fn first_turn(&self) -> bool {
        self.first_turn
    }

    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn is_free(&self) -> bool {
        self.last_play.is_none()
    }

    pub fn phase(&self) -> Phase<'_> {
        if let Some(winner) = self.winner {
            return Phase::Terminal { winner };
        }
        match self.last_play.as_ref() {
            Some(last) => Phase::MustBeat {
                seat: self.current,
                last,
            },
            None => Phase::FreeLead { seat: self.current },
        }
    }

    /// Cards that have left the hands, counted from the history.
    pub fn cards_played(&self) -> usize {
        self.history
            .iter()
            .map(|entry| match &entry.action {
                Action::Play { cards } => cards.len(),
                Action::Pass => 0,
            })
            .sum()
    }

    pub fn play(&mut self, seat: usize, mut cards: Vec<Card>) -> Result<PlayOutcome, GameError> {
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        if seat != self.current {
            return Err(GameError::NotYourTurn);
        }
        let remaining = remove_cards(&self.hands[seat], &cards).ok_or(GameError::CardsNotOwned)?;
        if self.first_turn && !cards.contains(&OPENING_CARD) {
            return Err(GameError::MissingOpeningCard);
        }
        let shape = classify(&cards).ok_or(GameError::IllegalShape)?;
        let last = self.last_play.as_ref().map(|last| &last.shape);
        if !can_beat(last, &shape) {
            return Err(GameError::TooSmall);
        }

        sort_hand(&mut cards);
        self.hands[seat] = remaining;
        self.pass_count = 0;
        self.first_turn = false;
        self.history.push(HistoryEntry {
            seat,
            action: Action::Play {
                cards: cards.clone(),
            },
        });
        self.last_play = Some(LastPlay { seat, cards, shape });
        debug!(seat, kind = ?shape.kind, rank = %shape.rank, "play accepted");

        if self.hands[seat].is_empty() {
            self.winner = Some(seat);
            info!(seat, "seat went out");
            return Ok(PlayOutcome {
                seat,
                shape,
                winner: Some(seat),
                next_turn: None,
            });
        }
        self.current = (seat + 1) % SEATS;
        Ok(PlayOutcome {
            seat,
            shape,
            winner: None,
            next_turn: Some(self.current),
        })
    }

    pub fn pass(&mut self, seat: usize) -> Result<PassOutcome, GameError> {
        if self.winner.is_some() {
            return Err(GameError::GameOver);
        }
        if seat != self.current {
            return Err(GameError::NotYourTurn);
        }
        if self.last_play.is_none() || self.first_turn {
            return Err(GameError::MustPlay);
        }
        self.pass_count += 1;
        self.history.push(HistoryEntry {
            seat,
            action: Action::Pass,
        });
        self.current = (seat + 1) % SEATS;
        let cleared = self.pass_count >= PASSES_TO_CLEAR;
        if cleared {
            self.last_play = None;
            self.pass_count = 0;
            debug!(leader = self.current, "table cleared after passes");
        }
        Ok(PassOutcome {
            seat,
            next_turn: self.current,
            cleared,
        })
    }

    /// `None` for a seat that is not at the table.
    pub fn view_for(&self, seat: usize) -> Option<TableView> {
        let hand = self.hands.get(seat)?.clone();
        let start = self.history.len().saturating_sub(HISTORY_WINDOW);
        Some(TableView {
            seat,
            hand,
            current: self.current,
            last_play: self.last_play.clone(),
            counts: self.counts(),
            winner: self.winner,
            history: self.history[start..].to_vec(),
            is_free: self.is_free(),
            first_turn: self.first_turn,
        })
    }

    /// The table as the decision engine sees it from `seat`.
    pub fn context_for(&self, seat: usize) -> TableContext {
        TableContext {
            seat,
            lead: self.last_play.as_ref().map(|last| last.shape),
            first_turn: self.first_turn,
            counts: self.counts(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;
    use crate::test_support::{cards, table};

    #[test]
    fn game_state_starts_with_opening_card_holder() {
        let state = TurnState::deal(7);
        assert!(state.hand(state.current()).contains(&OPENING_CARD));
        assert!(state.first_turn());
        assert!(state.is_free());
        assert_eq!(state.counts(), [13; SEATS]);
    }

    #[test]
    fn new_requires_someone_to_hold_the_opening_card() {
        let result = TurnState::new([cards("C3"), cards("C4"), cards("C5"), cards("C6")]);
        assert_eq!(result.err(), Some(GameError::MissingOpeningCard));
    }

    #[test]
    fn apply_play_removes_cards_and_advances() {
        let mut state = table(["D3 C3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        let outcome = state.play(0, cards("D3 C3")).unwrap();
        assert_eq!(outcome.shape.kind, ShapeKind::Pair);
        assert_eq!(outcome.seat, 0);
        assert_eq!(outcome.next_turn, Some(1));
        assert_eq!(state.hand(0), cards("D9").as_slice());
        assert!(!state.first_turn());
        assert_eq!(state.cards_played(), 2);
    }

    #[test]
    fn apply_play_checks_turn() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(state.play(1, cards("D4")).err(), Some(GameError::NotYourTurn));
    }

    #[test]
    fn apply_play_rejects_missing_cards() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(
            state.play(0, cards("D3 C3")).err(),
            Some(GameError::CardsNotOwned)
        );
        assert_eq!(
            state.play(0, cards("D3 D3")).err(),
            Some(GameError::CardsNotOwned)
        );
    }

    #[test]
    fn first_play_must_include_opening_card() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(
            state.play(0, cards("D9")).err(),
            Some(GameError::MissingOpeningCard)
        );
    }

    #[test]
    fn illegal_shape_is_rejected() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(
            state.play(0, cards("D3 D9")).err(),
            Some(GameError::IllegalShape)
        );
        assert_eq!(state.play(0, Vec::new()).err(), Some(GameError::MissingOpeningCard));
    }

    #[test]
    fn apply_play_requires_beating_previous() {
        let mut state = table(["D3 D9", "D4 C9 CK", "D5 H9", "D6 S9"]);
        state.play(0, cards("D3")).unwrap();
        state.play(1, cards("C9")).unwrap();
        assert_eq!(state.play(2, cards("D5")).err(), Some(GameError::TooSmall));
        assert_eq!(state.play(2, cards("H9")).err(), Some(GameError::TooSmall));
    }

    #[test]
    fn rejected_actions_leave_state_untouched() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        let before = state.clone();
        let _ = state.play(0, cards("D9"));
        let _ = state.play(1, cards("D4"));
        let _ = state.pass(0);
        let _ = state.play(0, cards("D3 D9"));
        assert_eq!(state, before);
    }

    #[test]
    fn pass_not_allowed_on_free_lead() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(state.pass(0).err(), Some(GameError::MustPlay));
        assert_eq!(state.pass(1).err(), Some(GameError::NotYourTurn));
    }

    #[test]
    fn three_passes_reset_last_play() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        state.play(0, cards("D3")).unwrap();
        assert!(!state.pass(1).unwrap().cleared);
        assert!(!state.pass(2).unwrap().cleared);
        let outcome = state.pass(3).unwrap();
        assert!(outcome.cleared);
        assert_eq!(outcome.next_turn, 0);
        assert!(state.last_play().is_none());
        assert_eq!(state.pass_count(), 0);
        assert_eq!(state.phase(), Phase::FreeLead { seat: 0 });
        assert_eq!(state.pass(0).err(), Some(GameError::MustPlay));
    }

    #[test]
    fn play_resets_pass_counter() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9 SK", "D6 S9"]);
        state.play(0, cards("D3")).unwrap();
        state.pass(1).unwrap();
        state.play(2, cards("D5")).unwrap();
        assert_eq!(state.pass_count(), 0);
        state.pass(3).unwrap();
        state.pass(0).unwrap();
        state.pass(1).unwrap();
        assert!(state.is_free());
        assert_eq!(state.current(), 2);
    }

    #[test]
    fn emptying_a_hand_ends_the_game() {
        let mut state = table(["D3", "D4 C9", "D5 H9", "D6 S9"]);
        let outcome = state.play(0, cards("D3")).unwrap();
        assert_eq!(outcome.winner, Some(0));
        assert_eq!(outcome.seat, 0);
        assert_eq!(outcome.next_turn, None);
        assert_eq!(state.current(), 0);
        assert_eq!(state.phase(), Phase::Terminal { winner: 0 });
        assert_eq!(state.play(0, cards("D4")).err(), Some(GameError::GameOver));
        assert_eq!(state.pass(1).err(), Some(GameError::GameOver));
    }

    #[test]
    fn escalating_bombs_until_one_is_too_small() {
        let mut state = table([
            "D3 D5 C5 H5 S5 DK",
            "D6 C6 H6 S6 CK",
            "D7 C7 H7 S7 HK",
            "D8 C8 H8 S8 SK",
        ]);
        state.play(0, cards("D3")).unwrap();
        for (seat, bomb) in [(1, "D6 C6 H6 S6"), (2, "D7 C7 H7 S7"), (3, "D8 C8 H8 S8")] {
            let outcome = state.play(seat, cards(bomb)).unwrap();
            assert_eq!(outcome.shape.kind, ShapeKind::Bomb);
        }
        assert_eq!(
            state.play(0, cards("D5 C5 H5 S5")).err(),
            Some(GameError::TooSmall)
        );
    }

    #[test]
    fn view_bounds_history_and_hides_other_hands() {
        let mut state = table(["D3 C3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        state.play(0, cards("D3")).unwrap();
        let view = state.view_for(1).unwrap();
        assert_eq!(view.hand, cards("D4 C9"));
        assert_eq!(view.counts, [2, 2, 2, 2]);
        assert!(!view.is_free);
        assert_eq!(view.history.len(), 1);
        assert!(view.history.len() <= HISTORY_WINDOW);
    }

    #[test]
    fn context_carries_lead_shape() {
        let mut state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert_eq!(state.context_for(0).lead, None);
        state.play(0, cards("D3")).unwrap();
        let context = state.context_for(1);
        assert_eq!(context.lead.map(|shape| shape.kind), Some(ShapeKind::Single));
        assert!(!context.first_turn);
    }

    #[test]
    fn seats_outside_the_table_have_no_hand_or_view() {
        let state = table(["D3 D9", "D4 C9", "D5 H9", "D6 S9"]);
        assert!(state.hand(SEATS).is_empty());
        assert!(state.view_for(SEATS).is_none());
        assert_eq!(state.hand(3), cards("D6 S9").as_slice());
    }
}
