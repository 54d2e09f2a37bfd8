//! Rules and computer play for a four-seat shedding game over a 52-card deck.
//!
//! The holder of the 3 of diamonds opens; players must beat the shape on the
//! table with a higher shape of the same kind and size, or with a bomb. The
//! first seat to empty its hand wins.

pub mod analysis;
pub mod card;
pub mod deal;
pub mod engine;
pub mod shape;
pub mod state;

pub use analysis::{finishing_play, leaves_single_shape, Decomposition, Holding};
pub use card::{
    describe_ranks, parse_cards, remove_cards, sort_hand, standard_deck, Card, Rank, Suit,
    OPENING_CARD,
};
pub use deal::{deal, shuffled_deck, Deal, HAND_SIZE};
pub use engine::{Decision, Engine, Rule, Situation, TableContext, LEAD_RULES, OPENING_RULES};
pub use shape::{can_beat, classify, Shape, ShapeKind};
pub use state::{
    Action, GameError, HistoryEntry, LastPlay, PassOutcome, Phase, PlayOutcome, TableView,
    TurnState, HISTORY_WINDOW, SEATS,
};
