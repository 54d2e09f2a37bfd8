use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::card::{sort_hand, standard_deck, Card, OPENING_CARD};
use crate::state::SEATS;

pub const HAND_SIZE: usize = 13;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deal {
    pub hands: [Vec<Card>; SEATS],
    /// Seat holding the opening card.
    pub starter: usize,
}

pub fn shuffled_deck(seed: u64) -> Vec<Card> {
    let mut deck = standard_deck();
    let mut rng = StdRng::seed_from_u64(seed);
    deck.shuffle(&mut rng);
    deck
}

pub fn deal(seed: u64) -> Deal {
    let deck = shuffled_deck(seed);
    let mut hands: [Vec<Card>; SEATS] = Default::default();
    for (seat, chunk) in deck.chunks(HAND_SIZE).enumerate() {
        hands[seat] = chunk.to_vec();
        sort_hand(&mut hands[seat]);
    }
    let starter = hands
        .iter()
        .position(|hand| hand.contains(&OPENING_CARD))
        .unwrap_or(0);
    Deal { hands, starter }
}
