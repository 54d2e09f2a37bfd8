use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    Diamonds,
    Clubs,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Diamonds, Suit::Clubs, Suit::Hearts, Suit::Spades];

    fn from_char(ch: char) -> Option<Self> {
        match ch {
            'D' => Some(Suit::Diamonds),
            'C' => Some(Suit::Clubs),
            'H' => Some(Suit::Hearts),
            'S' => Some(Suit::Spades),
            _ => None,
        }
    }

    fn to_char(self) -> char {
        match self {
            Suit::Diamonds => 'D',
            Suit::Clubs => 'C',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }
}

/// Card ranks in play order. `Two` is the highest rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Three = 0,
    Four = 1,
    Five = 2,
    Six = 3,
    Seven = 4,
    Eight = 5,
    Nine = 6,
    Ten = 7,
    Jack = 8,
    Queen = 9,
    King = 10,
    Ace = 11,
    Two = 12,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
        Rank::Two,
    ];

    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn from_value(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "3" => Some(Rank::Three),
            "4" => Some(Rank::Four),
            "5" => Some(Rank::Five),
            "6" => Some(Rank::Six),
            "7" => Some(Rank::Seven),
            "8" => Some(Rank::Eight),
            "9" => Some(Rank::Nine),
            "10" => Some(Rank::Ten),
            "J" => Some(Rank::Jack),
            "Q" => Some(Rank::Queen),
            "K" => Some(Rank::King),
            "A" => Some(Rank::Ace),
            "2" => Some(Rank::Two),
            _ => None,
        }
    }

    pub fn to_str(self) -> &'static str {
        match self {
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
            Rank::Ace => "A",
            Rank::Two => "2",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    pub suit: Suit,
}

/// The card whose holder leads the first trick, and which the first play must contain.
pub const OPENING_CARD: Card = Card {
    rank: Rank::Three,
    suit: Suit::Diamonds,
};

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Card { rank, suit }
    }

    pub fn code(&self) -> String {
        format!("{}{}", self.suit.to_char(), self.rank.to_str())
    }

    pub fn from_code(code: &str) -> Option<Self> {
        let mut chars = code.chars();
        let suit = Suit::from_char(chars.next()?)?;
        let rank = Rank::from_str(chars.as_str())?;
        Some(Card { rank, suit })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Parses whitespace separated card codes such as `D3 C3 S10`.
pub fn parse_cards(codes: &str) -> Option<Vec<Card>> {
    codes.split_whitespace().map(Card::from_code).collect()
}

pub fn standard_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(52);
    for suit in Suit::ALL.iter() {
        for rank in Rank::ALL.iter() {
            deck.push(Card::new(*rank, *suit));
        }
    }
    deck
}

pub fn sort_hand(hand: &mut [Card]) {
    hand.sort();
}

/// Removes `cards` from `hand` as a multiset and returns what is left, or `None`
/// if the hand does not hold every card the requested number of times.
pub fn remove_cards(hand: &[Card], cards: &[Card]) -> Option<Vec<Card>> {
    let mut needed: HashMap<Card, usize> = HashMap::new();
    for card in cards.iter() {
        *needed.entry(*card).or_insert(0) += 1;
    }
    let mut remaining = Vec::with_capacity(hand.len().saturating_sub(cards.len()));
    for card in hand.iter() {
        match needed.get_mut(card) {
            Some(count) if *count > 0 => *count -= 1,
            _ => remaining.push(*card),
        }
    }
    if needed.values().any(|count| *count > 0) {
        return None;
    }
    Some(remaining)
}

/// Renders cards as space separated rank text, e.g. `3 3 4`.
pub fn describe_ranks(cards: &[Card]) -> String {
    cards
        .iter()
        .map(|card| card.rank.to_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_has_52_unique_cards() {
        let deck = standard_deck();
        assert_eq!(deck.len(), 52);
        let mut sorted = deck.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), 52);
    }

    #[test]
    fn card_code_round_trip() {
        for card in standard_deck() {
            assert_eq!(Card::from_code(&card.code()), Some(card));
        }
        assert_eq!(Card::from_code("S10").unwrap().rank, Rank::Ten);
    }

    #[test]
    fn rejects_unknown_codes() {
        assert_eq!(Card::from_code(""), None);
        assert_eq!(Card::from_code("X3"), None);
        assert_eq!(Card::from_code("D1"), None);
        assert_eq!(Card::from_code("BJ"), None);
    }

    #[test]
    fn two_outranks_ace_and_suit_breaks_ties() {
        assert!(Rank::Two > Rank::Ace);
        assert!(Card::new(Rank::Three, Suit::Spades) < Card::new(Rank::Four, Suit::Diamonds));
        assert!(OPENING_CARD < Card::new(Rank::Three, Suit::Clubs));
    }

    #[test]
    fn remove_cards_respects_multiplicity() {
        let hand = vec![
            Card::new(Rank::Five, Suit::Clubs),
            Card::new(Rank::Six, Suit::Clubs),
        ];
        let five = Card::new(Rank::Five, Suit::Clubs);
        assert_eq!(
            remove_cards(&hand, &[five]),
            Some(vec![Card::new(Rank::Six, Suit::Clubs)])
        );
        assert_eq!(remove_cards(&hand, &[five, five]), None);
        assert_eq!(remove_cards(&hand, &[OPENING_CARD]), None);
    }
}
