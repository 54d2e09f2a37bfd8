//! Rule-ordered decision engine for computer seats.
//!
//! Leading walks an ordered rule table and takes the first rule that yields a
//! play. Answering dispatches on the shape to beat. Every proposal is checked
//! against the classifier and comparator before it is returned, so the turn
//! state never sees an illegal move from here.

use serde::Serialize;
use tracing::{debug, warn};

use crate::analysis::{finishing_play, Holding};
use crate::card::{describe_ranks, remove_cards, Card, Rank, OPENING_CARD};
use crate::shape::{can_beat, classify, Shape, ShapeKind};
use crate::state::SEATS;

/// Any opponent at or below this many cards makes the engine press.
const URGENT_OPPONENT_CARDS: usize = 2;
/// At or below this many cards of its own the engine answers aggressively.
const AGGRESSIVE_HAND_SIZE: usize = 4;
/// Hands this small may spend their top cards.
const SPENDING_HAND_SIZE: usize = 6;
/// Hands this large answer singles even with a top card.
const LARGE_HAND_SIZE: usize = 10;

/// The table as one seat sees it when asked to move.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TableContext {
    pub seat: usize,
    /// Shape to beat; `None` on a free lead.
    pub lead: Option<Shape>,
    pub first_turn: bool,
    pub counts: [usize; SEATS],
}

impl TableContext {
    pub fn fewest_opponent_cards(&self) -> usize {
        (0..SEATS)
            .filter(|seat| *seat != self.seat)
            .map(|seat| self.counts[seat])
            .min()
            .unwrap_or(0)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// `None` means pass.
    pub cards: Option<Vec<Card>>,
    /// Human-readable notes in the order the engine made them.
    pub trace: Vec<String>,
}

/// Everything a rule may look at.
pub struct Situation<'a> {
    pub hand: &'a Holding,
    pub urgent: bool,
    pub aggressive: bool,
}

/// A candidate play and a note explaining it.
pub type Pick = Option<(Vec<Card>, String)>;

pub struct Rule {
    pub name: &'static str,
    pub pick: fn(&Situation<'_>) -> Pick,
}

/// Search order for the very first play of a game.
pub const OPENING_RULES: &[Rule] = &[
    Rule {
        name: "opening straight",
        pick: opening_straight,
    },
    Rule {
        name: "opening consecutive pairs",
        pick: opening_consecutive_pairs,
    },
    Rule {
        name: "opening triple with pair",
        pick: opening_triple_with_pair,
    },
    Rule {
        name: "opening pair",
        pick: opening_pair,
    },
    Rule {
        name: "opening single",
        pick: opening_single,
    },
];

/// Free-lead priorities, highest first.
pub const LEAD_RULES: &[Rule] = &[
    Rule {
        name: "kill shot",
        pick: kill_shot,
    },
    Rule {
        name: "last cards",
        pick: last_cards,
    },
    Rule {
        name: "urgent bomb",
        pick: urgent_bomb,
    },
    Rule {
        name: "fragmented hand",
        pick: fragmented_hand,
    },
    Rule {
        name: "airplane",
        pick: lead_airplane,
    },
    Rule {
        name: "straight",
        pick: lead_straight,
    },
    Rule {
        name: "consecutive pairs",
        pick: lead_consecutive_pairs,
    },
    Rule {
        name: "triple with pair",
        pick: lead_triple_with_pair,
    },
    Rule {
        name: "pair",
        pick: lead_pair,
    },
    Rule {
        name: "loner",
        pick: lead_loner,
    },
    Rule {
        name: "smallest card",
        pick: smallest_card,
    },
];

#[derive(Clone, Copy, Debug, Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Chooses a play for `hand`. Pure: the same inputs give the same decision.
    pub fn decide(&self, hand: &[Card], table: &TableContext) -> Decision {
        let holding = Holding::new(hand);
        let mut trace = vec![format!(
            "hand ({}): {}",
            holding.len(),
            describe_ranks(holding.cards())
        )];
        if holding.is_empty() {
            trace.push("no cards left".to_string());
            return Decision { cards: None, trace };
        }
        let fewest = table.fewest_opponent_cards();
        trace.push(format!("fewest opponent cards: {fewest}"));
        let situation = Situation {
            hand: &holding,
            urgent: fewest <= URGENT_OPPONENT_CARDS,
            aggressive: holding.len() <= AGGRESSIVE_HAND_SIZE,
        };

        let proposal = match table.lead.as_ref() {
            None => lead(&situation, table.first_turn, &mut trace),
            Some(last) => respond(&situation, last, &mut trace),
        };
        let cards = checked(proposal, &holding, table, &mut trace);
        match cards.as_ref() {
            Some(cards) => trace.push(format!("decision: play {}", describe_ranks(cards))),
            None => trace.push("decision: pass".to_string()),
        }
        debug!(seat = table.seat, play = ?cards, "engine decided");
        Decision { cards, trace }
    }
}

fn run_rules(rules: &[Rule], situation: &Situation<'_>, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    for rule in rules.iter() {
        if let Some((cards, note)) = (rule.pick)(situation) {
            trace.push(format!("{}: {}", rule.name, note));
            return Some(cards);
        }
    }
    None
}

fn lead(situation: &Situation<'_>, first_turn: bool, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    if first_turn {
        trace.push(format!("first play must include {OPENING_CARD}"));
        return run_rules(OPENING_RULES, situation, trace);
    }
    let parts = situation.hand.decomposition();
    trace.push(format!(
        "structure: {} bombs, {} triples, {} pairs, {} loners",
        parts.bombs, parts.triples, parts.pairs, parts.loners
    ));
    if situation.urgent {
        trace.push("an opponent is nearly out".to_string());
    }
    run_rules(LEAD_RULES, situation, trace)
}

/// Final gate: anything the table would reject is dropped for a safe fallback.
fn checked(
    proposal: Option<Vec<Card>>,
    holding: &Holding,
    table: &TableContext,
    trace: &mut Vec<String>,
) -> Option<Vec<Card>> {
    if let Some(cards) = proposal {
        if is_legal(&cards, holding, table) {
            return Some(cards);
        }
        warn!(seat = table.seat, play = ?cards, "engine proposal failed the legality check");
        trace.push(format!("{} is not legal here", describe_ranks(&cards)));
    }
    if table.lead.is_some() {
        return None;
    }
    if table.first_turn && holding.cards().contains(&OPENING_CARD) {
        return Some(vec![OPENING_CARD]);
    }
    holding.smallest().map(|card| vec![card])
}

fn is_legal(cards: &[Card], holding: &Holding, table: &TableContext) -> bool {
    if remove_cards(holding.cards(), cards).is_none() {
        return false;
    }
    if table.first_turn && !cards.contains(&OPENING_CARD) {
        return false;
    }
    classify(cards).is_some_and(|shape| can_beat(table.lead.as_ref(), &shape))
}

fn beats(last: &Shape, cards: &[Card]) -> bool {
    classify(cards).is_some_and(|shape| can_beat(Some(last), &shape))
}

fn opening_straight(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .straights(None)
        .into_iter()
        .find(|cards| cards.contains(&OPENING_CARD))
        .map(|cards| {
            let note = format!("straight of {}", cards.len());
            (cards, note)
        })
}

fn opening_consecutive_pairs(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .consecutive_pairs(None)
        .into_iter()
        .find(|cards| cards.contains(&OPENING_CARD))
        .map(|cards| {
            let note = format!("{} pairs in a row", cards.len() / 2);
            (cards, note)
        })
}

fn opening_triple_with_pair(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .triples_with_pair()
        .into_iter()
        .find(|cards| cards.contains(&OPENING_CARD))
        .map(|cards| (cards, "triple with pair".to_string()))
}

fn opening_pair(situation: &Situation<'_>) -> Pick {
    let threes = situation.hand.group(OPENING_CARD.rank);
    if threes.len() >= 2 && threes[..2].contains(&OPENING_CARD) {
        return Some((threes[..2].to_vec(), "pair of 3s".to_string()));
    }
    None
}

fn opening_single(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .cards()
        .contains(&OPENING_CARD)
        .then(|| (vec![OPENING_CARD], "opening card alone".to_string()))
}

fn kill_shot(situation: &Situation<'_>) -> Pick {
    let cards = situation.hand.cards();
    classify(cards).map(|shape| {
        (
            cards.to_vec(),
            format!("whole hand goes out as a {}", shape.kind.label()),
        )
    })
}

fn last_cards(situation: &Situation<'_>) -> Pick {
    let cards = situation.hand.cards();
    if cards.len() > 2 {
        return None;
    }
    classify(cards).map(|_| (cards.to_vec(), "two cards or fewer, play them all".to_string()))
}

fn urgent_bomb(situation: &Situation<'_>) -> Pick {
    if !situation.urgent {
        return None;
    }
    situation
        .hand
        .bombs()
        .into_iter()
        .next()
        .map(|bomb| (bomb, "bomb to take control".to_string()))
}

fn fragmented_hand(situation: &Situation<'_>) -> Pick {
    let parts = situation.hand.decomposition();
    if parts.loners < 4 || parts.pairs > 1 {
        return None;
    }
    situation.hand.loners().first().map(|card| {
        (
            vec![*card],
            format!("{} loners, shedding {} first", parts.loners, card.rank),
        )
    })
}

fn lead_airplane(situation: &Situation<'_>) -> Pick {
    let mut planes: Vec<Vec<Card>> = situation
        .hand
        .airplanes()
        .into_iter()
        .filter(|plane| classify(plane).is_some())
        .collect();
    planes.sort_by_key(|plane| std::cmp::Reverse(plane.len()));
    planes.into_iter().next().map(|plane| {
        let note = format!("{} cards", plane.len());
        (plane, note)
    })
}

fn lead_straight(situation: &Situation<'_>) -> Pick {
    let mut straights = situation.hand.straights(None);
    straights.sort_by_key(|cards| (std::cmp::Reverse(cards.len()), cards[0].rank));
    straights.into_iter().next().map(|cards| {
        let note = format!("longest run, {} cards from {}", cards.len(), cards[0].rank);
        (cards, note)
    })
}

fn lead_consecutive_pairs(situation: &Situation<'_>) -> Pick {
    let mut runs = situation.hand.consecutive_pairs(None);
    runs.sort_by_key(|cards| std::cmp::Reverse(cards.len()));
    runs.into_iter().next().map(|cards| {
        let note = format!("{} pairs from {}", cards.len() / 2, cards[0].rank);
        (cards, note)
    })
}

fn lead_triple_with_pair(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .triples_with_pair()
        .into_iter()
        .next()
        .map(|cards| {
            let note = format!("smallest triple, {}s", cards[0].rank);
            (cards, note)
        })
}

fn lead_pair(situation: &Situation<'_>) -> Pick {
    let pairs = situation.hand.natural_pairs();
    let spend_top = situation.hand.len() <= AGGRESSIVE_HAND_SIZE || situation.urgent;
    let chosen = pairs
        .iter()
        .find(|pair| pair[0].rank < Rank::Two || spend_top)
        .or_else(|| pairs.first())?;
    Some((chosen.clone(), format!("pair of {}s", chosen[0].rank)))
}

fn lead_loner(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .loners()
        .first()
        .map(|card| (vec![*card], format!("single {}, no pair broken", card.rank)))
}

fn smallest_card(situation: &Situation<'_>) -> Pick {
    situation
        .hand
        .smallest()
        .map(|card| (vec![card], format!("smallest card {}", card.rank)))
}

fn respond(situation: &Situation<'_>, last: &Shape, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    trace.push(format!(
        "must beat {} ({} cards, rank {})",
        last.kind.label(),
        last.size,
        last.rank
    ));
    let hand = situation.hand;
    match last.kind {
        ShapeKind::Single => answer_single(situation, last.rank, trace),
        ShapeKind::Pair => answer_pair(situation, last.rank, trace),
        ShapeKind::Triple => answer_triple(situation, last.rank, trace),
        ShapeKind::TripleWithPair => answer_triple_with_pair(situation, last, trace),
        ShapeKind::Straight => {
            answer_run(situation, hand.straights(Some(last.size)), last, trace)
        }
        ShapeKind::ConsecutivePairs => {
            answer_run(situation, hand.consecutive_pairs(Some(last.size / 2)), last, trace)
        }
        ShapeKind::Bomb => answer_bomb(situation, last.rank, trace),
        ShapeKind::Airplane | ShapeKind::AirplanePure => {
            answer_run(situation, hand.airplanes(), last, trace)
        }
    }
}

fn fallback_bomb(situation: &Situation<'_>, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    if !situation.urgent {
        return None;
    }
    let bomb = situation.hand.bombs().into_iter().next()?;
    trace.push(format!("opponent nearly out, bombing with {}s", bomb[0].rank));
    Some(bomb)
}

fn answer_single(situation: &Situation<'_>, rank: Rank, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    let hand = situation.hand;
    let candidates: Vec<Card> = hand
        .loners()
        .into_iter()
        .filter(|card| card.rank > rank)
        .collect();
    let singles: Vec<Vec<Card>> = candidates.iter().map(|card| vec![*card]).collect();
    if let Some(play) = finishing_play(hand.cards(), &singles) {
        trace.push(format!("{} leaves a hand that goes out in one play", play[0].rank));
        return Some(play);
    }

    if let Some(cheapest) = candidates.first().copied() {
        if situation.urgent || situation.aggressive {
            trace.push(format!("pressing with smallest beating single {}", cheapest.rank));
            return Some(vec![cheapest]);
        }
        if let Some(card) = candidates.iter().find(|card| card.rank <= Rank::King) {
            trace.push(format!("loner {}, keeping A and 2", card.rank));
            return Some(vec![*card]);
        }
        if let Some(card) = candidates.iter().find(|card| card.rank <= Rank::Ace) {
            trace.push(format!("loner {}, keeping 2", card.rank));
            return Some(vec![*card]);
        }
        if hand.len() <= SPENDING_HAND_SIZE {
            trace.push(format!("few cards left, spending {}", cheapest.rank));
            return Some(vec![cheapest]);
        }
        if hand.len() >= LARGE_HAND_SIZE {
            trace.push(format!("large hand can afford {}", cheapest.rank));
            return Some(vec![cheapest]);
        }
        trace.push("only top singles beat it, holding them".to_string());
        return None;
    }

    if situation.urgent || situation.aggressive {
        if let Some(card) = hand.cards().iter().find(|card| card.rank > rank) {
            trace.push(format!("breaking the {}s to answer", card.rank));
            return Some(vec![*card]);
        }
    }
    if let Some(bomb) = fallback_bomb(situation, trace) {
        return Some(bomb);
    }
    trace.push("cannot beat the single".to_string());
    None
}

fn answer_pair(situation: &Situation<'_>, rank: Rank, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    let hand = situation.hand;
    let candidates: Vec<Vec<Card>> = hand
        .natural_pairs()
        .into_iter()
        .filter(|pair| pair[0].rank > rank)
        .collect();
    if let Some(play) = finishing_play(hand.cards(), &candidates) {
        trace.push(format!("pair of {}s leaves a hand that goes out in one play", play[0].rank));
        return Some(play);
    }

    if let Some(cheapest) = candidates.first() {
        if situation.urgent || situation.aggressive {
            trace.push(format!("pressing with pair of {}s", cheapest[0].rank));
            return Some(cheapest.clone());
        }
        if let Some(pair) = candidates.iter().find(|pair| pair[0].rank < Rank::Two) {
            trace.push(format!("pair of {}s", pair[0].rank));
            return Some(pair.clone());
        }
        if hand.len() <= SPENDING_HAND_SIZE {
            trace.push("few cards left, spending the 2s".to_string());
            return Some(cheapest.clone());
        }
        trace.push("only the pair of 2s beats it, holding it".to_string());
        return None;
    }

    if situation.urgent || situation.aggressive {
        if let Some(triple) = hand.triples().into_iter().find(|cards| cards[0].rank > rank) {
            trace.push(format!("breaking the {}s for a pair", triple[0].rank));
            return Some(triple[..2].to_vec());
        }
    }
    if let Some(bomb) = fallback_bomb(situation, trace) {
        return Some(bomb);
    }
    trace.push("cannot beat the pair".to_string());
    None
}

fn answer_triple(situation: &Situation<'_>, rank: Rank, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    let hand = situation.hand;
    let candidates: Vec<Vec<Card>> = hand
        .triples()
        .into_iter()
        .filter(|cards| cards[0].rank > rank)
        .collect();
    if let Some(play) = finishing_play(hand.cards(), &candidates) {
        trace.push(format!("triple {}s leaves a hand that goes out in one play", play[0].rank));
        return Some(play);
    }
    if let Some(triple) = candidates.into_iter().next() {
        trace.push(format!("triple {}s", triple[0].rank));
        return Some(triple);
    }
    fallback_bomb(situation, trace)
}

fn answer_triple_with_pair(
    situation: &Situation<'_>,
    last: &Shape,
    trace: &mut Vec<String>,
) -> Option<Vec<Card>> {
    let hand = situation.hand;
    let every_combo: Vec<Vec<Card>> = hand
        .all_triples_with_pair()
        .into_iter()
        .filter(|cards| beats(last, cards))
        .collect();
    if let Some(play) = finishing_play(hand.cards(), &every_combo) {
        trace.push(format!(
            "triple {}s with pair leaves a hand that goes out in one play",
            play[0].rank
        ));
        return Some(play);
    }
    if let Some(combo) = hand
        .triples_with_pair()
        .into_iter()
        .find(|cards| beats(last, cards))
    {
        trace.push(format!("triple {}s with pair", combo[0].rank));
        return Some(combo);
    }
    fallback_bomb(situation, trace)
}

/// Straights, consecutive pairs and airplanes: the first candidate of the
/// right size that beats, candidates already ordered from lowest.
fn answer_run(
    situation: &Situation<'_>,
    candidates: Vec<Vec<Card>>,
    last: &Shape,
    trace: &mut Vec<String>,
) -> Option<Vec<Card>> {
    if let Some(run) = candidates
        .into_iter()
        .find(|cards| cards.len() == last.size && beats(last, cards))
    {
        trace.push(format!("{} up to {}", last.kind.label(), run[run.len() - 1].rank));
        return Some(run);
    }
    fallback_bomb(situation, trace)
}

fn answer_bomb(situation: &Situation<'_>, rank: Rank, trace: &mut Vec<String>) -> Option<Vec<Card>> {
    let bomb = situation
        .hand
        .bombs()
        .into_iter()
        .find(|bomb| bomb[0].rank > rank)?;
    trace.push(format!("bigger bomb of {}s", bomb[0].rank));
    Some(bomb)
}
