use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::card::{Card, Rank};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Single,
    Pair,
    Triple,
    TripleWithPair,
    Straight,
    ConsecutivePairs,
    Bomb,
    Airplane,
    AirplanePure,
}

impl ShapeKind {
    pub fn label(self) -> &'static str {
        match self {
            ShapeKind::Single => "single",
            ShapeKind::Pair => "pair",
            ShapeKind::Triple => "triple",
            ShapeKind::TripleWithPair => "triple with pair",
            ShapeKind::Straight => "straight",
            ShapeKind::ConsecutivePairs => "consecutive pairs",
            ShapeKind::Bomb => "bomb",
            ShapeKind::Airplane | ShapeKind::AirplanePure => "airplane",
        }
    }
}

/// A classified play. `rank` is the deciding rank: the highest rank of a run,
/// the triple's rank of a triple with pair, the top triple of an airplane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub kind: ShapeKind,
    pub rank: Rank,
    pub size: usize,
}

impl Shape {
    fn new(kind: ShapeKind, rank: Rank, size: usize) -> Self {
        Shape { kind, rank, size }
    }
}

pub(crate) fn counts_by_rank(cards: &[Card]) -> BTreeMap<Rank, usize> {
    let mut counts = BTreeMap::new();
    for card in cards.iter() {
        *counts.entry(card.rank).or_insert(0) += 1;
    }
    counts
}

/// True when the sorted, distinct ranks form one unbroken run.
pub(crate) fn is_consecutive(ranks: &[Rank]) -> bool {
    ranks
        .windows(2)
        .all(|pair| pair[1].value() == pair[0].value() + 1)
}

/// Classifies a set of cards. Order of the input does not matter.
///
/// Attachments are permissive: the two extra cards of a triple with pair, and
/// the filler of an airplane, only need the right count. They are not checked
/// to be real pairs.
pub fn classify(cards: &[Card]) -> Option<Shape> {
    if cards.is_empty() {
        return None;
    }
    let len = cards.len();
    let counts = counts_by_rank(cards);
    let unique = counts.len();
    let ranks: Vec<Rank> = counts.keys().copied().collect();
    let lowest = ranks[0];
    let highest = ranks[unique - 1];

    if len == 1 {
        return Some(Shape::new(ShapeKind::Single, lowest, 1));
    }
    if len == 2 && unique == 1 {
        return Some(Shape::new(ShapeKind::Pair, lowest, 2));
    }
    if len == 4 && unique == 1 {
        return Some(Shape::new(ShapeKind::Bomb, lowest, 4));
    }
    if len >= 3 && unique == len && is_consecutive(&ranks) {
        return Some(Shape::new(ShapeKind::Straight, highest, len));
    }
    if len >= 4
        && len % 2 == 0
        && unique >= 2
        && counts.values().all(|count| *count == 2)
        && is_consecutive(&ranks)
    {
        return Some(Shape::new(ShapeKind::ConsecutivePairs, highest, len));
    }
    if len == 3 && unique == 1 {
        return Some(Shape::new(ShapeKind::Triple, lowest, 3));
    }
    if len == 5 {
        if let Some((rank, _)) = counts.iter().find(|(_, count)| **count >= 3) {
            return Some(Shape::new(ShapeKind::TripleWithPair, *rank, 5));
        }
    }
    classify_airplane(&counts, len)
}

fn classify_airplane(counts: &BTreeMap<Rank, usize>, len: usize) -> Option<Shape> {
    let triples: Vec<Rank> = counts
        .iter()
        .filter(|(_, count)| **count >= 3)
        .map(|(rank, _)| *rank)
        .collect();
    if triples.len() < 2 {
        return None;
    }
    for run in (2..=triples.len()).rev() {
        for window in triples.windows(run) {
            if !is_consecutive(window) {
                continue;
            }
            let top = window[run - 1];
            let leftover = len - 3 * run;
            if leftover == 0 {
                return Some(Shape::new(ShapeKind::AirplanePure, top, len));
            }
            if leftover == 2 * run {
                return Some(Shape::new(ShapeKind::Airplane, top, len));
            }
        }
    }
    None
}

/// Whether `challenger` may be played over `last`. `None` means a free lead.
pub fn can_beat(last: Option<&Shape>, challenger: &Shape) -> bool {
    let Some(last) = last else {
        return true;
    };
    match (last.kind, challenger.kind) {
        (ShapeKind::Bomb, ShapeKind::Bomb) => challenger.rank > last.rank,
        (_, ShapeKind::Bomb) => true,
        (ShapeKind::Bomb, _) => false,
        _ => {
            last.kind == challenger.kind
                && last.size == challenger.size
                && challenger.rank > last.rank
        }
    }
}
