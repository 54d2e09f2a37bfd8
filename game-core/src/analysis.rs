//! Combination search over a single hand.
//!
//! [`Holding`] groups a hand by rank and enumerates every shape the engine
//! may want to lead or answer with. Nothing here mutates the real hand; the
//! lookahead helpers work on copies.

use std::collections::BTreeMap;

use crate::card::{remove_cards, Card, Rank};
use crate::shape::{classify, is_consecutive};

/// Counts of rank groups by size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Decomposition {
    pub bombs: usize,
    pub triples: usize,
    pub pairs: usize,
    pub loners: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Holding {
    cards: Vec<Card>,
    groups: BTreeMap<Rank, Vec<Card>>,
}

impl Holding {
    pub fn new(hand: &[Card]) -> Self {
        let mut cards = hand.to_vec();
        cards.sort();
        let mut groups: BTreeMap<Rank, Vec<Card>> = BTreeMap::new();
        for card in cards.iter() {
            groups.entry(card.rank).or_default().push(*card);
        }
        Holding { cards, groups }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn smallest(&self) -> Option<Card> {
        self.cards.first().copied()
    }

    pub fn group(&self, rank: Rank) -> &[Card] {
        self.groups.get(&rank).map(Vec::as_slice).unwrap_or(&[])
    }

    fn group_size(&self, rank: Rank) -> usize {
        self.group(rank).len()
    }

    fn ranks_with_at_least(&self, size: usize) -> Vec<Rank> {
        self.groups
            .iter()
            .filter(|(_, cards)| cards.len() >= size)
            .map(|(rank, _)| *rank)
            .collect()
    }

    fn groups_of_exactly(&self, size: usize) -> impl Iterator<Item = &Vec<Card>> + '_ {
        self.groups.values().filter(move |cards| cards.len() == size)
    }

    /// Cards that are alone in their rank, lowest first.
    pub fn loners(&self) -> Vec<Card> {
        self.groups_of_exactly(1).map(|cards| cards[0]).collect()
    }

    /// Ranks held exactly twice. Pairs are never split off bigger groups here.
    pub fn natural_pairs(&self) -> Vec<Vec<Card>> {
        self.groups_of_exactly(2).cloned().collect()
    }

    /// Three cards of every rank held at least three times, lowest first.
    pub fn triples(&self) -> Vec<Vec<Card>> {
        self.groups
            .values()
            .filter(|cards| cards.len() >= 3)
            .map(|cards| cards[..3].to_vec())
            .collect()
    }

    pub fn bombs(&self) -> Vec<Vec<Card>> {
        self.groups_of_exactly(4).cloned().collect()
    }

    pub fn decomposition(&self) -> Decomposition {
        let mut parts = Decomposition::default();
        for cards in self.groups.values() {
            match cards.len() {
                1 => parts.loners += 1,
                2 => parts.pairs += 1,
                3 => parts.triples += 1,
                _ => parts.bombs += 1,
            }
        }
        parts
    }

    /// Straights of `length` cards, or of every length from three up, shortest
    /// first and then lowest first. Each rank contributes its lowest suit.
    pub fn straights(&self, length: Option<usize>) -> Vec<Vec<Card>> {
        let ranks = self.ranks_with_at_least(1);
        let (min, max) = length.map_or((3, ranks.len()), |len| (len, len));
        runs(&ranks, min, max)
            .into_iter()
            .map(|run| run.iter().map(|rank| self.group(*rank)[0]).collect())
            .collect()
    }

    /// Consecutive-pair runs of `pairs` pairs, or of every run from two pairs up.
    pub fn consecutive_pairs(&self, pairs: Option<usize>) -> Vec<Vec<Card>> {
        let ranks = self.ranks_with_at_least(2);
        let (min, max) = pairs.map_or((2, ranks.len()), |count| (count, count));
        runs(&ranks, min, max)
            .into_iter()
            .map(|run| {
                run.iter()
                    .flat_map(|rank| self.group(*rank)[..2].iter().copied())
                    .collect()
            })
            .collect()
    }

    /// Every run of two or more consecutive triples, both bare and with the
    /// smallest `2 * run` other cards as filler when the hand has enough.
    pub fn airplanes(&self) -> Vec<Vec<Card>> {
        let ranks = self.ranks_with_at_least(3);
        let mut planes = Vec::new();
        for run in runs(&ranks, 2, ranks.len()) {
            let body: Vec<Card> = run
                .iter()
                .flat_map(|rank| self.group(*rank)[..3].iter().copied())
                .collect();
            planes.push(body.clone());
            let Some(rest) = remove_cards(&self.cards, &body) else {
                continue;
            };
            let wings = 2 * run.len();
            if rest.len() >= wings {
                let mut plane = body;
                plane.extend_from_slice(&rest[..wings]);
                planes.push(plane);
            }
        }
        planes
    }

    /// One triple-with-pair per triple rank, lowest triple first.
    ///
    /// Attachments prefer loners, then cards outside four-of-a-kinds, then the
    /// smallest cards left.
    pub fn triples_with_pair(&self) -> Vec<Vec<Card>> {
        let mut combos = Vec::new();
        for body in self.triples() {
            let Some(rest) = remove_cards(&self.cards, &body) else {
                continue;
            };
            if rest.len() < 2 {
                continue;
            }
            let lonely: Vec<Card> = rest
                .iter()
                .copied()
                .filter(|card| self.group_size(card.rank) == 1)
                .collect();
            let attachments: Vec<Card> = match lonely.len() {
                0 => {
                    let safe: Vec<Card> = rest
                        .iter()
                        .copied()
                        .filter(|card| self.group_size(card.rank) < 4)
                        .collect();
                    if safe.len() >= 2 {
                        safe[..2].to_vec()
                    } else {
                        rest[..2].to_vec()
                    }
                }
                1 => {
                    let other = rest.iter().copied().find(|card| *card != lonely[0]);
                    std::iter::once(lonely[0]).chain(other).collect()
                }
                _ => lonely[..2].to_vec(),
            };
            let mut combo = body;
            combo.extend(attachments);
            combos.push(combo);
        }
        combos
    }

    /// Every triple-with-pair the hand can build: each triple with every two
    /// of the remaining cards. Lowest triple first, then attachments in hand
    /// order.
    pub fn all_triples_with_pair(&self) -> Vec<Vec<Card>> {
        let mut combos = Vec::new();
        for body in self.triples() {
            let Some(rest) = remove_cards(&self.cards, &body) else {
                continue;
            };
            for (i, first) in rest.iter().enumerate() {
                for second in rest[i + 1..].iter() {
                    let mut combo = body.clone();
                    combo.push(*first);
                    combo.push(*second);
                    combos.push(combo);
                }
            }
        }
        combos
    }
}

/// Windows over sorted distinct ranks that form unbroken runs, by length
/// from `min` to `max` and then by starting rank.
fn runs(ranks: &[Rank], min: usize, max: usize) -> Vec<&[Rank]> {
    let mut found = Vec::new();
    if min == 0 {
        return found;
    }
    for length in min..=max.min(ranks.len()) {
        for window in ranks.windows(length) {
            if is_consecutive(window) {
                found.push(window);
            }
        }
    }
    found
}

/// Whether the hand left after playing `removed` is itself one legal shape.
/// An emptied hand does not count.
pub fn leaves_single_shape(hand: &[Card], removed: &[Card]) -> bool {
    match remove_cards(hand, removed) {
        Some(rest) if !rest.is_empty() => classify(&rest).is_some(),
        _ => false,
    }
}

/// First candidate that leaves a hand playable in one go.
pub fn finishing_play(hand: &[Card], candidates: &[Vec<Card>]) -> Option<Vec<Card>> {
    candidates
        .iter()
        .find(|candidate| leaves_single_shape(hand, candidate))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::ShapeKind;
    use crate::test_support::cards;

    fn holding(codes: &str) -> Holding {
        Holding::new(&cards(codes))
    }

    #[test]
    fn decomposition_counts_groups() {
        let hand = holding("D3 C3 D5 C5 H5 D7 C7 H7 S7 D9 DJ");
        assert_eq!(
            hand.decomposition(),
            Decomposition {
                bombs: 1,
                triples: 1,
                pairs: 1,
                loners: 2
            }
        );
        assert_eq!(hand.loners(), cards("D9 DJ"));
        assert_eq!(hand.natural_pairs(), vec![cards("D3 C3")]);
        assert_eq!(hand.bombs(), vec![cards("D7 C7 H7 S7")]);
        assert_eq!(hand.triples(), vec![cards("D5 C5 H5"), cards("D7 C7 H7")]);
    }

    #[test]
    fn straights_enumerate_shortest_first() {
        let hand = holding("D3 C4 H5 S6");
        let found = hand.straights(None);
        assert_eq!(
            found,
            vec![cards("D3 C4 H5"), cards("C4 H5 S6"), cards("D3 C4 H5 S6")]
        );
        assert_eq!(hand.straights(Some(4)), vec![cards("D3 C4 H5 S6")]);
        assert!(hand.straights(Some(5)).is_empty());
    }

    #[test]
    fn straights_skip_gaps() {
        let hand = holding("D3 C4 H6 S7 D8");
        assert_eq!(hand.straights(None), vec![cards("H6 S7 D8")]);
    }

    #[test]
    fn consecutive_pairs_use_two_of_each_rank() {
        let hand = holding("D3 C3 H3 D4 C4 D5");
        assert_eq!(hand.consecutive_pairs(None), vec![cards("D3 C3 D4 C4")]);
        assert!(hand.consecutive_pairs(Some(3)).is_empty());
    }

    #[test]
    fn airplanes_with_and_without_filler() {
        let hand = holding("D3 C3 H3 D4 C4 H4 D9 DJ DQ DK");
        let planes = hand.airplanes();
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0], cards("D3 C3 H3 D4 C4 H4"));
        assert_eq!(planes[1], cards("D3 C3 H3 D4 C4 H4 D9 DJ DQ DK"));
        for plane in planes.iter() {
            assert!(classify(plane).is_some());
        }
    }

    #[test]
    fn triple_with_pair_prefers_loners() {
        let hand = holding("D6 C6 H6 D8 C8 D9 DK");
        assert_eq!(hand.triples_with_pair(), vec![cards("D6 C6 H6 D9 DK")]);
    }

    #[test]
    fn triple_with_pair_one_loner_takes_smallest_other() {
        let hand = holding("D6 C6 H6 D8 C8 DK");
        assert_eq!(hand.triples_with_pair(), vec![cards("D6 C6 H6 DK D8")]);
    }

    #[test]
    fn triple_with_pair_avoids_bomb_cards() {
        let hand = holding("D4 C4 H4 S4 D6 C6 H6 DQ CQ");
        let combos = hand.triples_with_pair();
        assert_eq!(combos[1], cards("D6 C6 H6 DQ CQ"));
        for combo in combos.iter() {
            assert_eq!(classify(combo).unwrap().kind, ShapeKind::TripleWithPair);
        }
    }

    #[test]
    fn every_attachment_pair_is_enumerated() {
        let hand = holding("D9 C9 H9 D3 D4 D5 D6 SK");
        let combos = hand.all_triples_with_pair();
        assert_eq!(combos.len(), 10);
        assert_eq!(combos[0], cards("D9 C9 H9 D3 D4"));
        assert_eq!(combos[3], cards("D9 C9 H9 D3 SK"));
        assert_eq!(combos[9], cards("D9 C9 H9 D6 SK"));
        assert!(combos.contains(&hand.triples_with_pair()[0]));

        let two_triples = holding("D5 C5 H5 D9 C9 H9");
        assert_eq!(two_triples.all_triples_with_pair().len(), 6);
        assert!(holding("D5 C5 H5 D9").all_triples_with_pair().is_empty());
    }

    #[test]
    fn lookahead_never_touches_the_hand() {
        let hand = cards("D5 D6 D7 D8 D9 SK");
        let snapshot = hand.clone();
        assert!(leaves_single_shape(&hand, &cards("SK")));
        assert!(!leaves_single_shape(&hand, &cards("D5")));
        assert!(!leaves_single_shape(&hand, &hand));
        assert_eq!(hand, snapshot);
    }

    #[test]
    fn finishing_play_picks_first_match() {
        let hand = cards("D5 D6 D7 D8 D9 SK");
        let candidates = vec![cards("D5"), cards("D9"), cards("SK")];
        assert_eq!(finishing_play(&hand, &candidates), Some(cards("SK")));
        assert_eq!(finishing_play(&hand, &candidates[..2]), None);
    }
}
