//! Seeded randomization of round stimuli: answer locations, queries, and the
//! five decoy pairings shown alongside the true query.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::answer::{Query, Representation};

pub const LOCATIONS: u8 = 6;
pub const QUERY_NUMBERS: u8 = 9;

#[derive(Debug)]
pub struct StimulusGenerator {
    rng: StdRng,
}

impl StimulusGenerator {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Uniform over 1..=6, never repeating the previous round's location.
    pub fn next_location(&mut self, previous: Option<u8>) -> u8 {
        let candidates: Vec<u8> = (1..=LOCATIONS)
            .filter(|loc| Some(*loc) != previous)
            .collect();
        candidates[self.rng.gen_range(0..candidates.len())]
    }

    /// Uniform query number and representation, except an equal number forces
    /// the opposite representation so the same stimulus never repeats.
    pub fn next_query(&mut self, previous: Option<Query>) -> Query {
        let number = self.rng.gen_range(1..=QUERY_NUMBERS);
        let mut representation = if self.rng.gen_bool(0.5) {
            Representation::Numeric
        } else {
            Representation::DotPattern
        };
        if let Some(prev) = previous {
            if prev.number == number {
                representation = prev.representation.opposite();
            }
        }
        Query::new(number, representation)
    }

    /// Five decoys sampled without replacement from the 16 remaining
    /// (number, representation) pairs; both representations of the true
    /// number are excluded.
    pub fn decoys(&mut self, truth: Query) -> [Query; 5] {
        let mut pool: Vec<Query> = (1..=QUERY_NUMBERS)
            .filter(|n| *n != truth.number)
            .flat_map(|n| {
                [
                    Query::new(n, Representation::Numeric),
                    Query::new(n, Representation::DotPattern),
                ]
            })
            .collect();
        pool.shuffle(&mut self.rng);

        let mut decoys = [truth; 5];
        for (slot, query) in decoys.iter_mut().zip(pool.into_iter()) {
            *slot = query;
        }
        decoys
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locations_never_repeat() {
        let mut gen = StimulusGenerator::new(Some(7));
        let mut previous = None;
        for _ in 0..500 {
            let loc = gen.next_location(previous);
            assert!((1..=LOCATIONS).contains(&loc));
            assert_ne!(Some(loc), previous);
            previous = Some(loc);
        }
    }

    #[test]
    fn queries_never_repeat_exactly() {
        let mut gen = StimulusGenerator::new(Some(11));
        let mut previous = None;
        for _ in 0..1000 {
            let query = gen.next_query(previous);
            assert!((1..=QUERY_NUMBERS).contains(&query.number));
            if let Some(prev) = previous {
                assert_ne!(query, prev);
            }
            previous = Some(query);
        }
    }

    #[test]
    fn equal_number_forces_opposite_representation() {
        let mut gen = StimulusGenerator::new(Some(3));
        let prev = Query::new(4, Representation::Numeric);
        for _ in 0..200 {
            let query = gen.next_query(Some(prev));
            if query.number == prev.number {
                assert_eq!(query.representation, Representation::DotPattern);
            }
        }
    }

    #[test]
    fn decoys_exclude_truth_and_each_other() {
        let mut gen = StimulusGenerator::new(Some(5));
        for number in 1..=QUERY_NUMBERS {
            let truth = Query::new(number, Representation::Numeric);
            let decoys = gen.decoys(truth);
            for (i, decoy) in decoys.iter().enumerate() {
                assert_ne!(decoy.number, truth.number);
                for other in &decoys[i + 1..] {
                    assert_ne!(decoy, other);
                }
            }
        }
    }

    #[test]
    fn same_seed_reproduces_the_sequence() {
        let mut a = StimulusGenerator::new(Some(99));
        let mut b = StimulusGenerator::new(Some(99));
        for _ in 0..50 {
            assert_eq!(a.next_location(None), b.next_location(None));
            assert_eq!(a.next_query(None), b.next_query(None));
        }
    }
}
