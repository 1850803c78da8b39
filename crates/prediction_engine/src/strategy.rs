//! Strategy Selector: z `OutcomeSnapshot` a strategie vybere stranu.

use crate::analyzer::OutcomeSnapshot;
use rand::Rng;
use serde::Serialize;
use settings::Strategy;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// První výsledek (A)
    Blue,
    /// Druhý výsledek (B)
    Pink,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Blue => "blue",
            Side::Pink => "pink",
        }
    }

    pub fn other(&self) -> Side {
        match self {
            Side::Blue => Side::Pink,
            Side::Pink => Side::Blue,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

enum Decision {
    Pick(Side),
    Tie,
}

/// Vždy vrátí stranu. Náhoda jen pro `Random` a přesnou shodu.
pub fn select_side<R: Rng + ?Sized>(snapshot: &OutcomeSnapshot, strategy: Strategy, rng: &mut R) -> Side {
    let prefer_higher = match strategy {
        Strategy::Blue => return Side::Blue,
        Strategy::Pink => return Side::Pink,
        Strategy::Random => return coin(rng),
        Strategy::Majority => true,
        Strategy::Minority => false,
    };

    // Body mají přednost před procenty
    let by_points = decide(snapshot.blue.points, snapshot.pink.points, prefer_higher);
    let decision = by_points.or_else(|| decide(snapshot.blue.percent, snapshot.pink.percent, prefer_higher));

    match decision {
        Some(Decision::Pick(side)) => side,
        Some(Decision::Tie) => coin(rng),
        None if prefer_higher => Side::Blue,
        None => Side::Pink,
    }
}

fn decide<T: PartialOrd>(blue: Option<T>, pink: Option<T>, prefer_higher: bool) -> Option<Decision> {
    let higher = match (blue, pink) {
        (None, None) => return None,
        // jediná známá hodnota se bere jako "větší"
        (Some(_), None) => Side::Blue,
        (None, Some(_)) => Side::Pink,
        (Some(b), Some(p)) if b == p => return Some(Decision::Tie),
        (Some(b), Some(p)) => {
            if b > p {
                Side::Blue
            } else {
                Side::Pink
            }
        }
    };
    Some(Decision::Pick(if prefer_higher { higher } else { higher.other() }))
}

fn coin<R: Rng + ?Sized>(rng: &mut R) -> Side {
    if rng.gen_bool(0.5) {
        Side::Blue
    } else {
        Side::Pink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::SideSignal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snap(blue: (Option<u32>, Option<u64>), pink: (Option<u32>, Option<u64>)) -> OutcomeSnapshot {
        OutcomeSnapshot {
            blue: SideSignal { percent: blue.0, points: blue.1 },
            pink: SideSignal { percent: pink.0, points: pink.1 },
            remaining_sec: None,
        }
    }

    #[test]
    fn fixed_strategies_ignore_snapshot() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = snap((Some(90), Some(9000)), (Some(10), Some(10)));
        assert_eq!(select_side(&s, Strategy::Blue, &mut rng), Side::Blue);
        assert_eq!(select_side(&s, Strategy::Pink, &mut rng), Side::Pink);
    }

    #[test]
    fn points_beat_percent() {
        let mut rng = StdRng::seed_from_u64(1);
        // procenta říkají modrá, body růžová
        let s = snap((Some(70), Some(1000)), (Some(30), Some(5000)));
        assert_eq!(select_side(&s, Strategy::Majority, &mut rng), Side::Pink);
        assert_eq!(select_side(&s, Strategy::Minority, &mut rng), Side::Blue);
    }

    #[test]
    fn falls_back_to_percent_when_points_unknown() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = snap((Some(70), None), (Some(30), None));
        assert_eq!(select_side(&s, Strategy::Majority, &mut rng), Side::Blue);
        assert_eq!(select_side(&s, Strategy::Minority, &mut rng), Side::Pink);
    }

    #[test]
    fn one_known_side() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = snap((None, None), (None, Some(200)));
        assert_eq!(select_side(&s, Strategy::Majority, &mut rng), Side::Pink);
        assert_eq!(select_side(&s, Strategy::Minority, &mut rng), Side::Blue);
    }

    #[test]
    fn nothing_known_defaults() {
        let mut rng = StdRng::seed_from_u64(1);
        let s = OutcomeSnapshot::default();
        assert_eq!(select_side(&s, Strategy::Majority, &mut rng), Side::Blue);
        assert_eq!(select_side(&s, Strategy::Minority, &mut rng), Side::Pink);
    }

    #[test]
    fn majority_and_minority_are_complementary_and_swap_with_sides() {
        let mut rng = StdRng::seed_from_u64(7);
        let cases = [
            snap((Some(55), Some(1200)), (Some(45), Some(800))),
            snap((Some(20), None), (Some(80), None)),
            snap((None, Some(3)), (None, Some(4))),
        ];
        for s in cases {
            let maj = select_side(&s, Strategy::Majority, &mut rng);
            let min = select_side(&s, Strategy::Minority, &mut rng);
            assert_eq!(maj, min.other());
            assert_eq!(select_side(&s.swapped(), Strategy::Majority, &mut rng), maj.other());
        }
    }

    #[test]
    fn ties_and_random_use_both_sides() {
        let mut rng = StdRng::seed_from_u64(42);
        let tie = snap((Some(50), Some(500)), (Some(50), Some(500)));
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            seen.insert(select_side(&tie, Strategy::Majority, &mut rng));
            seen.insert(select_side(&OutcomeSnapshot::default(), Strategy::Random, &mut rng));
        }
        assert_eq!(seen.len(), 2);
    }
}
