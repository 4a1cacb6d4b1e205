use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ActionTableError {
    #[error("Action table is empty.")]
    Empty,

    #[error("Cumulative bounds must be strictly increasing within (0, 1]; found {0} after {1}.")]
    NotIncreasing(f64, f64),

    #[error("The last cumulative bound must be exactly 1.0, not {0}.")]
    Incomplete(f64),

    #[error("Action weights must be finite and positive.")]
    InvalidWeight,
}

/// Weighted dispatch written as `(cumulative upper bound, action)` pairs.
///
/// Action `i` owns the half-open range `[upper[i - 1], upper[i])`, so a table ending at `1.0`
/// partitions `[0, 1)` with neither gaps nor overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTable<A> {
    entries: Vec<(f64, A)>,
}

impl<A> ActionTable<A> {
    pub fn cumulative(entries: Vec<(f64, A)>) -> Result<Self, ActionTableError> {
        let mut previous = 0.;
        for (upper, _) in &entries {
            if !upper.is_finite() || *upper <= previous || *upper > 1. {
                return Err(ActionTableError::NotIncreasing(*upper, previous));
            }
            previous = *upper;
        }

        match entries.last() {
            None => Err(ActionTableError::Empty),
            Some((upper, _)) if *upper != 1. => Err(ActionTableError::Incomplete(*upper)),
            Some(_) => Ok(Self { entries }),
        }
    }

    /// Build from relative weights, normalized to sum to one.
    pub fn from_weights(weights: Vec<(f64, A)>) -> Result<Self, ActionTableError> {
        if weights.iter().any(|(w, _)| !w.is_finite() || *w <= 0.) {
            return Err(ActionTableError::InvalidWeight);
        }
        let total: f64 = weights.iter().map(|(w, _)| w).sum();
        let count = weights.len();

        let mut running = 0.;
        let entries = weights
            .into_iter()
            .enumerate()
            .map(|(i, (w, action))| {
                running += w / total;
                // NOTE: Pin the last bound so rounding never leaves a gap below 1.0.
                let upper = if i + 1 == count { 1. } else { running.min(1.) };
                (upper, action)
            })
            .collect();
        Self::cumulative(entries)
    }

    /// The action owning `draw`, which must lie in `[0, 1)`. Out of range draws clamp to the
    /// first or last action.
    pub fn pick(&self, draw: f64) -> &A {
        let idx = self
            .entries
            .partition_point(|(upper, _)| *upper <= draw)
            .min(self.entries.len() - 1);
        &self.entries[idx].1
    }

    /// Each action with the half-open range it owns.
    pub fn ranges(&self) -> impl Iterator<Item = (f64, f64, &A)> {
        let lowers = std::iter::once(0.).chain(self.entries.iter().map(|(upper, _)| *upper));
        lowers
            .zip(self.entries.iter())
            .map(|(lo, (hi, action))| (lo, *hi, action))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum A {
        Health,
        Videos,
        Rankings,
        Auth,
    }

    fn web() -> ActionTable<A> {
        ActionTable::cumulative(vec![
            (0.1, A::Health),
            (0.4, A::Videos),
            (0.7, A::Rankings),
            (1.0, A::Auth),
        ])
        .unwrap()
    }

    #[test]
    fn buckets_partition_unit_interval() {
        let table = web();
        let ranges: Vec<_> = table.ranges().collect();
        assert_eq!(ranges.first().unwrap().0, 0.);
        assert_eq!(ranges.last().unwrap().1, 1.);
        for pair in ranges.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
            assert!(pair[0].0 < pair[0].1);
        }
    }

    #[test]
    fn boundaries_belong_to_upper_bucket() {
        let table = web();
        assert_eq!(table.pick(0.), &A::Health);
        assert_eq!(table.pick(0.099_999), &A::Health);
        assert_eq!(table.pick(0.1), &A::Videos);
        assert_eq!(table.pick(0.4), &A::Rankings);
        assert_eq!(table.pick(0.7), &A::Auth);
        assert_eq!(table.pick(0.999_999), &A::Auth);
        assert_eq!(table.pick(1.0), &A::Auth);
    }

    #[test]
    fn every_draw_hits_exactly_one_bucket() {
        let table = web();
        for step in 0..10_000 {
            let draw = step as f64 / 10_000.;
            let owners = table
                .ranges()
                .filter(|(lo, hi, _)| *lo <= draw && draw < *hi)
                .count();
            assert_eq!(owners, 1, "draw {draw}");
        }
    }

    #[test]
    fn malformed_tables_are_rejected() {
        assert_eq!(
            ActionTable::<A>::cumulative(vec![]).unwrap_err(),
            ActionTableError::Empty
        );
        assert_eq!(
            ActionTable::cumulative(vec![(0.5, A::Health), (0.9, A::Auth)]).unwrap_err(),
            ActionTableError::Incomplete(0.9)
        );
        assert_eq!(
            ActionTable::cumulative(vec![(0.5, A::Health), (0.5, A::Auth), (1., A::Videos)])
                .unwrap_err(),
            ActionTableError::NotIncreasing(0.5, 0.5)
        );
    }

    #[test]
    fn weights_normalize() {
        let table = ActionTable::from_weights(vec![(1., A::Health), (3., A::Videos)]).unwrap();
        let ranges: Vec<_> = table.ranges().map(|(lo, hi, _)| (lo, hi)).collect();
        assert_eq!(ranges, [(0., 0.25), (0.25, 1.)]);
        assert_eq!(
            ActionTable::from_weights(vec![(0., A::Health)]).unwrap_err(),
            ActionTableError::InvalidWeight
        );
    }
}
