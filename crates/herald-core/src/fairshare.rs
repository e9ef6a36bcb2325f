//! Constant-time fair-share accumulators.
//!
//! A participant's time-weighted share of a group is
//!
//! ```text
//! share(T) = own_weighted_time(T) / total_weighted_time(T)
//! ```
//!
//! Recomputing the total for every member on every change would be linear in
//! the population. Instead each group keeps a historical constant `Z`, the sum
//! of `count * duration` over every closed interval. Only the interval since
//! the last membership change remains open, and its contribution is
//! `count * (T - last_update)`, folded in at query time:
//!
//! ```text
//! subscriber:  (T - m) * ADJUST / (Z + n * (T - g))
//! channel:     (T - s) * a * ADJUST / (Z + n * (T - g) * w)
//! ```
//!
//! An update on add/remove closes the open interval into `Z` using the count
//! that was in force during it, then moves the count.

use serde::{Deserialize, Serialize};

use crate::error::MathError;
use crate::math::{checked_mul3, scaled_ratio};
use crate::types::Height;

/// Direction of a membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberAction {
    Added,
    Removed,
}

/// Elapsed heights between `from` and `to`, rejecting regressions.
fn elapsed(from: Height, to: Height) -> Result<u128, MathError> {
    to.checked_sub(from)
        .map(u128::from)
        .ok_or(MathError::HeightRegression {
            last_update: from,
            at: to,
        })
}

/// Unweighted accumulator: the subscriber set of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Accumulator {
    /// Current number of members.
    pub count: u64,
    /// Sum of `count * duration` over all closed intervals.
    pub historical_z: u128,
    /// Height of the last membership change.
    pub last_update: Height,
}

impl Accumulator {
    /// An empty accumulator opened at `at`.
    pub const fn new(at: Height) -> Self {
        Self {
            count: 0,
            historical_z: 0,
            last_update: at,
        }
    }

    /// Roll the accumulator forward to `at` and apply a membership change.
    ///
    /// Removing from an empty accumulator leaves the count at zero.
    pub fn rolled(&self, action: MemberAction, at: Height) -> Result<Self, MathError> {
        let open = u128::from(self.count)
            .checked_mul(elapsed(self.last_update, at)?)
            .ok_or(MathError::Overflow)?;
        let historical_z = self
            .historical_z
            .checked_add(open)
            .ok_or(MathError::Overflow)?;
        let count = match action {
            MemberAction::Added => self.count.checked_add(1).ok_or(MathError::Overflow)?,
            MemberAction::Removed => self.count.saturating_sub(1),
        };

        Ok(Self {
            count,
            historical_z,
            last_update: at,
        })
    }

    /// Total member-time accrued up to `at`: `Z + n * (T - g)`.
    pub fn total_at(&self, at: Height) -> Result<u128, MathError> {
        u128::from(self.count)
            .checked_mul(elapsed(self.last_update, at)?)
            .and_then(|open| open.checked_add(self.historical_z))
            .ok_or(MathError::Overflow)
    }

    /// Scaled share at `at` of a member whose last update was `member_since`.
    pub fn share_of(&self, member_since: Height, at: Height) -> Result<u128, MathError> {
        let own = elapsed(member_since, at)?;
        scaled_ratio(own, self.total_at(at)?)
    }
}

/// Weighted accumulator: the set of all channels.
///
/// Channels carry different weights, so the open interval is charged at the
/// group's normalized (mean) weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGroup {
    /// Number of channels in the group.
    pub count: u64,
    /// Mean channel weight, truncated.
    pub normalized_weight: u128,
    /// Sum of `count * duration * weight` over all closed intervals.
    pub historical_z: u128,
    /// Height of the last change to the group.
    pub last_update: Height,
}

impl ChannelGroup {
    /// Roll the group forward to `at` and add or remove a channel of `weight`.
    pub fn rolled(&self, action: MemberAction, weight: u128, at: Height) -> Result<Self, MathError> {
        let open = checked_mul3(
            u128::from(self.count),
            elapsed(self.last_update, at)?,
            self.normalized_weight,
        )?;
        let historical_z = self
            .historical_z
            .checked_add(open)
            .ok_or(MathError::Overflow)?;

        let total = self
            .normalized_weight
            .checked_mul(u128::from(self.count))
            .ok_or(MathError::Overflow)?;
        let (count, total) = match action {
            MemberAction::Added => (
                self.count.checked_add(1).ok_or(MathError::Overflow)?,
                total.checked_add(weight).ok_or(MathError::Overflow)?,
            ),
            // Truncated means can undershoot the true total, hence saturating.
            MemberAction::Removed => (self.count.saturating_sub(1), total.saturating_sub(weight)),
        };
        let normalized_weight = if count == 0 {
            0
        } else {
            total / u128::from(count)
        };

        Ok(Self {
            count,
            normalized_weight,
            historical_z,
            last_update: at,
        })
    }

    /// Total weighted channel-time accrued up to `at`: `Z + n * (T - g) * w`.
    pub fn total_at(&self, at: Height) -> Result<u128, MathError> {
        checked_mul3(
            u128::from(self.count),
            elapsed(self.last_update, at)?,
            self.normalized_weight,
        )?
        .checked_add(self.historical_z)
        .ok_or(MathError::Overflow)
    }

    /// Scaled share at `at` of a channel of `weight` that started at `start`.
    pub fn share_of(&self, start: Height, weight: u128, at: Height) -> Result<u128, MathError> {
        let own = elapsed(start, at)?
            .checked_mul(weight)
            .ok_or(MathError::Overflow)?;
        scaled_ratio(own, self.total_at(at)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ADJUST_FOR_FLOAT;
    use proptest::prelude::*;

    #[test]
    fn test_first_member_opens_without_history() {
        let acc = Accumulator::new(10).rolled(MemberAction::Added, 10).unwrap();
        assert_eq!(
            acc,
            Accumulator {
                count: 1,
                historical_z: 0,
                last_update: 10
            }
        );
    }

    #[test]
    fn test_add_closes_interval_with_previous_count() {
        let acc = Accumulator::new(10)
            .rolled(MemberAction::Added, 10)
            .unwrap()
            .rolled(MemberAction::Added, 20)
            .unwrap();
        assert_eq!(acc.count, 2);
        assert_eq!(acc.historical_z, 10);
        assert_eq!(acc.last_update, 20);

        let acc = acc.rolled(MemberAction::Removed, 25).unwrap();
        assert_eq!(acc.count, 1);
        assert_eq!(acc.historical_z, 20);
        assert_eq!(acc.last_update, 25);
    }

    #[test]
    fn test_remove_from_empty_clamps() {
        let acc = Accumulator::new(5).rolled(MemberAction::Removed, 7).unwrap();
        assert_eq!(acc.count, 0);
        assert_eq!(acc.historical_z, 0);
    }

    #[test]
    fn test_subscriber_shares_split_member_time() {
        // Creator from 10, second member from 20, queried at 30.
        let acc = Accumulator::new(10)
            .rolled(MemberAction::Added, 10)
            .unwrap()
            .rolled(MemberAction::Added, 20)
            .unwrap();

        assert_eq!(acc.total_at(30).unwrap(), 30);
        assert_eq!(acc.share_of(20, 30).unwrap(), 3_333_333);
        assert_eq!(acc.share_of(10, 30).unwrap(), 6_666_666);
    }

    #[test]
    fn test_sole_member_owns_everything() {
        let acc = Accumulator::new(100).rolled(MemberAction::Added, 100).unwrap();
        assert_eq!(acc.share_of(100, 150).unwrap(), ADJUST_FOR_FLOAT);
    }

    #[test]
    fn test_query_at_update_height_has_zero_denominator() {
        let acc = Accumulator::new(100).rolled(MemberAction::Added, 100).unwrap();
        assert_eq!(acc.share_of(100, 100), Err(MathError::ZeroDenominator));
    }

    #[test]
    fn test_regression_rejected() {
        let acc = Accumulator::new(100);
        assert_eq!(
            acc.rolled(MemberAction::Added, 99),
            Err(MathError::HeightRegression {
                last_update: 100,
                at: 99
            })
        );
    }

    #[test]
    fn test_channel_group_weighted_shares() {
        let group = ChannelGroup::default()
            .rolled(MemberAction::Added, 10_000_000, 0)
            .unwrap();
        assert_eq!(group.normalized_weight, 10_000_000);

        let group = group.rolled(MemberAction::Added, 20_000_000, 10).unwrap();
        assert_eq!(group.count, 2);
        assert_eq!(group.historical_z, 100_000_000);
        assert_eq!(group.normalized_weight, 15_000_000);

        assert_eq!(group.total_at(20).unwrap(), 400_000_000);
        assert_eq!(group.share_of(0, 10_000_000, 20).unwrap(), 5_000_000);
        assert_eq!(group.share_of(10, 20_000_000, 20).unwrap(), 5_000_000);
    }

    #[test]
    fn test_channel_group_zero_weight_members() {
        // Two protocol channels with no stake, then a staked channel.
        let group = ChannelGroup::default()
            .rolled(MemberAction::Added, 0, 1)
            .unwrap()
            .rolled(MemberAction::Added, 0, 1)
            .unwrap()
            .rolled(MemberAction::Added, 10_000_000, 5)
            .unwrap();
        assert_eq!(group.count, 3);
        assert_eq!(group.historical_z, 0);
        assert_eq!(group.normalized_weight, 3_333_333);
        assert_eq!(group.share_of(5, 10_000_000, 15).unwrap(), 10_000_001);
    }

    #[test]
    fn test_channel_group_remove_last() {
        let group = ChannelGroup::default()
            .rolled(MemberAction::Added, 7, 0)
            .unwrap()
            .rolled(MemberAction::Removed, 7, 4)
            .unwrap();
        assert_eq!(group.count, 0);
        assert_eq!(group.normalized_weight, 0);
        assert_eq!(group.historical_z, 28);
    }

    proptest! {
        #[test]
        fn test_accumulator_monotonic(
            steps in prop::collection::vec((any::<bool>(), 0u64..1_000), 1..64)
        ) {
            let mut acc = Accumulator::new(0);
            let mut at = 0u64;
            for (add, gap) in steps {
                at += gap;
                let action = if add { MemberAction::Added } else { MemberAction::Removed };
                let next = acc.rolled(action, at).unwrap();
                prop_assert!(next.historical_z >= acc.historical_z);
                prop_assert!(next.last_update >= acc.last_update);
                acc = next;
            }
        }

        #[test]
        fn test_historical_z_matches_replay(
            steps in prop::collection::vec((any::<bool>(), 0u64..1_000), 1..64)
        ) {
            // Replaying every interval naively must agree with the accumulator.
            let mut acc = Accumulator::new(0);
            let mut naive: u128 = 0;
            let mut count: u64 = 0;
            let mut at = 0u64;
            for (add, gap) in steps {
                naive += u128::from(count) * u128::from(gap);
                at += gap;
                count = if add { count + 1 } else { count.saturating_sub(1) };
                let action = if add { MemberAction::Added } else { MemberAction::Removed };
                acc = acc.rolled(action, at).unwrap();
            }
            prop_assert_eq!(acc.historical_z, naive);
            prop_assert_eq!(acc.count, count);
        }
    }
}
