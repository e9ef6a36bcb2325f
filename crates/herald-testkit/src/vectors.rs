//! Golden vectors for the fair-share arithmetic.
//!
//! These pin channel weights and the constant-time share formulas to known
//! values, so a change to the accumulator update shows up as a vector
//! mismatch rather than a silent drift in shares.

use herald_core::{
    channel_weight, Accumulator, Amount, ChannelGroup, Height, MathError, MemberAction,
};
use herald_ledger::config::{DEFAULT_MIN_CONTRIBUTION, TOKEN};
use serde::Serialize;

/// Expected weight of a contribution.
#[derive(Debug, Clone, Serialize)]
pub struct WeightVector {
    pub name: &'static str,
    pub contribution: Amount,
    pub expected_weight: u128,
}

/// Subscribers joining one channel, with their expected shares.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriberShareVector {
    pub name: &'static str,
    /// Join height of each member. The first member is the channel owner.
    pub joins: &'static [Height],
    pub query_at: Height,
    /// Expected scaled share of each member, in join order.
    pub expected: &'static [u128],
}

/// Channels joining an empty group, with their expected shares.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelShareVector {
    pub name: &'static str,
    /// `(contribution in whole tokens, start height)` of each channel.
    pub channels: &'static [(u128, Height)],
    pub query_at: Height,
    pub expected: &'static [u128],
}

pub fn weight_vectors() -> Vec<WeightVector> {
    vec![
        WeightVector {
            name: "minimum contribution",
            contribution: 50 * TOKEN,
            expected_weight: 10_000_000,
        },
        WeightVector {
            name: "double minimum",
            contribution: 100 * TOKEN,
            expected_weight: 20_000_000,
        },
        WeightVector {
            name: "one and a half minimum",
            contribution: 75 * TOKEN,
            expected_weight: 15_000_000,
        },
        WeightVector {
            name: "dust above minimum truncates",
            contribution: 50 * TOKEN + 1,
            expected_weight: 10_000_000,
        },
        WeightVector {
            name: "maximum contribution",
            contribution: 250_000 * 50 * TOKEN,
            expected_weight: 2_500_000_000_000,
        },
    ]
}

pub fn subscriber_share_vectors() -> Vec<SubscriberShareVector> {
    vec![
        SubscriberShareVector {
            name: "sole owner holds everything",
            joins: &[100],
            query_at: 150,
            expected: &[10_000_000],
        },
        SubscriberShareVector {
            name: "owner and one subscriber",
            joins: &[10, 20],
            query_at: 30,
            expected: &[6_666_666, 3_333_333],
        },
        SubscriberShareVector {
            name: "three staggered members",
            joins: &[0, 10, 20],
            query_at: 40,
            expected: &[4_444_444, 3_333_333, 2_222_222],
        },
    ]
}

pub fn channel_share_vectors() -> Vec<ChannelShareVector> {
    vec![
        ChannelShareVector {
            name: "single channel",
            channels: &[(50, 5)],
            query_at: 15,
            expected: &[10_000_000],
        },
        ChannelShareVector {
            name: "heavier late channel catches up",
            channels: &[(50, 0), (100, 10)],
            query_at: 20,
            expected: &[5_000_000, 5_000_000],
        },
    ]
}

fn subscriber_shares(vector: &SubscriberShareVector) -> Result<Vec<u128>, MathError> {
    let first = vector.joins.first().copied().unwrap_or(0);
    let mut acc = Accumulator::new(first);
    for &at in vector.joins {
        acc = acc.rolled(MemberAction::Added, at)?;
    }
    vector
        .joins
        .iter()
        .map(|&joined| acc.share_of(joined, vector.query_at))
        .collect()
}

fn channel_shares(vector: &ChannelShareVector) -> Result<Vec<u128>, MathError> {
    let mut group = ChannelGroup::default();
    let mut weights = Vec::with_capacity(vector.channels.len());
    for &(tokens, start) in vector.channels {
        let weight = channel_weight(tokens * TOKEN, DEFAULT_MIN_CONTRIBUTION)?;
        group = group.rolled(MemberAction::Added, weight, start)?;
        weights.push((start, weight));
    }
    weights
        .into_iter()
        .map(|(start, weight)| group.share_of(start, weight, vector.query_at))
        .collect()
}

/// Check every vector, reporting the first mismatch.
pub fn verify_all_vectors() -> Result<(), String> {
    for v in weight_vectors() {
        let weight = channel_weight(v.contribution, DEFAULT_MIN_CONTRIBUTION)
            .map_err(|e| format!("{}: {}", v.name, e))?;
        if weight != v.expected_weight {
            return Err(format!(
                "{}: weight {} != expected {}",
                v.name, weight, v.expected_weight
            ));
        }
    }

    for v in subscriber_share_vectors() {
        let shares = subscriber_shares(&v).map_err(|e| format!("{}: {}", v.name, e))?;
        if shares != v.expected {
            return Err(format!("{}: shares {:?} != expected {:?}", v.name, shares, v.expected));
        }
    }

    for v in channel_share_vectors() {
        let shares = channel_shares(&v).map_err(|e| format!("{}: {}", v.name, e))?;
        if shares != v.expected {
            return Err(format!("{}: shares {:?} != expected {:?}", v.name, shares, v.expected));
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct VectorSet {
    weights: Vec<WeightVector>,
    subscriber_shares: Vec<SubscriberShareVector>,
    channel_shares: Vec<ChannelShareVector>,
}

/// All vectors as pretty JSON, for sharing with other implementations.
pub fn vectors_json() -> serde_json::Result<String> {
    serde_json::to_string_pretty(&VectorSet {
        weights: weight_vectors(),
        subscriber_shares: subscriber_share_vectors(),
        channel_shares: channel_share_vectors(),
    })
}
