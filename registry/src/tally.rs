//! Winner determination.

/// Indices of every candidate sharing the maximum count, ascending.
///
/// Ties yield several winners. An all-zero tally makes every candidate a
/// winner, since zero is then the maximum. An empty tally has no winners.
pub fn winning_indices(tally: &[u64]) -> Vec<usize> {
    let Some(&max_votes) = tally.iter().max() else {
        return Vec::new();
    };
    tally
        .iter()
        .enumerate()
        .filter(|(_, &votes)| votes == max_votes)
        .map(|(index, _)| index)
        .collect()
}
