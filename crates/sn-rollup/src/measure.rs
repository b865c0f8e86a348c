//! Weighted measure averages.

use sn_tree::{ActivityIdx, ActivityTree};

/// Weighted average of the known values. Unknown values and zero weights
/// contribute nothing; no contributors yields `None`.
pub(crate) fn weighted_average(values: impl IntoIterator<Item = (f64, Option<f64>)>) -> Option<f64> {
    let (sum, weight) = values
        .into_iter()
        .filter_map(|(w, v)| v.map(|v| (w, v)))
        .filter(|(w, _)| *w > 0.0)
        .fold((0.0, 0.0), |(sum, total), (w, v)| (sum + w * v, total + w));
    (weight > 0.0).then(|| sum / weight)
}

/// Objective measure of `idx` from children that contribute to satisfaction.
pub(crate) fn objective_measure(tree: &ActivityTree, idx: ActivityIdx) -> Option<f64> {
    weighted_average(tree.children(idx).iter().map(|&c| {
        let child = tree.get(c);
        let weight = if child.rollup_controls.contributes_to_satisfaction() {
            child.rollup_controls.objective_measure_weight
        } else {
            0.0
        };
        (weight, child.state.objective_measure)
    }))
}

/// Progress measure of `idx` from children that contribute to completion.
pub(crate) fn progress_measure(tree: &ActivityTree, idx: ActivityIdx) -> Option<f64> {
    weighted_average(tree.children(idx).iter().map(|&c| {
        let child = tree.get(c);
        let weight = if child.rollup_controls.contributes_to_completion() {
            child.rollup_controls.objective_measure_weight
        } else {
            0.0
        };
        (weight, child.state.progress_measure)
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_are_excluded_not_zero() {
        assert_eq!(weighted_average([(1.0, Some(0.8)), (1.0, None)]), Some(0.8));
    }

    #[test]
    fn weights_apply() {
        let avg = weighted_average([(1.0, Some(1.0)), (0.5, Some(0.4))]).unwrap();
        assert!((avg - 0.8).abs() < 1e-9);
    }

    #[test]
    fn no_contributors() {
        assert_eq!(weighted_average([(0.0, Some(1.0)), (1.0, None)]), None);
        assert_eq!(weighted_average(std::iter::empty()), None);
    }
}
