use crate::dataset::LabelVector;

/// Percentage of non-zero label entries whose sign the prediction matches.
///
/// Zero labels carry no direction and are skipped, as are entries without a
/// counterpart. `None` when nothing is left to score.
pub fn direction_accuracy(predictions: &[LabelVector], labels: &[LabelVector]) -> Option<f64> {
    let mut correct = 0usize;
    let mut total = 0usize;

    for (predicted, actual) in predictions.iter().zip(labels) {
        for (&p, &a) in predicted.iter().zip(actual) {
            if a == 0.0 {
                continue;
            }
            total += 1;
            if (p > 0.0 && a > 0.0) || (p < 0.0 && a < 0.0) {
                correct += 1;
            }
        }
    }

    (total > 0).then(|| correct as f64 / total as f64 * 100.0)
}

/// Predict that each window's last realized move continues.
///
/// `labels` must be consecutive samples, one candle apart. For horizon `h`
/// the label of sample `j - h` is the move from `h` candles before window
/// `j` ends up to its end, so it is fully known when `j` is predicted.
/// Samples with less than `h` samples of history predict zero.
pub fn persistence_baseline(labels: &[LabelVector], horizons: &[usize]) -> Vec<LabelVector> {
    (0..labels.len())
        .map(|j| {
            horizons
                .iter()
                .enumerate()
                .map(|(column, &h)| {
                    j.checked_sub(h)
                        .filter(|_| h > 0)
                        .and_then(|past| labels[past].get(column).copied())
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect()
}
