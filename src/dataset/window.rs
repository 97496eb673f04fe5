use crate::dataset::{FeatureRow, LabelVector, SequenceSample};

/// Slide a `time_steps`-row window over `features`.
///
/// The sample for index `i` holds `features[i - time_steps..i]` and is paired
/// with `labels[i - 1]`, the label of the window's last row. Produces
/// `features.len() - time_steps` samples, or none when there are not more
/// rows than `time_steps`.
pub fn window(
    features: &[FeatureRow],
    labels: &[LabelVector],
    time_steps: usize,
) -> Vec<SequenceSample> {
    let len = features.len().min(labels.len());
    if time_steps == 0 || len <= time_steps {
        return Vec::new();
    }

    (time_steps..len)
        .map(|i| SequenceSample {
            window: features[i - time_steps..i].to_vec(),
            label: labels[i - 1].clone(),
        })
        .collect()
}
