use error_stack::{Report, bail};

use crate::dataset::{Dataset, SequenceSample};
use crate::error::DatasetError;

/// Index of the first validation sample: `floor(len * (1 - fraction))`.
pub fn split_index(len: usize, validation_fraction: f64) -> Result<usize, Report<DatasetError>> {
    if !(0.0..=1.0).contains(&validation_fraction) {
        bail!(DatasetError::InvalidParameter {
            name: format!("validation_fraction must be within [0, 1], got {validation_fraction}"),
        });
    }
    let index = (len as f64 * (1.0 - validation_fraction)).floor() as usize;
    Ok(index.min(len))
}

/// Positional split, no shuffling: validation is strictly the most recent
/// part of `samples`.
pub fn split(
    samples: Vec<SequenceSample>,
    validation_fraction: f64,
) -> Result<Dataset, Report<DatasetError>> {
    let index = split_index(samples.len(), validation_fraction)?;
    let mut train = samples;
    let validation = train.split_off(index);
    Ok(Dataset { train, validation })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(len: usize) -> Vec<SequenceSample> {
        (0..len)
            .map(|i| SequenceSample {
                window: Vec::new(),
                label: vec![i as f64],
            })
            .collect()
    }

    #[test]
    fn hundred_samples_split_eighty_twenty() {
        let dataset = split(samples(100), 0.2).unwrap();
        assert_eq!(dataset.train.len(), 80);
        assert_eq!(dataset.validation.len(), 20);
    }

    #[test]
    fn validation_follows_train_in_order() {
        let dataset = split(samples(100), 0.2).unwrap();
        let train: Vec<f64> = dataset.train.iter().map(|s| s.label[0]).collect();
        let validation: Vec<f64> = dataset.validation.iter().map(|s| s.label[0]).collect();
        assert_eq!(train, (0..80).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(validation, (80..100).map(|i| i as f64).collect::<Vec<_>>());
    }

    #[test]
    fn split_index_floors() {
        assert_eq!(split_index(7, 0.2).unwrap(), 5);
        assert_eq!(split_index(1, 0.2).unwrap(), 0);
        assert_eq!(split_index(0, 0.2).unwrap(), 0);
    }

    #[test]
    fn extreme_fractions() {
        let all_train = split(samples(10), 0.0).unwrap();
        assert_eq!((all_train.train.len(), all_train.validation.len()), (10, 0));
        let all_validation = split(samples(10), 1.0).unwrap();
        assert_eq!((all_validation.train.len(), all_validation.validation.len()), (0, 10));
    }

    #[test]
    fn fraction_out_of_range_rejected() {
        for fraction in [-0.1, 1.5, f64::NAN] {
            let err = split(samples(10), fraction).unwrap_err();
            assert!(matches!(
                err.current_context(),
                DatasetError::InvalidParameter { .. }
            ));
        }
    }
}
