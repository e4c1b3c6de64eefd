//! Held-out evaluation of the auxiliary classifier and the real/fake head

use tracing::info;

use crate::data::DataLoader;
use crate::model::Acgan;

/// Results of a pass over a labelled split
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    /// Fraction of images whose predicted class matches the label
    pub accuracy: f64,
    /// Mean probability the discriminator assigns to "real"
    pub mean_real_score: f64,
    pub num_samples: usize,
}

/// Run the discriminator over one full epoch of `data_loader`
pub fn evaluate(model: &Acgan, data_loader: &mut DataLoader) -> EvaluationReport {
    let mut correct = 0.0;
    let mut real_score = 0.0;
    let mut seen = 0usize;

    tch::no_grad(|| {
        for batch in data_loader.iter() {
            let (images, _, classes) = batch.to_tensors(model.device);
            let (class_logits, logit) = model.discriminate_t(&images, false);

            correct += class_logits
                .argmax(-1, false)
                .eq_tensor(&classes)
                .to_kind(tch::Kind::Float)
                .sum(tch::Kind::Float)
                .double_value(&[]);
            real_score += logit.sigmoid().sum(tch::Kind::Float).double_value(&[]);
            seen += batch.len();
        }
    });

    let report = if seen == 0 {
        EvaluationReport {
            accuracy: 0.0,
            mean_real_score: 0.0,
            num_samples: 0,
        }
    } else {
        EvaluationReport {
            accuracy: correct / seen as f64,
            mean_real_score: real_score / seen as f64,
            num_samples: seen,
        }
    };

    info!(
        "Evaluated {} images: class accuracy {:.2}%, mean real score {:.4}",
        report.num_samples,
        report.accuracy * 100.0,
        report.mean_real_score
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{IdxImages, ImageDataset};
    use ndarray::Array3;
    use tch::Device;

    fn loader(count: usize) -> DataLoader {
        let pixels = Array3::from_shape_fn((count, 8, 8), |(n, r, c)| ((n + r * c) % 256) as u8);
        let classes = (0..count).map(|n| (n % 3) as u8).collect();
        let dataset =
            ImageDataset::from_parts(IdxImages { rows: 8, cols: 8, pixels }, classes, 3).unwrap();
        DataLoader::new(dataset, 4, false, false)
    }

    #[test]
    fn test_evaluate_covers_every_sample() {
        let model = Acgan::with_defaults(8, 3, 4, Device::Cpu);
        let report = evaluate(&model, &mut loader(10));

        assert_eq!(report.num_samples, 10);
        assert!((0.0..=1.0).contains(&report.accuracy));
        assert!(report.mean_real_score > 0.0 && report.mean_real_score < 1.0);
    }

    #[test]
    fn test_evaluate_empty_split() {
        let model = Acgan::with_defaults(8, 3, 4, Device::Cpu);
        let report = evaluate(&model, &mut loader(0));
        assert_eq!(report.num_samples, 0);
        assert_eq!(report.accuracy, 0.0);
    }
}
