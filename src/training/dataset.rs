/// One worker's contribution: encoded scrambles and their labels.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedBatch {
    pub inputs: Vec<f32>,
    pub labels: Vec<f32>,
}

impl GeneratedBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// An epoch's (scramble, label) pairs. Row `i` of `inputs` is
/// `inputs[i * features..(i + 1) * features]`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    inputs: Vec<f32>,
    labels: Vec<f32>,
    features: usize,
}

impl TrainingSet {
    /// Concatenate worker batches in the order given.
    pub fn concat(features: usize, batches: Vec<GeneratedBatch>) -> Self {
        let rows: usize = batches.iter().map(GeneratedBatch::len).sum();
        let mut inputs = Vec::with_capacity(rows * features);
        let mut labels = Vec::with_capacity(rows);
        for batch in batches {
            debug_assert_eq!(batch.inputs.len(), batch.len() * features);
            inputs.extend(batch.inputs);
            labels.extend(batch.labels);
        }
        TrainingSet {
            inputs,
            labels,
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn features(&self) -> usize {
        self.features
    }

    pub fn input(&self, index: usize) -> &[f32] {
        &self.inputs[index * self.features..(index + 1) * self.features]
    }

    pub fn label(&self, index: usize) -> f32 {
        self.labels[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(rows: &[(f32, f32)]) -> GeneratedBatch {
        GeneratedBatch {
            inputs: rows.iter().flat_map(|&(x, _)| [x, -x]).collect(),
            labels: rows.iter().map(|&(_, y)| y).collect(),
        }
    }

    #[test]
    fn test_concat_keeps_rows_paired() {
        let set = TrainingSet::concat(
            2,
            vec![batch(&[(1.0, 10.0), (2.0, 20.0)]), batch(&[(3.0, 30.0)])],
        );
        assert_eq!(set.len(), 3);
        assert_eq!(set.features(), 2);
        assert_eq!(set.input(2), &[3.0, -3.0]);
        assert_eq!(set.label(2), 30.0);
        assert_eq!(set.input(0), &[1.0, -1.0]);
        assert_eq!(set.label(0), 10.0);
    }

    #[test]
    fn test_concat_of_nothing_is_empty() {
        let set = TrainingSet::concat(4, Vec::new());
        assert!(set.is_empty());
    }
}
