
use crate::data::{DigitSplits, TensorDataset};
use crate::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 两类可分的合成数据：类别 0 的像素约为 -1，类别 1 的像素约为 +1
pub(super) fn intensity_dataset(n: usize, seed: u64) -> TensorDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let side = 6;
    let mut data = Vec::with_capacity(n * side * side);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = i % 2;
        let level = if label == 0 { -1.0 } else { 1.0 };
        data.extend((0..side * side).map(|_| level + rng.gen_range(-0.1..0.1)));
        labels.push(label);
    }
    TensorDataset::new(Tensor::from_vec(data, &[n, 1, side, side]), labels).unwrap()
}

pub(super) fn intensity_splits(seed: u64) -> DigitSplits {
    DigitSplits::from_parts(
        intensity_dataset(40, seed),
        intensity_dataset(10, seed + 1),
        intensity_dataset(10, seed + 2),
    )
}
