//! 训练 / 验证 / 测试三路数据划分

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::dataloader::TensorDataset;
use super::datasets::{DataConfig, MnistDataset};
use super::error::DataError;

/// 将数据集随机划分为 (训练, 验证) 两部分
///
/// 验证集大小为 `floor(n * validation_fraction)`，比例会被截断到 [0, 1]。
/// 两部分互不相交，且各自保持打乱后的顺序。固定`seed`时结果可复现。
pub fn random_split(
    dataset: &TensorDataset,
    validation_fraction: f64,
    seed: Option<u64>,
) -> Result<(TensorDataset, TensorDataset), DataError> {
    let n = dataset.len();
    let fraction = if validation_fraction.is_nan() {
        0.0
    } else {
        validation_fraction.clamp(0.0, 1.0)
    };
    let validation_len = (n as f64 * fraction).floor() as usize;

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    indices.shuffle(&mut rng);

    let (validation, train) = indices.split_at(validation_len);
    Ok((dataset.subset(train)?, dataset.subset(validation)?))
}

/// 训练所需的三份互不相交的数据
#[derive(Debug, Clone)]
pub struct DigitSplits {
    pub train: TensorDataset,
    pub validation: TensorDataset,
    pub test: TensorDataset,
}

impl DigitSplits {
    /// 直接由已加载的数据组成
    pub fn from_parts(train: TensorDataset, validation: TensorDataset, test: TensorDataset) -> Self {
        Self {
            train,
            validation,
            test,
        }
    }

    /// 加载 MNIST：训练集按`validation_fraction`划出验证集，t10k 作为测试集
    pub fn mnist(
        config: &DataConfig,
        validation_fraction: f64,
        seed: Option<u64>,
    ) -> Result<Self, DataError> {
        let full_train = MnistDataset::load(config, true)?.into_tensor_dataset();
        let test = MnistDataset::load(config, false)?.into_tensor_dataset();
        let (train, validation) = random_split(&full_train, validation_fraction, seed)?;
        log::info!(
            "数据划分：训练 {}，验证 {}，测试 {}",
            train.len(),
            validation.len(),
            test.len()
        );
        Ok(Self::from_parts(train, validation, test))
    }
}
