/*
 * @Description  : DataLoader - PyTorch 风格的数据批量加载器
 *
 * 提供统一的数据迭代 API，支持：
 * - 自动分批 (batch_size)
 * - 随机打乱 (shuffle)，固定种子时顺序可复现
 * - 丢弃不完整批次 (drop_last)
 */

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::error::DataError;
use crate::tensor::Tensor;

/// TensorDataset - 持有图像和类别标签的数据集
///
/// # 示例
/// ```ignore
/// let dataset = TensorDataset::new(images, labels)?;
/// println!("样本数: {}", dataset.len());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TensorDataset {
    /// 特征张量，第一维为样本数，如 [N, 1, 28, 28]
    features: Tensor,
    /// 类别下标
    labels: Vec<usize>,
}

impl TensorDataset {
    /// 创建新的 TensorDataset
    ///
    /// # 参数
    /// - `features`: 特征张量，第一维为样本数
    /// - `labels`: 类别下标，长度必须与样本数一致
    pub fn new(features: Tensor, labels: Vec<usize>) -> Result<Self, DataError> {
        let len = features.shape().first().copied().unwrap_or(0);
        if features.dimension() == 0 || len != labels.len() {
            return Err(DataError::ShapeMismatch {
                expected: vec![labels.len()],
                got: features.shape().to_vec(),
            });
        }
        Ok(Self { features, labels })
    }

    /// 调用方已保证第一维与标签数一致
    pub(crate) fn from_parts_unchecked(features: Tensor, labels: Vec<usize>) -> Self {
        debug_assert_eq!(features.shape().first(), Some(&labels.len()));
        Self { features, labels }
    }

    /// 获取样本数量
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// 检查数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 获取特征张量引用
    pub fn features(&self) -> &Tensor {
        &self.features
    }

    /// 获取标签引用
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// 单个样本的特征形状（不含 batch 维度）
    pub fn sample_shape(&self) -> &[usize] {
        &self.features.shape()[1..]
    }

    /// 获取第 index 个样本：(特征 [1, ...], 标签)
    pub fn get(&self, index: usize) -> Result<(Tensor, usize), DataError> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok((self.features.narrow_rows(index, index + 1), self.labels[index]))
    }

    /// 按下标取出若干样本组成新的数据集（下标须在范围内）
    pub fn subset(&self, indices: &[usize]) -> Result<Self, DataError> {
        if let Some(&index) = indices.iter().find(|&&i| i >= self.len()) {
            return Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok(Self {
            features: self.features.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        })
    }
}

/// DataLoader - PyTorch 风格的数据批量加载器
///
/// 借用数据集，每个 epoch 新建一个即可，不会复制样本。
///
/// # 示例
/// ```ignore
/// let loader = DataLoader::new(&dataset, 32)
///     .shuffle(true)
///     .seed(42);
///
/// for (images, labels) in loader.iter() {
///     let logits = network.forward_train(&images)?;
///     ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a TensorDataset,
    batch_size: usize,
    shuffle: bool,
    drop_last: bool,
    seed: Option<u64>,
}

impl<'a> DataLoader<'a> {
    /// 创建新的 DataLoader
    ///
    /// # 参数
    /// - `dataset`: 数据集
    /// - `batch_size`: 批大小
    pub fn new(dataset: &'a TensorDataset, batch_size: usize) -> Self {
        assert!(batch_size > 0, "DataLoader: batch_size 必须大于 0");
        Self {
            dataset,
            batch_size,
            shuffle: false,
            drop_last: false,
            seed: None,
        }
    }

    /// 设置是否打乱数据
    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// 设置是否丢弃最后一个不完整的批次
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// 设置随机种子（用于 shuffle）
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// 获取批次数量
    pub fn num_batches(&self) -> usize {
        let n = self.dataset.len();
        if self.drop_last {
            n / self.batch_size
        } else {
            n.div_ceil(self.batch_size)
        }
    }

    /// 获取数据集大小
    pub fn len(&self) -> usize {
        self.dataset.len()
    }

    /// 检查是否为空
    pub fn is_empty(&self) -> bool {
        self.dataset.is_empty()
    }

    /// 创建迭代器
    pub fn iter(&self) -> DataLoaderIterator<'_, 'a> {
        // 生成索引
        let n = self.dataset.len();
        let mut indices: Vec<usize> = (0..n).collect();

        // 如果需要打乱
        if self.shuffle {
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }

        DataLoaderIterator {
            loader: self,
            indices,
            current_batch: 0,
        }
    }
}

/// DataLoader 迭代器，每次产出 (特征批次, 标签批次)
pub struct DataLoaderIterator<'l, 'a> {
    loader: &'l DataLoader<'a>,
    indices: Vec<usize>,
    current_batch: usize,
}

impl Iterator for DataLoaderIterator<'_, '_> {
    type Item = (Tensor, Vec<usize>);

    fn next(&mut self) -> Option<Self::Item> {
        let n = self.indices.len();
        let batch_size = self.loader.batch_size;
        let start = self.current_batch * batch_size;

        // 检查是否还有数据
        if start >= n {
            return None;
        }

        let end = (start + batch_size).min(n);

        // 如果 drop_last 且批次不完整，则跳过
        if self.loader.drop_last && end - start < batch_size {
            return None;
        }

        self.current_batch += 1;

        // 提取批次数据
        let batch_indices = &self.indices[start..end];
        let dataset = self.loader.dataset;
        let features = dataset.features.select_rows(batch_indices);
        let labels = batch_indices.iter().map(|&i| dataset.labels[i]).collect();
        Some((features, labels))
    }
}
