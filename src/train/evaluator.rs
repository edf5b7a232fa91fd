/*
 * @Description  : 在带标签的数据上计算分类准确率（只做推理，不改动网络）
 */

use crate::data::{DataLoader, TensorDataset};
use crate::errors::{ConfigError, ModelError};
use crate::nn::Network;

/// 评估时默认的批大小
pub const DEFAULT_EVAL_BATCH_SIZE: usize = 1000;

/// 以默认批大小评估，返回百分比准确率 [0, 100]
pub fn evaluate(network: &Network, split: &TensorDataset) -> Result<f32, ModelError> {
    evaluate_with_batch_size(network, split, DEFAULT_EVAL_BATCH_SIZE)
}

/// 按固定顺序分批推理，取每个样本得分最高的类别（并列取下标最小者）作为预测。
/// 空数据集的准确率为 0。
pub fn evaluate_with_batch_size(
    network: &Network,
    split: &TensorDataset,
    batch_size: usize,
) -> Result<f32, ModelError> {
    if batch_size == 0 {
        return Err(ConfigError::must_be_positive("eval_batch_size").into());
    }
    if split.is_empty() {
        return Ok(0.0);
    }

    let mut correct = 0usize;
    for (images, labels) in DataLoader::new(split, batch_size).iter() {
        let predictions = network.predict(&images)?;
        correct += predictions
            .iter()
            .zip(&labels)
            .filter(|(pred, label)| pred == label)
            .count();
    }
    Ok(correct as f32 * 100.0 / split.len() as f32)
}
