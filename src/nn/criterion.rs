/*
 * @Description  : 损失函数
 *
 * CrossEntropyLoss 内置 Softmax，输入为[batch, num_classes]的原始得分与类别下标，
 * 输出整批的平均损失；对得分的梯度为 (softmax(x) - onehot(y)) / batch
 */

use super::layer::dims2;
use crate::errors::ModelError;
use crate::tensor::Tensor;

/// 交叉熵损失函数（batch 平均）
///
/// # 使用示例
/// ```ignore
/// let criterion = CrossEntropyLoss::new();
/// let logits = network.forward_train(&images)?;
/// let (loss, grad) = criterion.forward_backward(&logits, &labels)?;
/// network.backward(&grad)?;
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossEntropyLoss;

impl CrossEntropyLoss {
    pub fn new() -> Self {
        Self
    }

    /// 只计算损失值
    pub fn loss(&self, logits: &Tensor, labels: &[usize]) -> Result<f32, ModelError> {
        self.compute(logits, labels, false).map(|(loss, _)| loss)
    }

    /// 同时计算损失值和对`logits`的梯度
    pub fn forward_backward(
        &self,
        logits: &Tensor,
        labels: &[usize],
    ) -> Result<(f32, Tensor), ModelError> {
        self.compute(logits, labels, true)
    }

    fn compute(
        &self,
        logits: &Tensor,
        labels: &[usize],
        with_grad: bool,
    ) -> Result<(f32, Tensor), ModelError> {
        let [n, classes] = dims2(logits, "交叉熵的输入")?;
        if labels.len() != n {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n],
                got: vec![labels.len()],
                message: "标签数量与 batch 大小不符".to_string(),
            });
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= classes) {
            return Err(ModelError::Computation(format!(
                "标签 {bad} 超出类别数 {classes}"
            )));
        }
        if n == 0 {
            return Ok((0.0, Tensor::zeros(&[0, classes])));
        }

        let mut total = 0.0f32;
        let mut grad = if with_grad {
            vec![0.0f32; n * classes]
        } else {
            Vec::new()
        };
        for (i, (row, &label)) in logits
            .data_as_slice()
            .chunks_exact(classes)
            .zip(labels)
            .enumerate()
        {
            // 减去最大值保证数值稳定
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exp: Vec<f32> = row.iter().map(|&x| (x - max).exp()).collect();
            let sum: f32 = exp.iter().sum();
            total += sum.ln() + max - row[label];

            if with_grad {
                let g = &mut grad[i * classes..(i + 1) * classes];
                for (j, e) in exp.iter().enumerate() {
                    g[j] = e / sum / n as f32;
                }
                g[label] -= 1.0 / n as f32;
            }
        }

        let grad = if with_grad {
            Tensor::from_vec(grad, &[n, classes])
        } else {
            Tensor::zeros(&[0])
        };
        Ok((total / n as f32, grad))
    }
}
