/*
 * @Description  : ReLU 激活：y = max(0, x)
 *                 反向时 x > 0 处梯度为 1，其余（含 0 点）为 0
 */

use super::missing_cache;
use crate::errors::ModelError;
use crate::tensor::Tensor;

#[derive(Debug, Clone, Default)]
pub struct ReLU {
    /// 训练前向时记录的正值掩码
    mask: Option<Vec<bool>>,
}

impl ReLU {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&self, x: &Tensor) -> Tensor {
        x.map(|v| v.max(0.0))
    }

    pub fn forward_train(&mut self, x: &Tensor) -> Tensor {
        self.mask = Some(x.data_as_slice().iter().map(|&v| v > 0.0).collect());
        self.forward(x)
    }

    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let mask = self.mask.take().ok_or_else(|| missing_cache("ReLU"))?;
        if mask.len() != grad_output.size() {
            return Err(ModelError::ShapeMismatch {
                expected: vec![mask.len()],
                got: grad_output.shape().to_vec(),
                message: "ReLU 上游梯度元素数与前向输入不符".to_string(),
            });
        }
        let mut grad = grad_output.clone();
        for (g, &keep) in grad.data_as_slice_mut().iter_mut().zip(&mask) {
            if !keep {
                *g = 0.0;
            }
        }
        Ok(grad)
    }
}
