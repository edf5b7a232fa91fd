/*
 * @Description  : BatchNorm2d (2D 批归一化) 层
 *
 * 对 [batch, C, H, W] 的每个通道，在 (batch, H, W) 上做归一化：
 *   y = gamma * (x - mean) / sqrt(var + eps) + beta
 *
 * - 训练：使用当前 batch 的统计量（有偏方差），并以`momentum`更新滑动统计量（无偏方差）
 * - 推理：使用滑动统计量
 */

use super::{dims4, missing_cache};
use crate::errors::ModelError;
use crate::nn::{Buffer, Module, Parameter};
use crate::tensor::Tensor;

pub const BN_EPS: f32 = 1e-5;
pub const BN_MOMENTUM: f32 = 0.1;

#[derive(Debug, Clone)]
struct BnCache {
    /// 归一化后的输入 x_hat
    normalized: Vec<f32>,
    /// 每个通道的 1/sqrt(var + eps)
    inv_std: Vec<f32>,
    input_shape: [usize; 4],
}

#[derive(Debug, Clone)]
pub struct BatchNorm2d {
    /// gamma [C]
    weight: Parameter,
    /// beta [C]
    bias: Parameter,
    running_mean: Buffer,
    running_var: Buffer,
    num_features: usize,
    eps: f32,
    momentum: f32,
    cache: Option<BnCache>,
}

impl BatchNorm2d {
    /// gamma 为一、beta 为零，滑动均值为零、滑动方差为一
    pub fn new(num_features: usize, name: &str) -> Self {
        Self {
            weight: Parameter::new(format!("{name}.weight"), Tensor::ones(&[num_features])),
            bias: Parameter::new(format!("{name}.bias"), Tensor::zeros(&[num_features])),
            running_mean: Buffer::new(
                format!("{name}.running_mean"),
                Tensor::zeros(&[num_features]),
            ),
            running_var: Buffer::new(format!("{name}.running_var"), Tensor::ones(&[num_features])),
            num_features,
            eps: BN_EPS,
            momentum: BN_MOMENTUM,
            cache: None,
        }
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn running_mean(&self) -> &Tensor {
        self.running_mean.value()
    }

    pub fn running_var(&self) -> &Tensor {
        self.running_var.value()
    }

    /// 推理：用滑动统计量归一化
    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        let [n, c, h, w] = self.check_input(x)?;
        let plane = h * w;
        let gamma = self.weight.value().data_as_slice();
        let beta = self.bias.value().data_as_slice();
        let mean = self.running_mean.value().data_as_slice();
        let var = self.running_var.value().data_as_slice();

        let mut output = x.data_as_slice().to_vec();
        for (i, map) in output.chunks_exact_mut(plane.max(1)).enumerate().take(n * c) {
            let ch = i % c;
            let scale = gamma[ch] / (var[ch] + self.eps).sqrt();
            let shift = beta[ch] - mean[ch] * scale;
            for v in map.iter_mut() {
                *v = *v * scale + shift;
            }
        }
        Ok(Tensor::from_vec(output, &[n, c, h, w]))
    }

    /// 训练：用 batch 统计量归一化，更新滑动统计量并缓存 x_hat
    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let [n, c, h, w] = self.check_input(x)?;
        let plane = h * w;
        let count = n * plane;
        if count == 0 {
            return Err(ModelError::ShapeMismatch {
                expected: vec![1, c, 1, 1],
                got: x.shape().to_vec(),
                message: "BatchNorm2d 训练时每个通道至少需要一个元素".to_string(),
            });
        }
        let input = x.data_as_slice();

        let mut mean = vec![0.0f32; c];
        let mut var = vec![0.0f32; c];
        for b in 0..n {
            for ch in 0..c {
                let start = (b * c + ch) * plane;
                mean[ch] += input[start..start + plane].iter().sum::<f32>();
            }
        }
        mean.iter_mut().for_each(|m| *m /= count as f32);
        for b in 0..n {
            for ch in 0..c {
                let start = (b * c + ch) * plane;
                var[ch] += input[start..start + plane]
                    .iter()
                    .map(|v| (v - mean[ch]).powi(2))
                    .sum::<f32>();
            }
        }
        var.iter_mut().for_each(|v| *v /= count as f32);

        let inv_std: Vec<f32> = var.iter().map(|v| 1.0 / (v + self.eps).sqrt()).collect();
        let gamma = self.weight.value().data_as_slice();
        let beta = self.bias.value().data_as_slice();
        let mut normalized = vec![0.0f32; input.len()];
        let mut output = vec![0.0f32; input.len()];
        for b in 0..n {
            for ch in 0..c {
                let start = (b * c + ch) * plane;
                for i in start..start + plane {
                    let x_hat = (input[i] - mean[ch]) * inv_std[ch];
                    normalized[i] = x_hat;
                    output[i] = gamma[ch] * x_hat + beta[ch];
                }
            }
        }

        // 滑动方差使用无偏估计
        let correction = if count > 1 {
            count as f32 / (count - 1) as f32
        } else {
            1.0
        };
        let momentum = self.momentum;
        for (r, m) in self
            .running_mean
            .value_mut()
            .data_as_slice_mut()
            .iter_mut()
            .zip(&mean)
        {
            *r = (1.0 - momentum) * *r + momentum * m;
        }
        for (r, v) in self
            .running_var
            .value_mut()
            .data_as_slice_mut()
            .iter_mut()
            .zip(&var)
        {
            *r = (1.0 - momentum) * *r + momentum * v * correction;
        }

        self.cache = Some(BnCache {
            normalized,
            inv_std,
            input_shape: [n, c, h, w],
        });
        Ok(Tensor::from_vec(output, &[n, c, h, w]))
    }

    /// dx = gamma * inv_std / m * (m * dy - Σdy - x_hat * Σ(dy * x_hat))
    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let cache = self.cache.take().ok_or_else(|| missing_cache("BatchNorm2d"))?;
        let [n, c, h, w] = cache.input_shape;
        if grad_output.shape() != cache.input_shape {
            return Err(ModelError::ShapeMismatch {
                expected: cache.input_shape.to_vec(),
                got: grad_output.shape().to_vec(),
                message: "BatchNorm2d 上游梯度形状与前向输入不符".to_string(),
            });
        }
        let plane = h * w;
        let count = (n * plane) as f32;
        let dy = grad_output.data_as_slice();
        let x_hat = &cache.normalized;

        let mut sum_dy = vec![0.0f32; c];
        let mut sum_dy_xhat = vec![0.0f32; c];
        for b in 0..n {
            for ch in 0..c {
                let start = (b * c + ch) * plane;
                for i in start..start + plane {
                    sum_dy[ch] += dy[i];
                    sum_dy_xhat[ch] += dy[i] * x_hat[i];
                }
            }
        }

        let gamma = self.weight.value().data_as_slice();
        let mut grad_input = vec![0.0f32; dy.len()];
        for b in 0..n {
            for ch in 0..c {
                let start = (b * c + ch) * plane;
                let k = gamma[ch] * cache.inv_std[ch] / count;
                for i in start..start + plane {
                    grad_input[i] =
                        k * (count * dy[i] - sum_dy[ch] - x_hat[i] * sum_dy_xhat[ch]);
                }
            }
        }

        self.weight
            .accumulate_grad(&Tensor::from_vec(sum_dy_xhat, &[c]));
        self.bias.accumulate_grad(&Tensor::from_vec(sum_dy, &[c]));
        Ok(Tensor::from_vec(grad_input, &cache.input_shape))
    }

    fn check_input(&self, x: &Tensor) -> Result<[usize; 4], ModelError> {
        let [n, c, h, w] = dims4(x, "BatchNorm2d 输入")?;
        if c != self.num_features {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.num_features, h, w],
                got: x.shape().to_vec(),
                message: format!("BatchNorm2d 期望 {} 个通道", self.num_features),
            });
        }
        Ok([n, c, h, w])
    }
}

impl Module for BatchNorm2d {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }

    fn buffers(&self) -> Vec<&Buffer> {
        vec![&self.running_mean, &self.running_var]
    }

    fn buffers_mut(&mut self) -> Vec<&mut Buffer> {
        vec![&mut self.running_mean, &mut self.running_var]
    }
}
