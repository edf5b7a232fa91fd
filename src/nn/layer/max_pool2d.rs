/*
 * @Description  : MaxPool2d (2D 最大池化) 层
 *
 * - 输入格式：[batch_size, channels, H, W]
 * - 输出格式：[batch_size, channels, H', W']
 * - 无可学习参数
 *
 * 输出尺寸（不足一个窗口的边缘直接舍弃）：
 * H' = (H - kernel) / stride + 1
 * W' = (W - kernel) / stride + 1
 */

use rayon::prelude::*;

use super::{dims4, missing_cache};
use crate::errors::ModelError;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct PoolCache {
    /// 每个输出位置对应的最大值在输入特征图中的平面下标
    max_indices: Vec<usize>,
    input_shape: [usize; 4],
}

/// 最大池化层，窗口内并列最大值取先出现者
#[derive(Debug, Clone)]
pub struct MaxPool2d {
    kernel_size: usize,
    stride: usize,
    cache: Option<PoolCache>,
}

impl MaxPool2d {
    pub fn new(kernel_size: usize, stride: usize) -> Self {
        Self {
            kernel_size: kernel_size.max(1),
            stride: stride.max(1),
            cache: None,
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// 给定输入空间尺寸，计算输出空间尺寸；输入小于窗口时返回`None`
    pub fn output_size(&self, h: usize, w: usize) -> Option<(usize, usize)> {
        if h < self.kernel_size || w < self.kernel_size {
            return None;
        }
        Some((
            (h - self.kernel_size) / self.stride + 1,
            (w - self.kernel_size) / self.stride + 1,
        ))
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        self.pool(x).map(|(output, _)| output)
    }

    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let (output, cache) = self.pool(x)?;
        self.cache = Some(cache);
        Ok(output)
    }

    /// 梯度只回传到各窗口最大值所在的位置，其余位置为 0
    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let cache = self.cache.take().ok_or_else(|| missing_cache("MaxPool2d"))?;
        let [n, c, in_h, in_w] = cache.input_shape;
        if grad_output.size() != cache.max_indices.len() {
            return Err(ModelError::ShapeMismatch {
                expected: vec![cache.max_indices.len()],
                got: grad_output.shape().to_vec(),
                message: "MaxPool2d 上游梯度元素数与前向输出不符".to_string(),
            });
        }

        let grad = grad_output.data_as_slice();
        let out_plane = grad.len() / (n * c).max(1);
        let in_plane = in_h * in_w;

        let batch_results: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|b| {
                let mut sample_grad = vec![0.0f32; c * in_plane];
                for ch in 0..c {
                    let plane = b * c + ch;
                    for o in 0..out_plane {
                        let idx = plane * out_plane + o;
                        sample_grad[ch * in_plane + cache.max_indices[idx]] += grad[idx];
                    }
                }
                sample_grad
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Ok(Tensor::from_vec(all_data, &cache.input_shape))
    }

    fn pool(&self, x: &Tensor) -> Result<(Tensor, PoolCache), ModelError> {
        let [n, c, in_h, in_w] = dims4(x, "MaxPool2d 输入")?;
        let (out_h, out_w) = self.output_size(in_h, in_w).ok_or_else(|| {
            ModelError::ShapeMismatch {
                expected: vec![n, c, self.kernel_size, self.kernel_size],
                got: x.shape().to_vec(),
                message: format!(
                    "特征图 {in_h}x{in_w} 小于池化窗口 {k}x{k}，无法继续下采样",
                    k = self.kernel_size
                ),
            }
        })?;

        let k = self.kernel_size;
        let s = self.stride;
        let input = x.data_as_slice();
        let single_sample_size = c * out_h * out_w;

        // Rayon 并行处理每个 batch 样本
        let batch_results: Vec<(Vec<f32>, Vec<usize>)> = (0..n)
            .into_par_iter()
            .map(|b| {
                let mut sample_output = vec![0.0f32; single_sample_size];
                let mut sample_indices = vec![0usize; single_sample_size];
                for ch in 0..c {
                    let base = (b * c + ch) * in_h * in_w;
                    for oh in 0..out_h {
                        for ow in 0..out_w {
                            let mut max_val = f32::NEG_INFINITY;
                            let mut max_idx = (oh * s) * in_w + ow * s;
                            for kh in 0..k {
                                for kw in 0..k {
                                    let pos = (oh * s + kh) * in_w + ow * s + kw;
                                    let val = input[base + pos];
                                    if val > max_val {
                                        max_val = val;
                                        max_idx = pos;
                                    }
                                }
                            }
                            let idx = (ch * out_h + oh) * out_w + ow;
                            sample_output[idx] = max_val;
                            sample_indices[idx] = max_idx;
                        }
                    }
                }
                (sample_output, sample_indices)
            })
            .collect();

        let mut all_output = Vec::with_capacity(n * single_sample_size);
        let mut all_indices = Vec::with_capacity(n * single_sample_size);
        for (output, indices) in batch_results {
            all_output.extend(output);
            all_indices.extend(indices);
        }

        Ok((
            Tensor::from_vec(all_output, &[n, c, out_h, out_w]),
            PoolCache {
                max_indices: all_indices,
                input_shape: [n, c, in_h, in_w],
            },
        ))
    }
}

impl Default for MaxPool2d {
    /// 2×2 窗口、步长 2
    fn default() -> Self {
        Self::new(2, 2)
    }
}
