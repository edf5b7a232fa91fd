/*
 * @Description  : 全局最大池化：把每张特征图整体压缩为一个最大值
 *                 [batch, C, H, W] -> [batch, C]（同时完成展平）
 */

use super::{dims4, missing_cache};
use crate::errors::ModelError;
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
struct GlobalPoolCache {
    max_indices: Vec<usize>,
    input_shape: [usize; 4],
}

#[derive(Debug, Clone, Default)]
pub struct GlobalMaxPool2d {
    cache: Option<GlobalPoolCache>,
}

impl GlobalMaxPool2d {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        self.pool(x).map(|(output, _)| output)
    }

    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let (output, cache) = self.pool(x)?;
        self.cache = Some(cache);
        Ok(output)
    }

    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let cache = self
            .cache
            .take()
            .ok_or_else(|| missing_cache("GlobalMaxPool2d"))?;
        let [n, c, h, w] = cache.input_shape;
        if grad_output.shape() != [n, c] {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, c],
                got: grad_output.shape().to_vec(),
                message: "GlobalMaxPool2d 上游梯度形状与前向输出不符".to_string(),
            });
        }
        let plane = h * w;
        let mut grad_input = vec![0.0f32; n * c * plane];
        for (i, (&g, &pos)) in grad_output
            .data_as_slice()
            .iter()
            .zip(&cache.max_indices)
            .enumerate()
        {
            grad_input[i * plane + pos] = g;
        }
        Ok(Tensor::from_vec(grad_input, &cache.input_shape))
    }

    fn pool(&self, x: &Tensor) -> Result<(Tensor, GlobalPoolCache), ModelError> {
        let [n, c, h, w] = dims4(x, "GlobalMaxPool2d 输入")?;
        let plane = h * w;
        if plane == 0 {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, c, 1, 1],
                got: x.shape().to_vec(),
                message: "全局池化的输入特征图为空".to_string(),
            });
        }

        let mut output = Vec::with_capacity(n * c);
        let mut max_indices = Vec::with_capacity(n * c);
        for map in x.data_as_slice().chunks_exact(plane) {
            let (pos, max_val) = map.iter().copied().enumerate().fold(
                (0, f32::NEG_INFINITY),
                |(best_pos, best), (pos, val)| {
                    if val > best { (pos, val) } else { (best_pos, best) }
                },
            );
            output.push(max_val);
            max_indices.push(pos);
        }

        Ok((
            Tensor::from_vec(output, &[n, c]),
            GlobalPoolCache {
                max_indices,
                input_shape: [n, c, h, w],
            },
        ))
    }
}
