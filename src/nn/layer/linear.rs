/*
 * @Description  : Linear (全连接) 层
 *
 * - 输入：[batch_size, in_features]
 * - 输出：[batch_size, out_features]
 * - 权重布局为 [out_features, in_features]，计算 y = x · Wᵀ + b
 */

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;

use super::{dims2, missing_cache};
use crate::errors::ModelError;
use crate::nn::{Init, Module, Parameter};
use crate::tensor::Tensor;

#[derive(Debug, Clone)]
pub struct Linear {
    weight: Parameter,
    bias: Parameter,
    in_features: usize,
    out_features: usize,
    /// 训练前向时缓存的输入
    input: Option<Tensor>,
}

impl Linear {
    /// 权重取 U(±1/√in_features)，偏置为零
    pub fn new(in_features: usize, out_features: usize, name: &str, rng: &mut StdRng) -> Self {
        let weight = Init::FanInUniform.generate_with_rng(&[out_features, in_features], rng);
        Self {
            weight: Parameter::new(format!("{name}.weight"), weight),
            bias: Parameter::new(format!("{name}.bias"), Tensor::zeros(&[out_features])),
            in_features,
            out_features,
            input: None,
        }
    }

    pub fn in_features(&self) -> usize {
        self.in_features
    }

    pub fn out_features(&self) -> usize {
        self.out_features
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        let [n, _] = self.check_input(x)?;
        let x = matrix(x, n, self.in_features)?;
        let w = matrix(self.weight.value(), self.out_features, self.in_features)?;
        let b = ArrayView1::from(self.bias.value().data_as_slice());
        let y: Array2<f32> = x.dot(&w.t()) + &b;
        Ok(Tensor::from_array(y.into_dyn()))
    }

    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let output = self.forward(x)?;
        self.input = Some(x.clone());
        Ok(output)
    }

    /// dW = gᵀ · x，db = Σ_batch g，dx = g · W
    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let input = self.input.take().ok_or_else(|| missing_cache("Linear"))?;
        let n = input.shape()[0];
        if grad_output.shape() != [n, self.out_features] {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.out_features],
                got: grad_output.shape().to_vec(),
                message: "Linear 上游梯度形状与前向输出不符".to_string(),
            });
        }
        let x = matrix(&input, n, self.in_features)?;
        let g = matrix(grad_output, n, self.out_features)?;
        let w = matrix(self.weight.value(), self.out_features, self.in_features)?;

        let grad_input = g.dot(&w);
        let grad_weight = g.t().dot(&x);
        let grad_bias = g.sum_axis(Axis(0));

        self.weight
            .accumulate_grad(&Tensor::from_array(grad_weight.into_dyn()));
        self.bias
            .accumulate_grad(&Tensor::from_array(grad_bias.into_dyn()));
        Ok(Tensor::from_array(grad_input.into_dyn()))
    }

    fn check_input(&self, x: &Tensor) -> Result<[usize; 2], ModelError> {
        let [n, f] = dims2(x, "Linear 输入")?;
        if f != self.in_features {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.in_features],
                got: x.shape().to_vec(),
                message: format!("Linear 期望 {} 个输入特征", self.in_features),
            });
        }
        Ok([n, f])
    }
}

/// 以二维视图的形式借用张量数据
fn matrix(t: &Tensor, rows: usize, cols: usize) -> Result<ArrayView2<'_, f32>, ModelError> {
    ArrayView2::from_shape((rows, cols), t.data_as_slice()).map_err(|e| {
        ModelError::ShapeMismatch {
            expected: vec![rows, cols],
            got: t.shape().to_vec(),
            message: e.to_string(),
        }
    })
}

impl Module for Linear {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}
