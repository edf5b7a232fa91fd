/*
 * @Description  : Adam优化器实现
 */

use std::collections::HashMap;

use super::Optimizer;
use crate::errors::ModelError;
use crate::nn::Module;
use crate::tensor::Tensor;

/// Adam优化器，矩估计按参数全名保存
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// 一阶矩估计
    m: HashMap<String, Tensor>,
    /// 二阶矩估计
    v: HashMap<String, Tensor>,
    /// 时间步
    t: usize,
}

impl Adam {
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: HashMap::new(),
            v: HashMap::new(),
            t: 0,
        }
    }

    /// 使用默认参数创建Adam优化器（β1=0.9，β2=0.999，ε=1e-8）
    pub fn new_default(learning_rate: f32) -> Self {
        Self::new(learning_rate, 0.9, 0.999, 1e-8)
    }

    /// 已执行的更新步数
    pub fn steps(&self) -> usize {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, module: &mut dyn Module) -> Result<(), ModelError> {
        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for param in module.parameters_mut() {
            let gradient = param.grad();

            // 预计算缩放后的梯度项
            let scaled_gradient = gradient * (1.0 - self.beta1);
            let gradient_squared = gradient * gradient;
            let scaled_gradient_squared = &gradient_squared * (1.0 - self.beta2);

            // 原地更新一阶矩估计: m = β1 * m + (1 - β1) * g
            let m = self
                .m
                .entry(param.name().to_string())
                .or_insert_with(|| Tensor::zeros(gradient.shape()));
            if !m.is_same_shape(gradient) {
                return Err(ModelError::Computation(format!(
                    "参数 {} 的形状与优化器状态不符，请先调用 reset()",
                    param.name()
                )));
            }
            *m *= self.beta1;
            *m += &scaled_gradient;

            // 原地更新二阶矩估计: v = β2 * v + (1 - β2) * g²
            let v = self
                .v
                .entry(param.name().to_string())
                .or_insert_with(|| Tensor::zeros(gradient.shape()));
            *v *= self.beta2;
            *v += &scaled_gradient_squared;

            // 偏差修正
            let m_hat = &*m / bias_correction1;
            let v_hat = &*v / bias_correction2;

            // 参数更新: θ = θ - α * m_hat / (√v_hat + ε)
            let denominator = &v_hat.sqrt() + self.epsilon;
            let update = &m_hat / &denominator;
            *param.value_mut() -= &(&update * self.learning_rate);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}
