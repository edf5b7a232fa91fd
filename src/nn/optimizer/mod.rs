/*
 * @Description  : 优化器模块，按累积的梯度更新网络参数
 */

mod adam;

pub use adam::Adam;

use crate::errors::ModelError;
use crate::nn::Module;

/// 优化器核心 trait
pub trait Optimizer {
    /// 参数更新（使用已计算的梯度）
    ///
    /// 训练循环：
    /// ```ignore
    /// network.zero_grad();
    /// let logits = network.forward_train(&images)?;
    /// let (loss, grad) = criterion.forward_backward(&logits, &labels)?;
    /// network.backward(&grad)?;
    /// optimizer.step(&mut network)?; // ← 只更新参数，不做 forward/backward
    /// ```
    fn step(&mut self, module: &mut dyn Module) -> Result<(), ModelError>;

    /// 重置累积状态
    fn reset(&mut self);

    /// 获取学习率
    fn learning_rate(&self) -> f32;

    /// 设置学习率
    fn set_learning_rate(&mut self, lr: f32);
}
