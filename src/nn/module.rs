/*
 * @Description  : Module trait 定义
 */

use super::{Buffer, Parameter};

/// 模块 trait
///
/// # 设计原则
/// - `forward()`/`backward()` **不是** trait 方法（各层的输入输出与缓存各异）
/// - `new()` **不是** trait 方法（参数各异）
/// - 参数与缓冲区的枚举签名一致，放入 trait，供优化器与权重持久化使用
pub trait Module {
    /// 获取所有可训练参数
    fn parameters(&self) -> Vec<&Parameter>;

    /// 获取所有可训练参数（可变），供优化器更新
    fn parameters_mut(&mut self) -> Vec<&mut Parameter>;

    /// 获取所有缓冲区（不参与梯度计算的状态），默认没有
    fn buffers(&self) -> Vec<&Buffer> {
        Vec::new()
    }

    /// 获取所有缓冲区（可变）
    fn buffers_mut(&mut self) -> Vec<&mut Buffer> {
        Vec::new()
    }

    /// 获取参数张量数量
    fn num_params(&self) -> usize {
        self.parameters().len()
    }

    /// 获取标量参数总数
    fn num_elements(&self) -> usize {
        self.parameters().iter().map(|p| p.value().size()).sum()
    }

    /// 清零所有参数的梯度
    fn zero_grad(&mut self) {
        for param in self.parameters_mut() {
            param.zero_grad();
        }
    }
}
