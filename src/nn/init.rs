/*
 * @Description  : 参数初始化策略
 */

use crate::tensor::Tensor;
use rand::rngs::StdRng;

/// 参数初始化策略
#[derive(Debug, Clone, PartialEq)]
pub enum Init {
    /// 常数初始化
    Constant(f32),
    /// 全零
    Zeros,
    /// 全一
    Ones,
    /// Xavier/Glorot 均匀分布，按`gain`缩放：U(±gain·√(6/(fan_in+fan_out)))
    XavierUniform { gain: f32 },
    /// 按输入扇出的均匀分布：U(±1/√fan_in)，全连接层的常规默认
    FanInUniform,
}

impl Init {
    /// `ReLU`的增益，配合`XavierUniform`使用
    pub fn relu_gain() -> f32 {
        2.0_f32.sqrt()
    }

    /// 生成初始化后的 Tensor（使用指定的 RNG，以便固定种子时可复现）
    pub fn generate_with_rng(&self, shape: &[usize], rng: &mut StdRng) -> Tensor {
        match self {
            Self::Constant(v) => Tensor::full(shape, *v),
            Self::Zeros => Tensor::zeros(shape),
            Self::Ones => Tensor::ones(shape),
            Self::XavierUniform { gain } => {
                let (fan_in, fan_out) = fans(shape);
                let bound = gain * (6.0 / (fan_in + fan_out).max(1) as f32).sqrt();
                Tensor::uniform_with_rng(-bound, bound, shape, rng)
            }
            Self::FanInUniform => {
                let (fan_in, _) = fans(shape);
                let bound = 1.0 / (fan_in.max(1) as f32).sqrt();
                Tensor::uniform_with_rng(-bound, bound, shape, rng)
            }
        }
    }
}

/// 计算(fan_in, fan_out)。
/// 形状约定：全连接层权重为[out, in]，卷积核为[C_out, C_in, kH, kW]。
fn fans(shape: &[usize]) -> (usize, usize) {
    match shape.len() {
        0 => (1, 1),
        1 => (shape[0], shape[0]),
        _ => {
            let receptive_field: usize = shape[2..].iter().product();
            (shape[1] * receptive_field, shape[0] * receptive_field)
        }
    }
}
