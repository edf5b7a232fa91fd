//! 数据变换函数
//!
//! 提供 MNIST 训练与推理共用的像素预处理，保证两者的输入分布一致。

use crate::tensor::Tensor;

/// MNIST 训练集像素（缩放到 [0, 1] 后）的均值
pub const MNIST_MEAN: f32 = 0.1307;
/// MNIST 训练集像素（缩放到 [0, 1] 后）的标准差
pub const MNIST_STD: f32 = 0.3081;

/// 将 0-255 像素值归一化到 0-1
///
/// # 参数
/// - `tensor`: 输入 Tensor，值范围 [0, 255]
///
/// # 返回
/// 归一化后的 Tensor，值范围 [0, 1]
pub fn normalize_pixels(tensor: &Tensor) -> Tensor {
    tensor / 255.0
}

/// 按均值、标准差标准化：(x - mean) / std
pub fn normalize(tensor: &Tensor, mean: f32, std: f32) -> Tensor {
    tensor.map(|x| (x - mean) / std)
}

/// 把 0-255 的原始像素直接变换为网络输入：先缩放到 [0, 1]，再按 MNIST 统计量标准化
///
/// # 示例
/// ```ignore
/// let raw = Tensor::new(&[0.0, 255.0], &[2]);
/// let x = mnist_normalize(&raw);
/// // 结果: [-0.4242, 2.8215]
/// ```
pub fn mnist_normalize(raw_pixels: &Tensor) -> Tensor {
    normalize(&normalize_pixels(raw_pixels), MNIST_MEAN, MNIST_STD)
}
