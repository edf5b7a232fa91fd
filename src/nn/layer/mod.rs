/*
 * @Description  : Layer 模块 - 网络中用到的各层
 *
 * 每一层都提供三个入口：
 * - `forward(&self)`：推理，不修改任何状态
 * - `forward_train(&mut self)`：训练前向，缓存反向传播所需的中间量
 * - `backward(&mut self)`：消费缓存，累加参数梯度并返回对输入的梯度
 */

mod batch_norm2d;
mod conv2d;
mod global_max_pool2d;
mod linear;
mod max_pool2d;
mod relu;

pub use batch_norm2d::BatchNorm2d;
pub use conv2d::Conv2d;
pub use global_max_pool2d::GlobalMaxPool2d;
pub use linear::Linear;
pub use max_pool2d::MaxPool2d;
pub use relu::ReLU;

use crate::errors::ModelError;
use crate::tensor::Tensor;

/// 取出 4 阶张量`[batch, C, H, W]`的各维大小
pub(crate) fn dims4(x: &Tensor, what: &str) -> Result<[usize; 4], ModelError> {
    match *x.shape() {
        [n, c, h, w] => Ok([n, c, h, w]),
        _ => Err(ModelError::ShapeMismatch {
            expected: Vec::new(),
            got: x.shape().to_vec(),
            message: format!("{what}须为4阶张量[batch, C, H, W]"),
        }),
    }
}

/// 取出 2 阶张量`[batch, features]`的各维大小
pub(crate) fn dims2(x: &Tensor, what: &str) -> Result<[usize; 2], ModelError> {
    match *x.shape() {
        [n, f] => Ok([n, f]),
        _ => Err(ModelError::ShapeMismatch {
            expected: Vec::new(),
            got: x.shape().to_vec(),
            message: format!("{what}须为2阶张量[batch, features]"),
        }),
    }
}

fn missing_cache(layer: &str) -> ModelError {
    ModelError::Computation(format!("{layer} 反向传播缺少前向缓存，须先调用 forward_train"))
}
