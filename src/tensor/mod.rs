/*
 * @Description  : 张量。底层为`ndarray`的动态维数组，仅提供网络前/反向传播、优化器
 *                 以及数据管线实际需要的运算。
 */

use ndarray::{ArrayD, IxDyn};
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

mod ops {
    pub mod add;
    pub mod div;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod index;
mod property;
mod shape;

#[cfg(test)]
mod tests;

/// 定义张量的结构体。其可以是标量、向量、矩阵或更高维度的数组。
/// 注：内部数据始终保持标准（行优先、连续）布局，故可随时以切片形式访问。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    data: ArrayD<f32>,
}

impl Tensor {
    /// 创建一个张量，`data`的长度必须和`shape`中所有元素的乘积相等，否则panic。
    /// 若为标量，`shape`可以是[]或[1]；
    /// 若为矩阵，`shape`可以是[n,m]；
    /// 若为图像批次，`shape`为[batch, C, H, W]。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        Self::from_vec(data.to_vec(), shape)
    }

    /// 同`new`，但直接接管`data`的所有权，避免一次拷贝
    pub fn from_vec(data: Vec<f32>, shape: &[usize]) -> Self {
        let expected = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        assert_eq!(
            Some(data.len()),
            expected,
            "数据长度{}与形状{:?}不符",
            data.len(),
            shape
        );
        let data = ArrayD::from_shape_vec(IxDyn(shape), data)
            .unwrap_or_else(|e| panic!("无法以形状{shape:?}构建张量：{e}"));
        Self { data }
    }

    /// 由`ndarray`数组构建张量（内部使用）。非标准布局的数组会被整理为标准布局。
    pub(crate) fn from_array(data: ArrayD<f32>) -> Self {
        if data.is_standard_layout() {
            Self { data }
        } else {
            Self {
                data: data.as_standard_layout().into_owned(),
            }
        }
    }

    /// 创建一个全为零的张量
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            data: ArrayD::zeros(IxDyn(shape)),
        }
    }

    /// 创建一个全为一的张量
    pub fn ones(shape: &[usize]) -> Self {
        Self::full(shape, 1.0)
    }

    /// 创建一个所有元素均为`value`的张量
    pub fn full(shape: &[usize], value: f32) -> Self {
        Self {
            data: ArrayD::from_elem(IxDyn(shape), value),
        }
    }

    /// 创建一个随机张量，其值服从[low, high]的均匀分布。
    /// 随机数由调用方提供的`rng`产生，以便在固定种子下完全复现。
    pub fn uniform_with_rng(low: f32, high: f32, shape: &[usize], rng: &mut StdRng) -> Self {
        let len = shape.iter().product::<usize>();
        let data = if low < high {
            let dist = Uniform::new_inclusive(low, high);
            (0..len).map(|_| dist.sample(rng)).collect()
        } else {
            vec![low; len]
        };
        Self::from_vec(data, shape)
    }
}
