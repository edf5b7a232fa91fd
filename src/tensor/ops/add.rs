/*
 * @Description  : 张量的加法，实现两个形状严格一致的张量“逐元素”相加（或张量与纯数相加），并返回一个新的张量。
 *                 网络内部不需要广播，故形状不一致时直接panic。
 */

use crate::tensor::Tensor;
use std::ops::{Add, AddAssign};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的张量 + f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add<f32> for Tensor {
    type Output = Self;

    fn add(self, scalar: f32) -> Self {
        Self {
            data: self.data + scalar,
        }
    }
}
impl Add<f32> for &Tensor {
    type Output = Tensor;

    fn add(self, scalar: f32) -> Tensor {
        Tensor {
            data: &self.data + scalar,
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的张量 + f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓带引用的张量 + 带引用的张量↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl<'a> Add<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn add(self, other: &'a Tensor) -> Tensor {
        assert!(
            self.is_same_shape(other),
            "形状不一致，故无法相加：第一个张量的形状为{:?}，第二个张量的形状为{:?}",
            self.shape(),
            other.shape()
        );
        Tensor {
            data: &self.data + &other.data,
        }
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑带引用的张量 + 带引用的张量↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓自相加↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl AddAssign<f32> for Tensor {
    fn add_assign(&mut self, scalar: f32) {
        self.data.mapv_inplace(|x| x + scalar);
    }
}
impl AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, other: &Tensor) {
        assert!(
            self.is_same_shape(other),
            "形状不一致，故无法自相加：第一个张量的形状为{:?}，第二个张量的形状为{:?}",
            self.shape(),
            other.shape()
        );
        self.data.zip_mut_with(&other.data, |a, &b| *a = *a + b);
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑自相加↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
