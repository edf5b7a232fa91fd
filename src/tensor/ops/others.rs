use crate::tensor::Tensor;
use approx::{AbsDiffEq, RelativeEq};

impl Tensor {
    /// 对张量中的所有元素求和，返回纯数
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// 所有元素的平均值；空张量返回0
    pub fn mean(&self) -> f32 {
        if self.size() == 0 {
            0.0
        } else {
            self.sum() / self.size() as f32
        }
    }

    /// 逐元素开平方
    pub fn sqrt(&self) -> Self {
        self.map(f32::sqrt)
    }

    /// 逐元素应用`f`，返回新的张量
    pub fn map(&self, f: impl Fn(f32) -> f32) -> Self {
        Self {
            data: self.data.mapv(f),
        }
    }

    /// 对形状为[N, C]的张量逐行求最大值所在的下标。
    /// 若存在多个相同的最大值，取下标最小者。
    pub fn argmax_rows(&self) -> Vec<usize> {
        assert_eq!(
            self.dimension(),
            2,
            "argmax_rows 仅支持二阶张量，实际形状为{:?}",
            self.shape()
        );
        let cols = self.shape()[1];
        if cols == 0 {
            return vec![0; self.shape()[0]];
        }
        self.data_as_slice()
            .chunks(cols)
            .map(|row| {
                let mut best = 0;
                for (j, &v) in row.iter().enumerate().skip(1) {
                    if v > row[best] {
                        best = j;
                    }
                }
                best
            })
            .collect()
    }
}

impl AbsDiffEq for Tensor {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.is_same_shape(other)
            && self
                .data_as_slice()
                .iter()
                .zip(other.data_as_slice())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl RelativeEq for Tensor {
    fn default_max_relative() -> f32 {
        f32::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f32, max_relative: f32) -> bool {
        self.is_same_shape(other)
            && self
                .data_as_slice()
                .iter()
                .zip(other.data_as_slice())
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}
