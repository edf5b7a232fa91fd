use super::Tensor;
use ndarray::{Axis, IxDyn};

impl Tensor {
    /// 改变形状（元素总数须一致，否则panic）
    pub fn reshape(&self, shape: &[usize]) -> Self {
        let new_total: usize = shape.iter().product();
        assert_eq!(
            self.size(),
            new_total,
            "张量形状不兼容：无法将{:?}变形为{:?}",
            self.shape(),
            shape
        );
        Self::from_vec(self.data_as_slice().to_vec(), shape)
    }

    /// 原地改变形状（元素总数须一致，否则panic）
    pub fn reshape_mut(&mut self, shape: &[usize]) {
        let new_total: usize = shape.iter().product();
        assert_eq!(
            self.size(),
            new_total,
            "张量形状不兼容：无法将{:?}变形为{:?}",
            self.shape(),
            shape
        );
        let data = std::mem::take(&mut self.data);
        self.data = data
            .into_shape(IxDyn(shape))
            .unwrap_or_else(|e| panic!("变形失败：{e}"));
    }

    /// 沿首个维度按`indices`取出若干样本，组成新的张量。
    /// 如形状[N, C, H, W]的张量取出k个下标后形状为[k, C, H, W]。
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self::from_array(self.data.select(Axis(0), indices))
    }

    /// 沿首个维度取出[start, end)区间的样本
    pub fn narrow_rows(&self, start: usize, end: usize) -> Self {
        let indices: Vec<usize> = (start..end).collect();
        self.select_rows(&indices)
    }
}
