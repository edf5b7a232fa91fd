/*
 * @Description  : 权重状态（state dict）：按网络顺序排列的“名称 -> 张量”映射
 *                 包含全部可训练参数与批归一化的滑动统计量，是权重文件在内存中的形式
 */

use ndarray::{ArrayD, IxDyn};
use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;

/// 单个命名张量，按`(name, shape, data)`保存以便原样写入权重文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

impl StateEntry {
    pub fn from_tensor(name: impl Into<String>, tensor: &Tensor) -> Self {
        Self {
            name: name.into(),
            shape: tensor.shape().to_vec(),
            data: tensor.data_as_slice().to_vec(),
        }
    }

    /// 数据长度与形状是否自洽（形状各维之积溢出时视为不自洽）
    pub fn is_consistent(&self) -> bool {
        self.shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            == Some(self.data.len())
    }

    /// 转为张量；数据长度与形状不符时返回`None`
    pub fn to_tensor(&self) -> Option<Tensor> {
        if !self.is_consistent() {
            return None;
        }
        ArrayD::from_shape_vec(IxDyn(&self.shape), self.data.clone())
            .ok()
            .map(Tensor::from_array)
    }
}

/// 有序的命名张量集合
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict {
    entries: Vec<StateEntry>,
}

impl StateDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<StateEntry>) -> Self {
        Self { entries }
    }

    /// 追加一个命名张量（保持插入顺序）
    pub fn insert(&mut self, name: impl Into<String>, tensor: &Tensor) {
        self.entries.push(StateEntry::from_tensor(name, tensor));
    }

    pub fn get(&self, name: &str) -> Option<&StateEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// 取出名为`name`的条目的可变引用
    pub fn get_mut(&mut self, name: &str) -> Option<&mut StateEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    /// 移除名为`name`的条目并返回之
    pub fn remove(&mut self, name: &str) -> Option<StateEntry> {
        let pos = self.entries.iter().position(|e| e.name == name)?;
        Some(self.entries.remove(pos))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[StateEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
