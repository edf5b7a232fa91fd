//! 数据加载模块
//!
//! 提供数据集加载、变换、划分和批处理功能。
//!
//! # 主要组件
//!
//! - [`DataLoader`]: `PyTorch` 风格的数据批量加载器
//! - [`TensorDataset`]: 持有图像和类别标签的数据集
//! - [`MnistDataset`]: MNIST 手写数字数据集
//! - [`DigitSplits`]: 训练 / 验证 / 测试三路划分
//! - [`transforms`]: 数据变换函数（像素缩放、归一化）
//! - [`DataError`]: 数据加载错误类型
//!
//! # 使用示例
//!
//! ```ignore
//! use gacnn::data::{DataConfig, DataLoader, DigitSplits};
//!
//! let splits = DigitSplits::mnist(&DataConfig::default(), 0.2, Some(42))?;
//! let loader = DataLoader::new(&splits.train, 32)
//!     .shuffle(true)
//!     .seed(42);
//!
//! for (images, labels) in loader.iter() {
//!     let logits = network.forward_train(&images)?;
//!     ...
//! }
//! ```

mod dataloader;
pub mod datasets;
pub mod download;
pub mod error;
mod split;
pub mod transforms;

#[cfg(test)]
mod tests;

// Re-exports
pub use dataloader::{DataLoader, DataLoaderIterator, TensorDataset};
pub use datasets::{DataConfig, MnistDataset, default_data_dir};
pub use error::DataError;
pub use split::{DigitSplits, random_split};
