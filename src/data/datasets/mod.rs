//! 内置数据集
//!
//! 目前只有 MNIST 手写数字分类。

mod mnist;

pub use mnist::{
    DataConfig, IDX_IMAGES_MAGIC, IDX_LABELS_MAGIC, MNIST_CLASSES, MNIST_SIDE, MnistDataset,
    default_data_dir, parse_idx_images, parse_idx_labels,
};
