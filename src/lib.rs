//! # GACNN
//!
//! `gacnn`用纯rust实现一个由遗传算法搜索得到的固定卷积网络结构（GACNN基因型），
//! 并提供在[MNIST](http://yann.lecun.com/exdb/mnist/)上训练、评估、保存权重
//! 以及识别单张手写数字照片所需的全部功能。
//!
//! ```ignore
//! use gacnn::nn::{ArchitectureDescriptor, Network, NetworkConfig};
//! use gacnn::train::{TrainerConfig, train};
//!
//! let report = train(None, &TrainerConfig::default().with_seed(42))?;
//! report.network.save_checkpoint("gacnn.gcnn")?;
//!
//! let network = Network::from_checkpoint(
//!     &ArchitectureDescriptor::gacnn(),
//!     &NetworkConfig::default(),
//!     "gacnn.gcnn",
//! )?;
//! let image = gacnn::vision::load_image("digit.png")?;
//! let digit = gacnn::vision::predict_digit(&network, &image)?;
//! ```

pub mod data;
pub mod errors;
pub mod nn;
pub mod tensor;
pub mod train;
pub mod vision;
