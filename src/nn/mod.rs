/*
 * @Description  : 负责神经网络（neural network）的构建、前/反向传播与权重持久化
 */

pub mod checkpoint;
mod criterion;
mod descriptor;
mod init;
pub mod layer;
mod module;
mod network;
pub mod optimizer;
mod parameter;
mod state_dict;

pub use criterion::CrossEntropyLoss;
pub use descriptor::{ArchitectureDescriptor, BlockSpec};
pub use init::Init;
pub use module::Module;
pub use network::{Block, ConvBlock, Device, Network, NetworkConfig};
pub use optimizer::{Adam, Optimizer};
pub use parameter::{Buffer, Parameter};
pub use state_dict::{StateDict, StateEntry};

#[cfg(test)]
mod tests;
