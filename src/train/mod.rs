//! 训练与评估
//!
//! - [`Trainer`]: 按 epoch 训练，每轮在验证集上评估并执行提前停止
//! - [`evaluate`]: 计算百分比准确率
//! - [`TrainingState`]: 提前停止状态机

mod evaluator;
mod state;
mod trainer;

#[cfg(test)]
mod tests;

pub use evaluator::{DEFAULT_EVAL_BATCH_SIZE, evaluate, evaluate_with_batch_size};
pub use state::{TrainerStatus, TrainingState};
pub use trainer::{EpochSummary, Trainer, TrainerConfig, TrainingReport, train};
