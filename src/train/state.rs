/*
 * @Description  : 训练状态机
 *
 * RUNNING ──(验证准确率持续低于最佳且已连续若干轮无提升)──> STOPPED_NO_IMPROVEMENT
 *    └──────(epoch 达到上限)─────────────────────────────> STOPPED_EPOCH_LIMIT
 */

use serde::{Deserialize, Serialize};

/// 训练器所处的状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrainerStatus {
    #[default]
    Running,
    StoppedNoImprovement,
    StoppedEpochLimit,
}

/// 每个 epoch 结束时更新一次的训练状态
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// 迄今最高的验证准确率（百分比）
    pub best_accuracy: f32,
    /// 取得最高准确率的 epoch（从 0 计）
    pub best_epoch: usize,
    /// 已完成的 epoch 数
    pub current_epoch: usize,
    /// 最近一个 epoch 的验证准确率（百分比）
    pub current_accuracy: f32,
    /// 最近一个 epoch 的平均训练损失
    pub current_loss: f32,
    pub status: TrainerStatus,
}

impl TrainingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == TrainerStatus::Running
    }

    /// 记录刚完成的 epoch 并推进状态机，返回新的状态。
    /// 已停止时不再变化。
    ///
    /// 继续条件：
    /// `(current_accuracy >= best_accuracy || current_epoch - best_epoch < patience)
    ///  && current_epoch < epoch_limit`
    /// 准确率与最佳值持平时不算提升，但会让训练继续。
    pub fn record_epoch(
        &mut self,
        loss: f32,
        accuracy: f32,
        patience: usize,
        epoch_limit: usize,
    ) -> TrainerStatus {
        if !self.is_running() {
            return self.status;
        }

        self.current_loss = loss;
        self.current_accuracy = accuracy;
        if accuracy > self.best_accuracy {
            self.best_accuracy = accuracy;
            self.best_epoch = self.current_epoch;
        }
        self.current_epoch += 1;

        let keep_going = (self.current_accuracy >= self.best_accuracy
            || self.current_epoch - self.best_epoch < patience)
            && self.current_epoch < epoch_limit;

        self.status = if keep_going {
            TrainerStatus::Running
        } else if self.current_epoch >= epoch_limit {
            TrainerStatus::StoppedEpochLimit
        } else {
            TrainerStatus::StoppedNoImprovement
        };
        self.status
    }
}
