/*
 * @Description  : 训练器：每个 epoch 打乱训练集分批训练（交叉熵 + Adam），
 *                 在验证集上评估并按提前停止策略决定是否继续。
 *                 返回的是最后一个 epoch 的网络，而不是验证准确率最高时的网络。
 */

use std::path::Path;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::evaluator::{DEFAULT_EVAL_BATCH_SIZE, evaluate_with_batch_size};
use super::state::{TrainerStatus, TrainingState};
use crate::data::{DataConfig, DataError, DataLoader, DigitSplits, TensorDataset};
use crate::errors::{ConfigError, ModelError};
use crate::nn::{
    Adam, ArchitectureDescriptor, CrossEntropyLoss, Device, Module, Network, NetworkConfig,
    Optimizer,
};

/// 训练超参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub batch_size: usize,
    pub epoch_limit: usize,
    pub learning_rate: f32,
    /// 验证准确率低于最佳值时，最多再容忍的 epoch 数
    pub patience: usize,
    /// 从 MNIST 训练集划出的验证集比例
    pub validation_fraction: f64,
    pub eval_batch_size: usize,
    /// 同时用于数据划分、网络初始化与每个 epoch 的打乱
    pub seed: Option<u64>,
    pub device: Device,
    pub data: DataConfig,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            batch_size: 32,
            epoch_limit: 1000,
            learning_rate: 0.001,
            patience: 5,
            validation_fraction: 0.2,
            eval_batch_size: DEFAULT_EVAL_BATCH_SIZE,
            seed: None,
            device: Device::Cpu,
            data: DataConfig::default(),
        }
    }
}

impl TrainerConfig {
    /// 从 JSON 文件读取配置，缺省字段取默认值
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::Invalid(format!("无法读取配置文件 {}：{e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            ConfigError::Invalid(format!("配置文件 {} 解析失败：{e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_epoch_limit(mut self, epoch_limit: usize) -> Self {
        self.epoch_limit = epoch_limit;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_data(mut self, data: DataConfig) -> Self {
        self.data = data;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        for (name, value) in [
            ("batch_size", self.batch_size),
            ("epoch_limit", self.epoch_limit),
            ("patience", self.patience),
            ("eval_batch_size", self.eval_batch_size),
        ] {
            if value == 0 {
                return Err(ConfigError::must_be_positive(name).into());
            }
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "learning_rate须为正数，实际为{}",
                self.learning_rate
            ))
            .into());
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "validation_fraction须在(0, 1)之间，实际为{}",
                self.validation_fraction
            ))
            .into());
        }
        Ok(())
    }

    /// 与本配置一致的网络构建配置
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            seed: self.seed,
            device: self.device,
            ..NetworkConfig::default()
        }
    }
}

/// 单个 epoch 的摘要
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub epoch: usize,
    pub loss: f32,
    pub validation_accuracy: f32,
}

/// 训练结果
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// 最后一个 epoch 结束时的网络
    pub network: Network,
    pub state: TrainingState,
    pub history: Vec<EpochSummary>,
    /// 停止后在训练集上的准确率（仅供参考）
    pub train_accuracy: f32,
    /// 停止后在测试集上的准确率（仅供参考）
    pub test_accuracy: f32,
}

/// 训练器
///
/// # 使用示例
/// ```ignore
/// let mut trainer = Trainer::new(TrainerConfig::default().with_seed(42))?;
/// let report = trainer.fit(network, &splits)?;
/// report.network.save_checkpoint("gacnn.gcnn")?;
/// ```
#[derive(Debug)]
pub struct Trainer {
    config: TrainerConfig,
    criterion: CrossEntropyLoss,
    optimizer: Adam,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let optimizer = Adam::new_default(config.learning_rate);
        Ok(Self {
            config,
            criterion: CrossEntropyLoss::new(),
            optimizer,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// 在已加载的数据上训练`network`直到停止，返回最后一个 epoch 的网络及统计
    pub fn fit(
        &mut self,
        mut network: Network,
        splits: &DigitSplits,
    ) -> Result<TrainingReport, ModelError> {
        if splits.train.is_empty() {
            return Err(DataError::FormatError("训练集为空".to_string()).into());
        }
        if splits.validation.is_empty() {
            log::warn!("验证集为空，验证准确率将恒为 0");
        }
        log::debug!(
            "设备 {:?}，批大小 {}，学习率 {}",
            self.config.device,
            self.config.batch_size,
            self.config.learning_rate
        );

        self.optimizer.reset();
        network.zero_grad();

        let mut state = TrainingState::new();
        let mut history = Vec::new();
        while state.is_running() {
            let epoch = state.current_epoch;
            let epoch_start = Instant::now();

            let loss = self.train_epoch(&mut network, &splits.train, epoch)?;
            let accuracy =
                evaluate_with_batch_size(&network, &splits.validation, self.config.eval_batch_size)?;
            state.record_epoch(
                loss,
                accuracy,
                self.config.patience,
                self.config.epoch_limit,
            );
            history.push(EpochSummary {
                epoch,
                loss,
                validation_accuracy: accuracy,
            });

            log::info!(
                "Epoch {:3}: loss = {:.4}, 验证准确率 = {:.2}%, 最佳 = {:.2}% (epoch {}), {:.1}s",
                epoch + 1,
                loss,
                accuracy,
                state.best_accuracy,
                state.best_epoch + 1,
                epoch_start.elapsed().as_secs_f32()
            );
        }

        match state.status {
            TrainerStatus::StoppedEpochLimit => {
                log::info!("已达到 epoch 上限 {}，停止训练", self.config.epoch_limit)
            }
            _ => log::info!(
                "连续 {} 个 epoch 验证准确率未超过 {:.2}%，停止训练",
                state.current_epoch - state.best_epoch,
                state.best_accuracy
            ),
        }

        let eval_batch = self.config.eval_batch_size;
        let train_accuracy = evaluate_with_batch_size(&network, &splits.train, eval_batch)?;
        let test_accuracy = evaluate_with_batch_size(&network, &splits.test, eval_batch)?;
        log::info!("训练集准确率 = {train_accuracy:.2}%，测试集准确率 = {test_accuracy:.2}%");

        Ok(TrainingReport {
            network,
            state,
            history,
            train_accuracy,
            test_accuracy,
        })
    }

    /// 训练一个 epoch，返回按样本数加权的平均损失
    fn train_epoch(
        &mut self,
        network: &mut Network,
        train: &TensorDataset,
        epoch: usize,
    ) -> Result<f32, ModelError> {
        let mut loader = DataLoader::new(train, self.config.batch_size).shuffle(true);
        if let Some(seed) = self.config.seed {
            loader = loader.seed(seed.wrapping_add(epoch as u64 + 1));
        }

        let num_batches = loader.num_batches();
        let mut total_loss = 0.0f64;
        for (batch_idx, (images, labels)) in loader.iter().enumerate() {
            network.zero_grad();
            let logits = network.forward_train(&images)?;
            let (loss, grad) = self.criterion.forward_backward(&logits, &labels)?;
            network.backward(&grad)?;
            self.optimizer.step(network)?;

            total_loss += f64::from(loss) * labels.len() as f64;
            if (batch_idx + 1) % 100 == 0 {
                log::debug!(
                    "epoch {} batch {}/{}: loss = {loss:.4}",
                    epoch + 1,
                    batch_idx + 1,
                    num_batches
                );
            }
        }
        Ok((total_loss / train.len() as f64) as f32)
    }
}

/// 加载 MNIST，用`descriptor`（缺省为 GACNN 基因型）构建网络并训练
pub fn train(
    descriptor: Option<&ArchitectureDescriptor>,
    config: &TrainerConfig,
) -> Result<TrainingReport, ModelError> {
    let mut trainer = Trainer::new(config.clone())?;
    let default_descriptor;
    let descriptor = match descriptor {
        Some(descriptor) => descriptor,
        None => {
            default_descriptor = ArchitectureDescriptor::gacnn();
            &default_descriptor
        }
    };
    let network = Network::build(descriptor, &config.network_config())?;
    log::info!(
        "网络共 {} 个块，{} 个可训练参数",
        descriptor.len(),
        network.num_elements()
    );

    let splits = DigitSplits::mnist(&config.data, config.validation_fraction, config.seed)?;
    trainer.fit(network, &splits)
}
