/*
 * @Description  : 由网络结构描述符构建的卷积网络
 *
 * 结构：blocks（池化块 / 卷积+批归一化+ReLU 块）-> 全局最大池化 -> 全连接分类器
 *
 * - 推理`forward(&self)`只借用网络，不会修改任何权重或滑动统计量
 * - 训练`forward_train(&mut self)` + `backward()`累加梯度，由优化器统一更新
 */

use std::collections::HashMap;
use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::checkpoint;
use super::layer::{BatchNorm2d, Conv2d, GlobalMaxPool2d, Linear, MaxPool2d, ReLU, dims4};
use super::{ArchitectureDescriptor, Buffer, Module, Parameter, StateDict};
use crate::errors::{ConfigError, ModelError};
use crate::tensor::Tensor;

/// 卷积块固定的填充量（与核大小无关，1×1 卷积因此会让每条边增长 2）
pub const CONV_PADDING: usize = 1;
/// 池化块的窗口与步长
pub const POOL_SIZE: usize = 2;

/// 计算设备。目前仅支持 CPU
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Device {
    #[default]
    Cpu,
}

/// 构建网络所需的配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub num_classes: usize,
    pub input_channels: usize,
    /// 固定种子时构建结果完全可复现；`None`则取系统熵
    pub seed: Option<u64>,
    pub device: Device,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_classes: 10,
            input_channels: 1,
            seed: None,
            device: Device::Cpu,
        }
    }
}

impl NetworkConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_num_classes(mut self, num_classes: usize) -> Self {
        self.num_classes = num_classes;
        self
    }

    pub fn with_input_channels(mut self, input_channels: usize) -> Self {
        self.input_channels = input_channels;
        self
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.num_classes == 0 {
            return Err(ConfigError::must_be_positive("num_classes").into());
        }
        if self.input_channels == 0 {
            return Err(ConfigError::must_be_positive("input_channels").into());
        }
        Ok(())
    }
}

/// 卷积 -> 批归一化 -> ReLU
#[derive(Debug, Clone)]
pub struct ConvBlock {
    pub conv: Conv2d,
    pub bn: BatchNorm2d,
    pub relu: ReLU,
}

impl ConvBlock {
    fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        let h = self.conv.forward(x)?;
        let h = self.bn.forward(&h)?;
        Ok(self.relu.forward(&h))
    }

    fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let h = self.conv.forward_train(x)?;
        let h = self.bn.forward_train(&h)?;
        Ok(self.relu.forward_train(&h))
    }

    fn backward(&mut self, grad: &Tensor) -> Result<Tensor, ModelError> {
        let g = self.relu.backward(grad)?;
        let g = self.bn.backward(&g)?;
        self.conv.backward(&g)
    }
}

/// 网络中的一个块
#[derive(Debug, Clone)]
pub enum Block {
    Pool(MaxPool2d),
    Conv(ConvBlock),
}

impl Block {
    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        match self {
            Self::Pool(pool) => pool.forward(x),
            Self::Conv(block) => block.forward(x),
        }
    }

    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        match self {
            Self::Pool(pool) => pool.forward_train(x),
            Self::Conv(block) => block.forward_train(x),
        }
    }

    pub fn backward(&mut self, grad: &Tensor) -> Result<Tensor, ModelError> {
        match self {
            Self::Pool(pool) => pool.backward(grad),
            Self::Conv(block) => block.backward(grad),
        }
    }

    pub fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }
}

impl Module for Block {
    fn parameters(&self) -> Vec<&Parameter> {
        match self {
            Self::Pool(_) => Vec::new(),
            Self::Conv(block) => {
                let mut params = block.conv.parameters();
                params.extend(block.bn.parameters());
                params
            }
        }
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        match self {
            Self::Pool(_) => Vec::new(),
            Self::Conv(block) => {
                let mut params = block.conv.parameters_mut();
                params.extend(block.bn.parameters_mut());
                params
            }
        }
    }

    fn buffers(&self) -> Vec<&Buffer> {
        match self {
            Self::Pool(_) => Vec::new(),
            Self::Conv(block) => block.bn.buffers(),
        }
    }

    fn buffers_mut(&mut self) -> Vec<&mut Buffer> {
        match self {
            Self::Pool(_) => Vec::new(),
            Self::Conv(block) => block.bn.buffers_mut(),
        }
    }
}

/// 卷积分类网络
#[derive(Debug, Clone)]
pub struct Network {
    descriptor: ArchitectureDescriptor,
    config: NetworkConfig,
    blocks: Vec<Block>,
    global_pool: GlobalMaxPool2d,
    classifier: Linear,
}

impl Network {
    /// 按描述符构建网络
    ///
    /// - 池化块：2×2、步长 2 的最大池化，通道数不变
    /// - 其余块：卷积（步长 1，填充固定为 1）+ 批归一化 + ReLU，通道数变为该块的`channels`
    /// - 最后接全连接分类器`last_channels -> num_classes`
    pub fn build(
        descriptor: &ArchitectureDescriptor,
        config: &NetworkConfig,
    ) -> Result<Self, ModelError> {
        descriptor.validate()?;
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut channels = config.input_channels;
        let mut blocks = Vec::with_capacity(descriptor.len());
        for (i, gene) in descriptor.blocks().iter().enumerate() {
            if gene.is_pool {
                blocks.push(Block::Pool(MaxPool2d::new(POOL_SIZE, POOL_SIZE)));
            } else {
                let prefix = format!("blocks.{i}");
                let conv = Conv2d::new(
                    channels,
                    gene.channels,
                    gene.kernel_size,
                    1,
                    CONV_PADDING,
                    &format!("{prefix}.conv"),
                    &mut rng,
                );
                let bn = BatchNorm2d::new(gene.channels, &format!("{prefix}.bn"));
                blocks.push(Block::Conv(ConvBlock {
                    conv,
                    bn,
                    relu: ReLU::new(),
                }));
                channels = gene.channels;
            }
        }

        let classifier = Linear::new(channels, config.num_classes, "classifier", &mut rng);
        log::debug!(
            "已构建网络：{} 个块，分类器 {} -> {}，共 {} 个可训练标量",
            blocks.len(),
            channels,
            config.num_classes,
            blocks.iter().map(Module::num_elements).sum::<usize>() + classifier.num_elements()
        );

        Ok(Self {
            descriptor: descriptor.clone(),
            config: config.clone(),
            blocks,
            global_pool: GlobalMaxPool2d::new(),
            classifier,
        })
    }

    /// 构建网络并从权重文件加载全部权重
    pub fn from_checkpoint<P: AsRef<Path>>(
        descriptor: &ArchitectureDescriptor,
        config: &NetworkConfig,
        path: P,
    ) -> Result<Self, ModelError> {
        let mut network = Self::build(descriptor, config)?;
        let state = checkpoint::load_state_dict(path)?;
        network.load_state_dict(&state)?;
        Ok(network)
    }

    pub fn descriptor(&self) -> &ArchitectureDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn classifier(&self) -> &Linear {
        &self.classifier
    }

    pub fn num_classes(&self) -> usize {
        self.config.num_classes
    }

    pub fn input_channels(&self) -> usize {
        self.config.input_channels
    }

    /// 推理：输入[batch, C, H, W]，输出[batch, num_classes]的原始得分
    pub fn forward(&self, images: &Tensor) -> Result<Tensor, ModelError> {
        self.check_input(images)?;
        let mut h = images.clone();
        for block in &self.blocks {
            h = block.forward(&h)?;
        }
        let pooled = self.global_pool.forward(&h)?;
        self.classifier.forward(&pooled)
    }

    /// 训练前向：批归一化使用 batch 统计量并更新滑动统计量，各层缓存中间结果
    pub fn forward_train(&mut self, images: &Tensor) -> Result<Tensor, ModelError> {
        self.check_input(images)?;
        let mut h = images.clone();
        for block in &mut self.blocks {
            h = block.forward_train(&h)?;
        }
        let pooled = self.global_pool.forward_train(&h)?;
        self.classifier.forward_train(&pooled)
    }

    /// 反向传播：须紧跟在`forward_train`之后调用，梯度累加到各参数上
    pub fn backward(&mut self, grad_logits: &Tensor) -> Result<(), ModelError> {
        let g = self.classifier.backward(grad_logits)?;
        let mut g = self.global_pool.backward(&g)?;
        for block in self.blocks.iter_mut().rev() {
            g = block.backward(&g)?;
        }
        Ok(())
    }

    /// 每个样本得分最高的类别（并列时取下标最小者）
    pub fn predict(&self, images: &Tensor) -> Result<Vec<usize>, ModelError> {
        Ok(self.forward(images)?.argmax_rows())
    }

    /// 按网络顺序导出全部参数与缓冲区
    pub fn state_dict(&self) -> StateDict {
        let mut state = StateDict::new();
        for block in &self.blocks {
            if let Block::Conv(conv_block) = block {
                for param in conv_block.conv.parameters() {
                    state.insert(param.name(), param.value());
                }
                for param in conv_block.bn.parameters() {
                    state.insert(param.name(), param.value());
                }
                for buffer in conv_block.bn.buffers() {
                    state.insert(buffer.name(), buffer.value());
                }
            }
        }
        for param in self.classifier.parameters() {
            state.insert(param.name(), param.value());
        }
        state
    }

    /// 一次性替换全部权重
    ///
    /// 名称集合与每个张量的形状必须与本网络完全一致，否则返回格式错误，且网络保持不变
    pub fn load_state_dict(&mut self, state: &StateDict) -> Result<(), ModelError> {
        let expected = self.state_dict();
        if state.len() != expected.len() {
            return Err(ModelError::Format(format!(
                "权重数量不符：期望 {} 个，实际 {} 个",
                expected.len(),
                state.len()
            )));
        }

        let mut incoming: HashMap<&str, Tensor> = HashMap::with_capacity(state.len());
        for entry in state.iter() {
            let tensor = entry.to_tensor().ok_or_else(|| {
                ModelError::Format(format!("张量 {} 的数据长度与形状不符", entry.name))
            })?;
            if incoming.insert(entry.name.as_str(), tensor).is_some() {
                return Err(ModelError::Format(format!("张量名称重复: {}", entry.name)));
            }
        }
        for target in expected.iter() {
            let tensor = incoming
                .get(target.name.as_str())
                .ok_or_else(|| ModelError::Format(format!("缺少张量: {}", target.name)))?;
            if tensor.shape() != target.shape.as_slice() {
                return Err(ModelError::Format(format!(
                    "张量 {} 形状不符：期望 {:?}，实际 {:?}",
                    target.name,
                    target.shape,
                    tensor.shape()
                )));
            }
        }

        // 校验全部通过后再写入
        for param in self.parameters_mut() {
            if let Some(tensor) = incoming.remove(param.name()) {
                *param.value_mut() = tensor;
                param.zero_grad();
            }
        }
        for buffer in self.buffers_mut() {
            if let Some(tensor) = incoming.remove(buffer.name()) {
                *buffer.value_mut() = tensor;
            }
        }
        Ok(())
    }

    /// 保存全部权重到`path`
    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        checkpoint::save_state_dict(&self.state_dict(), path)
    }

    /// 从`path`加载全部权重（架构须一致）
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<(), ModelError> {
        let state = checkpoint::load_state_dict(path)?;
        self.load_state_dict(&state)
    }

    fn check_input(&self, images: &Tensor) -> Result<(), ModelError> {
        let [n, c, h, w] = dims4(images, "网络输入")?;
        if c != self.config.input_channels || h == 0 || w == 0 {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.config.input_channels, h.max(1), w.max(1)],
                got: images.shape().to_vec(),
                message: format!(
                    "网络输入须为[batch, {}, H, W]且空间尺寸非空",
                    self.config.input_channels
                ),
            });
        }
        Ok(())
    }
}

impl Module for Network {
    fn parameters(&self) -> Vec<&Parameter> {
        let mut params: Vec<&Parameter> =
            self.blocks.iter().flat_map(|b| b.parameters()).collect();
        params.extend(self.classifier.parameters());
        params
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        let mut params: Vec<&mut Parameter> = self
            .blocks
            .iter_mut()
            .flat_map(|b| b.parameters_mut())
            .collect();
        params.extend(self.classifier.parameters_mut());
        params
    }

    fn buffers(&self) -> Vec<&Buffer> {
        self.blocks.iter().flat_map(|b| b.buffers()).collect()
    }

    fn buffers_mut(&mut self) -> Vec<&mut Buffer> {
        self.blocks.iter_mut().flat_map(|b| b.buffers_mut()).collect()
    }
}
