/*
 * @Description  : 网络结构描述符（genotype）
 *                 由若干块描述按顺序组成，完全决定网络的形状，可序列化为 JSON 与权重文件一同保存
 */

use serde::{Deserialize, Serialize};

use crate::errors::{ConfigError, ModelError};

/// 单个块的描述：`(channels, is_pool, kernel_size)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSpec {
    /// 输出通道数（池化块不使用，但仍须为正）
    pub channels: usize,
    /// 是否为 2×2 下采样（最大池化）块
    pub is_pool: bool,
    /// 卷积核边长（池化块不使用，但仍须为正）
    pub kernel_size: usize,
}

impl BlockSpec {
    pub const fn conv(channels: usize, kernel_size: usize) -> Self {
        Self {
            channels,
            is_pool: false,
            kernel_size,
        }
    }

    pub const fn pool(channels: usize, kernel_size: usize) -> Self {
        Self {
            channels,
            is_pool: true,
            kernel_size,
        }
    }
}

impl From<(usize, bool, usize)> for BlockSpec {
    fn from((channels, is_pool, kernel_size): (usize, bool, usize)) -> Self {
        Self {
            channels,
            is_pool,
            kernel_size,
        }
    }
}

/// 随附发布的 13 块结构（预先搜索得到，运行时不再搜索）
const GACNN_GENOTYPE: [BlockSpec; 13] = [
    BlockSpec::conv(16, 3),
    BlockSpec::conv(16, 3),
    BlockSpec::pool(16, 3),
    BlockSpec::conv(32, 3),
    BlockSpec::conv(32, 5),
    BlockSpec::pool(32, 3),
    BlockSpec::conv(64, 3),
    BlockSpec::conv(64, 1),
    BlockSpec::pool(64, 3),
    BlockSpec::conv(128, 3),
    BlockSpec::conv(128, 1),
    BlockSpec::conv(128, 3),
    BlockSpec::conv(256, 1),
];

/// 网络结构描述符，构建后不可变
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchitectureDescriptor {
    blocks: Vec<BlockSpec>,
}

impl ArchitectureDescriptor {
    /// 由块描述构建，空描述或任一通道数/核大小为 0 时返回配置错误
    pub fn new<B: Into<BlockSpec>>(blocks: impl IntoIterator<Item = B>) -> Result<Self, ModelError> {
        let descriptor = Self {
            blocks: blocks.into_iter().map(Into::into).collect(),
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// 随附发布的 13 块结构
    pub fn gacnn() -> Self {
        Self {
            blocks: GACNN_GENOTYPE.to_vec(),
        }
    }

    /// 校验描述是否合法（反序列化得到的描述须显式校验）
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.blocks.is_empty() {
            return Err(ConfigError::EmptyDescriptor.into());
        }
        for (i, block) in self.blocks.iter().enumerate() {
            if block.channels == 0 {
                return Err(ConfigError::must_be_positive(format!("blocks[{i}].channels")).into());
            }
            if block.kernel_size == 0 {
                return Err(
                    ConfigError::must_be_positive(format!("blocks[{i}].kernel_size")).into(),
                );
            }
        }
        Ok(())
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// 最后一个卷积块的输出通道数；若全为池化块则为`input_channels`
    pub fn output_channels(&self, input_channels: usize) -> usize {
        self.blocks
            .iter()
            .rev()
            .find(|b| !b.is_pool)
            .map_or(input_channels, |b| b.channels)
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// 从 JSON 字符串解析，并校验合法性
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let descriptor: Self = serde_json::from_str(json)
            .map_err(|e| ConfigError::Invalid(format!("解析网络结构描述失败: {e}")))?;
        descriptor.validate()?;
        Ok(descriptor)
    }
}

impl Default for ArchitectureDescriptor {
    fn default() -> Self {
        Self::gacnn()
    }
}
