/*
 * @Description  : 全局错误类型。按照失败的性质划分为：配置错误、数据不可用、
 *                 权重文件格式错误、输入形状不匹配以及图像无法识别。
 *                 核心内部不做任何重试，所有恢复策略交由调用方决定。
 */

use thiserror::Error;

use crate::data::DataError;

mod ops;
pub use self::ops::ComparisonOperator;

/// 本库所有对外操作的统一错误类型
#[derive(Error, Debug)]
pub enum ModelError {
    /// 网络结构或超参数非法，构建时即报告，不应重试
    #[error("配置错误：{0}")]
    Configuration(#[from] ConfigError),

    /// 数据集缺失、损坏、无法下载或下载超时，对本次训练是致命的
    #[error("数据不可用：{0}")]
    DataUnavailable(#[from] DataError),

    /// 权重文件与目标网络的名称/形状不符，或文件本身已损坏
    #[error("格式错误：{0}")]
    Format(String),

    /// 输入张量与网络不兼容
    #[error("形状不匹配：期望{expected:?}，实际{got:?}（{message}）")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },

    /// 无法将图像转换为可识别的数字
    #[error("无法识别该图像：{0}")]
    InvalidImage(String),

    /// 调用顺序有误，如未经训练前向就反向传播
    #[error("计算错误：{0}")]
    Computation(String),
}

/// 配置（结构描述、超参数）相关的错误
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    // 数字比较用
    #[error("{value_name}须{operator}{threshold}")]
    ValueMustSatisfyComparison {
        value_name: String,
        operator: ComparisonOperator,
        threshold: usize,
    },

    #[error("网络结构描述不能为空")]
    EmptyDescriptor,

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    /// 构造“`value_name`须>0”的错误
    pub(crate) fn must_be_positive(value_name: impl Into<String>) -> Self {
        Self::ValueMustSatisfyComparison {
            value_name: value_name.into(),
            operator: ComparisonOperator::GreaterThan,
            threshold: 0,
        }
    }
}
