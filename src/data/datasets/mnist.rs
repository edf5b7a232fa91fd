//! MNIST 手写数字数据集
//!
//! 支持：
//! - IDX 二进制格式解析（支持 .gz 压缩）
//! - 像素缩放到 [0, 1] 后按 MNIST 均值/标准差归一化
//! - 可选自动下载（带超时与 MD5 校验）

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};

use crate::data::dataloader::TensorDataset;
use crate::data::download::download_file;
use crate::data::error::DataError;
use crate::data::transforms::mnist_normalize;
use crate::tensor::Tensor;

/// MNIST 下载地址（使用 AWS S3 镜像，原官网 yann.lecun.com 不稳定）
const MNIST_BASE_URL: &str = "https://ossci-datasets.s3.amazonaws.com/mnist/";

/// MNIST 文件信息：(压缩文件名, MD5)
const MNIST_FILES: [(&str, &str); 4] = [
    (
        "train-images-idx3-ubyte.gz",
        "f68b3c2dcbeaaa9fbdd348bbdeb94873",
    ),
    (
        "train-labels-idx1-ubyte.gz",
        "d53e105ee54ea40749a09fcbcd1e9432",
    ),
    (
        "t10k-images-idx3-ubyte.gz",
        "9fb629c4189551a2d022fa330f9573f3",
    ),
    (
        "t10k-labels-idx1-ubyte.gz",
        "ec29112dd5afa0611ce80d1b7f02629c",
    ),
];

/// IDX 图像文件的魔数
pub const IDX_IMAGES_MAGIC: u32 = 2051;
/// IDX 标签文件的魔数
pub const IDX_LABELS_MAGIC: u32 = 2049;
/// MNIST 图像边长
pub const MNIST_SIDE: usize = 28;
/// MNIST 类别数
pub const MNIST_CLASSES: usize = 10;

/// 数据集加载配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// IDX 文件所在目录
    pub root: PathBuf,
    /// 文件缺失时是否自动下载
    pub download: bool,
    /// 单个文件的下载超时，超时即失败
    #[serde(with = "duration_secs")]
    pub download_timeout: Duration,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            root: default_data_dir().join("mnist"),
            download: true,
            download_timeout: Duration::from_secs(120),
        }
    }
}

impl DataConfig {
    /// 使用指定目录，其余取默认值
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// 设置是否自动下载
    pub fn with_download(mut self, download: bool) -> Self {
        self.download = download;
        self
    }

    /// 设置下载超时
    pub fn with_download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}

/// 配置文件中以秒数表示超时
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

/// MNIST 手写数字数据集
///
/// 包含 60,000 个训练样本和 10,000 个测试样本。
/// 每个样本是 28x28 的灰度图像，标签为 0-9。
#[derive(Debug, Clone)]
pub struct MnistDataset {
    /// 归一化后的图像 [N, 1, 28, 28]
    images: Tensor,
    /// 类别下标
    labels: Vec<usize>,
}

impl MnistDataset {
    /// 完整加载 API
    ///
    /// # 参数
    /// - `config`: 数据目录、是否下载与下载超时
    /// - `train`: true=训练集(60000), false=测试集(10000)
    ///
    /// # 返回
    /// 加载后的 MnistDataset，图像形状为 [N, 1, 28, 28]
    pub fn load(config: &DataConfig, train: bool) -> Result<Self, DataError> {
        // 确定文件名
        let (images_file, labels_file) = if train {
            ("train-images-idx3-ubyte", "train-labels-idx1-ubyte")
        } else {
            ("t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte")
        };

        // 检查文件是否存在，必要时下载
        let images_path = ensure_file(config, images_file)?;
        let labels_path = ensure_file(config, labels_file)?;

        let pixels = parse_idx_images(&images_path)?;
        let labels = parse_idx_labels(&labels_path)?;

        let dataset = Self::from_raw(&pixels, labels)?;
        log::info!(
            "已加载 MNIST {}集：{} 个样本",
            if train { "训练" } else { "测试" },
            dataset.len()
        );
        Ok(dataset)
    }

    /// 由原始像素（按样本顺序排列的 0-255 灰度）和标签构建数据集
    pub fn from_raw(pixels: &[u8], labels: Vec<usize>) -> Result<Self, DataError> {
        let plane = MNIST_SIDE * MNIST_SIDE;
        if pixels.len() != labels.len() * plane {
            return Err(DataError::ShapeMismatch {
                expected: vec![labels.len(), 1, MNIST_SIDE, MNIST_SIDE],
                got: vec![pixels.len() / plane, 1, MNIST_SIDE, MNIST_SIDE],
            });
        }
        if let Some(&label) = labels.iter().find(|&&l| l >= MNIST_CLASSES) {
            return Err(DataError::FormatError(format!(
                "无效的标签: {label} (期望 0-9)"
            )));
        }

        let raw: Vec<f32> = pixels.iter().map(|&p| f32::from(p)).collect();
        let raw = Tensor::from_vec(raw, &[labels.len(), 1, MNIST_SIDE, MNIST_SIDE]);
        Ok(Self {
            images: mnist_normalize(&raw),
            labels,
        })
    }

    /// 便捷 API：加载训练集（默认路径，自动下载）
    pub fn train() -> Result<Self, DataError> {
        Self::load(&DataConfig::default(), true)
    }

    /// 便捷 API：加载测试集（默认路径，自动下载）
    pub fn test() -> Result<Self, DataError> {
        Self::load(&DataConfig::default(), false)
    }

    /// 返回数据集中的样本数量
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// 数据集是否为空
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// 获取第 index 个样本
    ///
    /// # 返回
    /// (image [1, 1, 28, 28], label) 元组
    pub fn get(&self, index: usize) -> Result<(Tensor, usize), DataError> {
        if index >= self.len() {
            return Err(DataError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok((self.images.narrow_rows(index, index + 1), self.labels[index]))
    }

    /// 输入的形状（不含 batch 维度）
    pub fn input_shape(&self) -> [usize; 3] {
        [1, MNIST_SIDE, MNIST_SIDE]
    }

    /// 获取所有图像（用于批量处理）
    pub fn images(&self) -> &Tensor {
        &self.images
    }

    /// 获取所有标签
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// 转为通用的 TensorDataset
    pub fn into_tensor_dataset(self) -> TensorDataset {
        TensorDataset::from_parts_unchecked(self.images, self.labels)
    }
}

/// 获取默认数据目录
pub fn default_data_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("gacnn")
        .join("datasets")
}

/// 确保文件存在，必要时下载
fn ensure_file(config: &DataConfig, base_name: &str) -> Result<PathBuf, DataError> {
    let data_dir = &config.root;
    // 优先检查解压后的文件
    let uncompressed_path = data_dir.join(base_name);
    if uncompressed_path.exists() {
        return Ok(uncompressed_path);
    }

    // 检查 .gz 文件
    let gz_name = format!("{base_name}.gz");
    let gz_path = data_dir.join(&gz_name);
    if gz_path.exists() {
        return Ok(gz_path);
    }

    // 文件不存在，尝试下载
    if !config.download {
        return Err(DataError::FileNotFound(uncompressed_path));
    }
    let md5 = MNIST_FILES
        .iter()
        .find(|(name, _)| *name == gz_name)
        .map(|(_, md5)| *md5);
    std::fs::create_dir_all(data_dir)?;
    let url = format!("{MNIST_BASE_URL}{gz_name}");
    download_file(&url, &gz_path, md5, config.download_timeout)?;
    Ok(gz_path)
}

/// 打开 IDX 文件，`.gz` 后缀时透明解压
fn open_idx(path: &Path) -> Result<Box<dyn Read>, DataError> {
    let file = File::open(path).map_err(|_| DataError::FileNotFound(path.to_path_buf()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// 读取大端序头部并校验魔数，返回魔数之后的各字段
fn read_header<const N: usize>(
    reader: &mut dyn Read,
    expected_magic: u32,
) -> Result<[usize; N], DataError> {
    let mut magic = [0u8; 4];
    reader
        .read_exact(&mut magic)
        .map_err(|e| DataError::FormatError(format!("读取头部失败: {e}")))?;
    let magic = u32::from_be_bytes(magic);
    if magic != expected_magic {
        return Err(DataError::FormatError(format!(
            "无效的 magic number: {magic} (期望 {expected_magic})"
        )));
    }

    let mut fields = [0usize; N];
    for field in &mut fields {
        let mut bytes = [0u8; 4];
        reader
            .read_exact(&mut bytes)
            .map_err(|e| DataError::FormatError(format!("读取头部失败: {e}")))?;
        *field = u32::from_be_bytes(bytes) as usize;
    }
    Ok(fields)
}

/// 解析 IDX 图像文件，返回按样本排列的原始像素
///
/// IDX 格式：
/// - [0-3] magic number (0x00000803 = 2051)
/// - [4-7] number of images
/// - [8-11] number of rows
/// - [12-15] number of columns
/// - [16+] pixel data (unsigned byte)
pub fn parse_idx_images(path: &Path) -> Result<Vec<u8>, DataError> {
    let mut reader = open_idx(path)?;
    let [num_images, num_rows, num_cols] = read_header::<3>(&mut reader, IDX_IMAGES_MAGIC)?;

    if num_rows != MNIST_SIDE || num_cols != MNIST_SIDE {
        return Err(DataError::FormatError(format!(
            "无效的图像尺寸: {num_rows}x{num_cols} (期望 28x28)"
        )));
    }

    let expected = num_images
        .checked_mul(num_rows * num_cols)
        .ok_or_else(|| DataError::FormatError(format!("图像数量过大: {num_images}")))?;
    read_body(&mut reader, expected, "像素")
}

/// 解析 IDX 标签文件
///
/// IDX 格式：
/// - [0-3] magic number (0x00000801 = 2049)
/// - [4-7] number of labels
/// - [8+] label data (unsigned byte, 0-9)
pub fn parse_idx_labels(path: &Path) -> Result<Vec<usize>, DataError> {
    let mut reader = open_idx(path)?;
    let [num_labels] = read_header::<1>(&mut reader, IDX_LABELS_MAGIC)?;

    let labels = read_body(&mut reader, num_labels, "标签")?;
    Ok(labels.into_iter().map(usize::from).collect())
}

/// 读取头部之后的`expected`个字节。按实际读到的长度分配，头部声明的数量不可信
fn read_body(reader: &mut dyn Read, expected: usize, what: &str) -> Result<Vec<u8>, DataError> {
    let mut body = Vec::new();
    reader
        .take(expected as u64)
        .read_to_end(&mut body)
        .map_err(|e| DataError::FormatError(format!("读取{what}数据失败: {e}")))?;
    if body.len() != expected {
        return Err(DataError::FormatError(format!(
            "{what}数据不完整: 期望 {expected} 字节，实际 {} 字节",
            body.len()
        )));
    }
    Ok(body)
}
