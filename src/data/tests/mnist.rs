//! MNIST 数据集单元测试
//!
//! 解析相关的测试使用临时目录中合成的 IDX 文件；
//! 真实数据集测试首次运行需要网络连接下载数据（约 11MB），debug 构建下默认忽略。
//! 数据下载后缓存在 `~/.cache/gacnn/datasets/mnist/`，后续无需网络。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use approx::assert_abs_diff_eq;
use flate2::Compression;
use flate2::write::GzEncoder;

use crate::data::datasets::{
    DataConfig, IDX_IMAGES_MAGIC, IDX_LABELS_MAGIC, default_data_dir, parse_idx_images,
    parse_idx_labels,
};
use crate::data::transforms::{MNIST_MEAN, MNIST_STD};
use crate::data::{DataError, MnistDataset};

const PLANE: usize = 28 * 28;

/// 每个测试一个独立目录，结束时删除
struct TempDir(PathBuf);

impl TempDir {
    fn new(name: &str) -> Self {
        let dir = std::env::temp_dir().join(format!("gacnn_{}_{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        Self(dir)
    }

    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        fs::remove_dir_all(&self.0).ok();
    }
}

fn images_idx(count: usize, side: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    for field in [IDX_IMAGES_MAGIC, count as u32, side as u32, side as u32] {
        bytes.extend_from_slice(&field.to_be_bytes());
    }
    // 第 i 张图像所有像素都为 i * 50
    for i in 0..count {
        bytes.extend(std::iter::repeat_n((i * 50) as u8, side * side));
    }
    bytes
}

fn labels_idx(labels: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&IDX_LABELS_MAGIC.to_be_bytes());
    bytes.extend_from_slice(&(labels.len() as u32).to_be_bytes());
    bytes.extend_from_slice(labels);
    bytes
}

fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap()
}

fn offline(dir: &Path) -> DataConfig {
    DataConfig::default().with_root(dir).with_download(false)
}

#[test]
fn test_default_data_dir() {
    let dir = default_data_dir();
    assert!(dir.to_string_lossy().contains("gacnn"));
    assert!(dir.ends_with("datasets"));
    assert!(DataConfig::default().root.ends_with("mnist"));
}

#[test]
fn test_load_raw_idx_files() {
    let dir = TempDir::new("mnist_raw");
    fs::write(dir.path().join("t10k-images-idx3-ubyte"), images_idx(3, 28)).unwrap();
    fs::write(dir.path().join("t10k-labels-idx1-ubyte"), labels_idx(&[7, 0, 9])).unwrap();

    let dataset = MnistDataset::load(&offline(dir.path()), false).unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.images().shape(), &[3, 1, 28, 28]);
    assert_eq!(dataset.labels(), &[7, 0, 9]);
    assert_eq!(dataset.input_shape(), [1, 28, 28]);

    // 像素先缩放到 [0, 1] 再标准化
    let (image, label) = dataset.get(1).unwrap();
    assert_eq!(label, 0);
    assert_eq!(image.shape(), &[1, 1, 28, 28]);
    let expected = (50.0 / 255.0 - MNIST_MEAN) / MNIST_STD;
    assert_abs_diff_eq!(image[[0, 0, 13, 13]], expected, epsilon = 1e-5);
    assert_abs_diff_eq!(
        dataset.images()[[0, 0, 0, 0]],
        -MNIST_MEAN / MNIST_STD,
        epsilon = 1e-5
    );

    assert!(matches!(
        dataset.get(3),
        Err(DataError::IndexOutOfBounds { index: 3, len: 3 })
    ));
}

#[test]
fn test_load_gz_idx_files() {
    let dir = TempDir::new("mnist_gz");
    fs::write(
        dir.path().join("train-images-idx3-ubyte.gz"),
        gzip(&images_idx(2, 28)),
    )
    .unwrap();
    fs::write(
        dir.path().join("train-labels-idx1-ubyte.gz"),
        gzip(&labels_idx(&[4, 5])),
    )
    .unwrap();

    let dataset = MnistDataset::load(&offline(dir.path()), true).unwrap();
    assert_eq!(dataset.labels(), &[4, 5]);

    let tensors = dataset.into_tensor_dataset();
    assert_eq!(tensors.len(), 2);
    assert_eq!(tensors.sample_shape(), &[1, 28, 28]);
}

#[test]
fn test_missing_files_without_download() {
    let dir = TempDir::new("mnist_missing");
    let err = MnistDataset::load(&offline(dir.path()), true).unwrap_err();
    match err {
        DataError::FileNotFound(path) => assert!(path.ends_with("train-images-idx3-ubyte")),
        other => panic!("应为文件未找到，实际为{other:?}"),
    }
}

#[test]
fn test_parse_rejects_bad_files() {
    let dir = TempDir::new("mnist_bad");

    // 图像文件用了标签文件的魔数
    let path = dir.path().join("bad_magic");
    fs::write(&path, labels_idx(&[1, 2])).unwrap();
    let err = parse_idx_images(&path).unwrap_err();
    assert!(matches!(err, DataError::FormatError(ref m) if m.contains("2051")), "{err:?}");

    // 尺寸不是 28×28
    let path = dir.path().join("bad_side");
    fs::write(&path, images_idx(1, 27)).unwrap();
    assert!(matches!(parse_idx_images(&path), Err(DataError::FormatError(_))));

    // 像素数据被截断
    let path = dir.path().join("truncated");
    let mut bytes = images_idx(2, 28);
    bytes.truncate(16 + PLANE + 10);
    fs::write(&path, bytes).unwrap();
    assert!(matches!(parse_idx_images(&path), Err(DataError::FormatError(_))));

    // 标签头部不完整
    let path = dir.path().join("short_labels");
    fs::write(&path, [0u8, 0, 8]).unwrap();
    assert!(matches!(parse_idx_labels(&path), Err(DataError::FormatError(_))));

    // 头部声明的数量远大于实际数据：报格式错误而不是按声明分配内存
    let path = dir.path().join("huge_image_count");
    let mut bytes = images_idx(1, 28);
    bytes[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
    fs::write(&path, bytes).unwrap();
    let err = parse_idx_images(&path).unwrap_err();
    assert!(matches!(err, DataError::FormatError(ref m) if m.contains("不完整")), "{err:?}");

    let path = dir.path().join("huge_label_count");
    let mut bytes = labels_idx(&[1, 2, 3]);
    bytes[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
    fs::write(&path, gzip(&bytes)).unwrap();
    let gz_path = dir.path().join("huge_label_count.gz");
    fs::rename(&path, &gz_path).unwrap();
    assert!(matches!(parse_idx_labels(&gz_path), Err(DataError::FormatError(_))));
}

#[test]
fn test_load_rejects_inconsistent_files() {
    let dir = TempDir::new("mnist_inconsistent");
    fs::write(dir.path().join("t10k-images-idx3-ubyte"), images_idx(3, 28)).unwrap();
    fs::write(dir.path().join("t10k-labels-idx1-ubyte"), labels_idx(&[1, 2])).unwrap();
    let err = MnistDataset::load(&offline(dir.path()), false).unwrap_err();
    assert!(matches!(err, DataError::ShapeMismatch { .. }), "{err:?}");

    // 标签超出 0-9
    fs::write(dir.path().join("t10k-labels-idx1-ubyte"), labels_idx(&[1, 12, 3])).unwrap();
    let err = MnistDataset::load(&offline(dir.path()), false).unwrap_err();
    assert!(matches!(err, DataError::FormatError(_)), "{err:?}");
}

#[test]
fn test_data_config_json() {
    let config: DataConfig =
        serde_json::from_str(r#"{"root": "/tmp/mnist", "download_timeout": 2.5}"#).unwrap();
    assert_eq!(config.root, PathBuf::from("/tmp/mnist"));
    assert!(config.download);
    assert_eq!(config.download_timeout.as_millis(), 2500);

    let json = serde_json::to_string(&config).unwrap();
    let back: DataConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
#[cfg_attr(debug_assertions, ignore)]
fn test_mnist_train_load() {
    let dataset = MnistDataset::train().expect("加载 MNIST 训练集失败");
    assert_eq!(dataset.len(), 60000);
    assert_eq!(dataset.images().shape(), &[60000, 1, 28, 28]);
    assert!(dataset.labels().iter().all(|&l| l < 10));
}

#[test]
#[cfg_attr(debug_assertions, ignore)]
fn test_mnist_test_load() {
    let dataset = MnistDataset::test().expect("加载 MNIST 测试集失败");
    assert_eq!(dataset.len(), 10000);

    // 标准化后整体均值接近 0
    let mean = dataset.images().mean();
    assert!(mean.abs() < 0.05, "均值 {mean}");
}
