//! # GACNN 手写数字识别示例
//!
//! 展示完整流程：
//! - 加载 MNIST（首次运行自动下载到 `~/.cache/gacnn/datasets/mnist/`）
//! - 按 GACNN 基因型构建网络，Adam + 交叉熵训练，验证集提前停止
//! - 保存权重，重新加载后识别一张图片
//!
//! ## 运行
//! ```bash
//! RUST_LOG=info cargo run --release --example train_mnist -- [config.json] [digit.png]
//! ```
//! `config.json` 为 `TrainerConfig` 的 JSON 形式，缺省字段取默认值。

use std::time::Instant;

use gacnn::errors::ModelError;
use gacnn::nn::{ArchitectureDescriptor, Network};
use gacnn::train::{TrainerConfig, train};
use gacnn::vision::{load_image, predict_digit};

fn main() -> Result<(), ModelError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path.ends_with(".json") => TrainerConfig::from_json_file(&path)?,
        _ => TrainerConfig::default().with_seed(42),
    };
    let image_path = std::env::args().skip(1).find(|a| !a.ends_with(".json"));

    // 1. 训练
    let start = Instant::now();
    let descriptor = ArchitectureDescriptor::gacnn();
    let report = train(Some(&descriptor), &config)?;
    log::info!(
        "训练结束：{} 个 epoch，最佳验证准确率 {:.2}%，测试准确率 {:.2}%，耗时 {:.1}s",
        report.state.current_epoch,
        report.state.best_accuracy,
        report.test_accuracy,
        start.elapsed().as_secs_f32()
    );

    // 2. 保存并重新加载权重
    let checkpoint = std::env::temp_dir().join("gacnn_demo.gcnn");
    report.network.save_checkpoint(&checkpoint)?;
    let network = Network::from_checkpoint(&descriptor, &config.network_config(), &checkpoint)?;
    log::info!("权重已保存到 {}", checkpoint.display());

    // 3. 识别图片
    if let Some(path) = image_path {
        let image = load_image(&path)?;
        let digit = predict_digit(&network, &image)?;
        println!("{path} 中的数字是 {digit}");
    }
    Ok(())
}
