/*
 * @Description  : 端到端集成测试（不依赖网络）：
 *                 合成数据训练 -> 保存权重 -> 按同一结构重新构建并加载 -> 推理结果一致
 *
 * 合成数据：3 类 8×8 图像，分别在左半边、右半边、上半边有亮块，加少量噪声。
 */

use gacnn::data::{DataLoader, DigitSplits, TensorDataset};
use gacnn::errors::ModelError;
use gacnn::nn::{ArchitectureDescriptor, Network, NetworkConfig};
use gacnn::tensor::Tensor;
use gacnn::train::{Trainer, TrainerConfig, TrainerStatus, evaluate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SIDE: usize = 8;

fn make_dataset(n: usize, seed: u64) -> TensorDataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut data = Vec::with_capacity(n * SIDE * SIDE);
    let mut labels = Vec::with_capacity(n);
    for i in 0..n {
        let label = i % 3;
        for y in 0..SIDE {
            for x in 0..SIDE {
                let lit = match label {
                    0 => x < SIDE / 2,
                    1 => x >= SIDE / 2,
                    _ => y < SIDE / 2,
                };
                let base = if lit { 1.0 } else { -1.0 };
                data.push(base + rng.gen_range(-0.2..0.2));
            }
        }
        labels.push(label);
    }
    TensorDataset::new(Tensor::from_vec(data, &[n, 1, SIDE, SIDE]), labels).unwrap()
}

fn descriptor() -> ArchitectureDescriptor {
    ArchitectureDescriptor::new([(8_usize, false, 3_usize), (8, true, 3), (16, false, 3)]).unwrap()
}

#[test]
fn test_train_save_reload_predict() -> Result<(), ModelError> {
    let splits = DigitSplits::from_parts(make_dataset(90, 1), make_dataset(30, 2), make_dataset(30, 3));
    let network_config = NetworkConfig::default().with_seed(7).with_num_classes(3);
    let network = Network::build(&descriptor(), &network_config)?;

    let config = TrainerConfig::default()
        .with_batch_size(10)
        .with_learning_rate(0.01)
        .with_epoch_limit(20)
        .with_seed(7);
    let report = Trainer::new(config)?.fit(network, &splits)?;

    let state = &report.state;
    assert_ne!(state.status, TrainerStatus::Running);
    assert!(state.current_epoch <= 20);
    assert!(state.best_accuracy >= 90.0, "最佳验证准确率 {}", state.best_accuracy);

    // 保存 -> 用不同种子构建同构网络 -> 加载
    let path = std::env::temp_dir().join(format!("gacnn_it_{}.gcnn", std::process::id()));
    report.network.save_checkpoint(&path)?;
    let restored = Network::from_checkpoint(
        &descriptor(),
        &NetworkConfig::default().with_seed(99).with_num_classes(3),
        &path,
    )?;
    std::fs::remove_file(&path).ok();

    assert_eq!(restored.state_dict(), report.network.state_dict());
    assert_eq!(
        evaluate(&restored, &splits.test)?,
        evaluate(&report.network, &splits.test)?
    );
    for (images, _) in DataLoader::new(&splits.test, 7).iter() {
        assert_eq!(restored.predict(&images)?, report.network.predict(&images)?);
    }
    Ok(())
}

#[test]
fn test_checkpoint_rejects_other_architecture() -> Result<(), ModelError> {
    let network = Network::build(&descriptor(), &NetworkConfig::default().with_seed(1))?;
    let path = std::env::temp_dir().join(format!("gacnn_it_arch_{}.gcnn", std::process::id()));
    network.save_checkpoint(&path)?;

    let other = ArchitectureDescriptor::new([(8_usize, false, 3_usize), (8, true, 3), (8, false, 3)])?;
    let result = Network::from_checkpoint(&other, &NetworkConfig::default(), &path);
    std::fs::remove_file(&path).ok();
    assert!(matches!(result, Err(ModelError::Format(_))));
    Ok(())
}
