mod layer_linear;
mod layer_pool;

use crate::tensor::Tensor;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// [-1, 1]上的可复现随机张量
pub(super) fn random_tensor(shape: &[usize], seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    Tensor::uniform_with_rng(-1.0, 1.0, shape, &mut rng)
}

/// 元素两两间隔至少 0.1 的随机张量（用于最大池化等分段函数的数值梯度，避免扰动跨越分段点）
pub(super) fn distinct_tensor(shape: &[usize], seed: u64) -> Tensor {
    let mut rng = StdRng::seed_from_u64(seed);
    let len: usize = shape.iter().product();
    let mut values: Vec<f32> = (0..len).map(|i| i as f32 * 0.1 - len as f32 * 0.05).collect();
    values.shuffle(&mut rng);
    Tensor::from_vec(values, shape)
}

/// 以 L = Σ f(x) ⊙ probe 为标量损失，用中心差分估计 dL/dx
pub(super) fn numeric_grad(
    x: &Tensor,
    probe: &Tensor,
    eps: f32,
    mut f: impl FnMut(&Tensor) -> Tensor,
) -> Tensor {
    let mut grad = vec![0.0f32; x.size()];
    for (i, g) in grad.iter_mut().enumerate() {
        let mut plus = x.clone();
        plus.data_as_slice_mut()[i] += eps;
        let mut minus = x.clone();
        minus.data_as_slice_mut()[i] -= eps;
        let loss_plus = (&f(&plus) * probe).sum();
        let loss_minus = (&f(&minus) * probe).sum();
        *g = (loss_plus - loss_minus) / (2.0 * eps);
    }
    Tensor::from_vec(grad, x.shape())
}

/// 解析梯度与数值梯度逐元素比较（相对误差，量级小于 1 时按绝对误差）
pub(super) fn assert_grad_close(analytic: &Tensor, numeric: &Tensor, tol: f32) {
    assert_eq!(analytic.shape(), numeric.shape());
    for (i, (a, n)) in analytic
        .data_as_slice()
        .iter()
        .zip(numeric.data_as_slice())
        .enumerate()
    {
        assert!(
            (a - n).abs() <= tol * n.abs().max(1.0),
            "第{i}个元素梯度不符：解析{a}，数值{n}"
        );
    }
}
