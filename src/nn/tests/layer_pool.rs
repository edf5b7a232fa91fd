/*
 * @Description  : MaxPool2d / GlobalMaxPool2d / ReLU 单元测试
 */

use super::{assert_grad_close, distinct_tensor, numeric_grad};
use crate::errors::ModelError;
use crate::nn::layer::{GlobalMaxPool2d, MaxPool2d, ReLU};
use crate::tensor::Tensor;

#[rustfmt::skip]
const POOL_X: &[f32] = &[
    1.0, 3.0, 2.0, 0.0,
    4.0, 2.0, 1.0, 5.0,
    0.0, 1.0, 7.0, 7.0,
    2.0, 9.0, 7.0, 1.0,
];

#[test]
fn test_max_pool2d_forward() {
    let pool = MaxPool2d::default();
    let x = Tensor::new(POOL_X, &[1, 1, 4, 4]);
    let y = pool.forward(&x).unwrap();
    assert_eq!(y, Tensor::new(&[4.0, 5.0, 9.0, 7.0], &[1, 1, 2, 2]));
}

#[test]
fn test_max_pool2d_odd_size_drops_last_row_and_column() {
    let pool = MaxPool2d::new(2, 2);
    let x = Tensor::new(&(0..25).map(|v| v as f32).collect::<Vec<_>>(), &[1, 1, 5, 5]);
    let y = pool.forward(&x).unwrap();
    assert_eq!(y, Tensor::new(&[6.0, 8.0, 16.0, 18.0], &[1, 1, 2, 2]));
    assert_eq!(pool.output_size(5, 5), Some((2, 2)));
}

#[test]
fn test_max_pool2d_backward_routes_to_first_maximum() {
    let mut pool = MaxPool2d::default();
    let x = Tensor::new(POOL_X, &[1, 1, 4, 4]);
    pool.forward_train(&x).unwrap();
    let grad = pool
        .backward(&Tensor::new(&[1.0, 2.0, 3.0, 4.0], &[1, 1, 2, 2]))
        .unwrap();

    // 右下窗口 [7, 7; 7, 1] 并列，梯度只给先出现的 (2, 2)
    #[rustfmt::skip]
    let expected = Tensor::new(&[
        0.0, 0.0, 0.0, 0.0,
        1.0, 0.0, 0.0, 2.0,
        0.0, 0.0, 4.0, 0.0,
        0.0, 3.0, 0.0, 0.0,
    ], &[1, 1, 4, 4]);
    assert_eq!(grad, expected);
}

#[test]
fn test_max_pool2d_gradients_match_finite_differences() {
    let mut pool = MaxPool2d::default();
    let x = distinct_tensor(&[2, 3, 6, 5], 11);
    let probe = distinct_tensor(&[2, 3, 3, 2], 12);

    pool.forward_train(&x).unwrap();
    let grad = pool.backward(&probe).unwrap();
    let numeric = numeric_grad(&x, &probe, 1e-2, |x| pool.forward(x).unwrap());
    assert_grad_close(&grad, &numeric, 1e-2);
}

#[test]
fn test_max_pool2d_rejects_too_small_input() {
    let pool = MaxPool2d::default();
    let err = pool.forward(&Tensor::zeros(&[1, 4, 1, 3])).unwrap_err();
    assert!(matches!(err, ModelError::ShapeMismatch { .. }), "{err:?}");
}

#[test]
fn test_global_max_pool2d_forward_backward() {
    let mut pool = GlobalMaxPool2d::new();
    let x = Tensor::new(POOL_X, &[1, 1, 4, 4]);

    assert_eq!(pool.forward(&x).unwrap(), Tensor::new(&[9.0], &[1, 1]));

    pool.forward_train(&x).unwrap();
    let grad = pool.backward(&Tensor::new(&[2.5], &[1, 1])).unwrap();
    assert_eq!(grad[[0, 0, 3, 1]], 2.5);
    assert_eq!(grad.sum(), 2.5);
}

#[test]
fn test_global_max_pool2d_gradients_match_finite_differences() {
    let mut pool = GlobalMaxPool2d::new();
    let x = distinct_tensor(&[3, 4, 3, 3], 13);
    let probe = distinct_tensor(&[3, 4], 14);

    let y = pool.forward_train(&x).unwrap();
    assert_eq!(y.shape(), &[3, 4]);
    let grad = pool.backward(&probe).unwrap();
    let numeric = numeric_grad(&x, &probe, 1e-2, |x| pool.forward(x).unwrap());
    assert_grad_close(&grad, &numeric, 1e-2);
}

#[test]
fn test_global_max_pool2d_rejects_empty_feature_map() {
    let pool = GlobalMaxPool2d::new();
    let err = pool.forward(&Tensor::zeros(&[2, 3, 0, 4])).unwrap_err();
    assert!(matches!(err, ModelError::ShapeMismatch { .. }), "{err:?}");
}

#[test]
fn test_relu_forward_backward() {
    let mut relu = ReLU::new();
    let x = Tensor::new(&[-1.0, 0.0, 2.0, -3.0, 4.0], &[5]);
    assert_eq!(relu.forward(&x), Tensor::new(&[0.0, 0.0, 2.0, 0.0, 4.0], &[5]));

    relu.forward_train(&x);
    let grad = relu.backward(&Tensor::ones(&[5])).unwrap();
    // 0 点处梯度取 0
    assert_eq!(grad, Tensor::new(&[0.0, 0.0, 1.0, 0.0, 1.0], &[5]));

    let err = relu.backward(&Tensor::ones(&[5])).unwrap_err();
    assert!(matches!(err, ModelError::Computation(_)), "{err:?}");
}
