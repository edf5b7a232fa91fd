use super::{assert_grad_close, numeric_grad, random_tensor};
use crate::errors::ModelError;
use crate::nn::layer::Linear;
use crate::nn::Module;
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn linear(in_features: usize, out_features: usize) -> Linear {
    let mut rng = StdRng::seed_from_u64(0);
    Linear::new(in_features, out_features, "classifier", &mut rng)
}

#[test]
fn test_linear_creation() {
    let layer = linear(64, 10);
    assert_eq!(layer.weight().value().shape(), &[10, 64]);
    assert_eq!(layer.weight().name(), "classifier.weight");
    assert_eq!(layer.bias().name(), "classifier.bias");
    assert_eq!(layer.bias().value(), &Tensor::zeros(&[10]));
    // U(±1/√64)
    assert!(
        layer
            .weight()
            .value()
            .data_as_slice()
            .iter()
            .all(|w| w.abs() <= 0.125 + 1e-6)
    );
}

#[test]
fn test_linear_forward() {
    let mut layer = linear(2, 3);
    {
        let mut params = layer.parameters_mut();
        *params[0].value_mut() = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[3, 2]);
        *params[1].value_mut() = Tensor::new(&[0.1, 0.2, 0.3], &[3]);
    }
    let x = Tensor::new(&[1., 1., 0., -1.], &[2, 2]);
    let y = layer.forward(&x).unwrap();
    assert_abs_diff_eq!(
        y,
        Tensor::new(&[3.1, 7.2, 11.3, -1.9, -3.8, -5.7], &[2, 3]),
        epsilon = 1e-5
    );
}

#[test]
fn test_linear_gradients_match_finite_differences() {
    let mut layer = linear(5, 4);
    let x = random_tensor(&[3, 5], 21);
    let probe = random_tensor(&[3, 4], 22);

    layer.forward_train(&x).unwrap();
    let grad_x = layer.backward(&probe).unwrap();
    let numeric_x = numeric_grad(&x, &probe, 1e-2, |x| layer.forward(x).unwrap());
    assert_grad_close(&grad_x, &numeric_x, 1e-2);

    let weight = layer.weight().value().clone();
    let numeric_w = numeric_grad(&weight, &probe, 1e-2, |w| {
        let mut probe_layer = layer.clone();
        *probe_layer.parameters_mut()[0].value_mut() = w.clone();
        probe_layer.forward(&x).unwrap()
    });
    assert_grad_close(layer.weight().grad(), &numeric_w, 1e-2);

    let bias = layer.bias().value().clone();
    let numeric_b = numeric_grad(&bias, &probe, 1e-2, |b| {
        let mut probe_layer = layer.clone();
        *probe_layer.parameters_mut()[1].value_mut() = b.clone();
        probe_layer.forward(&x).unwrap()
    });
    assert_grad_close(layer.bias().grad(), &numeric_b, 1e-2);
}

#[test]
fn test_linear_shape_errors() {
    let mut layer = linear(4, 2);
    let err = layer.forward(&Tensor::zeros(&[2, 3])).unwrap_err();
    assert!(matches!(err, ModelError::ShapeMismatch { .. }), "{err:?}");
    let err = layer.forward(&Tensor::zeros(&[2, 4, 1])).unwrap_err();
    assert!(matches!(err, ModelError::ShapeMismatch { .. }), "{err:?}");

    layer.forward_train(&Tensor::zeros(&[2, 4])).unwrap();
    let err = layer.backward(&Tensor::zeros(&[3, 2])).unwrap_err();
    assert!(matches!(err, ModelError::ShapeMismatch { .. }), "{err:?}");
}
