use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

#[test]
fn test_binary_ops_with_tensor() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[4., 3., 2., 1.], &[2, 2]);

    assert_eq!(&a + &b, Tensor::new(&[5., 5., 5., 5.], &[2, 2]));
    assert_eq!(&a - &b, Tensor::new(&[-3., -1., 1., 3.], &[2, 2]));
    assert_eq!(&a * &b, Tensor::new(&[4., 6., 6., 4.], &[2, 2]));
    assert_abs_diff_eq!(
        &a / &b,
        Tensor::new(&[0.25, 2. / 3., 1.5, 4.], &[2, 2]),
        epsilon = 1e-6
    );
}

#[test]
fn test_binary_ops_with_scalar() {
    let a = Tensor::new(&[1., 2., 3.], &[3]);
    assert_eq!(&a + 1., Tensor::new(&[2., 3., 4.], &[3]));
    assert_eq!(&a - 1., Tensor::new(&[0., 1., 2.], &[3]));
    assert_eq!(&a * 2., Tensor::new(&[2., 4., 6.], &[3]));
    assert_eq!(2.0_f32 * &a, Tensor::new(&[2., 4., 6.], &[3]));
    assert_eq!(a.clone() / 2., Tensor::new(&[0.5, 1., 1.5], &[3]));
}

#[test]
fn test_assign_ops() {
    let mut a = Tensor::new(&[1., 2., 3.], &[3]);
    a += &Tensor::ones(&[3]);
    assert_eq!(a, Tensor::new(&[2., 3., 4.], &[3]));
    a *= 0.5;
    assert_eq!(a, Tensor::new(&[1., 1.5, 2.], &[3]));
    a -= &Tensor::new(&[1., 1., 1.], &[3]);
    assert_eq!(a, Tensor::new(&[0., 0.5, 1.], &[3]));
}

#[test]
#[should_panic(expected = "形状不一致")]
fn test_add_with_mismatched_shape() {
    let _ = &Tensor::zeros(&[2, 2]) + &Tensor::zeros(&[4]);
}

#[test]
fn test_sum_mean_sqrt() {
    let a = Tensor::new(&[1., 4., 9., 16.], &[2, 2]);
    assert_eq!(a.sum(), 30.);
    assert_eq!(a.mean(), 7.5);
    assert_eq!(a.sqrt(), Tensor::new(&[1., 2., 3., 4.], &[2, 2]));
    assert_eq!(Tensor::zeros(&[0]).mean(), 0.);
}

#[test]
fn test_argmax_rows() {
    let a = Tensor::new(&[0.1, 0.9, 0.0, 5., -1., 5., -3., -2., -1.], &[3, 3]);
    // 并列最大值取下标最小者
    assert_eq!(a.argmax_rows(), vec![1, 0, 2]);
}
