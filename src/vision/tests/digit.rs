use approx::assert_abs_diff_eq;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

use crate::data::transforms::{MNIST_MEAN, MNIST_STD};
use crate::errors::ModelError;
use crate::nn::{ArchitectureDescriptor, Network, NetworkConfig};
use crate::tensor::Tensor;
use crate::vision::{
    binarize_otsu, center_by_mass, crop_to_content, load_image, predict_digit, preprocess_digit,
    resize_bilinear, to_gray_bt601,
};

/// 白底照片上偏左上角的一条黑色竖笔画
fn off_centre_stroke() -> DynamicImage {
    let image = RgbImage::from_fn(80, 100, |x, y| {
        if (10..30).contains(&x) && (10..60).contains(&y) {
            Rgb([20, 20, 20])
        } else {
            Rgb([250, 250, 250])
        }
    });
    DynamicImage::ImageRgb8(image)
}

/// 以高于背景的部分为权重计算质心 (x, y)
fn foreground_centroid(tensor: &Tensor) -> (f32, f32) {
    let background = -MNIST_MEAN / MNIST_STD;
    let (mut mass, mut sx, mut sy) = (0.0, 0.0, 0.0);
    for y in 0..28 {
        for x in 0..28 {
            let w = tensor[[0, 0, y, x]] - background;
            mass += w;
            sx += w * x as f32;
            sy += w * y as f32;
        }
    }
    (sx / mass, sy / mass)
}

#[test]
fn test_preprocess_centres_off_centre_digit() {
    let tensor = preprocess_digit(&off_centre_stroke()).unwrap();
    assert_eq!(tensor.shape(), &[1, 1, 28, 28]);

    let (cx, cy) = foreground_centroid(&tensor);
    assert!((cx - 14.0).abs() <= 1.5, "质心 x = {cx}");
    assert!((cy - 14.0).abs() <= 1.5, "质心 y = {cy}");

    // 四周留白为背景值
    let background = -MNIST_MEAN / MNIST_STD;
    for (y, x) in [(0, 0), (0, 27), (27, 0), (27, 27)] {
        assert_abs_diff_eq!(tensor[[0, 0, y, x]], background, epsilon = 1e-5);
    }
    // 笔画最亮处为 255 对应的归一化值
    let max = tensor.data_as_slice().iter().copied().fold(f32::MIN, f32::max);
    assert_abs_diff_eq!(max, (1.0 - MNIST_MEAN) / MNIST_STD, epsilon = 1e-4);
}

#[test]
fn test_preprocess_rejects_blank_image() {
    let blank = DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])));
    let err = preprocess_digit(&blank).unwrap_err();
    assert!(matches!(err, ModelError::InvalidImage(_)), "{err:?}");
}

#[test]
fn test_to_gray_uses_bt601_weights() {
    let image = RgbImage::from_fn(3, 1, |x, _| match x {
        0 => Rgb([255, 0, 0]),
        1 => Rgb([0, 255, 0]),
        _ => Rgb([0, 0, 255]),
    });
    let gray = to_gray_bt601(&DynamicImage::ImageRgb8(image));
    let values: Vec<u8> = gray.pixels().map(|p| p[0]).collect();
    assert_eq!(values, vec![76, 150, 29]);
}

#[test]
fn test_resize_bilinear_upscale() {
    let image = GrayImage::from_fn(2, 1, |x, _| Luma([if x == 0 { 0 } else { 255 }]));
    let resized = resize_bilinear(&image, 4, 1);
    let values: Vec<u8> = resized.pixels().map(|p| p[0]).collect();
    assert_eq!(values, vec![0, 64, 191, 255]);
}

#[test]
fn test_resize_bilinear_downscale_samples_without_averaging() {
    let image = GrayImage::from_fn(4, 1, |x, _| Luma([if x < 2 { 0 } else { 255 }]));
    let resized = resize_bilinear(&image, 2, 1);
    let values: Vec<u8> = resized.pixels().map(|p| p[0]).collect();
    assert_eq!(values, vec![0, 255]);

    let constant = GrayImage::from_pixel(37, 53, Luma([90]));
    assert!(resize_bilinear(&constant, 28, 28).pixels().all(|p| p[0] == 90));
}

#[test]
fn test_binarize_otsu_two_levels() {
    let image = GrayImage::from_fn(8, 8, |x, _| if x < 4 { Luma([10]) } else { Luma([200]) });
    let binary = binarize_otsu(&image);
    assert_eq!(binary.get_pixel(0, 0)[0], 0);
    assert_eq!(binary.get_pixel(7, 7)[0], 255);
    assert!(binary.pixels().all(|p| p[0] == 0 || p[0] == 255));
}

#[test]
fn test_crop_to_content() {
    let mut image = GrayImage::new(10, 10);
    image.put_pixel(2, 3, Luma([255]));
    image.put_pixel(4, 5, Luma([255]));
    let cropped = crop_to_content(&image).unwrap();
    assert_eq!(cropped.dimensions(), (3, 3));
    assert_eq!(cropped.get_pixel(0, 0)[0], 255);
    assert_eq!(cropped.get_pixel(2, 2)[0], 255);
    assert_eq!(cropped.get_pixel(1, 1)[0], 0);

    assert!(crop_to_content(&GrayImage::new(5, 5)).is_none());
}

#[test]
fn test_center_by_mass_moves_single_pixel_to_centre() {
    let mut image = GrayImage::new(28, 28);
    image.put_pixel(2, 2, Luma([255]));
    let centered = center_by_mass(&image);
    assert_eq!(centered.get_pixel(14, 14)[0], 255);
    assert_eq!(centered.pixels().filter(|p| p[0] != 0).count(), 1);

    // 全黑图像原样返回
    let black = GrayImage::new(28, 28);
    assert_eq!(center_by_mass(&black), black);
}

#[test]
fn test_predict_digit_returns_a_digit() {
    let descriptor = ArchitectureDescriptor::new([(4_usize, false, 3_usize), (4, true, 3)]).unwrap();
    let network = Network::build(&descriptor, &NetworkConfig::default().with_seed(1)).unwrap();
    let image = off_centre_stroke();

    let digit = predict_digit(&network, &image).unwrap();
    assert!(digit < 10);
    let expected = network.predict(&preprocess_digit(&image).unwrap()).unwrap()[0];
    assert_eq!(usize::from(digit), expected);
}

#[test]
fn test_load_image() {
    let path = std::env::temp_dir().join(format!("gacnn_{}_digit.png", std::process::id()));
    off_centre_stroke().save(&path).unwrap();
    let loaded = load_image(&path).unwrap();
    assert_eq!((loaded.width(), loaded.height()), (80, 100));
    assert_eq!(
        preprocess_digit(&loaded).unwrap(),
        preprocess_digit(&off_centre_stroke()).unwrap()
    );
    std::fs::remove_file(&path).ok();

    let err = load_image(&path).unwrap_err();
    assert!(matches!(err, ModelError::InvalidImage(_)), "{err:?}");
}
