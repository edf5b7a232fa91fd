use image::imageops;
use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::geometric_transformations::translate;

use crate::data::datasets::MNIST_SIDE;
use crate::data::transforms::mnist_normalize;
use crate::errors::ModelError;
use crate::tensor::Tensor;

/// 输出画布边长
pub const DIGIT_CANVAS: u32 = MNIST_SIDE as u32;
/// 数字本体缩放后的长边
pub const DIGIT_BOX: u32 = 20;

pub(super) fn preprocess(image: &DynamicImage) -> Result<Tensor, ModelError> {
    // 灰度化、反色（白底黑字 -> 黑底白字）、缩放到28×28
    let mut gray = to_gray_bt601(image);
    imageops::invert(&mut gray);
    let gray = resize_bilinear(&gray, DIGIT_CANVAS, DIGIT_CANVAS);

    let binary = binarize_otsu(&gray);
    let digit = crop_to_content(&binary)
        .ok_or_else(|| ModelError::InvalidImage("图像中没有找到数字".to_string()))?;
    let digit = fit_into_box(&digit);
    let canvas = pad_to_canvas(&digit);
    let centered = center_by_mass(&canvas);

    let raw: Vec<f32> = centered.pixels().map(|p| f32::from(p[0])).collect();
    let raw = Tensor::from_vec(raw, &[1, 1, MNIST_SIDE, MNIST_SIDE]);
    Ok(mnist_normalize(&raw))
}

/// 按 BT.601 权重（0.299R + 0.587G + 0.114B）转灰度
pub fn to_gray_bt601(image: &DynamicImage) -> GrayImage {
    let rgb = image.to_rgb8();
    GrayImage::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
        Luma([luma.round().clamp(0.0, 255.0) as u8])
    })
}

/// 双线性缩放，像素中心对齐、越界坐标取边缘值，缩小时不做抗锯齿平均
pub fn resize_bilinear(image: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_width, src_height) = image.dimensions();
    if src_width == 0 || src_height == 0 {
        return GrayImage::new(width, height);
    }
    // 目标坐标 -> 源坐标的两个相邻下标及权重
    let sample = |dst: u32, dst_len: u32, src_len: u32| {
        let scale = src_len as f32 / dst_len as f32;
        let pos = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
        let lo = (pos.floor() as u32).min(src_len - 1);
        let hi = (lo + 1).min(src_len - 1);
        (lo, hi, pos - lo as f32)
    };
    GrayImage::from_fn(width, height, |x, y| {
        let (x0, x1, fx) = sample(x, width, src_width);
        let (y0, y1, fy) = sample(y, height, src_height);
        let p = |x: u32, y: u32| f32::from(image.get_pixel(x, y)[0]);
        let top = p(x0, y0) * (1.0 - fx) + p(x1, y0) * fx;
        let bottom = p(x0, y1) * (1.0 - fx) + p(x1, y1) * fx;
        let value = top * (1.0 - fy) + bottom * fy;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Otsu 阈值二值化：大于阈值的像素置 255，其余置 0
pub fn binarize_otsu(image: &GrayImage) -> GrayImage {
    let level = otsu_level(image);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y)[0] > level {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// 去掉首尾全黑的行与列；整幅图都是黑色时返回`None`
pub fn crop_to_content(image: &GrayImage) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    let row_empty = |y: u32| (0..width).all(|x| image.get_pixel(x, y)[0] == 0);
    let col_empty = |x: u32| (0..height).all(|y| image.get_pixel(x, y)[0] == 0);

    let top = (0..height).find(|&y| !row_empty(y))?;
    let bottom = (0..height).rev().find(|&y| !row_empty(y))?;
    let left = (0..width).find(|&x| !col_empty(x))?;
    let right = (0..width).rev().find(|&x| !col_empty(x))?;

    Some(imageops::crop_imm(image, left, top, right - left + 1, bottom - top + 1).to_image())
}

/// 等比缩放，使长边为`DIGIT_BOX`，短边至少为 1
fn fit_into_box(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = if height > width {
        (scaled_side(width, height), DIGIT_BOX)
    } else {
        (DIGIT_BOX, scaled_side(height, width))
    };
    resize_bilinear(image, new_width, new_height)
}

fn scaled_side(side: u32, longer: u32) -> u32 {
    let factor = f64::from(DIGIT_BOX) / f64::from(longer);
    ((f64::from(side) * factor).round_ties_even() as u32).max(1)
}

/// 补零到 28×28：前面补`ceil((28-n)/2)`，后面补`floor((28-n)/2)`
fn pad_to_canvas(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let left = (DIGIT_CANVAS - width).div_ceil(2);
    let top = (DIGIT_CANVAS - height).div_ceil(2);
    let mut canvas = GrayImage::new(DIGIT_CANVAS, DIGIT_CANVAS);
    for (x, y, pixel) in image.enumerate_pixels() {
        canvas.put_pixel(x + left, y + top, *pixel);
    }
    canvas
}

/// 按亮度质心平移，使质心尽量落在画布中心；移出画布的像素被丢弃
pub fn center_by_mass(image: &GrayImage) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut mass = 0.0f64;
    let mut sum_x = 0.0f64;
    let mut sum_y = 0.0f64;
    for (x, y, pixel) in image.enumerate_pixels() {
        let v = f64::from(pixel[0]);
        mass += v;
        sum_x += v * f64::from(x);
        sum_y += v * f64::from(y);
    }
    if mass == 0.0 {
        return image.clone();
    }

    let shift_x = (f64::from(width) / 2.0 - sum_x / mass).round_ties_even() as i32;
    let shift_y = (f64::from(height) / 2.0 - sum_y / mass).round_ties_even() as i32;
    translate(image, (shift_x, shift_y))
}
