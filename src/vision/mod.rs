/*
 * @Description  : 本模块提供把任意一张手写数字照片转换为网络输入的功能。
 *                 在本模块中，不严谨地说：
 *                 1. 所谓的image/图像是指`image`库能解码的任意格式图像；
 *                 2. “灰度”（图）等同于英文中luma、luminance、grey、gray的概念；
 *                 3. “前景”指数字笔画，预处理后为亮色、背景为黑色（与MNIST一致）。
 */

mod digit;

#[cfg(test)]
mod tests;

use std::path::Path;

use image::DynamicImage;

use crate::errors::ModelError;
use crate::nn::Network;

pub use digit::{
    DIGIT_BOX, DIGIT_CANVAS, binarize_otsu, center_by_mass, crop_to_content, resize_bilinear,
    to_gray_bt601,
};

/// 将本地的图像文件加载为`DynamicImage`
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DynamicImage, ModelError> {
    let path = path.as_ref();
    image::open(path).map_err(|e| {
        log::warn!("无法打开图像 {}：{e}", path.display());
        ModelError::InvalidImage(format!("无法读取图像文件 {}", path.display()))
    })
}

/// 预处理一张手写数字图像，得到形状为[1, 1, 28, 28]、已按MNIST统计量归一化的张量
///
/// 步骤与训练数据的制作方式一致：灰度化并反色、缩放到28×28、Otsu二值化、
/// 裁掉全黑的边缘行列、等比缩放到长边20、居中补零到28×28、按质心平移
pub fn preprocess_digit(image: &DynamicImage) -> Result<crate::tensor::Tensor, ModelError> {
    digit::preprocess(image)
}

/// 预处理并推理，返回识别出的数字
pub fn predict_digit(network: &Network, image: &DynamicImage) -> Result<u8, ModelError> {
    let input = preprocess_digit(image)?;
    let prediction = network
        .predict(&input)?
        .first()
        .copied()
        .ok_or_else(|| ModelError::InvalidImage("网络没有给出预测".to_string()))?;
    u8::try_from(prediction)
        .map_err(|_| ModelError::InvalidImage(format!("类别 {prediction} 超出数字范围")))
}
