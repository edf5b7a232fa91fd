/*
 * @Description  : Conv2d (2D 卷积) 层
 *
 * 输入/输出形状：
 * - 输入：[batch_size, in_channels, H, W]
 * - 输出：[batch_size, out_channels, H', W']
 *
 * 输出尺寸计算（正方形卷积核）：
 * H' = (H + 2*padding - kernel) / stride + 1
 * W' = (W + 2*padding - kernel) / stride + 1
 *
 * 计算：output = conv2d(x, K) + b
 * 使用 Rayon 在 batch 维度并行；跨样本的梯度按样本顺序归并，结果与线程调度无关
 */

use rand::rngs::StdRng;
use rayon::prelude::*;

use super::{dims4, missing_cache};
use crate::errors::ModelError;
use crate::nn::{Init, Module, Parameter};
use crate::tensor::Tensor;

/// 前向时缓存的数据（用于反向传播）
#[derive(Debug, Clone)]
struct ConvCache {
    /// 填充后的输入 [batch, C_in, H+2p, W+2p]
    padded_input: Tensor,
    /// 原始输入形状
    input_shape: [usize; 4],
}

/// Conv2d (2D 卷积) 层
///
/// # 使用示例
/// ```ignore
/// let conv = Conv2d::new(1, 32, 3, 1, 1, "blocks.0.conv", &mut rng);
/// let h = conv.forward(&x)?;
/// ```
#[derive(Debug, Clone)]
pub struct Conv2d {
    /// 卷积核参数 [out_channels, in_channels, kernel, kernel]
    weight: Parameter,
    /// 偏置参数 [out_channels]
    bias: Parameter,
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    stride: usize,
    padding: usize,
    cache: Option<ConvCache>,
}

impl Conv2d {
    /// 创建新的 Conv2d 层
    ///
    /// 卷积核使用按 `ReLU` 增益缩放的 Xavier 均匀初始化，偏置为零
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        stride: usize,
        padding: usize,
        name: &str,
        rng: &mut StdRng,
    ) -> Self {
        let init = Init::XavierUniform {
            gain: Init::relu_gain(),
        };
        let weight = init.generate_with_rng(
            &[out_channels, in_channels, kernel_size, kernel_size],
            rng,
        );
        Self {
            weight: Parameter::new(format!("{name}.weight"), weight),
            bias: Parameter::new(format!("{name}.bias"), Tensor::zeros(&[out_channels])),
            in_channels,
            out_channels,
            kernel_size,
            stride: stride.max(1),
            padding,
            cache: None,
        }
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn weight(&self) -> &Parameter {
        &self.weight
    }

    pub fn bias(&self) -> &Parameter {
        &self.bias
    }

    /// 给定输入空间尺寸，计算输出空间尺寸；输出为空时返回`None`
    pub fn output_size(&self, h: usize, w: usize) -> Option<(usize, usize)> {
        let (ph, pw) = (h + 2 * self.padding, w + 2 * self.padding);
        if ph < self.kernel_size || pw < self.kernel_size {
            return None;
        }
        Some((
            (ph - self.kernel_size) / self.stride + 1,
            (pw - self.kernel_size) / self.stride + 1,
        ))
    }

    /// 前向传播（推理），不缓存任何数据
    pub fn forward(&self, x: &Tensor) -> Result<Tensor, ModelError> {
        let [n, c, h, w] = self.check_input(x)?;
        let padded = self.pad_input(x, [n, c, h, w]);
        Ok(self.convolve(&padded))
    }

    /// 前向传播（训练），缓存填充后的输入
    pub fn forward_train(&mut self, x: &Tensor) -> Result<Tensor, ModelError> {
        let shape = self.check_input(x)?;
        let padded = self.pad_input(x, shape);
        let output = self.convolve(&padded);
        self.cache = Some(ConvCache {
            padded_input: padded,
            input_shape: shape,
        });
        Ok(output)
    }

    /// 反向传播：累加卷积核与偏置的梯度，返回对输入的梯度
    ///
    /// 对于 Y = conv(X, K) + b:
    /// - dL/dX: 转置卷积（把上游梯度按卷积核散射回输入）
    /// - dL/dK: 输入与上游梯度的相关运算
    /// - dL/db: 上游梯度按通道求和
    pub fn backward(&mut self, grad_output: &Tensor) -> Result<Tensor, ModelError> {
        let cache = self.cache.take().ok_or_else(|| missing_cache("Conv2d"))?;
        let [n, in_c, in_h, in_w] = cache.input_shape;
        let [gn, out_c, out_h, out_w] = dims4(grad_output, "Conv2d 上游梯度")?;
        if gn != n || out_c != self.out_channels {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.out_channels, out_h, out_w],
                got: grad_output.shape().to_vec(),
                message: "Conv2d 上游梯度形状与前向输出不符".to_string(),
            });
        }

        let k = self.kernel_size;
        let s = self.stride;
        let p = self.padding;
        let pad_h = in_h + 2 * p;
        let pad_w = in_w + 2 * p;
        let kernel = self.weight.value().data_as_slice();
        let padded = cache.padded_input.data_as_slice();
        let grad = grad_output.data_as_slice();

        let kernel_len = out_c * in_c * k * k;
        let padded_sample = in_c * pad_h * pad_w;
        let grad_sample = out_c * out_h * out_w;

        // 每个样本独立计算 (dK_b, db_b, dX_b)
        let per_sample: Vec<(Vec<f32>, Vec<f32>, Vec<f32>)> = (0..n)
            .into_par_iter()
            .map(|b| {
                let x = &padded[b * padded_sample..(b + 1) * padded_sample];
                let g = &grad[b * grad_sample..(b + 1) * grad_sample];
                let mut d_kernel = vec![0.0f32; kernel_len];
                let mut d_bias = vec![0.0f32; out_c];
                let mut d_padded = vec![0.0f32; padded_sample];

                for oc in 0..out_c {
                    let g_map = &g[oc * out_h * out_w..(oc + 1) * out_h * out_w];
                    d_bias[oc] = g_map.iter().sum();
                    for ic in 0..in_c {
                        let x_map = &x[ic * pad_h * pad_w..(ic + 1) * pad_h * pad_w];
                        let dx_map = ic * pad_h * pad_w;
                        for kh in 0..k {
                            for kw in 0..k {
                                let k_idx = ((oc * in_c + ic) * k + kh) * k + kw;
                                let k_val = kernel[k_idx];
                                let mut acc = 0.0f32;
                                for oh in 0..out_h {
                                    let row = (oh * s + kh) * pad_w;
                                    for ow in 0..out_w {
                                        let g_val = g_map[oh * out_w + ow];
                                        let col = ow * s + kw;
                                        acc += g_val * x_map[row + col];
                                        d_padded[dx_map + row + col] += g_val * k_val;
                                    }
                                }
                                d_kernel[k_idx] += acc;
                            }
                        }
                    }
                }

                // 裁掉填充部分
                let mut d_input = vec![0.0f32; in_c * in_h * in_w];
                for ic in 0..in_c {
                    for hi in 0..in_h {
                        let src = ic * pad_h * pad_w + (hi + p) * pad_w + p;
                        let dst = (ic * in_h + hi) * in_w;
                        d_input[dst..dst + in_w].copy_from_slice(&d_padded[src..src + in_w]);
                    }
                }
                (d_kernel, d_bias, d_input)
            })
            .collect();

        // 按样本顺序归并
        let mut total_kernel_grad = vec![0.0f32; kernel_len];
        let mut total_bias_grad = vec![0.0f32; out_c];
        let mut input_grad = Vec::with_capacity(n * in_c * in_h * in_w);
        for (d_kernel, d_bias, d_input) in per_sample {
            for (t, g) in total_kernel_grad.iter_mut().zip(d_kernel) {
                *t += g;
            }
            for (t, g) in total_bias_grad.iter_mut().zip(d_bias) {
                *t += g;
            }
            input_grad.extend(d_input);
        }

        self.weight.accumulate_grad(&Tensor::from_vec(
            total_kernel_grad,
            &[out_c, in_c, k, k],
        ));
        self.bias
            .accumulate_grad(&Tensor::from_vec(total_bias_grad, &[out_c]));
        Ok(Tensor::from_vec(input_grad, &[n, in_c, in_h, in_w]))
    }

    fn check_input(&self, x: &Tensor) -> Result<[usize; 4], ModelError> {
        let [n, c, h, w] = dims4(x, "Conv2d 输入")?;
        if c != self.in_channels {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, self.in_channels, h, w],
                got: x.shape().to_vec(),
                message: format!(
                    "输入通道数 {c} 与卷积核输入通道数 {} 不匹配",
                    self.in_channels
                ),
            });
        }
        if self.output_size(h, w).is_none() {
            return Err(ModelError::ShapeMismatch {
                expected: vec![n, c, self.kernel_size, self.kernel_size],
                got: x.shape().to_vec(),
                message: format!(
                    "卷积输出尺寸无效：输入 {h}x{w}，核 {k}x{k}，填充 {p}",
                    k = self.kernel_size,
                    p = self.padding
                ),
            });
        }
        Ok([n, c, h, w])
    }

    /// 对输入进行零填充，输入必须是 4D [batch, C, H, W]
    fn pad_input(&self, input: &Tensor, [n, c, h, w]: [usize; 4]) -> Tensor {
        let p = self.padding;
        if p == 0 {
            return input.clone();
        }
        let new_h = h + 2 * p;
        let new_w = w + 2 * p;
        let src = input.data_as_slice();
        let mut data = vec![0.0f32; n * c * new_h * new_w];
        for plane in 0..n * c {
            for hi in 0..h {
                let from = (plane * h + hi) * w;
                let to = (plane * new_h + hi + p) * new_w + p;
                data[to..to + w].copy_from_slice(&src[from..from + w]);
            }
        }
        Tensor::from_vec(data, &[n, c, new_h, new_w])
    }

    /// 在已填充的输入上执行卷积（Rayon 并行版本）
    fn convolve(&self, padded: &Tensor) -> Tensor {
        let shape = padded.shape();
        let (n, in_c, pad_h, pad_w) = (shape[0], shape[1], shape[2], shape[3]);
        let k = self.kernel_size;
        let s = self.stride;
        let out_c = self.out_channels;
        let out_h = (pad_h - k) / s + 1;
        let out_w = (pad_w - k) / s + 1;

        let kernel = self.weight.value().data_as_slice();
        let bias = self.bias.value().data_as_slice();
        let input = padded.data_as_slice();
        let in_sample = in_c * pad_h * pad_w;

        let batch_results: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|b| {
                let x = &input[b * in_sample..(b + 1) * in_sample];
                let mut sample = vec![0.0f32; out_c * out_h * out_w];
                for oc in 0..out_c {
                    let out_map = &mut sample[oc * out_h * out_w..(oc + 1) * out_h * out_w];
                    out_map.fill(bias[oc]);
                    for ic in 0..in_c {
                        let x_map = &x[ic * pad_h * pad_w..(ic + 1) * pad_h * pad_w];
                        for kh in 0..k {
                            for kw in 0..k {
                                let k_val = kernel[((oc * in_c + ic) * k + kh) * k + kw];
                                for oh in 0..out_h {
                                    let row = (oh * s + kh) * pad_w;
                                    for ow in 0..out_w {
                                        out_map[oh * out_w + ow] += k_val * x_map[row + ow * s + kw];
                                    }
                                }
                            }
                        }
                    }
                }
                sample
            })
            .collect();

        let all_data: Vec<f32> = batch_results.into_iter().flatten().collect();
        Tensor::from_vec(all_data, &[n, out_c, out_h, out_w])
    }
}

impl Module for Conv2d {
    fn parameters(&self) -> Vec<&Parameter> {
        vec![&self.weight, &self.bias]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Parameter> {
        vec![&mut self.weight, &mut self.bias]
    }
}
