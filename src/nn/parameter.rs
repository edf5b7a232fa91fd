use crate::tensor::Tensor;

/// 可训练参数：值与累积梯度成对保存
#[derive(Debug, Clone)]
pub struct Parameter {
    name: String,
    value: Tensor,
    grad: Tensor,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        let grad = Tensor::zeros(value.shape());
        Self {
            name: name.into(),
            value,
            grad,
        }
    }

    /// 参数的全名，如`blocks.0.conv.weight`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }

    pub fn grad(&self) -> &Tensor {
        &self.grad
    }

    /// 将`grad`累加到已有梯度上（反向传播时调用）
    pub(crate) fn accumulate_grad(&mut self, grad: &Tensor) {
        self.grad += grad;
    }

    pub fn zero_grad(&mut self) {
        self.grad = Tensor::zeros(self.value.shape());
    }
}

/// 不参与梯度计算、但属于权重状态的张量（如批归一化的滑动统计量）
#[derive(Debug, Clone)]
pub struct Buffer {
    name: String,
    value: Tensor,
}

impl Buffer {
    pub fn new(name: impl Into<String>, value: Tensor) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Tensor {
        &mut self.value
    }
}
