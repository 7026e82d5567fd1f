/// Step decay: lr = initial · γ^⌊epoch / step_size⌋.
/// Stepped once per epoch, after training and validation.
#[derive(Debug, Clone)]
pub struct StepLr {
    initial:   f64,
    step_size: usize,
    gamma:     f64,
    epoch:     usize,
}

impl StepLr {
    pub fn new(initial: f64, step_size: usize, gamma: f64) -> Self {
        Self { initial, step_size: step_size.max(1), gamma, epoch: 0 }
    }

    pub fn lr(&self) -> f64 {
        self.initial * self.gamma.powi((self.epoch / self.step_size) as i32)
    }

    pub fn step(&mut self) -> f64 {
        self.epoch += 1;
        self.lr()
    }
}
