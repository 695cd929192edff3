//! Adam optimizer over named ndarray parameters.
//!
//! Reference: Kingma & Ba (2014), "Adam: A Method for Stochastic
//! Optimization". Bias-corrected first/second moment estimates with
//! per-parameter adaptive learning rates. Each parameter is identified
//! by name; state is allocated lazily on the first update.

use ndarray::{Array, ArrayD, Dimension, Zip};
use std::collections::HashMap;

struct Slot {
    m: ArrayD<f32>,
    v: ArrayD<f32>,
    step: i32,
}

/// Adam optimizer.
pub struct Adam {
    lr: f32,
    beta1: f32,
    beta2: f32,
    eps: f32,
    state: HashMap<String, Slot>,
}

impl Adam {
    /// Create an Adam optimizer with the given learning rate and the
    /// standard moment decay rates (0.9, 0.999).
    pub fn new(lr: f32) -> Self {
        Self {
            lr,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            state: HashMap::new(),
        }
    }

    /// Apply one update step to `param` using `grad`.
    ///
    /// The name keys the moment state; the same parameter must always be
    /// updated under the same name and shape.
    pub fn update<D: Dimension>(&mut self, name: &str, param: &mut Array<f32, D>, grad: &Array<f32, D>) {
        let (lr, beta1, beta2, eps) = (self.lr, self.beta1, self.beta2, self.eps);
        let grad = grad.view().into_dyn();
        let slot = self.state.entry(name.to_string()).or_insert_with(|| Slot {
            m: ArrayD::zeros(grad.shape()),
            v: ArrayD::zeros(grad.shape()),
            step: 0,
        });
        slot.step += 1;

        Zip::from(&mut slot.m)
            .and(&grad)
            .for_each(|m, &g| *m = beta1 * *m + (1.0 - beta1) * g);
        Zip::from(&mut slot.v)
            .and(&grad)
            .for_each(|v, &g| *v = beta2 * *v + (1.0 - beta2) * g * g);

        let bias1 = 1.0 - beta1.powi(slot.step);
        let bias2 = 1.0 - beta2.powi(slot.step);

        let mut param = param.view_mut().into_dyn();
        Zip::from(&mut param)
            .and(&slot.m)
            .and(&slot.v)
            .for_each(|p, &m, &v| {
                let m_hat = m / bias1;
                let v_hat = v / bias2;
                *p -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, arr2, Array1};

    #[test]
    fn test_step_moves_against_gradient() {
        let mut opt = Adam::new(0.1);
        let mut p: Array1<f32> = arr1(&[1.0, -1.0]);
        let g = arr1(&[1.0, -1.0]);
        opt.update("p", &mut p, &g);
        assert!(p[0] < 1.0);
        assert!(p[1] > -1.0);
    }

    #[test]
    fn test_state_is_per_name() {
        let mut opt = Adam::new(0.1);
        let mut a = arr2(&[[1.0f32]]);
        let mut b = arr2(&[[1.0f32]]);
        let g = arr2(&[[1.0f32]]);
        for _ in 0..5 {
            opt.update("a", &mut a, &g);
        }
        opt.update("b", &mut b, &g);
        // "a" took five steps, "b" only one.
        assert!(a[[0, 0]] < b[[0, 0]]);
    }

    #[test]
    fn test_converges_on_quadratic() {
        // Minimize (x - 3)^2; gradient = 2(x - 3).
        let mut opt = Adam::new(0.05);
        let mut x = arr1(&[0.0f32]);
        for _ in 0..2000 {
            let g = arr1(&[2.0 * (x[0] - 3.0)]);
            opt.update("x", &mut x, &g);
        }
        assert!((x[0] - 3.0).abs() < 0.05, "x = {}", x[0]);
    }
}
