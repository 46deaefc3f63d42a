//! Monte-Carlo return computation.

/// Added to the standard deviation when normalizing.
const NORMALIZE_EPS: f32 = 1e-5;

/// Discounted cumulative future reward for every step of an episode.
///
/// Computed by a backward scan: `G_t = r_t + gamma * G_{t+1}`.
pub fn discounted_returns(rewards: &[f32], gamma: f32) -> Vec<f32> {
    let mut returns = vec![0.0f32; rewards.len()];
    let mut running = 0.0f32;
    for (i, &r) in rewards.iter().enumerate().rev() {
        running = r + gamma * running;
        returns[i] = running;
    }
    returns
}

/// Normalize to zero mean and unit (sample) variance. Single-step episodes
/// are left untouched.
pub fn normalize_returns(returns: &mut [f32]) {
    let n = returns.len();
    if n < 2 {
        return;
    }
    let mean = returns.iter().sum::<f32>() / n as f32;
    let var = returns.iter().map(|g| (g - mean).powi(2)).sum::<f32>() / (n - 1) as f32;
    let std = var.sqrt() + NORMALIZE_EPS;
    for g in returns.iter_mut() {
        *g = (*g - mean) / std;
    }
}
