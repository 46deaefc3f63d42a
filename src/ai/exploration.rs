use rand::Rng;

/// Epsilon-greedy action selection with multiplicative decay.
///
/// Every call to [`EpsilonGreedy::select`] decays epsilon toward the floor,
/// whether the random or the greedy branch was taken.
#[derive(Debug, Clone)]
pub struct EpsilonGreedy {
    epsilon: f64,
    decay: f64,
    floor: f64,
}

impl EpsilonGreedy {
    pub fn new(initial: f64, decay: f64, floor: f64) -> Self {
        EpsilonGreedy {
            epsilon: initial,
            decay,
            floor,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Set epsilon directly (checkpoint restore).
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon;
    }

    /// Pick a random action with probability epsilon, else the argmax of
    /// `q_values()`. The value function is only called on the greedy branch.
    pub fn select<R, F, E>(
        &mut self,
        rng: &mut R,
        num_actions: usize,
        q_values: F,
    ) -> Result<usize, E>
    where
        R: Rng,
        F: FnOnce() -> Result<Vec<f32>, E>,
    {
        let action = if rng.random::<f64>() < self.epsilon {
            rng.random_range(0..num_actions)
        } else {
            argmax(&q_values()?)
        };
        self.decay();
        Ok(action)
    }

    fn decay(&mut self) {
        self.epsilon = (self.epsilon * self.decay).max(self.floor);
    }
}

/// Index of the largest value. Ties resolve to the lowest index.
pub fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn fixed(values: &[f32]) -> impl FnOnce() -> Result<Vec<f32>, String> + '_ {
        move || Ok(values.to_vec())
    }

    #[test]
    fn test_epsilon_follows_closed_form() {
        let (initial, decay, floor) = (0.99, 0.9, 0.05);
        let mut policy = EpsilonGreedy::new(initial, decay, floor);
        let mut rng = StdRng::seed_from_u64(0);

        for d in 1..=60 {
            policy.select(&mut rng, 2, fixed(&[0.0, 1.0])).unwrap();
            let expected = (initial * decay.powi(d)).max(floor);
            assert!(
                (policy.epsilon() - expected).abs() < 1e-9,
                "after {} decisions: {} != {}",
                d,
                policy.epsilon(),
                expected
            );
        }
        assert_eq!(policy.epsilon(), floor);
    }

    #[test]
    fn test_zero_epsilon_is_greedy_and_skips_nothing() {
        let mut policy = EpsilonGreedy::new(0.0, 0.5, 0.0);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            assert_eq!(policy.select(&mut rng, 3, fixed(&[0.1, 0.7, 0.2])), Ok(1));
        }
    }

    #[test]
    fn test_full_epsilon_never_calls_value_fn() {
        let mut policy = EpsilonGreedy::new(1.0, 1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = [false; 2];
        for _ in 0..100 {
            let greedy = || -> Result<Vec<f32>, String> { panic!("greedy branch taken") };
            seen[policy.select(&mut rng, 2, greedy).unwrap()] = true;
        }
        assert!(seen[0] && seen[1]);
    }

    #[test]
    fn test_value_error_propagates() {
        let mut policy = EpsilonGreedy::new(0.0, 1.0, 0.0);
        let mut rng = StdRng::seed_from_u64(3);
        let failing = || Err::<Vec<f32>, _>("tensor read failed".to_string());
        assert_eq!(
            policy.select(&mut rng, 2, failing),
            Err("tensor read failed".to_string())
        );
    }

    #[test]
    fn test_argmax() {
        assert_eq!(argmax(&[0.5, -1.0, 2.0]), 2);
        assert_eq!(argmax(&[1.0, 1.0]), 0);
    }
}
