use burn::prelude::*;
use burn::tensor::TensorData;

use crate::error::TrainingError;

/// Encode a single observation as a tensor of shape [1, dim].
pub fn encode_observation<B: Backend>(observation: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(
        TensorData::new(observation.to_vec(), [1, observation.len()]),
        device,
    )
}

/// Encode a batch of equally sized observations as a tensor of shape [batch, dim].
pub fn encode_observations<B: Backend, O: AsRef<[f32]>>(
    observations: &[O],
    device: &B::Device,
) -> Tensor<B, 2> {
    let dim = observations.first().map_or(0, |o| o.as_ref().len());
    let mut flat = Vec::with_capacity(observations.len() * dim);
    for obs in observations {
        flat.extend_from_slice(obs.as_ref());
    }
    Tensor::from_data(TensorData::new(flat, [observations.len(), dim]), device)
}

/// One-hot mask of shape [batch, num_actions] selecting the taken actions.
pub fn action_mask<B: Backend>(
    actions: &[usize],
    num_actions: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let mut data = vec![0.0f32; actions.len() * num_actions];
    for (i, &a) in actions.iter().enumerate() {
        data[i * num_actions + a] = 1.0;
    }
    Tensor::from_data(TensorData::new(data, [actions.len(), num_actions]), device)
}

/// Column tensor of shape [batch, 1] from scalar values.
pub fn column<B: Backend>(values: &[f32], device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(values.to_vec(), [values.len(), 1]), device)
}

/// Pull f32 values out of a tensor.
pub fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>, TrainingError> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrainingError::TensorData(format!("{e:?}")))
}

/// Extract a single scalar (e.g. a loss).
pub fn to_scalar<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<f32, TrainingError> {
    to_vec(tensor)?
        .first()
        .copied()
        .ok_or_else(|| TrainingError::TensorData("empty tensor".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_encode_observations_shape() {
        let device = Default::default();
        let obs = vec![vec![0.1, 0.2, 0.3, 0.4], vec![1.0, 2.0, 3.0, 4.0]];
        let t = encode_observations::<TestBackend, _>(&obs, &device);
        assert_eq!(t.shape().dims, [2, 4]);
        let data = to_vec(t).unwrap();
        assert_eq!(data[4..], [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_encode_single_observation() {
        let device = Default::default();
        let t = encode_observation::<TestBackend>(&[0.0, 1.0, 2.0, 3.0], &device);
        assert_eq!(t.shape().dims, [1, 4]);
    }

    #[test]
    fn test_action_mask() {
        let device = Default::default();
        let mask = action_mask::<TestBackend>(&[1, 0, 1], 2, &device);
        assert_eq!(mask.shape().dims, [3, 2]);
        assert_eq!(to_vec(mask).unwrap(), vec![0.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_to_scalar() {
        let device = Default::default();
        let t = column::<TestBackend>(&[2.5], &device);
        assert_eq!(to_scalar(t).unwrap(), 2.5);
    }
}
