//! Target-network synchronization.
//!
//! Parameters are enumerated in module traversal order, which is identical for
//! two networks built from the same config. Blending pulls the live values
//! out as [`TensorData`] and rebuilds every target tensor from fresh buffers,
//! so the target never aliases live storage.

use burn::module::{Module, ModuleMapper, ModuleVisitor, ParamId};
use burn::prelude::*;
use burn::tensor::TensorData;

use crate::ai::networks::CostNetwork;
use crate::error::SyncError;

/// Snapshot of every float parameter, in traversal order.
pub fn parameters<B: Backend>(module: &CostNetwork<B>) -> Vec<TensorData> {
    let mut collector = ParamCollector { params: Vec::new() };
    module.visit(&mut collector);
    collector.params
}

/// Shapes of every float parameter, in traversal order.
pub fn parameter_shapes<B: Backend>(module: &CostNetwork<B>) -> Vec<Vec<usize>> {
    let mut collector = ShapeCollector { shapes: Vec::new() };
    module.visit(&mut collector);
    collector.shapes
}

/// Check that `target` and `live` enumerate parameters of identical shapes.
pub fn check_structure<B: Backend>(
    target: &CostNetwork<B>,
    live: &CostNetwork<B>,
) -> Result<(), SyncError> {
    let target = parameter_shapes(target);
    let live = parameter_shapes(live);
    if target.len() != live.len() {
        return Err(SyncError::ParameterCount {
            target: target.len(),
            live: live.len(),
        });
    }
    for (index, (t, l)) in target.into_iter().zip(live).enumerate() {
        if t != l {
            return Err(SyncError::ShapeMismatch {
                index,
                target: t,
                live: l,
            });
        }
    }
    Ok(())
}

/// Polyak update: every target parameter becomes
/// `tau * live + (1 - tau) * target`. `tau = 1` is an exact copy.
pub fn soft_update<B: Backend>(
    target: CostNetwork<B>,
    live: &CostNetwork<B>,
    tau: f32,
) -> Result<CostNetwork<B>, SyncError> {
    if !(tau > 0.0 && tau <= 1.0) {
        return Err(SyncError::InvalidTau(tau));
    }
    check_structure(&target, live)?;

    let mut mapper = BlendMapper {
        live: parameters(live).into_iter(),
        tau,
    };
    Ok(target.map(&mut mapper))
}

/// Overwrite every target parameter with the live value.
pub fn hard_copy<B: Backend>(
    target: CostNetwork<B>,
    live: &CostNetwork<B>,
) -> Result<CostNetwork<B>, SyncError> {
    soft_update(target, live, 1.0)
}

struct ParamCollector {
    params: Vec<TensorData>,
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.params.push(tensor.to_data());
    }
}

struct ShapeCollector {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ShapeCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.shapes.push(tensor.dims().to_vec());
    }
}

struct BlendMapper {
    live: std::vec::IntoIter<TensorData>,
    tau: f32,
}

impl<B: Backend> ModuleMapper<B> for BlendMapper {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        // Structure was checked up front; running dry would mean it changed mid-map.
        let Some(live) = self.live.next() else {
            return tensor;
        };
        let live = Tensor::<B, D>::from_data(live, &tensor.device());
        if self.tau >= 1.0 {
            return live;
        }
        live.mul_scalar(self.tau)
            .add(tensor.mul_scalar(1.0 - self.tau))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::networks::CostNetworkConfig;
    use crate::ai::InferBackend;

    fn net(hidden: usize) -> CostNetwork<InferBackend> {
        let device = Default::default();
        CostNetworkConfig::new(9)
            .with_hidden_size(hidden)
            .init::<InferBackend>(&device)
    }

    fn flat(params: &[TensorData]) -> Vec<f32> {
        params
            .iter()
            .flat_map(|p| p.to_vec::<f32>().unwrap())
            .collect()
    }

    #[test]
    fn test_soft_update_blends_every_parameter() {
        let target = net(6);
        let live = net(6);
        let before_t = flat(&parameters(&target));
        let before_l = flat(&parameters(&live));

        for tau in [0.25f32, 0.5, 0.9] {
            let updated = soft_update(target.clone(), &live, tau).unwrap();
            let after = flat(&parameters(&updated));
            assert_eq!(after.len(), before_t.len());
            for i in 0..after.len() {
                let expected = tau * before_l[i] + (1.0 - tau) * before_t[i];
                assert!(
                    (after[i] - expected).abs() < 1e-5,
                    "tau {tau} param {i}: {} vs {expected}",
                    after[i]
                );
            }
        }
    }

    #[test]
    fn test_tau_one_is_exact_copy() {
        let live = net(6);
        let updated = soft_update(net(6), &live, 1.0).unwrap();
        assert_eq!(flat(&parameters(&updated)), flat(&parameters(&live)));
    }

    #[test]
    fn test_tiny_tau_leaves_target_unchanged() {
        let target = net(6);
        let before = flat(&parameters(&target));
        let updated = soft_update(target, &net(6), 1e-9).unwrap();
        let after = flat(&parameters(&updated));
        for (a, b) in after.iter().zip(&before) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_hard_copy_then_networks_agree() {
        let live = net(4);
        let target = hard_copy(net(4), &live).unwrap();
        let device = Default::default();
        let input = Tensor::<InferBackend, 2>::ones([3, 9], &device);
        let a: Vec<f32> = live.forward(input.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = target.forward(input).into_data().to_vec().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_tau_rejected() {
        for tau in [0.0f32, -0.1, 1.5, f32::NAN] {
            let err = soft_update(net(4), &net(4), tau).unwrap_err();
            assert!(matches!(err, SyncError::InvalidTau(_)));
        }
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let err = soft_update(net(4), &net(5), 0.5).unwrap_err();
        assert!(
            matches!(err, SyncError::ShapeMismatch { index: 0, .. }),
            "got {err}"
        );
    }

    #[test]
    fn test_parameter_count_mismatch_rejected() {
        let device = Default::default();
        let deeper = CostNetworkConfig::new(9)
            .with_hidden_size(4)
            .with_num_hidden_layers(3)
            .init::<InferBackend>(&device);
        let err = soft_update(net(4), &deeper, 0.5).unwrap_err();
        assert!(matches!(
            err,
            SyncError::ParameterCount { target: 6, live: 8 }
        ));
    }

    #[test]
    fn test_shapes_follow_layer_order() {
        let shapes = parameter_shapes(&net(4));
        assert_eq!(
            shapes,
            vec![
                vec![9, 4],
                vec![4],
                vec![4, 4],
                vec![4],
                vec![4, 1],
                vec![1]
            ]
        );
    }
}
