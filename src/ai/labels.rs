use crate::ai::networks::CostNetwork;
use crate::ai::state_encoding::rows_to_tensor;
use crate::ai::{Device, InferBackend};
use crate::error::GenerationError;
use crate::puzzle::Environment;

/// Rows per forward pass when evaluating successor states.
const EVAL_CHUNK: usize = 4096;

/// Cost of a single move.
const MOVE_COST: f32 = 1.0;

/// Label every state with a one-step lookahead through the target network:
/// goal states get 0, every other state gets
/// `min over successors s' of MOVE_COST + J(s')`, where `J(goal) = 0` and
/// network estimates are clamped at 0.
pub fn label_states<E: Environment>(
    env: &E,
    network: &CostNetwork<InferBackend>,
    device: &Device,
    states: &[E::State],
) -> Result<Vec<f32>, GenerationError> {
    // Per state: (is_goal, successor range in `succ_goal`).
    let mut spans = Vec::with_capacity(states.len());
    let mut succ_goal = Vec::new();
    let mut to_eval = Vec::new();
    for state in states {
        if env.is_goal(state) {
            spans.push((true, 0..0));
            continue;
        }
        let start = succ_goal.len();
        for succ in env.successors(state) {
            let goal = env.is_goal(&succ);
            succ_goal.push(goal);
            if !goal {
                to_eval.push(succ);
            }
        }
        spans.push((false, start..succ_goal.len()));
    }

    let estimates = evaluate(env, network, device, &to_eval)?;

    // Map successor slots to their cost-to-go, goal successors cost nothing.
    let mut estimates = estimates.into_iter();
    let succ_cost: Vec<f32> = succ_goal
        .iter()
        .map(|&goal| {
            if goal {
                0.0
            } else {
                estimates.next().unwrap_or(0.0).max(0.0)
            }
        })
        .collect();

    let labels = spans
        .into_iter()
        .map(|(goal, range)| {
            if goal || range.is_empty() {
                0.0
            } else {
                succ_cost[range]
                    .iter()
                    .map(|&cost| MOVE_COST + cost)
                    .fold(f32::INFINITY, f32::min)
            }
        })
        .collect();
    Ok(labels)
}

/// Forward-only evaluation of `states`, chunked to bound tensor size.
fn evaluate<E: Environment>(
    env: &E,
    network: &CostNetwork<InferBackend>,
    device: &Device,
    states: &[E::State],
) -> Result<Vec<f32>, GenerationError> {
    let features = env.encoded_len();
    let mut out = Vec::with_capacity(states.len());
    for chunk in states.chunks(EVAL_CHUNK) {
        let mut flat = Vec::with_capacity(chunk.len() * features);
        for state in chunk {
            env.encode_into(state, &mut flat);
        }
        let values = network
            .forward(rows_to_tensor(flat, features, device))
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| GenerationError::Labeling(format!("{e:?}")))?;
        out.extend(values);
    }
    Ok(out)
}
