//! Effect factory: builds the fixed set of per-track effect sub-graphs.
//!
//! Every chain exposes one input and one output node. Parameters arrive
//! normalized to [0, 1] and are scaled here.

use mixdeck_types::{EffectParams, EffectType};

use crate::engine::{AudioBackend, AudioParam, BackendResult, BufferId, GraphContext, NodeId, NodeKind};

const OWNER: &str = "effect";

pub const LOWPASS_MAX_HZ: f32 = 20_000.0;
pub const LOWPASS_MAX_Q: f32 = 20.0;
pub const DELAY_MAX_SECS: f32 = 1.0;
pub const DELAY_MAX_FEEDBACK: f32 = 0.9;
pub const MODULATION_MAX_RATE_HZ: f32 = 5.0;
const FLANGER_BASE_DELAY: f32 = 0.005;
const FLANGER_DEPTH: f32 = 0.002;
const CHORUS_BASE_DELAY: f32 = 0.03;
const CHORUS_DEPTH: f32 = 0.005;

/// Scaled parameter values for one effect type.
pub fn scaled_params(effect_type: EffectType, params: &EffectParams) -> Vec<(Role, AudioParam, f32)> {
    match effect_type {
        EffectType::None | EffectType::Reverb => Vec::new(),
        EffectType::LowPass => vec![
            (Role::Processor, AudioParam::Frequency, params.param1 * LOWPASS_MAX_HZ),
            (Role::Processor, AudioParam::Q, params.param2 * LOWPASS_MAX_Q),
        ],
        EffectType::Delay => vec![
            (Role::Processor, AudioParam::DelayTime, params.param1 * DELAY_MAX_SECS),
            (Role::Feedback, AudioParam::Gain, params.param2 * DELAY_MAX_FEEDBACK),
        ],
        EffectType::Flanger | EffectType::Chorus => {
            let depth = if effect_type == EffectType::Flanger {
                FLANGER_DEPTH
            } else {
                CHORUS_DEPTH
            };
            vec![
                (Role::Lfo, AudioParam::Frequency, params.param2 * MODULATION_MAX_RATE_HZ),
                (Role::LfoDepth, AudioParam::Gain, params.param1 * depth),
            ]
        }
    }
}

/// Which node of a chain a parameter lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Processor,
    Feedback,
    Lfo,
    LfoDepth,
}

/// A built effect sub-graph.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectChain {
    pub effect_type: EffectType,
    pub input: NodeId,
    pub output: NodeId,
    feedback: Option<NodeId>,
    lfo: Option<NodeId>,
    lfo_depth: Option<NodeId>,
}

impl EffectChain {
    /// Every node owned by the chain.
    pub fn nodes(&self) -> Vec<NodeId> {
        let mut nodes = vec![self.input];
        if self.output != self.input {
            nodes.push(self.output);
        }
        nodes.extend(self.feedback);
        nodes.extend(self.lfo);
        nodes.extend(self.lfo_depth);
        nodes
    }

    fn node_for(&self, role: Role) -> Option<NodeId> {
        match role {
            Role::Processor => Some(self.input),
            Role::Feedback => self.feedback,
            Role::Lfo => self.lfo,
            Role::LfoDepth => self.lfo_depth,
        }
    }

    /// Push new parameter values into a live chain without rebuilding it.
    pub fn update_params(
        &self,
        backend: &dyn AudioBackend,
        params: &EffectParams,
        time_constant: f64,
    ) -> BackendResult {
        for (role, param, value) in scaled_params(self.effect_type, params) {
            if let Some(node) = self.node_for(role) {
                backend.set_param_smoothed(node, param, value, time_constant)?;
            }
        }
        Ok(())
    }

    /// Free every node of the chain.
    pub fn release(&self, ctx: &mut GraphContext<'_>) {
        for node in self.nodes() {
            ctx.release(node);
        }
    }
}

/// Build an effect chain. `Reverb` without an impulse falls back to a
/// passthrough. On failure every node created so far is released.
pub fn build_effect(
    ctx: &mut GraphContext<'_>,
    effect_type: EffectType,
    params: &EffectParams,
    impulse: Option<BufferId>,
    now: f64,
) -> BackendResult<EffectChain> {
    let mut created = Vec::new();
    let result = build_effect_nodes(ctx, effect_type, params, impulse, now, &mut created);
    if result.is_err() {
        for node in created {
            ctx.release(node);
        }
    }
    result
}

fn build_effect_nodes(
    ctx: &mut GraphContext<'_>,
    effect_type: EffectType,
    params: &EffectParams,
    impulse: Option<BufferId>,
    now: f64,
    created: &mut Vec<NodeId>,
) -> BackendResult<EffectChain> {
    let mut node = |ctx: &mut GraphContext<'_>, kind: NodeKind| -> BackendResult<NodeId> {
        let id = ctx.create(kind, OWNER)?;
        created.push(id);
        Ok(id)
    };

    let chain = match (effect_type, impulse) {
        (EffectType::Reverb, Some(impulse)) => {
            let convolver = node(ctx, NodeKind::Convolver)?;
            ctx.backend.assign_buffer(convolver, impulse)?;
            passthrough_shape(EffectType::Reverb, convolver)
        }
        (EffectType::None, _) | (EffectType::Reverb, None) => {
            let gain = node(ctx, NodeKind::Gain)?;
            passthrough_shape(EffectType::None, gain)
        }
        (EffectType::LowPass, _) => {
            let filter = node(ctx, NodeKind::LowPass)?;
            passthrough_shape(EffectType::LowPass, filter)
        }
        (EffectType::Delay, _) => {
            let delay = node(ctx, NodeKind::Delay)?;
            let feedback = node(ctx, NodeKind::Gain)?;
            ctx.backend.connect(delay, feedback)?;
            ctx.backend.connect(feedback, delay)?;
            EffectChain {
                feedback: Some(feedback),
                ..passthrough_shape(EffectType::Delay, delay)
            }
        }
        (EffectType::Flanger | EffectType::Chorus, _) => {
            let delay = node(ctx, NodeKind::Delay)?;
            let lfo = node(ctx, NodeKind::Oscillator)?;
            let depth = node(ctx, NodeKind::Gain)?;
            let base = if effect_type == EffectType::Flanger {
                FLANGER_BASE_DELAY
            } else {
                CHORUS_BASE_DELAY
            };
            ctx.backend.set_param(delay, AudioParam::DelayTime, base)?;
            ctx.backend.connect(lfo, depth)?;
            ctx.backend.connect_param(depth, delay, AudioParam::DelayTime)?;
            EffectChain {
                lfo: Some(lfo),
                lfo_depth: Some(depth),
                ..passthrough_shape(effect_type, delay)
            }
        }
    };

    for (role, param, value) in scaled_params(chain.effect_type, params) {
        if let Some(node) = chain.node_for(role) {
            ctx.backend.set_param(node, param, value)?;
        }
    }
    if let Some(lfo) = chain.lfo {
        ctx.backend.start_oscillator(lfo, now)?;
    }
    Ok(chain)
}

fn passthrough_shape(effect_type: EffectType, node: NodeId) -> EffectChain {
    EffectChain {
        effect_type,
        input: node,
        output: node,
        feedback: None,
        lfo: None,
        lfo_depth: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NodeAllocator, NodeRegistry, TestBackend, TestOp};

    fn params(p1: f32, p2: f32) -> EffectParams {
        EffectParams { param1: p1, param2: p2, param3: None }
    }

    fn build(backend: &TestBackend, effect_type: EffectType, p: EffectParams) -> EffectChain {
        let mut alloc = NodeAllocator::new();
        let mut registry = NodeRegistry::new();
        let mut ctx = GraphContext { backend, alloc: &mut alloc, registry: &mut registry };
        build_effect(&mut ctx, effect_type, &p, Some(7), 0.0).unwrap()
    }

    #[test]
    fn none_is_a_single_passthrough() {
        let backend = TestBackend::new();
        let chain = build(&backend, EffectType::None, params(0.5, 0.5));
        assert_eq!(chain.input, chain.output);
        assert_eq!(backend.nodes_created(NodeKind::Gain), vec![chain.input]);
    }

    #[test]
    fn reverb_uses_impulse() {
        let backend = TestBackend::new();
        let chain = build(&backend, EffectType::Reverb, params(0.5, 0.5));
        assert!(backend
            .find(|op| *op == TestOp::AssignBuffer { node_id: chain.input, bufnum: 7 })
            .is_some());
    }

    #[test]
    fn reverb_without_impulse_falls_back() {
        let backend = TestBackend::new();
        let mut alloc = NodeAllocator::new();
        let mut registry = NodeRegistry::new();
        let mut ctx = GraphContext { backend: &backend, alloc: &mut alloc, registry: &mut registry };
        let chain = build_effect(&mut ctx, EffectType::Reverb, &params(0.5, 0.5), None, 0.0).unwrap();
        assert_eq!(chain.effect_type, EffectType::None);
        assert!(backend.nodes_created(NodeKind::Convolver).is_empty());
    }

    #[test]
    fn lowpass_scaling() {
        let backend = TestBackend::new();
        let chain = build(&backend, EffectType::LowPass, params(0.25, 0.5));
        assert_eq!(backend.last_param(chain.input, AudioParam::Frequency), Some(5_000.0));
        assert_eq!(backend.last_param(chain.input, AudioParam::Q), Some(10.0));
    }

    #[test]
    fn delay_has_feedback_loop() {
        let backend = TestBackend::new();
        let chain = build(&backend, EffectType::Delay, params(0.5, 1.0));
        let feedback = chain.feedback.unwrap();
        assert_eq!(backend.connections_from(chain.input), vec![feedback]);
        assert_eq!(backend.connections_from(feedback), vec![chain.input]);
        assert_eq!(backend.last_param(chain.input, AudioParam::DelayTime), Some(0.5));
        assert!((backend.last_param(feedback, AudioParam::Gain).unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn flanger_and_chorus_modulate_delay_time() {
        for (effect_type, base, depth) in [
            (EffectType::Flanger, 0.005, 0.002),
            (EffectType::Chorus, 0.03, 0.005),
        ] {
            let backend = TestBackend::new();
            let chain = build(&backend, effect_type, params(1.0, 0.4));
            let lfo = chain.lfo.unwrap();
            let gain = chain.lfo_depth.unwrap();
            assert_eq!(backend.last_param(chain.input, AudioParam::DelayTime), Some(base));
            assert!((backend.last_param(lfo, AudioParam::Frequency).unwrap() - 2.0).abs() < 1e-6);
            assert_eq!(backend.last_param(gain, AudioParam::Gain), Some(depth));
            assert!(backend
                .find(|op| *op
                    == TestOp::ConnectParam { from: gain, to: chain.input, param: AudioParam::DelayTime })
                .is_some());
            assert!(backend.find(|op| matches!(op, TestOp::StartOscillator { .. })).is_some());
        }
    }

    #[test]
    fn release_frees_every_node() {
        let backend = TestBackend::new();
        let mut alloc = NodeAllocator::new();
        let mut registry = NodeRegistry::new();
        let mut ctx = GraphContext { backend: &backend, alloc: &mut alloc, registry: &mut registry };
        let chain = build_effect(&mut ctx, EffectType::Chorus, &params(0.5, 0.5), None, 0.0).unwrap();
        chain.release(&mut ctx);
        assert_eq!(ctx.registry.live_count(), 0);
        assert_eq!(backend.nodes_freed().len(), 3);
    }

    #[test]
    fn failed_build_releases_partial_chain() {
        let backend = TestBackend::new();
        backend.fail_param_connections(true);
        let mut alloc = NodeAllocator::new();
        let mut registry = NodeRegistry::new();
        let mut ctx = GraphContext { backend: &backend, alloc: &mut alloc, registry: &mut registry };
        assert!(build_effect(&mut ctx, EffectType::Flanger, &params(0.5, 0.5), None, 0.0).is_err());
        assert_eq!(ctx.registry.live_count(), 0);
        assert_eq!(backend.nodes_freed().len(), 3);
    }
}
