use std::fmt;

use super::PipelineStateAccess;

pub const MAX_COLOR_TARGETS: usize = 8;

/// Bind group slots. Shader resources, samplers, uniform and storage
/// bindings of every stage live in these.
pub const MAX_BIND_GROUPS: usize = 4;

/// Backend object types stored in a [`BoundState`].
pub trait StateHandles {
    type View: Clone;
    type BindGroup: Clone;
    type Pipeline: Clone;
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    #[inline]
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Everything an immediate-mode context keeps bound between draws.
///
/// The pipeline object covers shaders, rasterizer, depth-stencil and blend
/// states, vertex input layout and primitive topology.
pub struct BoundState<H: StateHandles> {
    pub color_targets: [Option<H::View>; MAX_COLOR_TARGETS],
    pub depth_stencil: Option<H::View>,
    pub bind_groups: [Option<H::BindGroup>; MAX_BIND_GROUPS],
    pub viewport: Option<Viewport>,
    pub pipeline: Option<H::Pipeline>,
    pub blend_constant: [f64; 4],
    pub stencil_reference: u32,
    pub scissor: Option<ScissorRect>,
}

impl<H: StateHandles> BoundState<H> {
    /// Number of leading color targets bound without gaps.
    pub fn color_target_count(&self) -> usize {
        self.color_targets.iter().take_while(|t| t.is_some()).count()
    }
}

impl<H: StateHandles> Default for BoundState<H> {
    fn default() -> Self {
        Self {
            color_targets: std::array::from_fn(|_| None),
            depth_stencil: None,
            bind_groups: std::array::from_fn(|_| None),
            viewport: None,
            pipeline: None,
            blend_constant: [0.0; 4],
            stencil_reference: 0,
            scissor: None,
        }
    }
}

impl<H: StateHandles> Clone for BoundState<H> {
    fn clone(&self) -> Self {
        Self {
            color_targets: self.color_targets.clone(),
            depth_stencil: self.depth_stencil.clone(),
            bind_groups: self.bind_groups.clone(),
            viewport: self.viewport,
            pipeline: self.pipeline.clone(),
            blend_constant: self.blend_constant,
            stencil_reference: self.stencil_reference,
            scissor: self.scissor,
        }
    }
}

impl<H> PartialEq for BoundState<H>
where
    H: StateHandles,
    H::View: PartialEq,
    H::BindGroup: PartialEq,
    H::Pipeline: PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.color_targets == other.color_targets
            && self.depth_stencil == other.depth_stencil
            && self.bind_groups == other.bind_groups
            && self.viewport == other.viewport
            && self.pipeline == other.pipeline
            && self.blend_constant == other.blend_constant
            && self.stencil_reference == other.stencil_reference
            && self.scissor == other.scissor
    }
}

impl<H: StateHandles> fmt::Debug for BoundState<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundState")
            .field("color_targets", &self.color_target_count())
            .field("depth_stencil", &self.depth_stencil.is_some())
            .field(
                "bind_groups",
                &self.bind_groups.iter().filter(|g| g.is_some()).count(),
            )
            .field("viewport", &self.viewport)
            .field("pipeline", &self.pipeline.is_some())
            .field("blend_constant", &self.blend_constant)
            .field("stencil_reference", &self.stencil_reference)
            .field("scissor", &self.scissor)
            .finish()
    }
}

impl<H: StateHandles> PipelineStateAccess for BoundState<H> {
    type Snapshot = BoundState<H>;

    fn capture(&self) -> Self::Snapshot {
        self.clone()
    }

    fn unbind_render_targets(&mut self) {
        self.color_targets = std::array::from_fn(|_| None);
        self.depth_stencil = None;
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        let BoundState {
            color_targets,
            depth_stencil,
            bind_groups,
            viewport,
            pipeline,
            blend_constant,
            stencil_reference,
            scissor,
        } = snapshot;

        self.color_targets = color_targets;
        self.depth_stencil = depth_stencil;
        self.bind_groups = bind_groups;
        self.viewport = viewport;
        self.pipeline = pipeline;
        self.blend_constant = blend_constant;
        self.stencil_reference = stencil_reference;
        self.scissor = scissor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::StateGuard;

    use std::rc::Rc;

    /// Reference-counted handles so released references are observable.
    struct Handles;

    impl StateHandles for Handles {
        type View = Rc<&'static str>;
        type BindGroup = Rc<u32>;
        type Pipeline = Rc<&'static str>;
    }

    fn populated() -> BoundState<Handles> {
        let mut s = BoundState::<Handles>::default();
        s.color_targets[0] = Some(Rc::new("scene color"));
        s.color_targets[1] = Some(Rc::new("velocity"));
        s.depth_stencil = Some(Rc::new("scene depth"));
        s.bind_groups[0] = Some(Rc::new(10));
        s.bind_groups[2] = Some(Rc::new(12));
        s.viewport = Some(Viewport::full(1280, 720));
        s.pipeline = Some(Rc::new("lit"));
        s.blend_constant = [0.5, 0.5, 0.5, 1.0];
        s.stencil_reference = 3;
        s.scissor = Some(ScissorRect { x: 0, y: 0, width: 640, height: 360 });
        s
    }

    #[test]
    fn capture_then_restore_is_identity() {
        let mut state = populated();
        let before = state.clone();
        drop(StateGuard::new(&mut state));
        assert_eq!(state, before);
    }

    #[test]
    fn restores_after_rebinding_everything() {
        let mut state = populated();
        let before = state.clone();
        {
            let mut g = StateGuard::new(&mut state);
            g.color_targets[0] = Some(Rc::new("vector target"));
            g.color_targets[1] = None;
            g.depth_stencil = None;
            g.bind_groups = std::array::from_fn(|i| Some(Rc::new(i as u32)));
            g.viewport = Some(Viewport::full(256, 256));
            g.pipeline = Some(Rc::new("blit"));
            g.blend_constant = [0.0; 4];
            g.stencil_reference = 0;
            g.scissor = None;
        }
        assert_eq!(state, before);
        assert_eq!(state.color_target_count(), 2);
    }

    #[test]
    fn snapshot_references_are_released() {
        let pipeline = Rc::new("lit");
        let mut state = BoundState::<Handles>::default();
        state.pipeline = Some(pipeline.clone());
        {
            let _g = StateGuard::new(&mut state);
            assert_eq!(Rc::strong_count(&pipeline), 3);
        }
        assert_eq!(Rc::strong_count(&pipeline), 2);
    }

    #[test]
    fn unbind_clears_only_targets() {
        let mut state = populated();
        state.unbind_render_targets();
        assert_eq!(state.color_target_count(), 0);
        assert!(state.depth_stencil.is_none());
        assert!(state.pipeline.is_some());
        assert!(state.bind_groups[0].is_some());
    }
}
