use std::ops::{Deref, DerefMut};

/// A context whose bound pipeline state can be captured and restored.
pub trait PipelineStateAccess {
    /// Owned copy of every binding; holding it keeps the bound objects alive.
    type Snapshot;

    fn capture(&self) -> Self::Snapshot;

    /// Unbinds color and depth targets so no resource is bound as both input
    /// and output while restoring.
    fn unbind_render_targets(&mut self);

    /// Rebinds everything in `snapshot`, in capture order.
    fn restore(&mut self, snapshot: Self::Snapshot);
}

/// Scoped capture of a context's pipeline state.
///
/// Captures on construction. On drop, unbinds render targets, restores the
/// snapshot, and releases it. The guard derefs to the context so the guarded
/// code draws through it.
pub struct StateGuard<'a, C: PipelineStateAccess> {
    context: &'a mut C,
    saved: Option<C::Snapshot>,
}

impl<'a, C: PipelineStateAccess> StateGuard<'a, C> {
    pub fn new(context: &'a mut C) -> Self {
        let saved = Some(context.capture());
        Self { context, saved }
    }
}

impl<C: PipelineStateAccess> Deref for StateGuard<'_, C> {
    type Target = C;

    #[inline]
    fn deref(&self) -> &C {
        self.context
    }
}

impl<C: PipelineStateAccess> DerefMut for StateGuard<'_, C> {
    #[inline]
    fn deref_mut(&mut self) -> &mut C {
        self.context
    }
}

impl<C: PipelineStateAccess> Drop for StateGuard<'_, C> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            self.context.unbind_render_targets();
            self.context.restore(saved);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::panic::{AssertUnwindSafe, catch_unwind};

    /// Context recording every call made on it.
    #[derive(Default)]
    struct Recorder {
        target: Option<u32>,
        shader: Option<u32>,
        log: Vec<String>,
    }

    impl PipelineStateAccess for Recorder {
        type Snapshot = (Option<u32>, Option<u32>);

        fn capture(&self) -> Self::Snapshot {
            (self.target, self.shader)
        }

        fn unbind_render_targets(&mut self) {
            self.target = None;
            self.log.push("unbind".into());
        }

        fn restore(&mut self, (target, shader): Self::Snapshot) {
            self.target = target;
            self.log.push(format!("target {target:?}"));
            self.shader = shader;
            self.log.push(format!("shader {shader:?}"));
        }
    }

    #[test]
    fn unbinds_before_restoring_in_capture_order() {
        let mut ctx = Recorder {
            target: Some(1),
            shader: Some(2),
            ..Recorder::default()
        };
        {
            let mut g = StateGuard::new(&mut ctx);
            g.target = Some(9);
            g.shader = None;
        }
        assert_eq!(ctx.log, vec!["unbind", "target Some(1)", "shader Some(2)"]);
        assert_eq!((ctx.target, ctx.shader), (Some(1), Some(2)));
    }

    #[test]
    fn restores_when_unwinding() {
        let mut ctx = Recorder {
            target: Some(4),
            ..Recorder::default()
        };
        let result = catch_unwind(AssertUnwindSafe(|| {
            let mut g = StateGuard::new(&mut ctx);
            g.target = Some(5);
            panic!("vector renderer failed");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.target, Some(4));
    }
}
