use std::collections::VecDeque;

/// One typed argument for the next renderlet invocation.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Param {
    I32(u32),
    I64(u64),
    F32(f32),
    F64(f64),
}

impl From<u32> for Param {
    #[inline]
    fn from(v: u32) -> Self {
        Param::I32(v)
    }
}

impl From<i32> for Param {
    #[inline]
    fn from(v: i32) -> Self {
        Param::I32(v as u32)
    }
}

impl From<u64> for Param {
    #[inline]
    fn from(v: u64) -> Self {
        Param::I64(v)
    }
}

impl From<i64> for Param {
    #[inline]
    fn from(v: i64) -> Self {
        Param::I64(v as u64)
    }
}

impl From<f32> for Param {
    #[inline]
    fn from(v: f32) -> Self {
        Param::F32(v)
    }
}

impl From<f64> for Param {
    #[inline]
    fn from(v: f64) -> Self {
        Param::F64(v)
    }
}

impl From<Param> for wasmtime::Val {
    fn from(p: Param) -> Self {
        match p {
            Param::I32(v) => wasmtime::Val::I32(v as i32),
            Param::I64(v) => wasmtime::Val::I64(v as i64),
            Param::F32(v) => wasmtime::Val::F32(v.to_bits()),
            Param::F64(v) => wasmtime::Val::F64(v.to_bits()),
        }
    }
}

/// FIFO of parameters consumed by the next invocation.
///
/// Not synchronized: one renderlet is driven from one thread.
#[derive(Debug, Default, Clone)]
pub struct ParamQueue {
    queue: VecDeque<Param>,
}

impl ParamQueue {
    #[inline]
    pub fn push(&mut self, param: impl Into<Param>) {
        self.queue.push_back(param.into());
    }

    /// Empties the queue without invoking anything.
    #[inline]
    pub fn reset(&mut self) {
        self.queue.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes every queued parameter in push order.
    pub fn drain(&mut self) -> Vec<Param> {
        self.queue.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_push_order() {
        let mut q = ParamQueue::default();
        q.push(1u32);
        q.push(2.5f32);
        q.push(7u64);
        q.push(0.25f64);

        assert_eq!(
            q.drain(),
            vec![Param::I32(1), Param::F32(2.5), Param::I64(7), Param::F64(0.25)]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn reset_discards_everything() {
        let mut q = ParamQueue::default();
        q.push(-1i32);
        q.push(-1i64);
        assert_eq!(q.len(), 2);
        q.reset();
        assert!(q.drain().is_empty());
    }

    #[test]
    fn converts_to_native_values() {
        assert!(matches!(wasmtime::Val::from(Param::I32(u32::MAX)), wasmtime::Val::I32(-1)));
        match wasmtime::Val::from(Param::F32(1.5)) {
            wasmtime::Val::F32(bits) => assert_eq!(f32::from_bits(bits), 1.5),
            other => panic!("unexpected {other:?}"),
        }
        match wasmtime::Val::from(Param::F64(-2.0)) {
            wasmtime::Val::F64(bits) => assert_eq!(f64::from_bits(bits), -2.0),
            other => panic!("unexpected {other:?}"),
        }
    }
}
