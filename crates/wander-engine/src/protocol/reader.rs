use crate::error::ProtocolError;

/// Sequential little-endian reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], ProtocolError> {
        let data = self.data;
        let start = self.pos;
        let slice = start
            .checked_add(len)
            .and_then(|end| data.get(start..end))
            .ok_or(ProtocolError::Truncated {
                offset: start,
                needed: len,
                available: data.len(),
            })?;
        self.pos += len;
        Ok(slice)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], ProtocolError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, ProtocolError> {
        self.array().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32, ProtocolError> {
        self.array().map(i32::from_le_bytes)
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, ProtocolError> {
        self.array().map(f32::from_le_bytes)
    }

    /// Reads a plain-old-data value stored with its native layout.
    pub fn pod<T: bytemuck::Pod>(&mut self) -> Result<T, ProtocolError> {
        let bytes = self.bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_sequentially() {
        let data = [1, 0, 0, 0, 0xff, 0xff, 0xff, 0xff, 0, 0, 0x80, 0x3f];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.u32().unwrap(), 1);
        assert_eq!(r.i32().unwrap(), -1);
        assert_eq!(r.f32().unwrap(), 1.0);
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.position(), 12);
    }

    #[test]
    fn failed_read_does_not_advance() {
        let data = [1, 2, 3];
        let mut r = ByteReader::new(&data);
        assert!(r.u32().is_err());
        assert_eq!(r.position(), 0);
        assert_eq!(r.bytes(3).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn huge_lengths_do_not_overflow() {
        let mut r = ByteReader::at(&[0u8; 4], 2);
        assert!(matches!(
            r.bytes(usize::MAX),
            Err(ProtocolError::Truncated { offset: 2, .. })
        ));
    }
}
