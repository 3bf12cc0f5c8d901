use memmap2::{MmapMut, MmapOptions};

const PAGE_SIZE: usize = 4096;

/// An anonymous memory map holding a fixed number of `u64` samples.
///
/// The map is page aligned, so it can be viewed as `[u64]` without copies.
pub(crate) struct SampleMmap {
    mmap: MmapMut,
    capacity: usize,
}

impl SampleMmap {
    pub fn new(capacity: usize) -> Result<Self, std::io::Error> {
        let len = capacity.checked_mul(size_of::<u64>()).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} samples overflow the addressable size", capacity),
            )
        })?;
        let mmap = MmapOptions::new().len(len).map_anon()?;
        Ok(Self { mmap, capacity })
    }

    /// Touches every page so first writes during capture do not fault.
    pub fn prefault(&mut self) {
        let len = self.mmap.len();
        let ptr = self.mmap.as_mut_ptr();
        let mut offset = 0;
        while offset < len {
            unsafe {
                std::ptr::write_volatile(ptr.add(offset), 0u8);
            }
            offset += PAGE_SIZE;
        }
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[u64] {
        bytemuck::cast_slice(&self.mmap[..])
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [u64] {
        bytemuck::cast_slice_mut(&mut self.mmap[..])
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_anonymous_is_zeroed() {
        let samples = SampleMmap::new(1024).unwrap();
        assert_eq!(samples.capacity(), 1024);
        assert_eq!(samples.as_slice().len(), 1024);
        assert!(samples.as_slice().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_oversized_capacity_is_rejected() {
        let err = SampleMmap::new(usize::MAX / 4).err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_write_and_read_back() {
        let mut samples = SampleMmap::new(16).unwrap();
        samples.as_mut_slice()[3] = 42;
        samples.as_mut_slice()[15] = u64::MAX;
        assert_eq!(samples.as_slice()[3], 42);
        assert_eq!(samples.as_slice()[15], u64::MAX);
    }

    #[test]
    fn test_prefault_keeps_contents() {
        let mut samples = SampleMmap::new(4 * PAGE_SIZE).unwrap();
        samples.as_mut_slice()[1] = 7;
        samples.prefault();
        assert_eq!(samples.as_slice()[1], 7);
        assert_eq!(samples.as_slice()[0], 0);
    }
}
