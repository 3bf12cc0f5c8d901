pub(crate) mod sample_mmap;
