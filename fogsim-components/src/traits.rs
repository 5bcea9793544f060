// Copyright (c) 2026 Graphcore Ltd. All rights reserved.

//! Traits implemented by payloads that flow through components.

/// The size of an object in bytes, used to derive transfer times.
pub trait TotalBytes {
    /// Return the total number of bytes in this object.
    fn total_bytes(&self) -> usize;
}

impl TotalBytes for i32 {
    fn total_bytes(&self) -> usize {
        std::mem::size_of::<i32>()
    }
}

impl TotalBytes for usize {
    fn total_bytes(&self) -> usize {
        *self
    }
}
