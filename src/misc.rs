// Copyright 2025 Simo Sorce
// See LICENSE.txt file for terms

//! Misc utilities that do not really belong in any module

use crate::pkcs11::CK_ULONG;

/// Size in bytes of a CK_ULONG
pub const CK_ULONG_SIZE: usize = std::mem::size_of::<CK_ULONG>();

/// Fixed width of numeric values in the serialized template wire format
pub const WIRE_NUM_SIZE: usize = 8;

/// Overwrites a buffer with zeros in a way the compiler is not allowed
/// to optimize away. Used to clear attribute values that held key
/// material.
pub fn zeromem(mem: &mut [u8]) {
    for b in mem.iter_mut() {
        unsafe {
            std::ptr::write_volatile(b, 0);
        }
    }
    std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeromem_clears_buffer() {
        let mut buf = vec![0xa5u8; 32];
        zeromem(buf.as_mut_slice());
        assert!(buf.iter().all(|b| *b == 0));
    }
}
