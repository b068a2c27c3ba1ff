/// Configuration and codec errors. Arithmetic kernels themselves are
/// infallible; preconditions on them are documented and debug-asserted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("limb width must be nonzero")]
    WordSizeZero,
    #[error("limb width {0} exceeds the 32-bit maximum")]
    WordSizeTooLarge(u32),
    #[error("modulus must be odd")]
    ModulusEven,
    #[error("montgomery radix 2^{k} must exceed 4 times the modulus")]
    RadixTooSmall { k: u32 },
    #[error("expected {expected} bytes, got {got}")]
    InvalidByteLength { expected: usize, got: usize },
}
