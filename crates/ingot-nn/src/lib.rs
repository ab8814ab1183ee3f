//! Convolution padding for ONNX-style 2-D convolutions.
//!
//! ONNX describes padding with explicit per-edge `pads`, while GPU
//! convolution kernels usually want an output size and a kernel placement
//! (offset into the source image). `ConvolutionPadding` converts between
//! the two for both regular and transposed convolutions.
//!
//! # Example
//!
//! ```
//! use ingot_nn::{ConvolutionPadding, Extent2, Pads};
//!
//! # fn main() -> ingot_nn::Result<()> {
//! let padding = ConvolutionPadding::new(
//!     Extent2::square(3),
//!     Extent2::square(2),
//!     Extent2::square(1),
//!     Pads::uniform(1),
//!     Extent2::square(0),
//!     false,
//! )?;
//!
//! assert_eq!(padding.output_size(Extent2::new(224, 224))?, Extent2::new(112, 112));
//! # Ok(())
//! # }
//! ```

pub mod attributes;
pub mod padding;

pub use attributes::{AttributeValue, Attributes};
pub use padding::{
    ConvolutionPadding, Destination, Dilations, EdgeMode, Extent2, ImageDescriptor, Kernel,
    KernelPlacement, Offset, Padding, Pads, Strides,
};

/// Result type using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or applying convolution padding.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Attribute error: {0}")]
    Attribute(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Shape error: {0}")]
    Shape(String),
}
