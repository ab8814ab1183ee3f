//! Output size and kernel placement for padded 2-D convolutions.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A height/width pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2 {
    pub height: i64,
    pub width: i64,
}

impl Extent2 {
    pub const fn new(height: i64, width: i64) -> Self {
        Self { height, width }
    }

    /// Same value in both dimensions.
    pub const fn square(size: i64) -> Self {
        Self::new(size, size)
    }
}

pub type Kernel = Extent2;
pub type Strides = Extent2;
pub type Dilations = Extent2;
/// Extra size added to one side of a transposed convolution's output.
pub type Padding = Extent2;

/// Per-edge padding, in ONNX `pads` order for two spatial axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Pads {
    pub top: i64,
    pub left: i64,
    pub bottom: i64,
    pub right: i64,
}

impl Pads {
    pub const fn new(top: i64, left: i64, bottom: i64, right: i64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub const fn uniform(pad: i64) -> Self {
        Self::new(pad, pad, pad, pad)
    }
}

/// A signed position in image space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl Offset {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }
}

/// How a kernel treats reads outside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeMode {
    /// Out-of-bounds reads return zero.
    #[default]
    Zero,
}

/// Where a convolution kernel samples the source relative to each output
/// pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelPlacement {
    /// Source position of output pixel (0, 0).
    pub offset: Offset,

    /// Position of the kernel's center tap. Only non-zero for transposed
    /// convolutions; `z` is always zero.
    pub kernel_offset: Offset,

    pub edge_mode: EdgeMode,
}

/// Size and layout of an image passed to or produced by a kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageDescriptor {
    pub width: u32,
    pub height: u32,
    pub feature_channels: u32,
    pub number_of_images: u32,
}

impl ImageDescriptor {
    /// A single image.
    pub const fn new(width: u32, height: u32, feature_channels: u32) -> Self {
        Self {
            width,
            height,
            feature_channels,
            number_of_images: 1,
        }
    }
}

/// Result of [`ConvolutionPadding::destination_descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub descriptor: ImageDescriptor,
    pub placement: KernelPlacement,
}

/// Explicit padding of a regular or transposed 2-D convolution.
///
/// Dilations are carried along for completeness but do not enter the
/// output-size formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "EncodedPadding", into = "EncodedPadding")]
pub struct ConvolutionPadding {
    kernel: Kernel,
    strides: Strides,
    dilations: Dilations,
    pads: Pads,
    output_padding: Padding,
    is_transpose: bool,
}

impl ConvolutionPadding {
    /// Validate and build a padding description.
    ///
    /// Kernel, stride and dilation components must be at least 1; pads and
    /// output padding must not be negative.
    pub fn new(
        kernel: Kernel,
        strides: Strides,
        dilations: Dilations,
        pads: Pads,
        output_padding: Padding,
        is_transpose: bool,
    ) -> Result<Self> {
        for (name, extent) in [
            ("kernel", kernel),
            ("strides", strides),
            ("dilations", dilations),
        ] {
            if extent.height < 1 || extent.width < 1 {
                return Err(Error::Shape(format!(
                    "{name} must be positive, got {}x{}",
                    extent.height, extent.width
                )));
            }
        }

        if [pads.top, pads.left, pads.bottom, pads.right]
            .iter()
            .any(|&pad| pad < 0)
        {
            return Err(Error::Shape(format!("pads must not be negative, got {pads:?}")));
        }

        if output_padding.height < 0 || output_padding.width < 0 {
            return Err(Error::Shape(format!(
                "output padding must not be negative, got {}x{}",
                output_padding.height, output_padding.width
            )));
        }

        Ok(Self {
            kernel,
            strides,
            dilations,
            pads,
            output_padding,
            is_transpose,
        })
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn strides(&self) -> Strides {
        self.strides
    }

    pub fn dilations(&self) -> Dilations {
        self.dilations
    }

    pub fn pads(&self) -> Pads {
        self.pads
    }

    pub fn output_padding(&self) -> Padding {
        self.output_padding
    }

    pub fn is_transpose(&self) -> bool {
        self.is_transpose
    }

    /// Spatial size of the convolution output for an input of `input`.
    ///
    /// Regular: `(in + pad_before + pad_after - kernel) / stride + 1`, using
    /// truncating division.
    /// Transposed: `(in - 1) * stride - pad_before - pad_after + kernel +
    /// output_padding`.
    ///
    /// The result is not clamped and may be zero or negative when the input
    /// is smaller than the padded kernel.
    ///
    /// # Errors
    /// `Error::Shape` if either axis overflows `i64`.
    pub fn output_size(&self, input: Extent2) -> Result<Extent2> {
        let Self {
            kernel,
            strides,
            pads,
            output_padding,
            is_transpose,
            ..
        } = *self;

        let height = axis_output_size(
            is_transpose,
            input.height,
            (pads.top, pads.bottom),
            kernel.height,
            strides.height,
            output_padding.height,
        );
        let width = axis_output_size(
            is_transpose,
            input.width,
            (pads.left, pads.right),
            kernel.width,
            strides.width,
            output_padding.width,
        );

        match (height, width) {
            (Some(height), Some(width)) => Ok(Extent2::new(height, width)),
            _ => Err(Error::Shape(format!(
                "output size overflows for {}x{} input",
                input.height, input.width
            ))),
        }
    }

    /// Kernel placement that realizes the explicit pads.
    pub fn placement(&self) -> KernelPlacement {
        let Self { kernel, pads, .. } = *self;

        if self.is_transpose {
            KernelPlacement {
                offset: Offset::default(),
                kernel_offset: Offset::new(
                    kernel.width / 2 - kernel.width + 1 + pads.left,
                    kernel.height / 2 - kernel.height + 1 + pads.top,
                    0,
                ),
                edge_mode: EdgeMode::Zero,
            }
        } else {
            KernelPlacement {
                offset: Offset::new(kernel.width / 2 - pads.left, kernel.height / 2 - pads.top, 0),
                kernel_offset: Offset::default(),
                edge_mode: EdgeMode::Zero,
            }
        }
    }

    /// Descriptor of the destination image for `source`.
    ///
    /// Starts from `suggested` (typically carrying the channel count and
    /// batch size the kernel wants) and replaces width and height with the
    /// computed output size.
    ///
    /// # Errors
    /// `Error::Shape` if the output would be empty or too large for an
    /// image dimension.
    pub fn destination_descriptor(
        &self,
        source: &ImageDescriptor,
        suggested: ImageDescriptor,
    ) -> Result<Destination> {
        let output = self.output_size(Extent2::new(
            i64::from(source.height),
            i64::from(source.width),
        ))?;

        let dimension = |value: i64, axis: &str| {
            u32::try_from(value)
                .ok()
                .filter(|&v| v > 0)
                .ok_or_else(|| {
                    Error::Shape(format!(
                        "output {axis} {value} for {}x{} source is out of range",
                        source.width, source.height
                    ))
                })
        };

        let descriptor = ImageDescriptor {
            width: dimension(output.width, "width")?,
            height: dimension(output.height, "height")?,
            ..suggested
        };

        debug!(
            source_width = source.width,
            source_height = source.height,
            width = descriptor.width,
            height = descriptor.height,
            transpose = self.is_transpose,
            "Computed convolution destination"
        );

        Ok(Destination {
            descriptor,
            placement: self.placement(),
        })
    }
}

/// Output size along one axis, `None` on overflow.
fn axis_output_size(
    is_transpose: bool,
    input: i64,
    (pad_before, pad_after): (i64, i64),
    kernel: i64,
    stride: i64,
    output_padding: i64,
) -> Option<i64> {
    if is_transpose {
        input
            .checked_sub(1)?
            .checked_mul(stride)?
            .checked_sub(pad_before)?
            .checked_sub(pad_after)?
            .checked_add(kernel)?
            .checked_add(output_padding)
    } else {
        input
            .checked_add(pad_before)?
            .checked_add(pad_after)?
            .checked_sub(kernel)?
            .checked_div(stride)?
            .checked_add(1)
    }
}

/// Flat wire form of [`ConvolutionPadding`].
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EncodedPadding {
    kernel_height: i64,
    kernel_width: i64,
    stride_height: i64,
    stride_width: i64,
    dilation_height: i64,
    dilation_width: i64,
    pad_top: i64,
    pad_left: i64,
    pad_bottom: i64,
    pad_right: i64,
    output_padding_height: i64,
    output_padding_width: i64,
    is_transpose: bool,
}

impl From<ConvolutionPadding> for EncodedPadding {
    fn from(padding: ConvolutionPadding) -> Self {
        Self {
            kernel_height: padding.kernel.height,
            kernel_width: padding.kernel.width,
            stride_height: padding.strides.height,
            stride_width: padding.strides.width,
            dilation_height: padding.dilations.height,
            dilation_width: padding.dilations.width,
            pad_top: padding.pads.top,
            pad_left: padding.pads.left,
            pad_bottom: padding.pads.bottom,
            pad_right: padding.pads.right,
            output_padding_height: padding.output_padding.height,
            output_padding_width: padding.output_padding.width,
            is_transpose: padding.is_transpose,
        }
    }
}

impl TryFrom<EncodedPadding> for ConvolutionPadding {
    type Error = Error;

    fn try_from(encoded: EncodedPadding) -> Result<Self> {
        ConvolutionPadding::new(
            Extent2::new(encoded.kernel_height, encoded.kernel_width),
            Extent2::new(encoded.stride_height, encoded.stride_width),
            Extent2::new(encoded.dilation_height, encoded.dilation_width),
            Pads::new(
                encoded.pad_top,
                encoded.pad_left,
                encoded.pad_bottom,
                encoded.pad_right,
            ),
            Extent2::new(encoded.output_padding_height, encoded.output_padding_width),
            encoded.is_transpose,
        )
    }
}
