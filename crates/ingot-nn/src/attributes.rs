//! Construction from ONNX `Conv` / `ConvTranspose` node attributes.

use crate::padding::{ConvolutionPadding, Extent2, Pads};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::warn;

/// A decoded ONNX attribute. Variants follow the ONNX `AttributeProto`
/// types; convolution only reads `Ints` and `String`.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Float(f32),
    Int(i64),
    String(String),
    Floats(Vec<f32>),
    Ints(Vec<i64>),
    Strings(Vec<String>),
}

impl AttributeValue {
    /// ONNX type name, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            AttributeValue::Float(_) => "float",
            AttributeValue::Int(_) => "int",
            AttributeValue::String(_) => "string",
            AttributeValue::Floats(_) => "floats",
            AttributeValue::Ints(_) => "ints",
            AttributeValue::Strings(_) => "strings",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_ints(&self) -> Option<&[i64]> {
        match self {
            AttributeValue::Ints(values) => Some(values.as_slice()),
            _ => None,
        }
    }
}

/// Attributes of one ONNX node, keyed by attribute name.
pub type Attributes = HashMap<String, AttributeValue>;

/// Look up `name` and view it as `T`, failing only on a type mismatch.
fn optional_attr<'a, T: ?Sized>(
    attributes: &'a Attributes,
    name: &str,
    expected: &str,
    view: impl Fn(&'a AttributeValue) -> Option<&'a T>,
) -> Result<Option<&'a T>> {
    let Some(value) = attributes.get(name) else {
        return Ok(None);
    };
    view(value).map(Some).ok_or_else(|| {
        Error::Attribute(format!(
            "'{name}' must be {expected}, got {}",
            value.type_name()
        ))
    })
}

/// Read an int-array attribute of exactly `N` values, or `default`.
fn ints<const N: usize>(attributes: &Attributes, name: &str, default: [i64; N]) -> Result<[i64; N]> {
    match optional_attr(attributes, name, "ints", AttributeValue::as_ints)? {
        None => Ok(default),
        Some(values) => values.try_into().map_err(|_| {
            Error::Attribute(format!(
                "'{name}' must have {N} values for a 2-D convolution, got {}",
                values.len()
            ))
        }),
    }
}

impl ConvolutionPadding {
    /// Build padding from the attributes of a `Conv` or `ConvTranspose`
    /// node with two spatial axes.
    ///
    /// Missing optional attributes take their ONNX defaults: strides and
    /// dilations 1, pads and output padding 0. `kernel_shape` is required.
    ///
    /// # Errors
    /// - `Error::Attribute` for a missing `kernel_shape` or malformed values
    /// - `Error::Unsupported` for other operators, `SAME_*` auto padding or
    ///   an explicit `output_shape`, all of which make pads depend on the
    ///   input size
    pub fn from_onnx(op_type: &str, attributes: &Attributes) -> Result<Self> {
        let is_transpose = match op_type {
            "Conv" => false,
            "ConvTranspose" => true,
            other => {
                return Err(Error::Unsupported(format!(
                    "'{other}' is not a convolution operator"
                )));
            }
        };

        if !attributes.contains_key("kernel_shape") {
            return Err(Error::Attribute("missing 'kernel_shape'".to_string()));
        }
        let [kernel_height, kernel_width] = ints(attributes, "kernel_shape", [0; 2])?;
        let [stride_height, stride_width] = ints(attributes, "strides", [1; 2])?;
        let [dilation_height, dilation_width] = ints(attributes, "dilations", [1; 2])?;
        let [output_padding_height, output_padding_width] =
            ints(attributes, "output_padding", [0; 2])?;

        if is_transpose && attributes.contains_key("output_shape") {
            return Err(Error::Unsupported(
                "ConvTranspose with explicit 'output_shape'".to_string(),
            ));
        }

        let auto_pad =
            optional_attr(attributes, "auto_pad", "a string", AttributeValue::as_str)?
                .unwrap_or("NOTSET");
        let [top, left, bottom, right] = match auto_pad {
            "NOTSET" => ints(attributes, "pads", [0; 4])?,
            "VALID" => {
                if attributes.contains_key("pads") {
                    warn!("Ignoring 'pads' because auto_pad is VALID");
                }
                [0; 4]
            }
            "SAME_UPPER" | "SAME_LOWER" => {
                return Err(Error::Unsupported(format!("auto_pad {auto_pad}")));
            }
            other => {
                return Err(Error::Attribute(format!("unknown auto_pad value '{other}'")));
            }
        };

        ConvolutionPadding::new(
            Extent2::new(kernel_height, kernel_width),
            Extent2::new(stride_height, stride_width),
            Extent2::new(dilation_height, dilation_width),
            Pads::new(top, left, bottom, right),
            Extent2::new(output_padding_height, output_padding_width),
            is_transpose,
        )
        .map_err(|e| match e {
            Error::Shape(message) => Error::Attribute(message),
            other => other,
        })
    }
}
