//! Convolution shape reports.

use anyhow::{Context as _, Result, bail};
use ingot_nn::{ConvolutionPadding, Extent2, ImageDescriptor, Pads};

pub struct ConvArgs {
    pub input: Extent2,
    pub kernel: Extent2,
    pub strides: Extent2,
    pub dilations: Extent2,
    pub pads: Pads,
    pub output_padding: Extent2,
    pub transpose: bool,
    pub channels: u32,
}

/// Parse `HxW`, or a single `N` for both dimensions.
pub fn parse_extent(text: &str) -> Result<Extent2> {
    let parse = |value: &str| {
        value
            .trim()
            .parse::<i64>()
            .with_context(|| format!("Invalid size '{text}' (expected HxW or N)"))
    };

    match text.split_once(['x', 'X']) {
        Some((height, width)) => Ok(Extent2::new(parse(height)?, parse(width)?)),
        None => Ok(Extent2::square(parse(text)?)),
    }
}

/// Parse `TOP,LEFT,BOTTOM,RIGHT`, or a single `N` for every edge.
pub fn parse_pads(text: &str) -> Result<Pads> {
    let values = text
        .split(',')
        .map(|value| value.trim().parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("Invalid pads '{text}'"))?;

    match values.as_slice() {
        [pad] => Ok(Pads::uniform(*pad)),
        [top, left, bottom, right] => Ok(Pads::new(*top, *left, *bottom, *right)),
        _ => bail!("Invalid pads '{text}': expected 1 or 4 values, got {}", values.len()),
    }
}

pub fn cmd_conv_shape(args: &ConvArgs, json: bool) -> Result<()> {
    let padding = ConvolutionPadding::new(
        args.kernel,
        args.strides,
        args.dilations,
        args.pads,
        args.output_padding,
        args.transpose,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&padding)?);
        return Ok(());
    }

    let width = u32::try_from(args.input.width).context("Input width out of range")?;
    let height = u32::try_from(args.input.height).context("Input height out of range")?;
    let source = ImageDescriptor::new(width, height, args.channels);
    let destination = padding
        .destination_descriptor(&source, ImageDescriptor::new(0, 0, args.channels))?;

    let kind = if padding.is_transpose() {
        "ConvTranspose"
    } else {
        "Conv"
    };
    let placement = destination.placement;

    println!(
        "{kind}: {height}x{width} -> {}x{}",
        destination.descriptor.height, destination.descriptor.width
    );
    println!("  Channels: {}", destination.descriptor.feature_channels);
    println!(
        "  Offset: ({}, {}, {})",
        placement.offset.x, placement.offset.y, placement.offset.z
    );
    println!(
        "  Kernel offset: ({}, {}, {})",
        placement.kernel_offset.x, placement.kernel_offset.y, placement.kernel_offset.z
    );
    println!("  Edge mode: {:?}", placement.edge_mode);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extent() {
        assert_eq!(parse_extent("224x112").unwrap(), Extent2::new(224, 112));
        assert_eq!(parse_extent("3").unwrap(), Extent2::square(3));
        assert_eq!(parse_extent(" 5 X 7 ").unwrap(), Extent2::new(5, 7));
        assert!(parse_extent("3x").is_err());
        assert!(parse_extent("big").is_err());
    }

    #[test]
    fn test_parse_pads() {
        assert_eq!(parse_pads("1").unwrap(), Pads::uniform(1));
        assert_eq!(parse_pads("0,1,2,3").unwrap(), Pads::new(0, 1, 2, 3));
        assert!(parse_pads("1,2").is_err());
        assert!(parse_pads("1,a,2,3").is_err());
    }

    #[test]
    fn test_conv_shape_rejects_empty_output() {
        let args = ConvArgs {
            input: Extent2::new(2, 2),
            kernel: Extent2::square(5),
            strides: Extent2::square(1),
            dilations: Extent2::square(1),
            pads: Pads::default(),
            output_padding: Extent2::default(),
            transpose: false,
            channels: 1,
        };
        assert!(cmd_conv_shape(&args, false).is_err());
    }

    #[test]
    fn test_conv_shape_rejects_overflowing_stride() {
        let args = ConvArgs {
            input: Extent2::new(3, 3),
            kernel: Extent2::square(1),
            strides: Extent2::square(i64::MAX),
            dilations: Extent2::square(1),
            pads: Pads::default(),
            output_padding: Extent2::default(),
            transpose: true,
            channels: 1,
        };
        assert!(cmd_conv_shape(&args, false).is_err());
    }
}
