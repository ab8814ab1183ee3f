//! Ingot CLI - inspect shader bindings, GPU limits and convolution shapes.

mod conv;
mod device;
mod reflect;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use ingot_wgpu::ReflectionMode;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ingot")]
#[command(about = "Reflection-driven GPU compute binding tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// GPU context configuration (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bindings a WGSL shader's entry points reflect
    Reflect {
        /// Path to the WGSL file
        #[arg(value_name = "SHADER")]
        shader: PathBuf,

        /// Entry point to reflect (defaults to every compute entry point)
        #[arg(short, long)]
        entry: Option<String>,

        /// Preprocessor definitions (format: NAME=VALUE, can be repeated)
        #[arg(short = 'D', long = "define")]
        defines: Vec<String>,

        /// Which globals count as bindings
        #[arg(short, long, value_enum, default_value = "entry-point")]
        mode: Mode,

        /// Also create each pipeline on the GPU
        #[arg(long)]
        compile: bool,
    },
    /// Show the selected GPU and its compute limits
    Device,
    /// Compute the output size and kernel placement of a 2-D convolution
    ConvShape {
        /// Input size (format: HxW)
        #[arg(long, value_name = "HxW")]
        input: String,

        /// Kernel size (format: HxW or N)
        #[arg(short, long, value_name = "HxW")]
        kernel: String,

        /// Strides (format: HxW or N)
        #[arg(short, long, default_value = "1")]
        stride: String,

        /// Dilations (format: HxW or N)
        #[arg(short, long, default_value = "1")]
        dilation: String,

        /// Explicit pads (format: TOP,LEFT,BOTTOM,RIGHT or N)
        #[arg(short, long, default_value = "0")]
        pads: String,

        /// Extra output padding for transposed convolution (format: HxW or N)
        #[arg(long, default_value = "0")]
        output_padding: String,

        /// Treat the convolution as transposed
        #[arg(short, long)]
        transpose: bool,

        /// Feature channels of the destination image
        #[arg(short, long, default_value = "1")]
        channels: u32,

        /// Print the padding description as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    /// Only globals the entry point uses
    EntryPoint,
    /// Every global in the module
    Module,
}

impl From<Mode> for ReflectionMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::EntryPoint => ReflectionMode::EntryPointUsage,
            Mode::Module => ReflectionMode::ModuleGlobals,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Reflect {
            shader,
            entry,
            defines,
            mode,
            compile,
        } => {
            let mut config = device::load_config(cli.config.as_deref())?;
            config.reflection = mode.into();
            reflect::cmd_reflect(&shader, entry.as_deref(), &defines, &config, compile)?;
        }
        Commands::Device => {
            let config = device::load_config(cli.config.as_deref())?;
            device::cmd_device(&config)?;
        }
        Commands::ConvShape {
            input,
            kernel,
            stride,
            dilation,
            pads,
            output_padding,
            transpose,
            channels,
            json,
        } => {
            let args = conv::ConvArgs {
                input: conv::parse_extent(&input)?,
                kernel: conv::parse_extent(&kernel)?,
                strides: conv::parse_extent(&stride)?,
                dilations: conv::parse_extent(&dilation)?,
                pads: conv::parse_pads(&pads)?,
                output_padding: conv::parse_extent(&output_padding)?,
                transpose,
                channels,
            };
            conv::cmd_conv_shape(&args, json)?;
        }
    }

    Ok(())
}
