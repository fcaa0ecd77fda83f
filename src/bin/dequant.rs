//! strata-dequant: Decode a raw GGUF tensor payload to f32 and summarize it.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use serde::Serialize;

use strata_quant::cli::{self, PayloadFile, TensorSummary};
use strata_quant::{DequantConfig, Dequantizer, GgufTensorType, TensorDescriptor};

#[derive(Parser)]
#[command(name = "strata-dequant", about = "Dequantize a raw GGUF tensor payload")]
struct Args {
    /// Tensor type name or numeric ID (e.g., "Q4_K" or "12")
    #[arg(short = 't', long = "type", value_parser = parse_tensor_type)]
    dtype: GgufTensorType,

    /// Comma-separated dimensions (e.g., "4096,32")
    #[arg(short = 'd', long)]
    dims: String,

    /// File holding the tensor bytes
    #[arg(short = 'i', long)]
    input: PathBuf,

    /// Byte offset of the tensor data within the file
    #[arg(long, default_value_t = 0)]
    offset: u64,

    /// Number of leading values to print
    #[arg(long, default_value_t = 8)]
    head: usize,

    /// Output format: text or json
    #[arg(long, default_value = "text", value_parser = validate_output_format)]
    output_format: String,

    /// Decode on the calling thread only
    #[arg(long)]
    serial: bool,

    /// Suppress all logging
    #[arg(long)]
    log_disable: bool,
}

fn parse_tensor_type(s: &str) -> Result<GgufTensorType, String> {
    if let Ok(id) = s.parse::<u32>() {
        return GgufTensorType::from_u32(id).map_err(|e| e.to_string());
    }
    GgufTensorType::from_name(s).ok_or_else(|| format!("Unknown tensor type '{}'", s))
}

fn validate_output_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("Unknown output format '{}'. Options: text, json", s)),
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    dtype: &'static str,
    dims: &'a [u64],
    bytes: usize,
    #[serde(flatten)]
    summary: TensorSummary,
}

fn main() {
    let args = Args::parse();
    cli::init_logging(args.log_disable);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let desc = TensorDescriptor::new(args.dtype, cli::parse_dims(&args.dims)?);
    let byte_len = desc.expected_byte_len()?;

    let payload = PayloadFile::open(&args.input)?;
    let raw = payload.slice(args.offset, byte_len)?;

    let config = if args.serial {
        DequantConfig::serial()
    } else {
        DequantConfig::from_env()
    };
    let dequantizer = Dequantizer::new(config);

    let start = std::time::Instant::now();
    let values = dequantizer.dequantize(&desc, raw)?;
    tracing::info!(
        "decoded {} {} values in {:.2?}",
        values.len(),
        desc.dtype,
        start.elapsed()
    );

    let summary = TensorSummary::new(&values, args.head);

    match args.output_format.as_str() {
        "json" => {
            let output = JsonOutput {
                dtype: desc.dtype.name(),
                dims: &desc.dims,
                bytes: raw.len(),
                summary,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => {
            println!("type:   {}", desc.dtype);
            println!("dims:   {:?}", desc.dims);
            println!("bytes:  {}", raw.len());
            println!("count:  {}", summary.count);
            println!("min:    {}", summary.min);
            println!("max:    {}", summary.max);
            println!("mean:   {}", summary.mean);
            for (i, v) in summary.head.iter().enumerate() {
                println!("{:>5} -> {}", i, v);
            }
        }
    }

    Ok(())
}
