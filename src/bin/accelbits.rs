//! accelbits CLI: pack, unpack and inspect accelerator stream values.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use accelbits::{codec, CodecOptions, DataType};
use clap::{Args, Parser, Subcommand};
use std::process;

#[derive(Parser)]
#[command(name = "accelbits", about = "Bit-dense packing of accelerator stream values")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Pack values and print the stream as hex
    Pack(PackArgs),
    /// Unpack a hex string or raw file into values
    Unpack(UnpackArgs),
    /// Show bitwidth, sign and range of a datatype
    Info(InfoArgs),
}

#[derive(Args)]
struct PackArgs {
    /// Datatype, e.g. INT5, UINT12, FIXED<8,4>, BIPOLAR
    #[arg(short, long)]
    dtype: DataType,

    /// Write raw bytes to this file instead of printing hex
    #[arg(short, long)]
    output: Option<String>,

    /// Reject values that the datatype cannot represent exactly
    #[arg(long)]
    strict: bool,

    /// Disable parallel packing
    #[arg(long)]
    sequential: bool,

    /// Values to pack
    #[arg(required = true, allow_negative_numbers = true)]
    values: Vec<String>,
}

#[derive(Args)]
struct UnpackArgs {
    /// Datatype, e.g. INT5, UINT12, FIXED<8,4>, BIPOLAR
    #[arg(short, long)]
    dtype: DataType,

    /// Padding bits at the end of the stream
    #[arg(short, long, default_value_t = 0)]
    padding: usize,

    /// Raw input file
    #[arg(short, long, conflicts_with = "hex")]
    input: Option<String>,

    /// Stream as hex string
    #[arg(required_unless_present = "input")]
    hex: Option<String>,
}

#[derive(Args)]
struct InfoArgs {
    /// Datatype, e.g. INT5, UINT12, FIXED<8,4>, BIPOLAR
    #[arg(short, long)]
    dtype: DataType,
}

/// Parsed command line values, typed by the widest format they all fit.
#[derive(Debug, PartialEq)]
enum Values {
    Int(Vec<i64>),
    UInt(Vec<u64>),
    Float(Vec<f64>),
}

impl Values {
    fn parse(raw: &[String]) -> Result<Self, String> {
        if let Ok(v) = raw.iter().map(|s| s.parse::<i64>()).collect::<Result<Vec<_>, _>>() {
            return Ok(Values::Int(v));
        }
        if let Ok(v) = raw.iter().map(|s| s.parse::<u64>()).collect::<Result<Vec<_>, _>>() {
            return Ok(Values::UInt(v));
        }
        raw.iter()
            .map(|s| s.parse::<f64>().map_err(|_| format!("Ungueltiger Wert '{s}'")))
            .collect::<Result<Vec<_>, _>>()
            .map(Values::Float)
    }

    fn as_f64(&self) -> Vec<f64> {
        match self {
            Values::Int(v) => v.iter().map(|&x| x as f64).collect(),
            Values::UInt(v) => v.iter().map(|&x| x as f64).collect(),
            Values::Float(v) => v.clone(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Values::Int(v) => v.len(),
            Values::UInt(v) => v.len(),
            Values::Float(v) => v.len(),
        }
    }
}

/// Besitzer der Eingabedaten. Haelt entweder eine Mmap oder einen Vec<u8> am Leben.
enum UnpackInput {
    Buf(Vec<u8>),
    #[cfg(feature = "mmap")]
    Mmap(memmap2::Mmap),
}

impl std::ops::Deref for UnpackInput {
    type Target = [u8];
    fn deref(&self) -> &[u8] {
        match self {
            UnpackInput::Buf(v) => v,
            #[cfg(feature = "mmap")]
            UnpackInput::Mmap(m) => m,
        }
    }
}

/// Laedt eine Rohdatei; mit Feature `mmap` per Memory-Map.
fn load_unpack_input(path: &str) -> Result<UnpackInput, String> {
    #[cfg(feature = "mmap")]
    {
        let file = std::fs::File::open(path).map_err(|e| format!("Lesefehler '{path}': {e}"))?;
        // Leere Dateien lassen sich nicht mappen
        if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
            return Ok(UnpackInput::Buf(Vec::new()));
        }
        let mmap = unsafe { memmap2::Mmap::map(&file) }
            .map_err(|e| format!("Mmap-Fehler '{path}': {e}"))?;
        Ok(UnpackInput::Mmap(mmap))
    }
    #[cfg(not(feature = "mmap"))]
    {
        let buf = std::fs::read(path).map_err(|e| format!("Lesefehler '{path}': {e}"))?;
        Ok(UnpackInput::Buf(buf))
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Accepts upper/lower case, an optional `0x` prefix and embedded whitespace.
fn decode_hex(input: &str) -> Result<Vec<u8>, String> {
    let trimmed = input.trim();
    let digits: Vec<u8> = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("Hex-String hat ungerade Laenge: '{input}'"));
    }
    digits
        .chunks_exact(2)
        .map(|pair| {
            let s = std::str::from_utf8(pair).map_err(|_| format!("Ungueltiges Hex: '{input}'"))?;
            u8::from_str_radix(s, 16).map_err(|_| format!("Ungueltiges Hex: '{input}'"))
        })
        .collect()
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Pack(args) => run_pack(args),
        Command::Unpack(args) => run_unpack(args),
        Command::Info(args) => run_info(args),
    }
}

fn run_pack(args: PackArgs) -> Result<(), String> {
    let dt = args.dtype;
    let values = Values::parse(&args.values)?;

    if args.strict {
        if let Some(v) = values.as_f64().into_iter().find(|&v| !dt.allowed(v)) {
            return Err(format!("Wert {v} ist in {dt} nicht darstellbar"));
        }
    }

    let opts = if args.sequential {
        CodecOptions::sequential()
    } else {
        CodecOptions::default()
    };
    let bytes = match &values {
        Values::Int(v) => codec::pack_with_options(dt, v, &opts),
        Values::UInt(v) => codec::pack_with_options(dt, v, &opts),
        Values::Float(v) => codec::pack_with_options(dt, v, &opts),
    }
    .map_err(|e| e.to_string())?;
    let (_, padding) = dt.packed_len(values.len());

    match args.output {
        Some(path) => {
            std::fs::write(&path, &bytes).map_err(|e| format!("Schreibfehler '{path}': {e}"))?;
        }
        None => println!("{}", encode_hex(&bytes)),
    }
    println!("padding: {padding}");
    Ok(())
}

fn run_unpack(args: UnpackArgs) -> Result<(), String> {
    let input = match (&args.input, &args.hex) {
        (Some(path), _) => load_unpack_input(path)?,
        (None, Some(hex)) => UnpackInput::Buf(decode_hex(hex)?),
        (None, None) => return Err("Keine Eingabe angegeben".into()),
    };
    let values = codec::unpack_native(args.dtype, &input, args.padding).map_err(|e| e.to_string())?;
    println!("{values}");
    Ok(())
}

fn run_info(args: InfoArgs) -> Result<(), String> {
    let dt = args.dtype;
    dt.validate().map_err(|e| e.to_string())?;
    println!("datatype:  {dt}");
    println!("bitwidth:  {}", dt.bitwidth());
    println!("signed:    {}", dt.sign());
    println!("integer:   {}", dt.is_integer());
    if dt.is_fixed_point() {
        println!("int bits:  {}", dt.int_bits());
        println!("frac bits: {}", dt.frac_bits());
    }
    println!("min:       {}", dt.min());
    println!("max:       {}", dt.max());
    println!("native:    {:?}", dt.native_type());
    Ok(())
}
