use std::fs;
use std::io::{self, Read, Write};

use anyhow::{Context, Result, bail};
use log::info;
use protodyn::{DecodeOptions, DescriptorPool, DynamicMessage, text_format};

#[derive(Debug, Default)]
struct Args {
    json: bool,
    text_in: bool,
    descriptor_set: String,
    message_type: String,
    payload: Option<String>,
}

fn parse_args(args: &[String]) -> Result<Option<Args>> {
    let mut parsed = Args::default();
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--json" => parsed.json = true,
            "--text-in" => parsed.text_in = true,
            "-h" | "--help" => return Ok(None),
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            _ => positional.push(arg.clone()),
        }
    }
    if parsed.json && parsed.text_in {
        bail!("--json and --text-in cannot be combined");
    }
    let mut positional = positional.into_iter();
    match (positional.next(), positional.next(), positional.next(), positional.next()) {
        (Some(descriptor_set), Some(message_type), payload, None) => {
            parsed.descriptor_set = descriptor_set;
            parsed.message_type = message_type;
            parsed.payload = payload.filter(|p| p != "-");
            Ok(Some(parsed))
        }
        _ => Ok(None),
    }
}

fn read_payload(path: Option<&str>) -> Result<Vec<u8>> {
    match path {
        Some(path) => fs::read(path).with_context(|| format!("reading {path}")),
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn run(args: Args) -> Result<()> {
    let descriptor_bytes =
        fs::read(&args.descriptor_set).with_context(|| format!("reading {}", args.descriptor_set))?;
    let pool = DescriptorPool::new();
    let files = pool
        .decode_file_descriptor_set(&descriptor_bytes)
        .with_context(|| format!("building {}", args.descriptor_set))?;
    info!("Loaded {} files from {}", files.len(), args.descriptor_set);

    let descriptor = pool
        .find_message_by_name(&args.message_type)
        .with_context(|| format!("message type {} not found", args.message_type))?;
    let payload = read_payload(args.payload.as_deref())?;
    info!("Read payload ({} bytes)", payload.len());

    let mut stdout = io::stdout().lock();
    if args.text_in {
        let text = String::from_utf8(payload).context("text payload is not UTF-8")?;
        let mut message = DynamicMessage::new(descriptor);
        text_format::parse_from_str(&text, &mut message)?;
        stdout.write_all(&message.encode_to_vec())?;
        return Ok(());
    }

    let options = DecodeOptions {
        allow_partial: true,
        ..Default::default()
    };
    let message = DynamicMessage::decode_with_options(descriptor, &payload, &options)
        .with_context(|| format!("decoding {}", args.message_type))?;
    if args.json {
        serde_json::to_writer_pretty(&mut stdout, &message)?;
        writeln!(stdout)?;
    } else {
        stdout.write_all(message.to_string().as_bytes())?;
    }
    Ok(())
}

fn print_usage(program: &str) {
    eprintln!("Dynamic protobuf decoder");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  {program} [--json] <descriptor_set.pb> <message.Type> [payload.bin | -]");
    eprintln!("  {program} --text-in <descriptor_set.pb> <message.Type> [payload.txt | -] > out.bin");
    eprintln!();
    eprintln!("OPTIONS:");
    eprintln!("  --json      Print proto3 JSON instead of text format");
    eprintln!("  --text-in   Read the payload as text format and write binary");
    eprintln!();
    eprintln!("EXAMPLE:");
    eprintln!("  protoc --descriptor_set_out=desc.pb --include_imports my.proto");
    eprintln!("  {program} desc.pb my.pkg.Msg payload.bin");
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("protodyn");
    match parse_args(args.get(1..).unwrap_or_default())? {
        Some(parsed) => run(parsed),
        None => {
            print_usage(program);
            Ok(())
        }
    }
}
