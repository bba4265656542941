//! Decode and print every value in one or more MessagePack buffers.
//!
//! Usage:
//!   minipack_dump [OPTIONS] [FILE ...]
//!   minipack_dump < file.bin
//!
//! Options:
//!   --hex, -x      Input is hex text (whitespace, commas and 0x prefixes allowed)
//!   --tree, -t     Indented multi-line output instead of one line per value
//!   --lenient, -l  First-wins duplicate keys; drop entries with unsupported keys
//!
//! If no files are given, reads from stdin. Exit status 1 if any input fails to decode.

use minipack::dump::{parse_hex, value_summary_line, value_to_dump};
use minipack::{decode_sequence, DecodeOptions};
use std::io::{self, Read};
use std::path::Path;

#[derive(Clone, Copy)]
enum OutputStyle {
    Line,
    Tree,
}

fn take_flag(args: &mut Vec<String>, long: &str, short: &str) -> bool {
    match args.iter().position(|a| a == long || a == short) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

/// Returns false if `input` failed to decode.
fn dump(name: &str, input: &[u8], hex: bool, style: OutputStyle, opts: &DecodeOptions) -> bool {
    let bytes = if hex {
        match parse_hex(&String::from_utf8_lossy(input)) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("{}: {}", name, e);
                return false;
            }
        }
    } else {
        input.to_vec()
    };
    match decode_sequence(&bytes, opts) {
        Ok(values) => {
            for d in &values {
                match style {
                    OutputStyle::Line => println!("{}", value_summary_line(&d.value)),
                    OutputStyle::Tree => {
                        println!("# {} bytes {}..{}", name, d.byte_range.0, d.byte_range.1);
                        println!("{}", value_to_dump(&d.value, 0));
                    }
                }
            }
            log::debug!("{}: {} value(s), {} bytes", name, values.len(), bytes.len());
            true
        }
        Err(e) => {
            eprintln!("{}: {}", name, e);
            false
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let hex = take_flag(&mut args, "--hex", "-x");
    let style = if take_flag(&mut args, "--tree", "-t") {
        OutputStyle::Tree
    } else {
        OutputStyle::Line
    };
    let opts = if take_flag(&mut args, "--lenient", "-l") {
        DecodeOptions::lenient()
    } else {
        DecodeOptions::default()
    };

    let mut has_error = false;
    if args.is_empty() {
        let mut input = Vec::new();
        io::stdin().read_to_end(&mut input)?;
        has_error |= !dump("<stdin>", &input, hex, style, &opts);
    } else {
        for path in &args {
            let path = Path::new(path);
            let input = match std::fs::read(path) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    has_error = true;
                    continue;
                }
            };
            has_error |= !dump(&path.display().to_string(), &input, hex, style, &opts);
        }
    }

    if has_error {
        std::process::exit(1);
    }
    Ok(())
}
