//! # taxslip CLI
//!
//! Usage:
//!   taxslip input.json -o output.pdf
//!   echo '{ ... }' | taxslip -o output.pdf
//!   taxslip input.json -o output.pdf --font regular.ttf --bold-font bold.ttf
//!   taxslip --example > invoice.json
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use std::env;
use std::fs;
use std::io::{self, Read};

use taxslip::font::FontContext;
use taxslip::Result;
use tracing_subscriber::EnvFilter;

const EXAMPLE_JSON: &str = include_str!("../demos/inv10111.json");

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", EXAMPLE_JSON);
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {}", e);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1])?
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    };

    let flag = |name: &str| {
        args.windows(2)
            .find(|w| w[0] == name)
            .map(|w| w[1].clone())
    };
    let output_path = flag("-o").unwrap_or_else(|| "output.pdf".to_string());

    let fonts = match flag("--font") {
        Some(regular) => {
            let bold = flag("--bold-font").map(fs::read).transpose()?;
            Some(FontContext::truetype(fs::read(regular)?, bold)?)
        }
        None => {
            if flag("--bold-font").is_some() {
                tracing::warn!("--bold-font ignored without --font");
            }
            None
        }
    };

    let pdf_bytes = taxslip::render_json(&input, fonts.as_ref())?;
    fs::write(&output_path, &pdf_bytes)?;
    eprintln!("✓ Written {} bytes to {}", pdf_bytes.len(), output_path);
    Ok(())
}
