//! psd-blocks - Print the decoded tagged blocks of a PSD or PSB document.
//!
//! This binary reads a document, decodes every tagged block and prints the
//! result as text or JSON, followed by the diagnostics of the pass.

use clap::Parser;
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bytes::Bytes;
use psd_tagged_blocks::{
    config::{Config, OutputFormat},
    read_document, BlockDecoder, Decoded, DecodedChunk, DecodedDocument, Diagnostic,
};

fn main() -> ExitCode {
    let config = Config::parse();
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let data = match std::fs::read(&config.file) {
        Ok(data) => Bytes::from(data),
        Err(e) => {
            error!("Failed to read {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(path = %config.file.display(), len = data.len(), "Read input file");

    let document = match read_document(&data, config.encoding.into()) {
        Ok(document) => document,
        Err(e) => {
            error!("Failed to read document: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let decoder = BlockDecoder::new(config.decode_options());
    let decoded = match decoder.decode_document(document) {
        Ok(decoded) => decoded,
        Err(e) => {
            error!("Decoding failed: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let diagnostics = decoder.diagnostics().take();
    info!(
        layers = decoded.layers.len(),
        global_blocks = decoded.global_blocks.len(),
        diagnostics = diagnostics.len(),
        "Decoded document"
    );

    match config.format {
        OutputFormat::Text => print_text(&decoded, &diagnostics),
        OutputFormat::Json => {
            let json = serde_json::json!({
                "document": decoded,
                "diagnostics": diagnostics,
            });
            match serde_json::to_string_pretty(&json) {
                Ok(output) => println!("{}", output),
                Err(e) => {
                    error!("Failed to serialize output: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "psd_tagged_blocks=debug,psd_blocks=debug"
    } else {
        "psd_tagged_blocks=info,psd_blocks=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

// =============================================================================
// Text Output
// =============================================================================

fn print_text(document: &DecodedDocument, diagnostics: &[Diagnostic]) {
    let header = &document.header;
    println!(
        "{:?} {}x{}, {} channels, {} bits",
        header.version, header.width, header.height, header.channels, header.depth
    );

    for (index, layer) in document.layers.iter().enumerate() {
        println!();
        println!("Layer {} \"{}\"", index, layer.name);
        print_blocks(&layer.blocks, 1);
    }

    if !document.global_blocks.is_empty() {
        println!();
        println!("Global blocks");
        print_blocks(&document.global_blocks, 1);
    }

    if !diagnostics.is_empty() {
        println!();
        println!("Diagnostics");
        for diagnostic in diagnostics {
            println!("  {}", diagnostic);
        }
    }
}

fn print_blocks(blocks: &[DecodedChunk], indent: usize) {
    let pad = "  ".repeat(indent);
    for block in blocks {
        match &block.payload {
            Decoded::Raw(bytes) => {
                println!("{}{}  Raw ({} bytes)", pad, block.code, bytes.len());
            }
            Decoded::NestedLayers(nested) => {
                println!(
                    "{}{}  NestedLayers ({} layers, {} bits)",
                    pad,
                    block.code,
                    nested.layers.len(),
                    nested.channel_depth
                );
                for layer in &nested.layers {
                    println!("{}  Layer \"{}\"", pad, layer.name);
                    print_blocks(&layer.blocks, indent + 2);
                }
            }
            payload => println!("{}{}  {}", pad, block.code, payload.kind()),
        }
    }
}
