use clap::Parser;
use ragmark_context::text::{TextChunk, split_indexed};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to split extracted text into retrieval chunks as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the input text file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Document path recorded against each chunk.
    #[arg(short, long, default_value = "unknown_path")]
    path: String,
}

#[derive(Serialize)]
struct SerializableChunk<'a> {
    path: &'a str,
    #[serde(flatten)]
    chunk: TextChunk,
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    let text = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let chunks: Vec<SerializableChunk> = split_indexed(&text)
        .into_iter()
        .map(|chunk| SerializableChunk {
            path: &args.path,
            chunk,
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&chunks)?);
    Ok(())
}
