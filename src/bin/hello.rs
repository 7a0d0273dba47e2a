//! Prints a greeting.
//!
//! Run with:
//!   cargo run --bin hello -- Earth

use clap::Parser;

/// Greet someone, or the world
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Who to greet
    #[arg(value_name = "NAME", default_value = "world")]
    name: String,
}

fn greeting(name: &str) -> String {
    format!("Hello, {}!", name)
}

fn main() {
    let args = Args::parse();
    println!("{}", greeting(&args.name));
}
