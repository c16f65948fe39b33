//! T-shirt image generation CLI
//!
//! Background removal, mockup composition and prompt-to-mockup generation
//! from the command line.

#[cfg(feature = "cli")]
use tshirt_image_gen::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(1);
}
