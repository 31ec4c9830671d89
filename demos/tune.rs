//! Antenna tuning - print voltage and impedance for each antenna.
//!
//! ```text
//! RUST_LOG=proxmark_client=debug cargo run --example tune
//! ```

use proxmark_client::ProxmarkBuilder;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut pm = ProxmarkBuilder::new().open_usb()?;

    for antenna in pm.tune()? {
        println!("{antenna}");
    }

    pm.close()?;
    Ok(())
}
