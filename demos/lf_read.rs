//! LF read - energize a 125 kHz (or 134 kHz) tag and dump the samples.
//!
//! ```text
//! cargo run --example lf_read          # 125 kHz
//! cargo run --example lf_read -- 134   # 134 kHz
//! ```

use proxmark_client::{ProxmarkBuilder, SessionConfig};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let high_mode = std::env::args().nth(1).as_deref() == Some("134");

    // Optional overrides, e.g. PROXMARK_CONFIG='{"timeout_ms": 2000}'
    let config = match std::env::var("PROXMARK_CONFIG") {
        Ok(json) => SessionConfig::from_json(&json)?,
        Err(_) => SessionConfig::default(),
    };

    let mut pm = ProxmarkBuilder::new().config(config).open_usb()?;

    let samples = if high_mode {
        pm.lf_read_134khz()?
    } else {
        pm.lf_read_125khz()?
    };

    for line in samples.as_slice().chunks(16) {
        let row: Vec<String> = line.iter().map(|s| format!("{s:4}")).collect();
        println!("{}", row.join(" "));
    }

    pm.close()?;
    Ok(())
}
