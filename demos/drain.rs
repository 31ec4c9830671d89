//! Drain - start an ISO14443A snoop and print whatever the device sends.
//!
//! Press the device button to end the snoop; the drain stops once the device
//! has been quiet for one timeout period.

use std::time::Duration;

use proxmark_client::{DrainEnd, ProxmarkBuilder};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut pm = ProxmarkBuilder::new()
        .timeout(Duration::from_secs(5))
        .open_usb()?;

    pm.hf_snoop_iso14443a()?;
    let drained = pm.read_msgs();

    for frame in &drained.frames {
        println!(
            "opcode=0x{:03x} ext=({}, {}, {})",
            frame.opcode, frame.ext1, frame.ext2, frame.ext3
        );
    }

    match drained.end {
        DrainEnd::Quiet => println!("{} frames, device quiet", drained.frames.len()),
        DrainEnd::Fault(e) => eprintln!("{} frames, stopped on error: {e}", drained.frames.len()),
    }

    pm.close()?;
    Ok(())
}
