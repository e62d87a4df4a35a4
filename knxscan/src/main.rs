//! Sweep a KNX line for devices that answer a transport connect
//!
//! Dials every individual address in the requested range over a
//! simulated tunnelling gateway, reads the device descriptor of every
//! device that answers and prints the results.

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::Parser;
use knx::IndividualAddr;
use knx::transport::{Bus, BusConfig};
use knx_sim::wired_gateway;

#[derive(Parser, Debug)]
#[command(name = "knxscan", about = "Scan a KNX line for responding devices")]
struct Args {
    /// Line to scan, as "area.line"
    #[arg(long, default_value = "1.1")]
    line: String,

    /// First device number to probe
    #[arg(long, default_value_t = 1)]
    start: u8,

    /// Last device number to probe
    #[arg(long, default_value_t = 255)]
    stop: u8,

    /// Device numbers the simulated gateway answers for
    #[arg(long, value_delimiter = ',', default_values_t = [1u8, 7, 42])]
    present: Vec<u8>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.start > args.stop {
        bail!("start ({}) must not exceed stop ({})", args.start, args.stop);
    }
    let (area, line) = parse_line(&args.line)?;

    // The gateway answers for the devices named on the command line
    let (link, frames, mut sim) = wired_gateway(32);
    for &device in &args.present {
        let addr = IndividualAddr::new(area, line, device)?;
        sim = sim.with_device(addr, Bytes::from_static(&[0x07, 0xB0]));
    }
    sim.spawn();

    let (bus, _groups) = Bus::open(link, frames, BusConfig::default());

    let mut found = 0usize;
    for device in args.start..=args.stop {
        let addr = IndividualAddr::new(area, line, device)?;
        let mut session = match bus.dial(addr).await {
            Ok(session) => session,
            Err(e) => {
                log::debug!("{}: {}", addr, e);
                continue;
            }
        };

        match session.device_descriptor_read(&[0x00]).await {
            Ok(descriptor) => {
                println!("{}: descriptor {:02X?}", addr, descriptor.as_ref());
                found += 1;
            }
            Err(e) => log::warn!("{}: descriptor read failed: {}", addr, e),
        }
        let _ = session.close();
    }

    println!("{} device(s) found on line {}.{}", found, area, line);
    Ok(())
}

fn parse_line(s: &str) -> anyhow::Result<(u8, u8)> {
    let (area, line) = s
        .split_once('.')
        .with_context(|| format!("expected \"area.line\", got {:?}", s))?;
    let area = area
        .parse::<u8>()
        .with_context(|| format!("invalid area {:?}", area))?;
    let line = line
        .parse::<u8>()
        .with_context(|| format!("invalid line {:?}", line))?;
    Ok((area, line))
}
