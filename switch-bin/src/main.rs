// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]

mod args;
mod program;

use crate::args::CmdArgs;
use crate::program::{CountingDevice, HashForwarding};
use clap::Parser;
use sim::{Clock, EventQueue, SimTime};
use std::time::Duration;
use switch::{Address, ConfigError, PsaSwitch, SwitchEvent};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const ETHERTYPE_IPV4: u16 = 0x0800;

/// Events of the simulation: the switch's own, and packet arrivals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Switch(SwitchEvent),
    Arrival(u64),
}

impl From<SwitchEvent> for Event {
    fn from(event: SwitchEvent) -> Self {
        Event::Switch(event)
    }
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(filter) => EnvFilter::new(filter),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_line_number(true)
        .init();
}

/// Synthetic Ethernet frame number `seq`, padded with zeros to `size` bytes
fn frame(seq: u64, size: usize) -> Vec<u8> {
    let seq = seq.to_be_bytes();
    let mut frame = vec![0x02, 0, 0, seq[5], seq[6], seq[7]];
    frame.extend_from_slice(&[0x02, 0, 0, 1, 0, seq[7] % 7]);
    frame.extend_from_slice(&ETHERTYPE_IPV4.to_be_bytes());
    frame.resize(size.max(frame.len()), 0);
    frame
}

fn run(args: &CmdArgs) -> Result<(), ConfigError> {
    let config = args.switch_config()?;
    info!(
        "Running {} packets over {} ports for {}us at {} pps",
        args.packets, args.ports, args.duration_us, config.packet_rate_pps
    );
    let program = HashForwarding::new(args.ports, config.queues_per_port)?;
    let mut switch = PsaSwitch::new(config, program, CountingDevice::default())?;
    let destination = Address::from([0x02, 0, 0, 0, 0, 0xfe]);

    let mut queue = EventQueue::<Event>::new();
    for seq in 0..args.packets {
        let at = SimTime::from_nanos(seq.saturating_mul(args.interval_ns));
        queue.schedule_at(at, Event::Arrival(seq));
    }
    switch.start(&mut queue);

    let end = SimTime::ZERO + Duration::from_micros(args.duration_us);
    let fired = queue.run_until(end, |queue, event| match event {
        Event::Switch(event) => switch.handle_event(event, queue),
        Event::Arrival(seq) => {
            #[allow(clippy::cast_possible_truncation)]
            let port = (seq % u64::from(args.ports)) as u32;
            let payload = frame(seq, args.packet_size);
            switch.receive_packet(&payload, port, ETHERTYPE_IPV4, &destination, queue.now());
        }
    });
    info!(
        "Simulation stopped at {}: {fired} events processed, {} still pending, {} packets queued",
        queue.now(),
        queue.len(),
        switch.egress_len()
    );

    switch.shutdown();
    println!("{}", switch.stats());
    println!("{}", switch.device());
    Ok(())
}

fn main() {
    let args = CmdArgs::parse();
    init_logging(args.log_level.as_deref());
    info!(" ━━━━━━ PSA switch simulation started ━━━━━━");
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
