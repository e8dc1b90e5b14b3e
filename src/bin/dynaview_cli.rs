//! One-shot CLI client for the simulation server.
//!
//! Examples:
//!   dynaview-cli reset
//!   dynaview-cli control pull_k=0.02 alpha=0.3
//!   dynaview-cli watch 30
//!   dynaview-cli keys
//!
//! By default it talks to 127.0.0.1:8765; override with `--addr host:port`.

use dynaview::prelude::*;
use dynaview::time::Instant;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpStream;
use std::process;
use std::time::Duration;

const DEFAULT_ADDR: &str = "127.0.0.1:8765";

fn usage() -> ! {
    eprintln!("dynaview-cli (talks to the simulation @ {DEFAULT_ADDR} by default)");
    eprintln!("Usage: dynaview-cli [--addr host:port] <command> [args]\n");
    eprintln!("Commands:");
    eprintln!("  reset                       Reset the simulation");
    eprintln!("  control key=value ...       Send control parameters (unset keys use defaults)");
    eprintln!("  watch [n]                   Fit and print the next n snapshots (default 10)");
    eprintln!("  keys                        List control keys and their defaults");
    process::exit(1);
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }

    let mut addr = DEFAULT_ADDR.to_string();
    if args.len() >= 2 && args[0] == "--addr" {
        addr = args[1].clone();
        args.drain(0..2);
    }

    if args.is_empty() {
        usage();
    }

    (addr, args)
}

fn parse_controls(pairs: &[String]) -> Result<ControlParams, String> {
    let mut params = ControlParams::default();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{pair}'"))?;
        let key: ControlKey = key.parse()?;
        let value: f64 = value
            .parse()
            .map_err(|_| format!("{} must be a number", key.label()))?;
        if !value.is_finite() {
            return Err(format!("{} must be finite", key.label()));
        }
        params.set(key, value);
    }
    Ok(params)
}

fn connect(addr: &str) -> Result<TcpStream, String> {
    let stream = TcpStream::connect(addr).map_err(|e| format!("connect: {e}"))?;
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .map_err(|e| format!("set_read_timeout: {e}"))?;
    Ok(stream)
}

fn send_command(addr: &str, cmd: &Command) -> Result<(), String> {
    let mut stream = connect(addr)?;
    let line = cmd.encode().map_err(|e| format!("serialize: {e}"))?;
    stream
        .write_all(line.as_bytes())
        .and_then(|_| stream.write_all(b"\n"))
        .and_then(|_| stream.flush())
        .map_err(|e| format!("send: {e}"))
}

/// Pulse step for a snapshot arriving at `now`, measured like the console does.
fn pulse_dt(clock: &mut ArrivalClock, pulse: &PulseClock, now: Instant) -> f64 {
    pulse.step(clock.mark(now))
}

fn watch(addr: &str, count: usize) -> Result<(), String> {
    let stream = connect(addr)?;
    let reader = BufReader::new(stream);
    let mut viewport = Viewport::new(RenderParams::default());
    let mut clock = ArrivalClock::new();
    let pulse = PulseClock::default();

    let mut seen = 0usize;
    for line in reader.lines() {
        if seen >= count {
            break;
        }
        let line = line.map_err(|e| format!("recv: {e}"))?;
        let snap = match Inbound::decode(&line) {
            Ok(Inbound::Snapshot(s)) => s,
            Ok(other) => {
                println!("(skipped {other:?})");
                continue;
            }
            Err(e) => {
                eprintln!("(undecodable line: {e})");
                continue;
            }
        };
        let dt = pulse_dt(&mut clock, &pulse, Instant::now());
        let r = viewport.render(&snap, dt);
        println!(
            "#{:<4} drift={:.4} entropy={:.4} nodes={} edges={} scale={:.3} offset=({:.1},{:.1}) pulse={:.3}",
            seen,
            snap.drift.unwrap_or(f64::NAN),
            snap.entropy.unwrap_or(f64::NAN),
            snap.emb.len(),
            r.scene.lines().count(),
            r.transform.scale,
            r.transform.offset_x,
            r.transform.offset_y,
            r.pulse,
        );
        seen += 1;
    }
    Ok(())
}

fn main() {
    let (addr, args) = parse_args();
    let cmd = &args[0];

    let result = match cmd.as_str() {
        "reset" => send_command(&addr, &Command::Reset).map(|_| println!("reset sent")),
        "control" => parse_controls(&args[1..]).and_then(|payload| {
            send_command(&addr, &Command::Control { payload })
                .map(|_| println!("control sent: {payload:?}"))
        }),
        "watch" => {
            let n = match args.get(1) {
                Some(s) => s.parse().unwrap_or_else(|_| {
                    eprintln!("watch count must be a number");
                    process::exit(1);
                }),
                None => 10,
            };
            watch(&addr, n)
        }
        "keys" => {
            let defaults = ControlParams::default();
            for key in ControlKey::all() {
                println!("{:<16} {}", key.label(), defaults.get(*key));
            }
            Ok(())
        }
        _ => usage(),
    };

    if let Err(e) = result {
        eprintln!("Failed: {e}");
        process::exit(1);
    }
}
