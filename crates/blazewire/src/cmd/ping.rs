use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use blazewire_client::NoopWatcher;
use serde::Serialize;

use crate::cmd::{open_session, parse_timeout, PingArgs};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PingOutput<'a> {
    address: &'a str,
    sent: usize,
    rtt_ms: Vec<f64>,
    avg_ms: Option<f64>,
}

fn millis(d: Duration) -> f64 {
    (d.as_secs_f64() * 1000.0 * 100.0).round() / 100.0
}

pub fn run(args: PingArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_timeout(&args.connect.timeout)?;
    let mut session = open_session(&args.connect, NoopWatcher, timeout)?;

    let mut rtt_ms = Vec::with_capacity(args.count);
    for _ in 0..args.count.max(1) {
        let rtt = Rc::new(Cell::new(None));
        let sink = Rc::clone(&rtt);
        let token = session
            .ping(move |d| sink.set(Some(d)))
            .map_err(|err| client_error("ping failed", err))?;
        session
            .wait(&token, timeout)
            .map_err(|err| client_error("ping failed", err))?;
        if let Some(d) = rtt.get() {
            rtt_ms.push(millis(d));
        }
    }

    let avg_ms = (!rtt_ms.is_empty()).then(|| rtt_ms.iter().sum::<f64>() / rtt_ms.len() as f64);
    let out = PingOutput {
        address: &args.connect.address,
        sent: args.count.max(1),
        rtt_ms,
        avg_ms,
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table | OutputFormat::Pretty => {
            for (seq, ms) in out.rtt_ms.iter().enumerate() {
                println!("reply from {}: seq={} time={ms:.2}ms", out.address, seq + 1);
            }
            if let Some(avg) = out.avg_ms {
                println!("{} pings, avg {avg:.2}ms", out.sent);
            }
        }
        OutputFormat::Raw => {
            if let Some(avg) = out.avg_ms {
                println!("{avg:.2}");
            }
        }
    }
    Ok(SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_rounds_to_hundredths() {
        assert_eq!(millis(Duration::from_micros(12_345)), 12.35);
        assert_eq!(millis(Duration::from_millis(3)), 3.0);
    }
}
