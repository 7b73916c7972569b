use std::io::{self, Write};
use std::time::Duration;

use clap::Parser;

/// Reads data from a serial port and echoes it to stdout.
#[derive(Parser)]
struct Args {
    /// The device path to a serial port.
    port: String,
    /// The baud rate to connect at.
    baud: u32,
}

fn main() {
    let args = Args::parse();

    let port = serialport::new(&args.port, args.baud)
        .timeout(Duration::from_millis(10))
        .open();

    match port {
        Ok(mut port) => {
            let mut serial_buf: Vec<u8> = vec![0; 1000];
            println!("Receiving data on {} at {} baud:", &args.port, &args.baud);
            loop {
                match port.read(serial_buf.as_mut_slice()) {
                    Ok(t) => io::stdout().write_all(&serial_buf[..t]).unwrap(),
                    Err(ref e) if e.kind() == io::ErrorKind::TimedOut => (),
                    Err(e) => eprintln!("{e:?}"),
                }
            }
        }
        Err(e) => {
            eprintln!("Failed to open \"{}\". Error: {e}", args.port);
            std::process::exit(1);
        }
    }
}
