//! Fan work out over a push/pull pipeline.
//!
//! A ventilator pushes numbered jobs; two workers pull them round-robin
//! and stop once their receive timeout sees no more work.

use std::thread;

use spaceframe::{Domain, Message, OptionValue, Socket, SocketOption, SocketType};

const JOBS: u32 = 10;
const WORKERS: usize = 2;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pipeline Fanout ===\n");

    let mut ventilator = Socket::new(Domain::Sp, SocketType::Push)?;
    ventilator.bind("inproc://pipeline.jobs")?;
    println!("1. Ventilator bound to 'inproc://pipeline.jobs'");

    let mut workers = Vec::new();
    for id in 0..WORKERS {
        workers.push(thread::spawn(move || -> spaceframe::Result<u32> {
            let mut puller = Socket::new(Domain::Sp, SocketType::Pull)?;
            puller.connect("inproc://pipeline.jobs")?;
            puller.set_option(SocketOption::ReceiveTimeout, OptionValue::from(300))?;

            let mut handled = 0;
            loop {
                match puller.recvmsg(2) {
                    Ok(job) => {
                        let seq = job.at(0).unwrap().as_scalar::<u32>()?;
                        println!("[Worker {id}] Job #{seq}");
                        handled += 1;
                    }
                    Err(err) if err.is_timed_out() => break,
                    Err(err) => return Err(err),
                }
            }
            Ok(handled)
        }));
    }
    println!("2. {WORKERS} workers pulling\n");

    for seq in 0..JOBS {
        let mut job = Message::new();
        job.append(seq).append_str("payload");
        ventilator.sendmsg(&mut job)?;
    }

    let mut total = 0;
    for (id, worker) in workers.into_iter().enumerate() {
        let handled = worker.join().expect("worker thread panicked")?;
        println!("[Worker {id}] Handled {handled} jobs");
        total += handled;
    }

    println!("\n=== {total} of {JOBS} jobs handled ===");
    Ok(())
}
