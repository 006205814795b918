//! Bidirectional pair over the in-process fabric.
//!
//! One thread per side; each message carries a sequence number and a
//! text part.

use std::thread;

use spaceframe::{Domain, Message, Socket, SocketType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Pair Hello ===\n");

    let mut server = Socket::new(Domain::Sp, SocketType::Pair)?;
    server.bind("inproc://pair.hello")?;
    println!("1. Server bound to 'inproc://pair.hello'");

    let server_thread = thread::spawn(move || -> spaceframe::Result<()> {
        for _ in 0..3 {
            let request = server.recvmsg(2)?;
            let seq = request.at(0).unwrap().as_scalar::<u32>()?;
            let text = String::from_utf8_lossy(request.at(1).unwrap().as_bytes()).into_owned();
            println!("[Server] #{seq}: {text}");

            let mut reply = Message::new();
            reply.append(seq).append_str("hello to you too");
            server.sendmsg(&mut reply)?;
        }
        Ok(())
    });

    let mut client = Socket::new(Domain::Sp, SocketType::Pair)?;
    client.connect("inproc://pair.hello")?;
    println!("2. Client connected\n");

    for seq in 0u32..3 {
        let mut msg = Message::new();
        msg.append(seq).append_str("hello over there");
        client.sendmsg(&mut msg)?;

        let reply = client.recvmsg(2)?;
        println!(
            "[Client] #{}: {}",
            reply.at(0).unwrap().as_scalar::<u32>()?,
            String::from_utf8_lossy(reply.at(1).unwrap().as_bytes())
        );
    }

    server_thread.join().expect("server thread panicked")?;
    println!("\n=== Done ===");
    Ok(())
}
