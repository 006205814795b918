//! Survey a group of respondents and tally the answers.
//!
//! The surveyor sets a deadline, broadcasts one question, and collects
//! votes until the deadline reports timeout. Respondents that answer
//! late are simply not counted.

use std::sync::{Arc, Barrier};
use std::thread;

use spaceframe::{Domain, Message, OptionValue, Socket, SocketOption, SocketType};

const RESPONDENTS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    spaceframe::dev_tracing::init_tracing();
    println!("=== Survey Quorum ===\n");

    let mut surveyor = Socket::new(Domain::Sp, SocketType::Surveyor)?;
    surveyor.bind("inproc://survey.quorum")?;
    surveyor.set_option(SocketOption::SurveyorDeadline, OptionValue::from(500))?;
    println!("1. Surveyor bound, deadline 500 ms");

    let connected = Arc::new(Barrier::new(RESPONDENTS + 1));
    let mut voters = Vec::new();
    for id in 0..RESPONDENTS {
        let connected = Arc::clone(&connected);
        voters.push(thread::spawn(move || -> spaceframe::Result<()> {
            let mut respondent = Socket::new(Domain::Sp, SocketType::Respondent)?;
            respondent.connect("inproc://survey.quorum")?;
            connected.wait();

            let question = respondent.recvmsg(1)?;
            println!(
                "[Respondent {id}] Question: {}",
                String::from_utf8_lossy(question.at(0).unwrap().as_bytes())
            );

            let mut vote = Message::new();
            vote.append_str(if id % 2 == 0 { "aye" } else { "nay" });
            respondent.sendmsg(&mut vote)?;
            Ok(())
        }));
    }
    // Every respondent must be linked before the question goes out
    connected.wait();
    println!("2. {RESPONDENTS} respondents connected\n");

    let mut question = Message::new();
    question.append_str("ship it?");
    surveyor.sendmsg(&mut question)?;

    let (mut ayes, mut nays) = (0, 0);
    loop {
        match surveyor.recvmsg(1) {
            Ok(vote) => match vote.at(0).unwrap().as_bytes() {
                b"aye" => ayes += 1,
                _ => nays += 1,
            },
            Err(err) if err.is_timed_out() => break,
            Err(err) => return Err(err.into()),
        }
    }

    for voter in voters {
        voter.join().expect("respondent thread panicked")?;
    }

    println!("[Surveyor] ayes={ayes} nays={nays}");
    println!(
        "\n=== {} ===",
        if ayes > nays { "Motion carries" } else { "Motion fails" }
    );
    Ok(())
}
