//! Pattern Semantics Integration Tests
//!
//! Drives each messaging pattern through the C-shaped entry points:
//! request/reply state enforcement, stale-reply filtering, subscription
//! matching, pipeline distribution, survey deadlines, and bus fan-out.

use std::thread;
use std::time::Duration;

use spaceframe_core::error::Errno;
use spaceframe_core::fabric::{bind, close, connect, open, recv, recvmsg, send, set_option};
use spaceframe_core::protocol::{
    AF_SP, AF_SP_RAW, BUS, DONTWAIT, PAIR, PUB, PULL, PUSH, REP, REQ, RESPONDENT, SUB,
    SUB_SUBSCRIBE, SURVEYOR, SURVEYOR_DEADLINE,
};

fn recv_text(fd: i32, flags: i32) -> Result<String, Errno> {
    let mut buf = [0u8; 64];
    let got = recv(fd, &mut buf, flags)?;
    Ok(String::from_utf8_lossy(&buf[..got.min(buf.len())]).into_owned())
}

/// Full request/reply round trip
#[test]
fn test_req_rep_round_trip() {
    let rep = open(AF_SP, REP).unwrap();
    let req = open(AF_SP, REQ).unwrap();
    bind(rep, "inproc://patterns.reqrep").unwrap();
    connect(req, "inproc://patterns.reqrep").unwrap();

    send(req, b"what time is it", DONTWAIT).unwrap();
    assert_eq!(recv_text(rep, DONTWAIT).unwrap(), "what time is it");
    send(rep, b"beer o'clock", DONTWAIT).unwrap();
    assert_eq!(recv_text(req, DONTWAIT).unwrap(), "beer o'clock");

    close(req).unwrap();
    close(rep).unwrap();
}

/// The request/reply state machine rejects out-of-order operations
#[test]
fn test_req_rep_state_enforcement() {
    let rep = open(AF_SP, REP).unwrap();
    let req = open(AF_SP, REQ).unwrap();
    bind(rep, "inproc://patterns.fsm").unwrap();
    connect(req, "inproc://patterns.fsm").unwrap();

    // Receive before any request went out
    assert_eq!(recvmsg(req, DONTWAIT).unwrap_err(), Errno::BadState);
    // Reply before any request came in
    assert_eq!(send(rep, b"eager", DONTWAIT).unwrap_err(), Errno::BadState);

    // One full cycle resets both sides
    send(req, b"ping", DONTWAIT).unwrap();
    recv_text(rep, DONTWAIT).unwrap();
    send(rep, b"pong", DONTWAIT).unwrap();
    recv_text(req, DONTWAIT).unwrap();
    assert_eq!(recvmsg(req, DONTWAIT).unwrap_err(), Errno::BadState);
    assert_eq!(send(rep, b"again", DONTWAIT).unwrap_err(), Errno::BadState);

    close(req).unwrap();
    close(rep).unwrap();
}

/// Re-issuing a request abandons the previous one; its reply is dropped
#[test]
fn test_reissued_request_drops_stale_reply() {
    let rep = open(AF_SP, REP).unwrap();
    let req = open(AF_SP, REQ).unwrap();
    bind(rep, "inproc://patterns.stale").unwrap();
    connect(req, "inproc://patterns.stale").unwrap();

    send(req, b"first", DONTWAIT).unwrap();
    assert_eq!(recv_text(rep, DONTWAIT).unwrap(), "first");

    // The requester gives up and asks again before the reply arrives
    send(req, b"second", DONTWAIT).unwrap();

    // The reply to the abandoned request goes nowhere
    send(rep, b"stale answer", DONTWAIT).unwrap();
    assert_eq!(recvmsg(req, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    // The current request still completes
    assert_eq!(recv_text(rep, DONTWAIT).unwrap(), "second");
    send(rep, b"fresh answer", DONTWAIT).unwrap();
    assert_eq!(recv_text(req, DONTWAIT).unwrap(), "fresh answer");

    close(req).unwrap();
    close(rep).unwrap();
}

/// Subscribers only see messages matching a subscribed prefix
#[test]
fn test_pub_sub_prefix_filtering() {
    let publisher = open(AF_SP, PUB).unwrap();
    let subscriber = open(AF_SP, SUB).unwrap();
    bind(publisher, "inproc://patterns.pubsub").unwrap();
    connect(subscriber, "inproc://patterns.pubsub").unwrap();
    set_option(subscriber, SUB, SUB_SUBSCRIBE, b"alerts/").unwrap();

    send(publisher, b"alerts/fire in sector 7", 0).unwrap();
    send(publisher, b"news/nothing happened", 0).unwrap();
    send(publisher, b"alerts/flood", 0).unwrap();

    assert_eq!(
        recv_text(subscriber, DONTWAIT).unwrap(),
        "alerts/fire in sector 7"
    );
    assert_eq!(recv_text(subscriber, DONTWAIT).unwrap(), "alerts/flood");
    assert_eq!(recvmsg(subscriber, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    close(subscriber).unwrap();
    close(publisher).unwrap();
}

/// A subscriber with no subscriptions receives nothing
#[test]
fn test_unsubscribed_sub_receives_nothing() {
    let publisher = open(AF_SP, PUB).unwrap();
    let subscriber = open(AF_SP, SUB).unwrap();
    bind(publisher, "inproc://patterns.nosub").unwrap();
    connect(subscriber, "inproc://patterns.nosub").unwrap();

    send(publisher, b"anyone listening?", 0).unwrap();
    assert_eq!(recvmsg(subscriber, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    close(subscriber).unwrap();
    close(publisher).unwrap();
}

/// Pipeline sends rotate across connected consumers
#[test]
fn test_push_pull_round_robin() {
    let producer = open(AF_SP, PUSH).unwrap();
    let worker_a = open(AF_SP, PULL).unwrap();
    let worker_b = open(AF_SP, PULL).unwrap();
    bind(producer, "inproc://patterns.pipeline").unwrap();
    connect(worker_a, "inproc://patterns.pipeline").unwrap();
    connect(worker_b, "inproc://patterns.pipeline").unwrap();

    for job in [b"job0", b"job1", b"job2", b"job3"] {
        send(producer, job, DONTWAIT).unwrap();
    }

    let mut counts = [0usize; 2];
    for (slot, worker) in [worker_a, worker_b].into_iter().enumerate() {
        while recvmsg(worker, DONTWAIT).is_ok() {
            counts[slot] += 1;
        }
    }
    assert_eq!(counts, [2, 2], "four jobs should split evenly");

    close(worker_a).unwrap();
    close(worker_b).unwrap();
    close(producer).unwrap();
}

/// Surveys collect responses until the deadline, then time out
#[test]
fn test_survey_deadline() {
    let surveyor = open(AF_SP, SURVEYOR).unwrap();
    let voter_a = open(AF_SP, RESPONDENT).unwrap();
    let voter_b = open(AF_SP, RESPONDENT).unwrap();
    bind(surveyor, "inproc://patterns.survey").unwrap();
    connect(voter_a, "inproc://patterns.survey").unwrap();
    connect(voter_b, "inproc://patterns.survey").unwrap();
    set_option(surveyor, SURVEYOR, SURVEYOR_DEADLINE, &100i32.to_ne_bytes()).unwrap();

    send(surveyor, b"ship it?", DONTWAIT).unwrap();
    assert_eq!(recv_text(voter_a, DONTWAIT).unwrap(), "ship it?");
    assert_eq!(recv_text(voter_b, DONTWAIT).unwrap(), "ship it?");

    // One vote lands inside the window
    send(voter_a, b"yes", DONTWAIT).unwrap();
    assert_eq!(recv_text(surveyor, DONTWAIT).unwrap(), "yes");

    // The survey expires; collecting again reports the timeout once,
    // then the pattern is idle
    thread::sleep(Duration::from_millis(150));
    assert_eq!(recvmsg(surveyor, DONTWAIT).unwrap_err(), Errno::TimedOut);
    assert_eq!(recvmsg(surveyor, DONTWAIT).unwrap_err(), Errno::BadState);

    // A vote after the deadline goes nowhere
    send(voter_b, b"no", DONTWAIT).unwrap();
    assert_eq!(recvmsg(surveyor, DONTWAIT).unwrap_err(), Errno::BadState);

    close(voter_a).unwrap();
    close(voter_b).unwrap();
    close(surveyor).unwrap();
}

/// A fresh survey supersedes the previous one
#[test]
fn test_new_survey_supersedes_old() {
    let surveyor = open(AF_SP, SURVEYOR).unwrap();
    let voter = open(AF_SP, RESPONDENT).unwrap();
    bind(surveyor, "inproc://patterns.resurvey").unwrap();
    connect(voter, "inproc://patterns.resurvey").unwrap();

    send(surveyor, b"round one", DONTWAIT).unwrap();
    assert_eq!(recv_text(voter, DONTWAIT).unwrap(), "round one");

    send(surveyor, b"round two", DONTWAIT).unwrap();

    // The vote answers round one; round two ignores it
    send(voter, b"one!", DONTWAIT).unwrap();
    assert_eq!(recvmsg(surveyor, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    assert_eq!(recv_text(voter, DONTWAIT).unwrap(), "round two");
    send(voter, b"two!", DONTWAIT).unwrap();
    assert_eq!(recv_text(surveyor, DONTWAIT).unwrap(), "two!");

    close(voter).unwrap();
    close(surveyor).unwrap();
}

/// Bus messages reach every linked peer except the sender
#[test]
fn test_bus_fan_out() {
    let hub = open(AF_SP, BUS).unwrap();
    let spoke_a = open(AF_SP, BUS).unwrap();
    let spoke_b = open(AF_SP, BUS).unwrap();
    bind(hub, "inproc://patterns.bus").unwrap();
    connect(spoke_a, "inproc://patterns.bus").unwrap();
    connect(spoke_b, "inproc://patterns.bus").unwrap();

    send(hub, b"all stations", DONTWAIT).unwrap();
    assert_eq!(recv_text(spoke_a, DONTWAIT).unwrap(), "all stations");
    assert_eq!(recv_text(spoke_b, DONTWAIT).unwrap(), "all stations");

    // Spokes only link to the hub, not to each other
    send(spoke_a, b"from a", DONTWAIT).unwrap();
    assert_eq!(recv_text(hub, DONTWAIT).unwrap(), "from a");
    assert_eq!(recvmsg(spoke_b, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    close(spoke_a).unwrap();
    close(spoke_b).unwrap();
    close(hub).unwrap();
}

/// Raw-domain sockets route without per-pattern state enforcement
#[test]
fn test_raw_domain_forwarding() {
    let raw_rep = open(AF_SP_RAW, REP).unwrap();
    let req = open(AF_SP, REQ).unwrap();
    bind(raw_rep, "inproc://patterns.raw").unwrap();
    connect(req, "inproc://patterns.raw").unwrap();

    send(req, b"through the device", DONTWAIT).unwrap();
    assert_eq!(recv_text(raw_rep, DONTWAIT).unwrap(), "through the device");

    // A raw reply carries no correlation, so a strict requester drops it
    send(raw_rep, b"device answer", DONTWAIT).unwrap();
    assert_eq!(recvmsg(req, DONTWAIT).unwrap_err(), Errno::WouldBlock);

    close(req).unwrap();
    close(raw_rep).unwrap();
}

/// Pair sockets carry traffic both ways over one link
#[test]
fn test_pair_bidirectional() {
    let left = open(AF_SP, PAIR).unwrap();
    let right = open(AF_SP, PAIR).unwrap();
    bind(left, "inproc://patterns.pair").unwrap();
    connect(right, "inproc://patterns.pair").unwrap();

    send(left, b"ping", DONTWAIT).unwrap();
    send(right, b"pong", DONTWAIT).unwrap();
    assert_eq!(recv_text(right, DONTWAIT).unwrap(), "ping");
    assert_eq!(recv_text(left, DONTWAIT).unwrap(), "pong");

    close(left).unwrap();
    close(right).unwrap();
}
