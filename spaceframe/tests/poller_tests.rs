//! Readiness polling across sockets: interest registration, timeouts,
//! cross-thread wakeups, and stale registrations.

use std::thread;
use std::time::{Duration, Instant};

use spaceframe::{Domain, Interest, Message, Poller, Socket, SocketType};

fn open(ty: SocketType) -> Socket {
    Socket::new(Domain::Sp, ty).expect("Failed to open socket")
}

/// An unconnected socket that can send polls writable immediately.
#[test]
fn test_unconnected_socket_polls_writable() {
    let mut socket = open(SocketType::Pair);
    socket.bind("inproc://facade.poll.writable").unwrap();

    let mut poller = Poller::new();
    poller.add(&socket, Interest::Writable);

    let ready = poller.poll(Some(Duration::ZERO)).unwrap();
    assert!(ready, "send readiness does not depend on peers");
    assert!(poller.has_event(&socket, Interest::Writable));
    assert!(!poller.has_event(&socket, Interest::Readable));
}

/// Delivery flips a socket readable; draining it flips it back.
#[test]
fn test_readable_tracks_queue_state() {
    let mut listener = open(SocketType::Pair);
    listener.bind("inproc://facade.poll.readable").unwrap();
    let mut peer = open(SocketType::Pair);
    peer.connect("inproc://facade.poll.readable").unwrap();

    let mut poller = Poller::new();
    poller.add(&listener, Interest::Both);

    let mut msg = Message::new();
    msg.append_str("pending");
    peer.sendmsg(&mut msg).unwrap();

    assert!(poller.poll(Some(Duration::ZERO)).unwrap());
    assert!(poller.has_event(&listener, Interest::Readable));
    assert!(
        poller.has_event(&listener, Interest::Both),
        "any overlapping readiness satisfies a combined interest"
    );

    // Level-triggered: still readable until drained
    assert!(poller.poll(Some(Duration::ZERO)).unwrap());
    listener.recvmsg(1).unwrap();

    assert!(poller.poll(Some(Duration::ZERO)).unwrap(), "still writable");
    assert!(!poller.has_event(&listener, Interest::Readable));
}

/// With nothing ready the poll waits out its timeout and reports false.
#[test]
fn test_timeout_expires_quietly() {
    let mut subscriber = open(SocketType::Sub);
    subscriber.connect("inproc://facade.poll.quiet").unwrap();

    let mut poller = Poller::new();
    poller.add(&subscriber, Interest::Both);

    let start = Instant::now();
    let ready = poller.poll(Some(Duration::from_millis(120))).unwrap();
    assert!(!ready, "nothing can become ready on an idle subscriber");
    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "the timeout must be waited out"
    );
}

/// A poll blocked on an empty queue wakes when another thread delivers.
#[test]
fn test_wakes_on_cross_thread_delivery() {
    let mut puller = open(SocketType::Pull);
    puller.bind("inproc://facade.poll.wake").unwrap();

    let pusher = thread::spawn(|| {
        let mut push = open(SocketType::Push);
        push.connect("inproc://facade.poll.wake").unwrap();
        thread::sleep(Duration::from_millis(50));
        let mut msg = Message::new();
        msg.append_str("delivered");
        push.sendmsg(&mut msg).unwrap();
        thread::sleep(Duration::from_millis(100));
    });

    let mut poller = Poller::new();
    poller.add(&puller, Interest::Readable);

    let start = Instant::now();
    let ready = poller.poll(Some(Duration::from_secs(2))).unwrap();
    assert!(ready, "the delivery must wake the poll");
    assert!(
        start.elapsed() < Duration::from_secs(2),
        "the wakeup must beat the timeout"
    );
    assert!(poller.has_event(&puller, Interest::Readable));
    pusher.join().unwrap();
}

/// Re-adding a socket updates its interest in place; removal forgets it.
#[test]
fn test_add_updates_and_remove_forgets() {
    let mut socket = open(SocketType::Pair);
    socket.bind("inproc://facade.poll.registry").unwrap();

    let mut poller = Poller::new();
    poller.add(&socket, Interest::Writable);
    poller.add(&socket, Interest::Readable);
    assert_eq!(poller.len(), 1, "re-adding must not duplicate the entry");

    assert!(
        !poller.poll(Some(Duration::ZERO)).unwrap(),
        "the registration now watches readability only"
    );

    poller.remove(&socket);
    assert!(poller.is_empty());
    assert!(!poller.has_event(&socket, Interest::Both));
    assert!(
        !poller.poll(Some(Duration::ZERO)).unwrap(),
        "an empty set has nothing to report"
    );
}

/// A registration that outlives its socket reports nothing.
#[test]
fn test_closed_socket_reports_nothing() {
    let mut stale = open(SocketType::Pair);
    stale.bind("inproc://facade.poll.stale").unwrap();
    let mut live = open(SocketType::Pair);
    live.bind("inproc://facade.poll.stale2").unwrap();

    let mut poller = Poller::new();
    poller.add(&stale, Interest::Both);
    poller.add(&live, Interest::Writable);

    stale.close().unwrap();

    let ready = poller.poll(Some(Duration::ZERO)).unwrap();
    assert!(ready, "the live socket still polls writable");
    assert!(!poller.has_event(&stale, Interest::Both));
    assert!(poller.has_event(&live, Interest::Writable));
}
