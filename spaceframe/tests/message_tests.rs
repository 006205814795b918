//! Part and message semantics: copy independence, typed appends, the
//! descriptor view, and release behavior. Nothing here touches a socket.

use spaceframe::{Error, Message, Part};

/// A part built with `from_bytes` owns an independent deep copy.
#[test]
fn test_from_bytes_deep_copy_independence() {
    let mut source = vec![10u8, 20, 30];
    let mut part = Part::from_bytes(&source);

    source[0] = 99;
    assert_eq!(
        part.as_bytes(),
        &[10, 20, 30],
        "mutating the source must not reach the part"
    );

    part.as_bytes_mut()[1] = 77;
    assert_eq!(
        source,
        vec![99, 20, 30],
        "mutating the part must not reach the source"
    );
}

/// Part count equals append count equals descriptor length.
#[test]
fn test_part_count_matches_appends() {
    let mut msg = Message::new();
    msg.append(1u32)
        .append(2u64)
        .append_str("three")
        .append_bytes(b"four")
        .add_part(Part::alloc(5));

    assert_eq!(msg.len(), 5);
    let desc = msg.generate_descriptor();
    assert_eq!(desc.len(), 5);
    assert_eq!(desc.total_bytes(), 4 + 8 + 5 + 4 + 5);
}

/// Typed appends round-trip through `as_scalar` with exact widths.
#[test]
fn test_typed_append_round_trip() {
    let mut msg = Message::new();
    msg.append(0xdead_beefu32)
        .append(-40_000i64)
        .append(1.5f64)
        .append(0x7fu8);

    assert_eq!(msg.at(0).unwrap().as_scalar::<u32>().unwrap(), 0xdead_beef);
    assert_eq!(msg.at(1).unwrap().as_scalar::<i64>().unwrap(), -40_000);
    assert_eq!(msg.at(2).unwrap().as_scalar::<f64>().unwrap(), 1.5);
    assert_eq!(msg.at(3).unwrap().as_scalar::<u8>().unwrap(), 0x7f);
}

/// Reading a scalar of the wrong width is refused, not truncated.
#[test]
fn test_scalar_width_mismatch_rejected() {
    let mut msg = Message::new();
    msg.append(7u32);
    let part = msg.at(0).unwrap();

    assert_eq!(part.as_scalar::<u64>().unwrap_err(), Error::InvalidArgument);
    assert_eq!(part.as_scalar::<u16>().unwrap_err(), Error::InvalidArgument);
    assert_eq!(part.as_scalar::<u32>().unwrap(), 7, "the exact width still reads");
}

/// The descriptor is rebuilt per call and reflects current contents.
#[test]
fn test_descriptor_tracks_mutation() {
    let mut msg = Message::new();
    msg.append_bytes(b"old");
    assert_eq!(msg.generate_descriptor().iter().next().unwrap().bytes, b"old");

    msg.at_mut(0).unwrap().as_bytes_mut().copy_from_slice(b"new");
    assert_eq!(msg.generate_descriptor().iter().next().unwrap().bytes, b"new");
}

/// Parts keep insertion order through `from_parts` and iteration.
#[test]
fn test_from_parts_preserves_order() {
    let parts = vec![
        Part::from_bytes(b"a"),
        Part::from_bytes(b"bb"),
        Part::from_bytes(b"ccc"),
    ];
    let msg = Message::from_parts(parts);

    let lens: Vec<usize> = msg.iter().map(Part::len).collect();
    assert_eq!(lens, vec![1, 2, 3]);
}

/// A released part reads as empty and releases only once.
#[test]
fn test_released_part_is_empty() {
    let mut part = Part::from_bytes(b"gone");
    let buf = part.release().expect("first release yields the buffer");
    assert_eq!(buf.as_slice(), b"gone");

    assert!(part.is_released());
    assert!(part.is_empty());
    assert!(part.as_bytes().is_empty());
    assert!(part.release().is_none(), "second release must yield nothing");
}

/// `Message::release` frees every part and leaves an empty message.
#[test]
fn test_message_release_clears() {
    let mut msg = Message::new();
    msg.append_str("x").append_str("y");
    msg.release();

    assert!(msg.is_empty());
    assert_eq!(msg.generate_descriptor().len(), 0);
}

/// Iteration is non-consuming; a descriptor can be regenerated after.
#[test]
fn test_iteration_is_reusable() {
    let mut msg = Message::new();
    msg.append(1u8).append(2u8);

    let first: Vec<u8> = msg.iter().map(|p| p.as_bytes()[0]).collect();
    let second: Vec<u8> = (&msg).into_iter().map(|p| p.as_bytes()[0]).collect();
    assert_eq!(first, second);
    assert_eq!(msg.generate_descriptor().len(), 2);
}
