//! Integration tests for the FIFO byte store

use chardev::io::BufferCore;

#[test]
fn test_new_buffer_is_empty() {
    let buffer = BufferCore::with_capacity(8).unwrap();
    assert!(buffer.is_empty());
    assert!(!buffer.is_full());
    assert_eq!(buffer.len(), 0);
    assert_eq!(buffer.free(), 8);
}

#[test]
fn test_append_truncates_to_free_space() {
    let mut buffer = BufferCore::with_capacity(4).unwrap();
    assert_eq!(buffer.append(b"abc"), 3);
    assert_eq!(buffer.append(b"def"), 1);
    assert_eq!(buffer.append(b"g"), 0);
    assert!(buffer.is_full());
    assert_eq!(buffer.as_slice(), b"abcd");
}

#[test]
fn test_consume_shifts_remainder() {
    let mut buffer = BufferCore::with_capacity(8).unwrap();
    buffer.append(b"abcdef");

    let mut out = [0u8; 2];
    assert_eq!(buffer.consume(&mut out), 2);
    assert_eq!(&out, b"ab");
    assert_eq!(buffer.as_slice(), b"cdef");

    // Space freed at the front is usable again
    assert_eq!(buffer.append(b"ghij"), 4);
    assert_eq!(buffer.as_slice(), b"cdefghij");
}

#[test]
fn test_clear() {
    let mut buffer = BufferCore::with_capacity(4).unwrap();
    buffer.append(b"full");
    buffer.clear();
    assert!(buffer.is_empty());
    assert_eq!(buffer.free(), 4);

    let mut out = [0u8; 4];
    assert_eq!(buffer.consume(&mut out), 0);
}

#[test]
fn test_fifo_order_over_mixed_operations() {
    let mut buffer = BufferCore::with_capacity(5).unwrap();
    let mut written = Vec::new();
    let mut read = Vec::new();
    let mut next = 0u8;

    for step in 0..200usize {
        let chunk: Vec<u8> = (0..step % 4 + 1)
            .map(|_| {
                next = next.wrapping_add(1);
                next
            })
            .collect();
        let accepted = buffer.append(&chunk);
        written.extend_from_slice(&chunk[..accepted]);
        // Rejected bytes are not part of the stream
        next = next.wrapping_sub(u8::try_from(chunk.len() - accepted).unwrap());

        let mut out = vec![0u8; step % 3 + 1];
        let n = buffer.consume(&mut out);
        read.extend_from_slice(&out[..n]);

        assert!(buffer.len() <= buffer.capacity());
        assert_eq!(buffer.len(), written.len() - read.len());
    }

    let mut rest = [0u8; 5];
    let n = buffer.consume(&mut rest);
    read.extend_from_slice(&rest[..n]);
    assert_eq!(read, written);
}
