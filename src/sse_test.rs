use super::*;

#[test]
fn single_event() {
    let mut parser = SseParser::new();
    let events = parser.feed("id: 7\ndata: {\"a\":1}\n\n");
    assert_eq!(events, vec![SseEvent { id: Some("7".into()), data: "{\"a\":1}".into() }]);
}

#[test]
fn chunks_may_split_lines() {
    let mut parser = SseParser::new();
    assert!(parser.feed("da").is_empty());
    assert!(parser.feed("ta: hel").is_empty());
    assert!(parser.feed("lo\n").is_empty());
    assert_eq!(parser.feed("\n")[0].data, "hello");
}

#[test]
fn multiple_data_lines_join_with_newline() {
    let mut parser = SseParser::new();
    let events = parser.feed("data: a\ndata: b\n\n");
    assert_eq!(events[0].data, "a\nb");
    assert_eq!(events[0].id, None);
}

#[test]
fn comments_and_other_fields_are_ignored() {
    let mut parser = SseParser::new();
    let events = parser.feed(": keep-alive\n\nevent: x\nretry: 10\ndata: y\n\n");
    assert_eq!(events, vec![SseEvent { id: None, data: "y".into() }]);
}

#[test]
fn crlf_line_endings() {
    let mut parser = SseParser::new();
    let events = parser.feed("id: 1\r\ndata: z\r\n\r\n");
    assert_eq!(events, vec![SseEvent { id: Some("1".into()), data: "z".into() }]);
}

#[test]
fn blank_line_without_data_dispatches_nothing() {
    let mut parser = SseParser::new();
    assert!(parser.feed("id: 3\n\n").is_empty());
    // The id does not leak into the next event.
    assert_eq!(parser.feed("data: q\n\n")[0].id, None);
}

#[test]
fn finish_flushes_trailing_event() {
    let mut parser = SseParser::new();
    assert!(parser.feed("data: one\ndata: two").is_empty());
    assert_eq!(parser.finish(), Some(SseEvent { id: None, data: "one\ntwo".into() }));
    assert_eq!(parser.finish(), None);
}

#[test]
fn feed_bytes_holds_split_utf8() {
    let mut parser = SseParser::new();
    let text = "data: caf\u{e9}\n\n".as_bytes();
    let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
    assert!(parser.feed_bytes(&text[..split]).is_empty());
    assert_eq!(parser.feed_bytes(&text[split..])[0].data, "caf\u{e9}");
}

#[test]
fn indented_fields_are_recognised() {
    let mut parser = SseParser::new();
    let events = parser.feed("  id: 3\n\tdata: {\"a\":1}\n   \n");
    assert_eq!(events, vec![SseEvent { id: Some("3".into()), data: "{\"a\":1}".into() }]);
}
