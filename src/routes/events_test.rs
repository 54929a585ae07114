use super::*;
use crate::hub::Hub;

#[test]
fn replay_defaults_on() {
    assert!(EventsQuery::default().replay());
    assert!(EventsQuery { replay: Some("1".into()) }.replay());
    assert!(!EventsQuery { replay: Some("0".into()) }.replay());
    assert!(!EventsQuery { replay: Some("false".into()) }.replay());
}

#[tokio::test]
async fn stream_yields_hello_then_backlog_then_ends_on_close() {
    let hub = Hub::new(20, 8);
    hub.publish("one");
    hub.publish("two");

    let mut stream = Box::pin(event_stream(hub.subscribe(true)));
    let mut seen = 0;
    for _ in 0..3 {
        assert!(stream.next().await.is_some());
        seen += 1;
    }
    assert_eq!(seen, 3);

    hub.close_all();
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn dropping_stream_unregisters_client() {
    let hub = Hub::new(20, 8);
    let stream = event_stream(hub.subscribe(false));
    assert_eq!(hub.counts().connected, 1);
    drop(stream);
    assert_eq!(hub.counts().connected, 0);
}
