use crate::*;
use errbit_core::wire::frame_request;
use errbit_writer::{Delivery, SocketWriter, Writer};

#[test]
fn notice_posted_as_single_http_request() -> Result<()> {
    let (port, collector) = stream_collector()?;
    let config = loopback_config(port);

    let delivery = SocketWriter::new().write(b"<notice/>", &config);
    let received = collector.join().unwrap()?;

    let text = String::from_utf8(received)?;
    assert!(text.starts_with("POST /notifier_api/v2/notices/ HTTP/1.1\r\n"));
    assert!(text.ends_with("\r\n\r\n<notice/>"));
    assert!(text.contains("\r\nHost: 127.0.0.1\r\n"));
    assert!(text.contains("\r\nUser-Agent: errbit-integration\r\n"));
    assert!(text.contains("\r\nContent-Length: 9\r\n"));
    assert!(text.contains("\r\nConnection: close\r\n"));
    assert_eq!(
        delivery,
        Delivery::Sent(errbit_writer::Sent {
            bytes: text.len(),
            packets: 1
        })
    );
    Ok(())
}

#[test]
fn large_notice_arrives_intact() -> Result<()> {
    let (port, collector) = stream_collector()?;
    let config = loopback_config(port);
    let notice = sample_notice(2000);

    assert!(SocketWriter::new().write(notice.as_bytes(), &config).is_sent());
    let received = collector.join().unwrap()?;

    assert_eq!(received, frame_request(notice.as_bytes(), &config));
    Ok(())
}

#[test]
fn mtu_is_ignored_on_the_stream_path() -> Result<()> {
    let (port, collector) = stream_collector()?;
    let mut config = loopback_config(port);
    config.mtu = Some(16);

    let notice = sample_notice(10);
    let sent = SocketWriter::new().try_write(notice.as_bytes(), &config)?;
    let received = collector.join().unwrap()?;

    assert_eq!(sent.packets, 1);
    assert!(received.ends_with(notice.as_bytes()));
    Ok(())
}
