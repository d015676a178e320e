use std::net::TcpListener;
use std::time::Instant;

use crate::*;
use errbit_writer::{Delivery, SocketWriter, WriteError, Writer};

/// A port on loopback with nothing listening.
fn dead_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .unwrap()
}

#[test]
fn refused_connection_is_absorbed() {
    let config = loopback_config(dead_port());
    assert_eq!(SocketWriter::new().write(b"<notice/>", &config), Delivery::Abandoned);
}

#[test]
fn unresolvable_host_is_absorbed() {
    let mut config = loopback_config(80);
    config.host = "collector.errbit.invalid".into();

    assert_eq!(SocketWriter::new().write(b"<notice/>", &config), Delivery::Abandoned);
    assert_eq!(
        SocketWriter::new().write(b"<notice/>", &WriterConfig { async_mode: true, ..config }),
        Delivery::Abandoned
    );
}

#[test]
fn unreachable_host_does_not_hang_past_connect_timeout() {
    // TEST-NET-1, never routed. Either times out or fails fast.
    let mut config = loopback_config(80);
    config.host = "192.0.2.1".into();
    config.connect_timeout = Duration::from_millis(300);

    let started = Instant::now();
    let err = SocketWriter::new().try_write(b"<notice/>", &config).unwrap_err();
    assert!(matches!(err, WriteError::Connect(..)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn collector_hanging_up_on_tls_is_absorbed() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let server = std::thread::spawn(move || {
        if let Ok((conn, _)) = listener.accept() {
            drop(conn);
        }
    });

    let mut config = loopback_config(port);
    config.secure = true;

    assert_eq!(SocketWriter::new().write(b"<notice/>", &config), Delivery::Abandoned);
    server.join().unwrap();
    Ok(())
}

#[test]
fn non_utf8_notice_is_abandoned_in_async_mode() -> Result<()> {
    let collector = DatagramCollector::bind()?;
    let config = WriterConfig {
        async_mode: true,
        ..loopback_config(collector.port())
    };

    assert_eq!(SocketWriter::new().write(&[0xfe, 0xff], &config), Delivery::Abandoned);
    assert!(collector.is_quiet(Duration::from_millis(200)));
    Ok(())
}
