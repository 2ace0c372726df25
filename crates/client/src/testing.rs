use crate::api::ClientOptions;
use std::net::TcpListener;
use std::time::Duration;

/// A loopback URL whose port was just released, so connecting is refused.
pub(crate) fn closed_local_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

pub(crate) fn short_timeouts() -> ClientOptions {
    ClientOptions {
        timeout: Some(Duration::from_secs(5)),
        connect_timeout: Some(Duration::from_secs(2)),
        ..ClientOptions::default()
    }
}
