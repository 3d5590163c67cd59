//! AIS source adapters. Exactly one runs per gateway instance: the
//! AISStream.io websocket when an API key is configured, otherwise an HTTP
//! feed poller when a feed URL is set, otherwise the UDP NMEA listener.

pub mod poll;
pub mod stream;
pub mod udp;
