//! Small network helpers used to build UPnP callback URLs and to guess the
//! local address a device would see us on.

mod ip;

pub use ip::{guess_local_ip, non_loopback_ips};
