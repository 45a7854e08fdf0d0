//! Channel key formatting.
//!
//! A channel is a single named, independently-updated telemetry stream.
//! Indexed channels (e.g. per-wheel values) carry their index in the key
//! itself so the state tree needs no special handling for them.

use std::fmt::Write;

/// Build the store key for a channel update.
///
/// Without an index the key is the channel name itself; with an index the
/// key is `name[index]`, e.g. `truck.wheel.suspension[2]`.
pub fn channel_key(name: &str, index: Option<u32>) -> String {
    match index {
        None => name.to_owned(),
        Some(i) => {
            let mut key = String::with_capacity(name.len() + 4);
            let _ = write!(key, "{name}[{i}]");
            key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_channel_key_is_name() {
        assert_eq!(channel_key("truck.engine.rpm", None), "truck.engine.rpm");
    }

    #[test]
    fn indexed_channel_key_appends_index() {
        assert_eq!(
            channel_key("truck.wheel.suspension", Some(2)),
            "truck.wheel.suspension[2]"
        );
        assert_eq!(channel_key("trailer.wheel.on_ground", Some(0)), "trailer.wheel.on_ground[0]");
    }
}
