//! Channel registry.
//!
//! Static mapping of channel name → payload codec → routing key. The set of
//! channels is fixed when the registry is built and never mutated at
//! runtime; the lifecycle manager subscribes every registered channel after
//! each reconnect.
//!
//! Channel names are lowercase identifiers by registry convention, which is
//! what lets LISTEN/NOTIFY statements interpolate them without quoting.
//! The convention is enforced once at build time, not per notification.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::dispatch::DispatchPayload;
use crate::error::BusError;

type DecodeFn = Arc<dyn Fn(&str) -> Result<DispatchPayload, BusError> + Send + Sync>;

/// A registered channel: name, payload codec and routing destination.
#[derive(Clone)]
pub struct ChannelSpec {
    name: String,
    routing_key: String,
    decode: DecodeFn,
}

impl ChannelSpec {
    /// Creates a channel whose payloads are JSON documents decoding to `T`.
    ///
    /// The sender side of the codec pair is `serde_json` serialization of
    /// the same `T` (see [`NotificationSender::send`]).
    ///
    /// [`NotificationSender::send`]: crate::sender::NotificationSender::send
    #[must_use]
    pub fn json<T>(name: impl Into<String>, routing_key: impl Into<String>) -> Self
    where
        T: DeserializeOwned + Send + Sync + 'static,
    {
        let name = name.into();
        let decode_channel = name.clone();
        Self {
            name,
            routing_key: routing_key.into(),
            decode: Arc::new(move |raw| {
                serde_json::from_str::<T>(raw)
                    .map(|payload| Arc::new(payload) as DispatchPayload)
                    .map_err(|e| BusError::Decode {
                        channel: decode_channel.clone(),
                        message: e.to_string(),
                    })
            }),
        }
    }

    /// Returns the channel name, used verbatim in LISTEN/NOTIFY statements.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the routing key messages from this channel dispatch under.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Decodes a raw notification payload into a dispatchable message.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Decode` when the payload does not match the
    /// channel's payload type.
    pub fn decode(&self, raw: &str) -> Result<DispatchPayload, BusError> {
        (self.decode)(raw)
    }
}

impl fmt::Debug for ChannelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelSpec")
            .field("name", &self.name)
            .field("routing_key", &self.routing_key)
            .finish_non_exhaustive()
    }
}

/// Immutable registry of the channels this process subscribes to.
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    channels: HashMap<String, ChannelSpec>,
}

impl ChannelRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> ChannelRegistryBuilder {
        ChannelRegistryBuilder {
            channels: Vec::new(),
        }
    }

    /// Looks up a channel by name, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `BusError::UnknownChannel` when the name is not registered.
    pub fn resolve(&self, name: &str) -> Result<&ChannelSpec, BusError> {
        self.channels
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| BusError::UnknownChannel {
                channel: name.to_string(),
            })
    }

    /// Iterates over all registered channels.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelSpec> {
        self.channels.values()
    }

    /// Returns the number of registered channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns `true` if no channels are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Builder for [`ChannelRegistry`].
#[derive(Debug)]
pub struct ChannelRegistryBuilder {
    channels: Vec<ChannelSpec>,
}

impl ChannelRegistryBuilder {
    /// Adds a channel to the registry.
    #[must_use]
    pub fn channel(mut self, spec: ChannelSpec) -> Self {
        self.channels.push(spec);
        self
    }

    /// Builds the registry, enforcing the naming convention.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Config` when the registry is empty, a channel
    /// name is not a lowercase identifier, or two channels share a name.
    pub fn build(self) -> Result<ChannelRegistry, BusError> {
        if self.channels.is_empty() {
            return Err(BusError::Config(
                "registry must contain at least one channel".to_string(),
            ));
        }

        let mut channels = HashMap::with_capacity(self.channels.len());
        for spec in self.channels {
            if !is_valid_channel_name(spec.name()) {
                return Err(BusError::Config(format!(
                    "invalid channel name '{}': must be a lowercase identifier",
                    spec.name()
                )));
            }
            if channels.insert(spec.name().to_string(), spec.clone()).is_some() {
                return Err(BusError::Config(format!(
                    "duplicate channel name '{}'",
                    spec.name()
                )));
            }
        }

        Ok(ChannelRegistry { channels })
    }
}

fn is_valid_channel_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Message {
        payload: String,
    }

    fn registry() -> ChannelRegistry {
        ChannelRegistry::builder()
            .channel(ChannelSpec::json::<Message>("messages", "messages.events"))
            .build()
            .unwrap()
    }

    // ── Lookup ──

    #[test]
    fn test_resolve_is_case_insensitive() {
        let registry = registry();
        assert_eq!(registry.resolve("messages").unwrap().name(), "messages");
        assert_eq!(registry.resolve("MESSAGES").unwrap().name(), "messages");
        assert_eq!(
            registry.resolve("messages").unwrap().routing_key(),
            "messages.events"
        );
    }

    #[test]
    fn test_resolve_unknown_channel() {
        let registry = registry();
        let err = registry.resolve("orders").unwrap_err();
        assert!(matches!(
            err,
            BusError::UnknownChannel { channel } if channel == "orders"
        ));
    }

    // ── Decoding ──

    #[test]
    fn test_decode_valid_payload() {
        let registry = registry();
        let spec = registry.resolve("messages").unwrap();

        let payload = spec.decode(r#"{"payload":"a"}"#).unwrap();
        let message = payload.downcast::<Message>().unwrap();
        assert_eq!(message.payload, "a");
    }

    #[test]
    fn test_decode_malformed_payload() {
        let registry = registry();
        let spec = registry.resolve("messages").unwrap();

        let err = spec.decode("not-json").unwrap_err();
        assert!(matches!(
            err,
            BusError::Decode { channel, .. } if channel == "messages"
        ));
    }

    // ── Build-time validation ──

    #[test]
    fn test_empty_registry_rejected() {
        assert!(ChannelRegistry::builder().build().is_err());
    }

    #[test]
    fn test_invalid_channel_name_rejected() {
        for name in ["Messages", "my-channel", "", "1chan", "chan nel"] {
            let result = ChannelRegistry::builder()
                .channel(ChannelSpec::json::<Message>(name, "x"))
                .build();
            assert!(result.is_err(), "name {name:?} should be rejected");
        }
    }

    #[test]
    fn test_duplicate_channel_name_rejected() {
        let result = ChannelRegistry::builder()
            .channel(ChannelSpec::json::<Message>("messages", "a"))
            .channel(ChannelSpec::json::<Message>("messages", "b"))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_valid_names_accepted() {
        let registry = ChannelRegistry::builder()
            .channel(ChannelSpec::json::<Message>("messages", "a"))
            .channel(ChannelSpec::json::<Message>("_audit_log2", "b"))
            .build()
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }
}
