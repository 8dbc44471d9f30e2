//! Type-tag → factory registry (spec §4.4: unknown types are "reported to the logger and
//! dropped" on receive, which requires looking the tag up before deserializing).

use std::collections::HashMap;

use umps_base::error::{Error, Result};

use crate::message::{Message, MessageType};

type Factory = fn(&[u8]) -> Result<Box<dyn Message>>;

#[derive(Default)]
pub struct Registry {
    factories: HashMap<&'static str, Factory>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: MessageType>(&mut self) {
        fn factory<T: MessageType>(bytes: &[u8]) -> Result<Box<dyn Message>> {
            <T as MessageType>::deserialize(bytes).map(|value| Box::new(value) as Box<dyn Message>)
        }
        self.factories.insert(T::TYPE_TAG, factory::<T>);
    }

    pub fn deserialize(&self, type_tag: &str, body: &[u8]) -> Result<Box<dyn Message>> {
        let factory = self
            .factories
            .get(type_tag)
            .ok_or_else(|| Error::invalid_argument(format!("unknown message type: {type_tag}")))?;
        factory(body)
    }

    pub fn is_known(&self, type_tag: &str) -> bool {
        self.factories.contains_key(type_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_message;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Ping {
        nonce: u64,
    }
    impl_message!(Ping, "Ping");

    #[test]
    fn registers_and_round_trips() {
        let mut registry = Registry::new();
        registry.register::<Ping>();
        let body = Ping { nonce: 7 }.serialize().unwrap();
        let message = registry.deserialize("Ping", &body).unwrap();
        assert_eq!(message.type_tag(), "Ping");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let registry = Registry::new();
        assert!(registry.deserialize("Nope", &[]).is_err());
    }
}
