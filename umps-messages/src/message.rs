//! The `Message` trait (spec §3 "Message", C5): a type tag, a version, and a CBOR body.

use serde::de::DeserializeOwned;
use serde::Serialize;

use umps_base::error::Result;

use crate::wire;

/// Object-safe surface every wire message exposes.
pub trait Message: std::fmt::Debug + Send + Sync {
    fn type_tag(&self) -> &'static str;

    fn version(&self) -> &'static str {
        "1.0"
    }

    fn serialize(&self) -> Result<Vec<u8>>;
    fn to_json(&self) -> Result<String>;
    fn clone_message(&self) -> Box<dyn Message>;
}

/// The `Sized` half of spec §3's `Message`: `deserialize` (an associated function) and
/// `new_empty`. Kept separate from [`Message`] so `Box<dyn Message>` stays object-safe.
pub trait MessageType: Message + Serialize + DeserializeOwned + Default + Clone + 'static {
    const TYPE_TAG: &'static str;

    fn deserialize(bytes: &[u8]) -> Result<Self> {
        wire::decode(bytes)
    }

    fn new_empty() -> Self {
        Self::default()
    }
}

/// Implements [`Message`] for a type that already derives `Serialize + Deserialize + Default +
/// Clone + Debug`, using its CBOR form as the wire body.
#[macro_export]
macro_rules! impl_message {
    ($type:ty, $tag:expr) => {
        impl $crate::message::MessageType for $type {
            const TYPE_TAG: &'static str = $tag;
        }

        impl $crate::message::Message for $type {
            fn type_tag(&self) -> &'static str {
                $tag
            }

            fn serialize(&self) -> umps_base::error::Result<Vec<u8>> {
                $crate::wire::encode(self)
            }

            fn to_json(&self) -> umps_base::error::Result<String> {
                $crate::wire::to_json(self)
            }

            fn clone_message(&self) -> Box<dyn $crate::message::Message> {
                Box::new(self.clone())
            }
        }
    };
}
