use crate::{CoreError, Payload, Result as CoreErrorResult, UserId, bound};

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::panic::Location;

use error_location::ErrorLocation;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A notification produced upstream and held by the external queue.
///
/// Fields other than the user id and `payload` are forwarded verbatim. The user
/// id goes back out under the key the producer used for it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawQueueItem")]
pub struct QueueItem {
    pub user_id: UserId,
    pub user_key: UserIdKey,
    pub payload: Payload,
    pub extra: BTreeMap<String, Payload>,
}

/// Spelling of the user id key in a queue item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UserIdKey {
    #[default]
    Snake,
    Camel,
}

impl UserIdKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Snake => "user_id",
            Self::Camel => "userId",
        }
    }
}

#[derive(Deserialize)]
struct RawQueueItem {
    user_id: Option<UserId>,
    #[serde(rename = "userId")]
    user_id_camel: Option<UserId>,
    #[serde(default)]
    payload: Payload,
    #[serde(flatten)]
    extra: BTreeMap<String, Payload>,
}

impl TryFrom<RawQueueItem> for QueueItem {
    type Error = &'static str;

    fn try_from(raw: RawQueueItem) -> Result<Self, Self::Error> {
        let (user_id, user_key) = match (raw.user_id, raw.user_id_camel) {
            (Some(user_id), None) => (user_id, UserIdKey::Snake),
            (None, Some(user_id)) => (user_id, UserIdKey::Camel),
            (Some(_), Some(_)) => return Err("both `user_id` and `userId` present"),
            (None, None) => return Err("missing field `user_id`"),
        };

        Ok(Self {
            user_id,
            user_key,
            payload: raw.payload,
            extra: raw.extra,
        })
    }
}

impl Serialize for QueueItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.view(&self.payload).serialize(serializer)
    }
}

/// Serialized queue item, ready to go out as a text frame
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedFrame {
    pub text: String,
    /// True when the payload had to be reduced to approach the budget
    pub truncated: bool,
}

/// Borrowed view used for encoding without cloning the item
struct FrameView<'a> {
    user_id: UserId,
    user_key: UserIdKey,
    payload: &'a Payload,
    extra: &'a BTreeMap<String, Payload>,
}

impl Serialize for FrameView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.extra.len() + 2))?;
        map.serialize_entry(self.user_key.as_str(), &self.user_id)?;
        map.serialize_entry("payload", self.payload)?;
        for (key, value) in self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl QueueItem {
    pub fn new(user_id: UserId, payload: Payload) -> Self {
        Self {
            user_id,
            user_key: UserIdKey::default(),
            payload,
            extra: BTreeMap::new(),
        }
    }

    /// Parse the raw JSON text popped from the queue
    #[track_caller]
    pub fn parse(raw: &str) -> CoreErrorResult<Self> {
        serde_json::from_str(raw).map_err(|source| CoreError::InvalidQueueItem {
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Encode the whole item, bounding only the payload.
    ///
    /// The payload budget is `budget` minus the bytes taken by the envelope
    /// (user id and extra fields), so a bounded payload yields a frame near `budget`.
    #[track_caller]
    pub fn to_bounded_frame(&self, budget: usize) -> CoreErrorResult<BoundedFrame> {
        let null = Payload::null();
        let envelope_len = self
            .encode(&null)?
            .len()
            .saturating_sub(null.encoded_len());
        let payload_budget = budget.saturating_sub(envelope_len);

        let payload = bound(&self.payload, payload_budget);
        let truncated = matches!(payload, Cow::Owned(_));

        Ok(BoundedFrame {
            text: self.encode(&payload)?,
            truncated,
        })
    }

    fn view<'a>(&'a self, payload: &'a Payload) -> FrameView<'a> {
        FrameView {
            user_id: self.user_id,
            user_key: self.user_key,
            payload,
            extra: &self.extra,
        }
    }

    #[track_caller]
    fn encode(&self, payload: &Payload) -> CoreErrorResult<String> {
        serde_json::to_string(&self.view(payload)).map_err(|source| CoreError::FrameEncode {
            source,
            location: ErrorLocation::from(Location::caller()),
        })
    }
}
