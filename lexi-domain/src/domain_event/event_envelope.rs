use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::domain_event_trait::Event;
use super::metadata::ReplayMetadata;
use crate::error::{EventBusError, EventBusResult};

/// 线上信封：`{"fullName": "<事件名>", "data": "<JSON 载荷>"}`
///
/// 回放流量额外携带 `replay` 字段；读取时字段名大小写不敏感。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventEnvelope {
    full_name: String,
    data: String,
    replay: Option<ReplayMetadata>,
}

impl EventEnvelope {
    pub fn new(full_name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            data: data.into(),
            replay: None,
        }
    }

    /// 将事件序列化为载荷并以其事件名封装
    pub fn wrap<E: Event>(event: &E) -> EventBusResult<Self> {
        Ok(Self::new(E::event_name(), serde_json::to_string(event)?))
    }

    /// 标记为回放流量
    pub fn with_replay(mut self, metadata: ReplayMetadata) -> Self {
        self.replay = Some(metadata);
        self
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn replay(&self) -> Option<&ReplayMetadata> {
        self.replay.as_ref()
    }

    /// 反序列化内层载荷
    pub fn decode<E: Event>(&self) -> EventBusResult<E> {
        Ok(serde_json::from_str(&self.data)?)
    }

    pub fn to_json(&self) -> EventBusResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> EventBusResult<Self> {
        serde_json::from_str(raw).map_err(|e| match e.classify() {
            serde_json::error::Category::Data => EventBusError::envelope(e.to_string()),
            _ => EventBusError::from(e),
        })
    }
}

impl Serialize for EventEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.replay.is_some() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("fullName", &self.full_name)?;
        map.serialize_entry("data", &self.data)?;
        if let Some(replay) = &self.replay {
            map.serialize_entry("replay", replay)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EventEnvelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let field = |name: &str| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        };

        let full_name = match field("fullName") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(de::Error::custom("fullName must be a string")),
            None => return Err(de::Error::missing_field("fullName")),
        };
        let data = match field("data") {
            Some(Value::String(s)) => s.clone(),
            Some(_) => return Err(de::Error::custom("data must be a string")),
            None => return Err(de::Error::missing_field("data")),
        };
        let replay = match field("replay") {
            None | Some(Value::Null) => None,
            Some(v) => Some(serde_json::from_value(v.clone()).map_err(de::Error::custom)?),
        };

        Ok(Self {
            full_name,
            data,
            replay,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WordAdded {
        word_id: u64,
        spelling: String,
    }

    impl Event for WordAdded {
        fn event_name() -> &'static str {
            "WordAdded"
        }
    }

    #[test]
    fn wrap_uses_event_name_and_camel_case_payload() {
        let env = EventEnvelope::wrap(&WordAdded {
            word_id: 7,
            spelling: "serendipity".into(),
        })
        .unwrap();
        assert_eq!(env.full_name(), "WordAdded");
        assert_eq!(env.data(), r#"{"wordId":7,"spelling":"serendipity"}"#);

        let json = env.to_json().unwrap();
        assert_eq!(
            json,
            r#"{"fullName":"WordAdded","data":"{\"wordId\":7,\"spelling\":\"serendipity\"}"}"#
        );
    }

    #[test]
    fn envelope_roundtrip_with_and_without_replay() {
        let plain = EventEnvelope::new("Foo", r#"{"value":1}"#);
        assert_eq!(EventEnvelope::from_json(&plain.to_json().unwrap()).unwrap(), plain);

        let replayed = plain.clone().with_replay(
            ReplayMetadata::builder()
                .message_id("s1:3".to_string())
                .stream_id("s1".to_string())
                .version(3)
                .occurred_at(Utc::now())
                .build(),
        );
        let back = EventEnvelope::from_json(&replayed.to_json().unwrap()).unwrap();
        assert_eq!(back, replayed);
        assert_eq!(back.replay().map(|r| r.version()), Some(3));
    }

    #[test]
    fn field_names_are_case_insensitive_on_read() {
        let env = EventEnvelope::from_json(r#"{"FullName":"Foo","DATA":"{}"}"#).unwrap();
        assert_eq!(env.full_name(), "Foo");
        assert_eq!(env.data(), "{}");
        assert!(env.replay().is_none());
    }

    #[test]
    fn missing_field_is_an_envelope_error() {
        let err = EventEnvelope::from_json(r#"{"data":"{}"}"#).unwrap_err();
        assert!(matches!(err, EventBusError::Envelope { .. }), "{err:?}");

        let err = EventEnvelope::from_json("not json").unwrap_err();
        assert!(matches!(err, EventBusError::Serialization { .. }), "{err:?}");
    }

    #[test]
    fn decode_rejects_foreign_payload() {
        let env = EventEnvelope::new("WordAdded", r#"{"unexpected":true}"#);
        assert!(env.decode::<WordAdded>().is_err());
    }
}
