use crate::{
    config::SessionInfo,
    error::Error,
    types::{self, DynamicEvent, Timestamp},
};
use derive_more::{Display, From, Into};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, OnceLock},
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{trace, warn};

pub use codec::{EventLineCodec, LoggedEvent};
pub use sink::{ChannelSink, LineReceiver, LogSink, MemorySink, NullSink, WriterSink};

pub mod codec;
pub mod sink;

/// Something the [`StructuredLogger`] can log.
///
/// Typed events override [`Event::event_type`] with a constant tag naming
/// the event, typeless events keep the default and are emitted without a
/// `type` field.
pub trait Event {
    /// Write this event's fields into `event`. Must not perform IO and
    /// must produce the same fields each time it is called.
    fn populate(&self, event: &mut DynamicEvent);

    fn event_type(&self) -> Option<&str> {
        None
    }
}

impl<E: Event + ?Sized> Event for &E {
    fn populate(&self, event: &mut DynamicEvent) {
        (**self).populate(event)
    }

    fn event_type(&self) -> Option<&str> {
        (**self).event_type()
    }
}

impl<E: Event + ?Sized> Event for Box<E> {
    fn populate(&self, event: &mut DynamicEvent) {
        (**self).populate(event)
    }

    fn event_type(&self) -> Option<&str> {
        (**self).event_type()
    }
}

/// Identifier shared by every event emitted during one process session.
#[derive(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Debug,
    Display,
    From,
    Into,
    Serialize,
    Deserialize,
)]
pub struct SessionId(u32);

impl SessionId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Random id generated on first use and stable for the rest of the process.
    pub fn process() -> Self {
        static SESSION_ID: OnceLock<SessionId> = OnceLock::new();
        *SESSION_ID.get_or_init(|| {
            let bytes = uuid::Uuid::new_v4().into_bytes();
            SessionId(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
        })
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// Converts [`Event`]s into two-bucket JSON lines enriched with session
/// metadata, and hands each line to a [`LogSink`].
#[derive(Debug)]
pub struct StructuredLogger<S> {
    sink: S,
    session_info: Arc<SessionInfo>,
    session_id: SessionId,
}

impl<S: LogSink> StructuredLogger<S> {
    /// Logger tagging events with [`SessionId::process`].
    pub fn new<I: Into<Arc<SessionInfo>>>(sink: S, session_info: I) -> Self {
        Self::with_session_id(sink, session_info, SessionId::process())
    }

    pub fn with_session_id<I: Into<Arc<SessionInfo>>>(
        sink: S,
        session_info: I,
        session_id: SessionId,
    ) -> Self {
        Self {
            sink,
            session_info: session_info.into(),
            session_id,
        }
    }

    pub fn session_info(&self) -> &SessionInfo {
        &self.session_info
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Populate, enrich, serialize and write `event` as one line.
    ///
    /// Nothing reaches the sink if the event cannot be serialized. Sink
    /// failures are returned as [`Error::Sink`].
    pub fn log_event<E: Event + ?Sized>(&self, event: &E) -> Result<(), Error> {
        let dynamic_event = self.build_event(event)?;
        let line = dynamic_event.to_json_line()?;
        trace!(
            event_type = event.event_type().unwrap_or_default(),
            len = line.len(),
            "Writing event line"
        );
        self.sink.write(line).map_err(Error::Sink)
    }

    /// The populated and enriched event, as it would be serialized by
    /// [`StructuredLogger::log_event`].
    pub fn build_event<E: Event + ?Sized>(&self, event: &E) -> Result<DynamicEvent, Error> {
        let mut dynamic_event = DynamicEvent::new();
        event.populate(&mut dynamic_event);

        let reserved: Vec<String> = dynamic_event
            .bucket(types::Bucket::Int)
            .chain(dynamic_event.bucket(types::Bucket::Normal))
            .map(|(name, _)| name)
            .filter(|name| types::is_reserved(name))
            .map(str::to_owned)
            .collect();
        for name in reserved.iter() {
            warn!(field = name.as_str(), "Event defines a reserved field name, dropping it");
            dynamic_event.remove(name);
        }

        dynamic_event.add_int(types::TIME, now());
        dynamic_event.add_int(types::SESSION_ID, i64::from(self.session_id.as_u32()));

        let info = &self.session_info;
        dynamic_event.add_string(types::USER, info.user.as_str());
        dynamic_event.add_string(types::HOST, info.host.as_str());
        dynamic_event.add_string(types::OS, info.os.as_str());
        dynamic_event.add_string(types::OS_VERSION, info.osver.as_str());
        dynamic_event.add_string(types::EDEN_VERSION, info.edenver.as_str());
        dynamic_event.add_string(types::LOGGED_BY, info.logged_by.as_str());
        if cfg!(target_os = "macos") {
            dynamic_event.add_string(
                types::SYSTEM_ARCHITECTURE,
                info.system_architecture.clone().unwrap_or_default(),
            );
        }

        match event.event_type() {
            Some("") => warn!("Typed event returned an empty type tag, omitting it"),
            Some(typ) => dynamic_event.add_string(types::TYPE, typ),
            None => (),
        }

        dynamic_event.validate()?;
        Ok(dynamic_event)
    }
}

fn now() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| Timestamp::try_from(d.as_secs()).unwrap_or(Timestamp::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{Bucket, FieldValue};

    struct Typed;

    impl Event for Typed {
        fn populate(&self, event: &mut DynamicEvent) {
            event.add_string("str", "name");
            event.add_int("number", 10);
        }

        fn event_type(&self) -> Option<&str> {
            Some("test_event")
        }
    }

    struct EmptyTag;

    impl Event for EmptyTag {
        fn populate(&self, _event: &mut DynamicEvent) {}

        fn event_type(&self) -> Option<&str> {
            Some("")
        }
    }

    fn logger() -> StructuredLogger<MemorySink> {
        StructuredLogger::with_session_id(
            MemorySink::default(),
            SessionInfo::default(),
            SessionId::new(1234),
        )
    }

    #[test]
    fn process_session_id_is_stable() {
        assert_eq!(SessionId::process(), SessionId::process());
    }

    #[test]
    fn build_event_enriches() {
        let ev = logger().build_event(&Typed).unwrap();
        assert_eq!(ev.get("session_id"), Some(&FieldValue::Int(1234)));
        assert_eq!(ev.get("type"), Some(&FieldValue::from("test_event")));
        assert!(ev.get("time").and_then(FieldValue::as_int).unwrap() > 0);
        assert_eq!(ev.bucket(Bucket::Int).count(), 3);
    }

    #[test]
    fn empty_type_tag_is_omitted() {
        let ev = logger().build_event(&EmptyTag).unwrap();
        assert!(!ev.contains("type"));
    }

    #[test]
    fn trait_objects_can_be_logged() {
        let logger = logger();
        let events: Vec<Box<dyn Event>> = vec![Box::new(Typed), Box::new(EmptyTag)];
        for ev in events.iter() {
            logger.log_event(ev).unwrap();
        }
        assert_eq!(logger.sink().lines().len(), 2);
    }
}
