use crate::{
    error::Error,
    types::{Bucket, FieldName, FieldValue},
};
use internment::Intern;
use serde::ser::{Serialize, SerializeMap, Serializer};
use tracing::warn;

/// Accumulates the fields of a single event emission, sorted into the
/// `int` and `normal` buckets by value kind.
///
/// A field name lives in at most one bucket. Adding a name that is already
/// present replaces the earlier value (last write wins), moving it to the
/// other bucket if the kind changed.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct DynamicEvent {
    int: Vec<(FieldName, FieldValue)>,
    normal: Vec<(FieldName, FieldValue)>,
}

impl DynamicEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_string<S: Into<String>>(&mut self, name: &str, value: S) {
        self.add(name, FieldValue::String(value.into()));
    }

    pub fn add_int(&mut self, name: &str, value: i64) {
        self.add(name, FieldValue::Int(value));
    }

    pub fn add_double(&mut self, name: &str, value: f64) {
        self.add(name, FieldValue::from(value));
    }

    pub fn add_bool(&mut self, name: &str, value: bool) {
        self.add(name, FieldValue::Bool(value));
    }

    pub fn add<V: Into<FieldValue>>(&mut self, name: &str, value: V) {
        let name = Intern::new(name.to_owned());
        let value = value.into();
        let target = value.bucket();

        for bucket in Bucket::ALL {
            let fields = self.fields_mut(bucket);
            if let Some(idx) = fields.iter().position(|(n, _)| *n == name) {
                warn!(field = %name, %bucket, "Field added more than once, keeping the last value");
                if bucket == target {
                    fields[idx].1 = value;
                    return;
                }
                fields.remove(idx);
            }
        }

        self.fields_mut(target).push((name, value));
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.int
            .iter()
            .chain(self.normal.iter())
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v)
    }

    /// Remove `name` from whichever bucket holds it.
    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        for bucket in Bucket::ALL {
            let fields = self.fields_mut(bucket);
            if let Some(idx) = fields.iter().position(|(n, _)| n.as_str() == name) {
                return Some(fields.remove(idx).1);
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// The fields of one bucket, in insertion order.
    pub fn bucket(&self, bucket: Bucket) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields(bucket).iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.int.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.int.is_empty() && self.normal.is_empty()
    }

    /// Check that every value can be represented in JSON.
    pub fn validate(&self) -> Result<(), Error> {
        match self.int.iter().find(|(_, v)| !v.is_finite()) {
            Some((name, FieldValue::Double(v))) => Err(Error::NonFiniteValue(*name, v.into_inner())),
            _ => Ok(()),
        }
    }

    /// Serialize into a single line of JSON, `{"int":{..},"normal":{..}}`.
    pub fn to_json_line(&self) -> Result<String, Error> {
        self.validate()?;
        Ok(serde_json::to_string(self)?)
    }

    fn fields(&self, bucket: Bucket) -> &[(FieldName, FieldValue)] {
        match bucket {
            Bucket::Int => &self.int,
            Bucket::Normal => &self.normal,
        }
    }

    fn fields_mut(&mut self, bucket: Bucket) -> &mut Vec<(FieldName, FieldValue)> {
        match bucket {
            Bucket::Int => &mut self.int,
            Bucket::Normal => &mut self.normal,
        }
    }
}

struct BucketFields<'a>(&'a [(FieldName, FieldValue)]);

impl Serialize for BucketFields<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in self.0.iter() {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

impl Serialize for DynamicEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Bucket::ALL.len()))?;
        for bucket in Bucket::ALL {
            map.serialize_entry(&bucket, &BucketFields(self.fields(bucket)))?;
        }
        map.end()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fields_are_bucketed_by_kind() {
        let mut ev = DynamicEvent::new();
        ev.add_string("str", "name");
        ev.add_int("number", 10);
        ev.add_double("ratio", 0.25);
        ev.add_bool("cached", true);

        let ints: Vec<_> = ev.bucket(Bucket::Int).map(|(n, _)| n).collect();
        let normals: Vec<_> = ev.bucket(Bucket::Normal).map(|(n, _)| n).collect();
        assert_eq!(ints, vec!["number", "ratio"]);
        assert_eq!(normals, vec!["str", "cached"]);
        assert_eq!(ev.len(), 4);
    }

    #[test]
    fn duplicate_name_last_write_wins() {
        let mut ev = DynamicEvent::new();
        ev.add_int("number", 1);
        ev.add_int("number", 2);
        assert_eq!(ev.get("number"), Some(&FieldValue::Int(2)));
        assert_eq!(ev.len(), 1);
    }

    #[test]
    fn duplicate_name_moves_between_buckets() {
        let mut ev = DynamicEvent::new();
        ev.add_int("value", 1);
        ev.add_string("value", "one");
        assert_eq!(ev.bucket(Bucket::Int).count(), 0);
        assert_eq!(ev.get("value"), Some(&FieldValue::from("one")));
        assert_eq!(ev.len(), 1);
    }

    #[test]
    fn remove_from_either_bucket() {
        let mut ev = DynamicEvent::new();
        ev.add_int("number", 1);
        ev.add_string("str", "name");
        assert_eq!(ev.remove("number"), Some(FieldValue::Int(1)));
        assert_eq!(ev.remove("str"), Some(FieldValue::from("name")));
        assert_eq!(ev.remove("missing"), None);
        assert!(ev.is_empty());
    }

    #[test]
    fn empty_event_serializes_both_buckets() {
        let ev = DynamicEvent::new();
        assert!(ev.is_empty());
        assert_eq!(ev.to_json_line().unwrap(), r#"{"int":{},"normal":{}}"#);
    }

    #[test]
    fn serializes_to_a_single_line() {
        let mut ev = DynamicEvent::new();
        ev.add_int("number", 10);
        ev.add_string("str", "multi\nline");
        ev.add_bool("ok", false);
        let line = ev.to_json_line().unwrap();
        assert!(!line.contains('\n'));
        assert_eq!(
            line,
            r#"{"int":{"number":10},"normal":{"str":"multi\nline","ok":false}}"#
        );
    }

    #[test]
    fn non_finite_double_is_rejected() {
        let mut ev = DynamicEvent::new();
        ev.add_double("latency", f64::NAN);
        match ev.to_json_line() {
            Err(Error::NonFiniteValue(name, _)) => assert_eq!(name.as_str(), "latency"),
            other => panic!("expected a non-finite value error, got {other:?}"),
        }

        let mut ev = DynamicEvent::new();
        ev.add_double("latency", f64::INFINITY);
        assert!(ev.validate().is_err());
    }
}
