use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use tracing::debug;

/// One document attribute.
///
/// Attributes live in a list at the document's top level, and each entry is
/// a mapping with a single key: the attribute's name, pointing at whatever
/// definition the authoring surface stores for it.
///
/// # YAML shape
///
/// ```yaml
/// attributes:
///   - date:
///       type: datetime
///       label: analysis date
///   - vehicle: v123
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attribute(pub Mapping);

impl Attribute {
    pub fn new(name: impl Into<Value>, definition: impl Into<Value>) -> Self {
        let mut map = Mapping::new();
        map.insert(name.into(), definition.into());
        Attribute(map)
    }

    /// The attribute's identity: its first key, when that key is text.
    pub fn name(&self) -> Option<&str> {
        self.0.iter().next().and_then(|(key, _)| key.as_str())
    }

    pub fn definition(&self) -> Option<&Value> {
        self.0.iter().next().map(|(_, value)| value)
    }
}

/// Append each of `incoming` to `target` unless an attribute with the same
/// name is already there.
///
/// The existing definition always wins; a clashing import never overwrites
/// it. Names claimed by earlier `incoming` entries count as taken too, so
/// duplicates inside one batch collapse to the first occurrence. Entries
/// whose first key is not text carry no name and are dropped from the merge.
pub fn merge_attributes(target: &mut Vec<Attribute>, incoming: &[Attribute]) {
    let mut seen: HashSet<String> = target
        .iter()
        .filter_map(Attribute::name)
        .map(str::to_string)
        .collect();
    for attr in incoming {
        let Some(name) = attr.name() else {
            debug!("Skipping attribute without a name during merge");
            continue;
        };
        if seen.contains(name) {
            debug!("Keeping existing attribute {} over imported one", name);
            continue;
        }
        seen.insert(name.to_string());
        target.push(attr.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_into_empty() {
        let mut target = Vec::new();
        merge_attributes(
            &mut target,
            &[Attribute::new("date", "2024-01-01"), Attribute::new("vehicle", "v123")],
        );
        assert_eq!(target.len(), 2);
        assert_eq!(target[0].name(), Some("date"));
        assert_eq!(target[1].name(), Some("vehicle"));
    }

    #[test]
    fn test_merge_existing_name_wins() {
        let mut target = vec![Attribute::new("foo", 2)];
        merge_attributes(
            &mut target,
            &[Attribute::new("foo", 1), Attribute::new("bar", 3)],
        );
        assert_eq!(target.len(), 2);
        assert_eq!(target[0], Attribute::new("foo", 2));
        assert_eq!(target[1], Attribute::new("bar", 3));
    }

    #[test]
    fn test_merge_duplicates_within_incoming_collapse() {
        let mut target = Vec::new();
        merge_attributes(
            &mut target,
            &[Attribute::new("foo", "first"), Attribute::new("foo", "second")],
        );
        assert_eq!(target, vec![Attribute::new("foo", "first")]);
    }

    #[test]
    fn test_merge_skips_nameless_entries() {
        let mut target = vec![Attribute::new("date", "2024-01-01")];
        merge_attributes(
            &mut target,
            &[Attribute(Mapping::new()), Attribute::new(7, "numeric key")],
        );
        assert_eq!(target, vec![Attribute::new("date", "2024-01-01")]);
    }

    #[test]
    fn test_merge_preserves_order() {
        let mut target = vec![Attribute::new("a", 1)];
        merge_attributes(
            &mut target,
            &[
                Attribute::new("b", 2),
                Attribute::new("a", 9),
                Attribute::new("c", 3),
            ],
        );
        let names: Vec<_> = target.iter().filter_map(Attribute::name).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_name_uses_first_key() {
        let mut map = Mapping::new();
        map.insert(Value::from("first"), Value::from(1));
        map.insert(Value::from("second"), Value::from(2));
        let attr = Attribute(map);
        assert_eq!(attr.name(), Some("first"));
        assert_eq!(attr.definition(), Some(&Value::from(1)));
    }
}
