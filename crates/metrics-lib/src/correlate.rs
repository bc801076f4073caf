//! Merge-join of independently fetched row lists
//!
//! The authoritative list fixes the set and order of output entities: one
//! record per authoritative row, never more. Dependent lists only fill in
//! values; a key missing from a dependent list leaves that role absent.

use crate::extract::{KeyField, TaggedRow};
use crate::fanout::Role;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

/// How a dependent row is matched to an authoritative row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    /// Equality on every non-empty key field both rows carry
    Exact,
    /// The authoritative field contains the dependent field as a substring.
    /// Used for node readiness, where `node` labels and `nodename` labels
    /// are not always identical.
    Contains {
        authoritative: KeyField,
        dependent: KeyField,
    },
}

/// One dependent list and its role in the output record
#[derive(Debug, Clone)]
pub struct Dependent {
    pub role: Role,
    pub rows: Vec<TaggedRow>,
    pub rule: MatchRule,
}

impl Dependent {
    pub fn exact(role: Role, rows: Vec<TaggedRow>) -> Self {
        Self {
            role,
            rows,
            rule: MatchRule::Exact,
        }
    }

    pub fn contains(
        role: Role,
        rows: Vec<TaggedRow>,
        authoritative: KeyField,
        dependent: KeyField,
    ) -> Self {
        Self {
            role,
            rows,
            rule: MatchRule::Contains {
                authoritative,
                dependent,
            },
        }
    }
}

/// An authoritative key with the values gathered for it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub key: Vec<(KeyField, String)>,
    values: HashMap<Role, String>,
}

impl MergedRecord {
    fn new(key: Vec<(KeyField, String)>) -> Self {
        Self {
            key,
            values: HashMap::new(),
        }
    }

    /// Identity field of this record
    pub fn field(&self, field: KeyField) -> &str {
        self.key
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// Joined value for `role`, `None` if no dependent row matched
    pub fn value(&self, role: Role) -> Option<&str> {
        self.values.get(role).map(String::as_str)
    }

    /// Joined value for `role`, empty when absent
    pub fn value_or_empty(&self, role: Role) -> String {
        self.value(role).unwrap_or_default().to_string()
    }

    pub fn has(&self, role: Role) -> bool {
        self.values.contains_key(role)
    }
}

/// Join `dependents` onto `authoritative`. Output order and cardinality are
/// those of `authoritative`; the first matching dependent row wins.
pub fn merge(authoritative: &[TaggedRow], dependents: &[Dependent]) -> Vec<MergedRecord> {
    let mut records: Vec<MergedRecord> = authoritative
        .iter()
        .map(|row| MergedRecord::new(row.key.clone()))
        .collect();

    for dependent in dependents {
        match dependent.rule {
            MatchRule::Exact => join_exact(&mut records, dependent),
            MatchRule::Contains {
                authoritative,
                dependent: dep_field,
            } => join_contains(&mut records, dependent, authoritative, dep_field),
        }
    }

    records
}

fn join_exact(records: &mut [MergedRecord], dependent: &Dependent) {
    let Some(first) = dependent.rows.first() else {
        return;
    };

    // Rows of one list share their key schema
    let dep_fields: Vec<KeyField> = first.key.iter().map(|(f, _)| *f).collect();

    // One index per set of compared fields; empty labels are never compared
    let mut indexes: HashMap<Vec<KeyField>, HashMap<Vec<String>, &str>> = HashMap::new();

    for record in records.iter_mut() {
        let (fields, wanted): (Vec<KeyField>, Vec<String>) = dep_fields
            .iter()
            .filter_map(|f| {
                record
                    .key
                    .iter()
                    .find(|(rf, v)| rf == f && !v.is_empty())
                    .map(|(_, v)| (*f, v.clone()))
            })
            .unzip();

        if fields.is_empty() {
            debug!(
                role = dependent.role,
                "No non-empty key component shared with dependent list"
            );
            continue;
        }

        let index = indexes
            .entry(fields.clone())
            .or_insert_with(|| project(&dependent.rows, &fields));

        if let Some(value) = index.get(&wanted) {
            record.values.insert(dependent.role, value.to_string());
        }
    }
}

/// Dependent rows keyed by the values of `fields`, first row winning
fn project<'a>(rows: &'a [TaggedRow], fields: &[KeyField]) -> HashMap<Vec<String>, &'a str> {
    let mut index = HashMap::new();
    for row in rows {
        let Some(value) = row.value.as_deref() else {
            continue;
        };
        let key: Vec<String> = fields
            .iter()
            .map(|f| row.get(*f).unwrap_or_default().to_string())
            .collect();
        index.entry(key).or_insert(value);
    }
    index
}

fn join_contains(
    records: &mut [MergedRecord],
    dependent: &Dependent,
    auth_field: KeyField,
    dep_field: KeyField,
) {
    for record in records.iter_mut() {
        let haystack = record.field(auth_field).to_string();

        let matched = dependent.rows.iter().find(|row| {
            row.get(dep_field)
                .map(|needle| !needle.is_empty() && haystack.contains(needle))
                .unwrap_or(false)
        });

        if let Some(value) = matched.and_then(|row| row.value.clone()) {
            record.values.insert(dependent.role, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &[(KeyField, &str)], value: Option<&str>) -> TaggedRow {
        TaggedRow::new(
            key.iter().map(|(f, v)| (*f, v.to_string())).collect(),
            value.map(str::to_string),
        )
    }

    #[test]
    fn test_missing_dependent_entry_is_absent() {
        let names = vec![
            row(&[(KeyField::Instance, "i1")], None),
            row(&[(KeyField::Instance, "i2")], None),
        ];
        let memory = Dependent::exact(
            "memory_usage",
            vec![row(&[(KeyField::Instance, "i1")], Some("42.00"))],
        );

        let merged = merge(&names, &[memory]);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value_or_empty("memory_usage"), "42.00");
        assert_eq!(merged[1].value_or_empty("memory_usage"), "");
        assert!(!merged[1].has("memory_usage"));
    }

    #[test]
    fn test_cardinality_follows_authoritative_list() {
        let names = vec![row(&[(KeyField::Instance, "i1")], None)];
        let cpu = Dependent::exact(
            "cpu",
            vec![
                row(&[(KeyField::Instance, "i1")], Some("1")),
                row(&[(KeyField::Instance, "i9")], Some("9")),
                row(&[(KeyField::Instance, "i8")], Some("8")),
            ],
        );

        let merged = merge(&names, &[cpu]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value("cpu"), Some("1"));
    }

    #[test]
    fn test_non_matching_key_contributes_nothing() {
        let names = vec![row(&[(KeyField::Instance, "10.0.0.1:9100")], None)];
        let disk = Dependent::exact(
            "disk",
            vec![row(&[(KeyField::Instance, "10.0.0.1")], Some("500"))],
        );

        let merged = merge(&names, &[disk]);
        assert_eq!(merged[0].value("disk"), None);
    }

    #[test]
    fn test_composite_key_requires_every_component() {
        let names = vec![
            row(
                &[
                    (KeyField::Namespace, "default"),
                    (KeyField::Pod, "web-1"),
                    (KeyField::Container, "nginx"),
                ],
                None,
            ),
            row(
                &[
                    (KeyField::Namespace, "staging"),
                    (KeyField::Pod, "web-1"),
                    (KeyField::Container, "nginx"),
                ],
                None,
            ),
        ];
        let cpu = Dependent::exact(
            "cpu",
            vec![row(
                &[
                    (KeyField::Namespace, "staging"),
                    (KeyField::Pod, "web-1"),
                    (KeyField::Container, "nginx"),
                ],
                Some("0.25"),
            )],
        );

        let merged = merge(&names, &[cpu]);
        assert_eq!(merged[0].value("cpu"), None);
        assert_eq!(merged[1].value("cpu"), Some("0.25"));
    }

    #[test]
    fn test_dependent_key_wider_than_authoritative_key() {
        let names = vec![
            row(&[(KeyField::Instance, "i1")], None),
            row(&[(KeyField::Instance, "i2")], None),
        ];
        let cpu = Dependent::exact(
            "cpu",
            vec![row(
                &[(KeyField::Instance, "i1"), (KeyField::Namespace, "monitoring")],
                Some("5"),
            )],
        );

        let merged = merge(&names, &[cpu]);
        assert_eq!(merged[0].value("cpu"), Some("5"));
        assert_eq!(merged[1].value("cpu"), None);
    }

    #[test]
    fn test_empty_key_components_never_match() {
        let names = vec![
            row(&[(KeyField::Instance, "")], None),
            row(&[(KeyField::Instance, "i1")], None),
        ];
        let cpu = Dependent::exact(
            "cpu",
            vec![
                row(&[(KeyField::Instance, "")], Some("unlabelled")),
                row(&[(KeyField::Instance, "i1")], Some("1")),
            ],
        );

        let merged = merge(&names, &[cpu]);
        assert!(!merged[0].has("cpu"));
        assert_eq!(merged[1].value("cpu"), Some("1"));
    }

    #[test]
    fn test_readiness_uses_containment() {
        let names = vec![
            row(
                &[(KeyField::Instance, "i1"), (KeyField::NodeName, "worker-1.cluster.local")],
                None,
            ),
            row(&[(KeyField::Instance, "i2"), (KeyField::NodeName, "worker-2")], None),
        ];
        let ready = Dependent::contains(
            "ready",
            vec![
                row(&[(KeyField::Node, "worker-1")], Some("1")),
                row(&[(KeyField::Node, "")], Some("1")),
            ],
            KeyField::NodeName,
            KeyField::Node,
        );

        let merged = merge(&names, &[ready]);
        assert!(merged[0].has("ready"));
        // An empty node label must not match everything
        assert!(!merged[1].has("ready"));
    }

    #[test]
    fn test_first_match_wins_and_valueless_rows_are_skipped() {
        let names = vec![row(&[(KeyField::Pod, "p")], None)];
        let dep = Dependent::exact(
            "mem",
            vec![
                row(&[(KeyField::Pod, "p")], None),
                row(&[(KeyField::Pod, "p")], Some("first")),
                row(&[(KeyField::Pod, "p")], Some("second")),
            ],
        );

        let merged = merge(&names, &[dep]);
        assert_eq!(merged[0].value("mem"), Some("first"));
    }

    #[test]
    fn test_empty_inputs() {
        assert!(merge(&[], &[Dependent::exact("x", vec![])]).is_empty());

        let names = vec![row(&[(KeyField::Pod, "p")], None)];
        let merged = merge(&names, &[Dependent::exact("x", vec![])]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].field(KeyField::Pod), "p");
    }
}
