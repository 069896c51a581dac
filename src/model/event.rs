use serde::{Deserialize, Serialize};

use super::date::SimDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum EventKind {
    ClassesEmerged,
    ConflictStarted,
    ConflictStageChanged,
    ConflictTypeChanged,
    ConflictResolved,
    ResolutionConsequence,
    PropertyRedistributed,
    Crisis,
    IntellectualEmerged,
}

tagged_enum!(EventKind {
    ClassesEmerged => "classes_emerged",
    ConflictStarted => "conflict_started",
    ConflictStageChanged => "conflict_stage_changed",
    ConflictTypeChanged => "conflict_type_changed",
    ConflictResolved => "conflict_resolved",
    ResolutionConsequence => "resolution_consequence",
    PropertyRedistributed => "property_redistributed",
    Crisis => "crisis",
    IntellectualEmerged => "intellectual_emerged",
});

/// One entry in the society's event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: u64,
    pub kind: EventKind,
    pub date: SimDate,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_id: Option<String>,
    /// Structured details; `null` when there are none.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub data: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&EventKind::ConflictStageChanged).unwrap(),
            "\"conflict_stage_changed\""
        );
    }

    #[test]
    fn optional_fields_omitted() {
        let ev = Event {
            id: 1,
            kind: EventKind::Crisis,
            date: SimDate::from_year(10),
            description: "drought".to_string(),
            conflict_id: None,
            data: serde_json::Value::Null,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert!(json.get("conflict_id").is_none());
        assert!(json.get("data").is_none());
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }
}
