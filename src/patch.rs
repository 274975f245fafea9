//! Partial updates of an [`Event`] from an untyped JSON object.
//!
//! Keys are matched against a fixed table of event fields, ignoring case,
//! underscores and hyphens, so `startTime`, `start_time` and `STARTTIME` all
//! address the same field. Every table entry declares the JSON shape it
//! accepts and whether the field may be written at all. A field addressed by
//! more than one key is rejected under every one of them.
//!
//! Unknown keys are ignored. A value of the wrong shape, or one that fails the
//! field's validator, leaves that field untouched and is reported back in
//! [`PatchOutcome::rejected`]; under [`MismatchPolicy::Strict`] the whole patch
//! fails instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::models::event::{validate_window, Event};
use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MismatchPolicy {
    /// Leave rejected fields unchanged and apply the rest.
    #[default]
    Skip,
    /// Fail the whole patch if any field is rejected.
    Strict,
}

impl std::str::FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown patch policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    IntegerList,
    Timestamp,
}

#[derive(Debug, Clone, PartialEq)]
enum FieldValue {
    Text(String),
    Integer(i64),
    IntegerList(Vec<i64>),
    Timestamp(DateTime<Utc>),
}

type Setter = fn(&mut Event, FieldValue) -> Result<(), String>;
type Getter = fn(&Event) -> FieldValue;

#[derive(Clone, Copy)]
enum Access {
    Settable(Setter),
    /// May be echoed back unchanged, never altered.
    Immutable {
        current: Getter,
        reason: &'static str,
    },
    /// Owned by storage; any value is rejected.
    ReadOnly,
}

struct FieldSpec {
    name: &'static str,
    kind: FieldKind,
    access: Access,
}

static FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: "title",
        kind: FieldKind::Text,
        access: Access::Settable(set_title),
    },
    FieldSpec {
        name: "description",
        kind: FieldKind::Text,
        access: Access::Settable(set_description),
    },
    FieldSpec {
        name: "location",
        kind: FieldKind::Text,
        access: Access::Settable(set_location),
    },
    FieldSpec {
        name: "starttime",
        kind: FieldKind::Timestamp,
        access: Access::Settable(set_start_time),
    },
    FieldSpec {
        name: "endtime",
        kind: FieldKind::Timestamp,
        access: Access::Settable(set_end_time),
    },
    FieldSpec {
        name: "organizer",
        kind: FieldKind::Integer,
        access: Access::Immutable {
            current: current_organizer,
            reason: "organizer cannot be changed",
        },
    },
    FieldSpec {
        name: "attendees",
        kind: FieldKind::IntegerList,
        access: Access::Immutable {
            current: current_attendees,
            reason: "attendees are managed through registration",
        },
    },
    FieldSpec {
        name: "id",
        kind: FieldKind::Integer,
        access: Access::ReadOnly,
    },
    FieldSpec {
        name: "version",
        kind: FieldKind::Integer,
        access: Access::ReadOnly,
    },
    FieldSpec {
        name: "createdat",
        kind: FieldKind::Timestamp,
        access: Access::ReadOnly,
    },
    FieldSpec {
        name: "updatedat",
        kind: FieldKind::Timestamp,
        access: Access::ReadOnly,
    },
    FieldSpec {
        name: "deletedat",
        kind: FieldKind::Timestamp,
        access: Access::ReadOnly,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchOutcome {
    pub event: Event,
    /// Canonical names of the fields that were written.
    pub applied: Vec<&'static str>,
    pub rejected: Vec<FieldError>,
    /// Payload keys that matched no known field.
    pub ignored: Vec<String>,
}

/// Merges `payload` into a copy of `current` and stamps `updated_at` with `now`.
///
/// Fails only when the payload is not an object, when the merged event has
/// `end_time` before `start_time`, or when `policy` is strict and some field
/// was rejected.
pub fn apply_patch(
    current: &Event,
    payload: &Value,
    now: DateTime<Utc>,
    policy: MismatchPolicy,
) -> Result<PatchOutcome, AppError> {
    let entries = payload.as_object().ok_or_else(|| {
        AppError::ValidationError("patch body must be a JSON object".into())
    })?;

    let mut event = current.clone();
    let mut applied = Vec::new();
    let mut rejected = Vec::new();
    let mut ignored = Vec::new();

    let mut addressed: HashMap<&'static str, usize> = HashMap::new();
    for spec in entries.keys().filter_map(|key| lookup(key)) {
        *addressed.entry(spec.name).or_default() += 1;
    }

    for (key, raw) in entries {
        let Some(spec) = lookup(key) else {
            ignored.push(key.clone());
            continue;
        };

        if addressed.get(spec.name).is_some_and(|&count| count > 1) {
            rejected.push(FieldError {
                field: key.clone(),
                reason: format!("{} is given under more than one key", spec.name),
            });
            continue;
        }

        match write_field(&mut event, spec, raw) {
            Ok(true) => applied.push(spec.name),
            Ok(false) => {}
            Err(reason) => rejected.push(FieldError {
                field: key.clone(),
                reason,
            }),
        }
    }

    if policy == MismatchPolicy::Strict && !rejected.is_empty() {
        return Err(AppError::InvalidFields(rejected));
    }

    validate_window(event.start_time, event.end_time)?;
    event.updated_at = Some(now);

    Ok(PatchOutcome {
        event,
        applied,
        rejected,
        ignored,
    })
}

fn lookup(key: &str) -> Option<&'static FieldSpec> {
    let normalized = normalize(key);
    FIELDS.iter().find(|spec| spec.name == normalized)
}

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Returns whether the event changed.
fn write_field(event: &mut Event, spec: &FieldSpec, raw: &Value) -> Result<bool, String> {
    match spec.access {
        Access::ReadOnly => Err("field is read-only".into()),
        Access::Settable(set) => set(event, coerce(spec.kind, raw)?).map(|()| true),
        Access::Immutable { current, reason } => {
            let value = coerce(spec.kind, raw)?;
            if normalized(value) == normalized(current(event)) {
                Ok(false)
            } else {
                Err(reason.into())
            }
        }
    }
}

fn coerce(kind: FieldKind, raw: &Value) -> Result<FieldValue, String> {
    match kind {
        FieldKind::Text => raw
            .as_str()
            .map(|s| FieldValue::Text(s.to_owned()))
            .ok_or_else(|| "expected a string".to_owned()),
        FieldKind::Integer => truncate(raw)
            .map(FieldValue::Integer)
            .ok_or_else(|| "expected a number".to_owned()),
        FieldKind::IntegerList => raw
            .as_array()
            .and_then(|items| items.iter().map(truncate).collect::<Option<Vec<_>>>())
            .map(FieldValue::IntegerList)
            .ok_or_else(|| "expected an array of numbers".to_owned()),
        FieldKind::Timestamp => raw
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| FieldValue::Timestamp(dt.with_timezone(&Utc)))
            .ok_or_else(|| "expected an RFC 3339 timestamp".to_owned()),
    }
}

/// JSON numbers become integers by truncation toward zero.
fn truncate(raw: &Value) -> Option<i64> {
    raw.as_i64()
        .or_else(|| raw.as_f64().map(|f| f.trunc() as i64))
}

/// Lists compare as sets.
fn normalized(value: FieldValue) -> FieldValue {
    match value {
        FieldValue::IntegerList(mut ids) => {
            ids.sort_unstable();
            ids.dedup();
            FieldValue::IntegerList(ids)
        }
        other => other,
    }
}

const KIND_MISMATCH: &str = "value does not match field type";

fn set_title(event: &mut Event, value: FieldValue) -> Result<(), String> {
    let FieldValue::Text(title) = value else {
        return Err(KIND_MISMATCH.into());
    };
    if title.trim().is_empty() {
        return Err("title must not be empty".into());
    }
    event.title = title;
    Ok(())
}

fn set_description(event: &mut Event, value: FieldValue) -> Result<(), String> {
    let FieldValue::Text(description) = value else {
        return Err(KIND_MISMATCH.into());
    };
    event.description = Some(description);
    Ok(())
}

fn set_location(event: &mut Event, value: FieldValue) -> Result<(), String> {
    let FieldValue::Text(location) = value else {
        return Err(KIND_MISMATCH.into());
    };
    event.location = Some(location);
    Ok(())
}

fn set_start_time(event: &mut Event, value: FieldValue) -> Result<(), String> {
    let FieldValue::Timestamp(start) = value else {
        return Err(KIND_MISMATCH.into());
    };
    event.start_time = start;
    Ok(())
}

fn set_end_time(event: &mut Event, value: FieldValue) -> Result<(), String> {
    let FieldValue::Timestamp(end) = value else {
        return Err(KIND_MISMATCH.into());
    };
    event.end_time = end;
    Ok(())
}

fn current_organizer(event: &Event) -> FieldValue {
    FieldValue::Integer(event.organizer)
}

fn current_attendees(event: &Event) -> FieldValue {
    FieldValue::IntegerList(event.attendees.clone())
}
