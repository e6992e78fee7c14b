//! Lenient parsing of service responses.
//!
//! Models wrap JSON in markdown fences, add prose around it, rename keys and
//! emit the odd malformed edge. Parsing strips the wrapping, accepts flat
//! (`[{"type": ..}]`) and grouped (`{"left": [..], ..}`) edge lists, drops
//! edges it cannot read and clamps coordinates into 0..1000. Only a body
//! with no usable JSON object, or one missing every required field, is a
//! [`CritiqueError::Parse`].

use glam::Vec2;
use pt_core::{AxisClass, EdgeSegment, Grade, Normalized};
use serde_json::{Value, json};

use crate::client::ComparisonResult;
use crate::error::CritiqueError;

/// Shown when the model graded but wrote nothing
pub const DEFAULT_FEEDBACK: &str = "No written feedback was returned for this drawing.";

const REFERENCE_KEYS: [&str; 3] = ["referenceEdges", "reference_edges", "reference"];
const USER_KEYS: [&str; 4] = ["userEdges", "user_edges", "drawingEdges", "drawing"];
const TYPE_KEYS: [&str; 3] = ["type", "axis", "class"];

/// Grade and feedback of the comparison step
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub grade: Grade,
    pub feedback: String,
}

/// Parse a single-shot response.
pub fn parse_comparison(text: &str) -> Result<ComparisonResult, CritiqueError> {
    let value = extract_json(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| CritiqueError::Parse("expected a JSON object".to_string()))?;

    let reference = first_present(object, &REFERENCE_KEYS);
    let user = first_present(object, &USER_KEYS);
    if !object.contains_key("grade") && !object.contains_key("feedback") && reference.is_none() && user.is_none() {
        return Err(CritiqueError::Parse(
            "response has no grade, feedback or edges".to_string(),
        ));
    }

    let verdict = verdict_from(object);
    Ok(ComparisonResult {
        grade: verdict.grade,
        feedback: verdict.feedback,
        reference_edges: reference.map(parse_edge_set).unwrap_or_default(),
        user_edges: user.map(parse_edge_set).unwrap_or_default(),
    })
}

/// Parse an edge-extraction response (`{"edges": [..]}`, grouped, or a bare array).
pub fn parse_edges(text: &str) -> Result<Vec<EdgeSegment<Normalized>>, CritiqueError> {
    let value = extract_json(text)?;
    match &value {
        Value::Array(_) => Ok(parse_edge_set(&value)),
        Value::Object(object) => {
            if let Some(edges) = object.get("edges") {
                Ok(parse_edge_set(edges))
            } else if AxisClass::ALL.iter().any(|c| object.contains_key(c.as_wire_str())) {
                Ok(parse_edge_set(&value))
            } else {
                Err(CritiqueError::Parse("response has no edges".to_string()))
            }
        }
        _ => Err(CritiqueError::Parse("expected edges".to_string())),
    }
}

/// Parse a comparison-step response.
pub fn parse_verdict(text: &str) -> Result<Verdict, CritiqueError> {
    let value = extract_json(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| CritiqueError::Parse("expected a JSON object".to_string()))?;
    if !object.contains_key("grade") && !object.contains_key("feedback") {
        return Err(CritiqueError::Parse("response has no grade or feedback".to_string()));
    }
    Ok(verdict_from(object))
}

/// Serialize edges in the wire shape used in prompts.
pub fn edges_to_json(edges: &[EdgeSegment<Normalized>]) -> String {
    let list: Vec<Value> = edges
        .iter()
        .map(|e| {
            json!({
                "start": [e.start.x.round(), e.start.y.round()],
                "end": [e.end.x.round(), e.end.y.round()],
                "type": e.axis.as_wire_str(),
            })
        })
        .collect();
    Value::Array(list).to_string()
}

/// Find and parse the JSON payload inside a model answer.
///
/// Each `{` or `[` is tried in order as the start of a value; the first one
/// that parses wins, so bracketed prose ahead of the payload is skipped.
pub fn extract_json(text: &str) -> Result<Value, CritiqueError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(CritiqueError::Parse("empty response".to_string()));
    }

    let mut last_error = None;
    for (start, _) in text.match_indices(['{', '[']) {
        let mut values = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match values.next() {
            Some(Ok(value)) => {
                let used = values.byte_offset();
                if used != text.len() {
                    tracing::debug!("Stripped {} bytes around response JSON", text.len() - used);
                }
                return Ok(value);
            }
            Some(Err(e)) => last_error = Some(e.to_string()),
            None => {}
        }
    }
    Err(CritiqueError::Parse(
        last_error.unwrap_or_else(|| "response contains no JSON".to_string()),
    ))
}

fn first_present<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k))
}

fn verdict_from(object: &serde_json::Map<String, Value>) -> Verdict {
    let grade = match object.get("grade").and_then(Value::as_str).and_then(Grade::parse_lenient) {
        Some(grade) => grade,
        None => {
            tracing::warn!("Response grade missing or unreadable, defaulting to {}", Grade::default());
            Grade::default()
        }
    };
    let feedback = object
        .get("feedback")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_FEEDBACK)
        .to_string();
    Verdict { grade, feedback }
}

fn parse_edge_set(value: &Value) -> Vec<EdgeSegment<Normalized>> {
    let mut edges = Vec::new();
    let mut dropped = 0;
    match value {
        Value::Array(items) => {
            for item in items {
                match parse_edge(item, None) {
                    Some(edge) => edges.push(edge),
                    None => dropped += 1,
                }
            }
        }
        Value::Object(groups) => {
            for class in AxisClass::ALL {
                let Some(Value::Array(items)) = groups.get(class.as_wire_str()) else {
                    continue;
                };
                for item in items {
                    match parse_edge(item, Some(class)) {
                        Some(edge) => edges.push(edge),
                        None => dropped += 1,
                    }
                }
            }
        }
        _ => {}
    }
    if dropped > 0 {
        tracing::warn!("Dropped {} malformed edges from response", dropped);
    }
    edges
}

fn parse_edge(value: &Value, group: Option<AxisClass>) -> Option<EdgeSegment<Normalized>> {
    let object = value.as_object()?;
    let class = TYPE_KEYS
        .iter()
        .find_map(|k| object.get(*k))
        .and_then(Value::as_str)
        .and_then(AxisClass::from_wire)
        .or(group)?;
    let start = parse_point(object.get("start")?)?;
    let end = parse_point(object.get("end")?)?;
    Some(EdgeSegment::new(start, end, class).clamped())
}

fn parse_point(value: &Value) -> Option<Vec2> {
    let (x, y) = match value {
        Value::Array(items) if items.len() >= 2 => (items[0].as_f64()?, items[1].as_f64()?),
        Value::Object(object) => (object.get("x")?.as_f64()?, object.get("y")?.as_f64()?),
        _ => return None,
    };
    let point = Vec2::new(x as f32, y as f32);
    point.is_finite().then_some(point)
}
