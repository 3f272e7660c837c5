//! Sample investigation data

use casebook_model::{DuplicateCandidate, Edge, Entity};
use serde_json::{json, Value};

/// Person entity with a `name` property
#[must_use]
pub fn person(id: &str, name: &str) -> Entity {
    Entity::new(id, "Person").with_property("name", [name])
}

#[must_use]
pub fn company(id: &str, name: &str) -> Entity {
    Entity::new(id, "Company").with_property("name", [name])
}

#[must_use]
pub fn link(id: &str, source: &str, target: &str) -> Edge {
    Edge::new(id, source, target).with_schema("UnknownLink")
}

/// Candidate pair of two people with default names
#[must_use]
pub fn candidate(left: &str, right: &str, similarity: f64) -> DuplicateCandidate {
    DuplicateCandidate::new(
        person(left, &format!("Person {left}")),
        person(right, &format!("Person {right}")),
        similarity,
        "name similarity",
    )
}

/// Small graph: `p1 -e1-> p2`, `p1 -e2-> c1`, `p2 -e3-> p3`
#[must_use]
pub fn sample_graph() -> (Vec<Entity>, Vec<Edge>) {
    (
        vec![
            person("p1", "Ada Lovelace"),
            person("p2", "Charles Babbage"),
            person("p3", "Luigi Menabrea"),
            company("c1", "Analytical Engines Ltd"),
        ],
        vec![link("e1", "p1", "p2"), link("e2", "p1", "c1"), link("e3", "p2", "p3")],
    )
}

/// Stored canvas with one note and one entity reference
#[must_use]
pub fn sample_canvas() -> Value {
    json!({
        "nodes": [
            {
                "id": "n1",
                "type": "note",
                "position": {"x": 10, "y": 20},
                "data": {
                    "title": "Lead",
                    "content": {"type": "doc", "content": [{"type": "paragraph"}]}
                }
            },
            {
                "id": "entity-p1-0a1b2c3d",
                "type": "entity",
                "position": {"x": 370, "y": 60},
                "data": {"entityId": "p1", "label": "Ada Lovelace", "schema": "Person"}
            }
        ],
        "edges": [
            {"id": "edge-n1-entity-p1-0a1b2c3d", "source": "n1", "target": "entity-p1-0a1b2c3d", "type": "smoothstep"}
        ],
        "viewport": {"x": 0, "y": 0, "zoom": 1}
    })
}
