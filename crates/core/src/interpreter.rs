use std::collections::HashMap;
use std::fmt;

use common::error::Error;
use common::types::{UNREACHED_DISTANCE, VertexId, VertexResult};
use serde::Deserialize;
use serde_json::Value;

use super::graph::Snapshot;

/// Multiplier applied to a distance before it is clamped into a colour channel.
const COLOR_STEP: i64 = 32;
const CHANNEL_MIN: i64 = 127;
const CHANNEL_MAX: i64 = 255;

pub const NEGATIVE_LOOP_COLOR: Rgb = Rgb {
    r: 255,
    g: 58,
    b: 58,
};

pub const UNREACHABLE_COLOR: Rgb = Rgb {
    r: 127,
    g: 191,
    b: 127,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

/// Distance of a vertex from the start, as the editor should present it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Distance {
    Finite(i64),
    /// The vertex is reachable through a negative loop; its distance is undefined.
    NegativeInfinity,
    /// The solver never reached the vertex from the start.
    Unreachable,
}

impl fmt::Display for Distance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Distance::Finite(d) => write!(f, "{}", d),
            Distance::NegativeInfinity => write!(f, "-∞"),
            Distance::Unreachable => write!(f, "∞"),
        }
    }
}

/// Per-vertex result ready for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Annotation {
    pub distance: Distance,
}

impl Annotation {
    /// The negative-loop flag wins over whatever numeric distance came with it.
    pub fn from_result(result: &VertexResult) -> Self {
        let distance = if result.is_in_negative_loop {
            Distance::NegativeInfinity
        } else if result.distance == UNREACHED_DISTANCE {
            Distance::Unreachable
        } else {
            Distance::Finite(result.distance)
        };
        Annotation { distance }
    }

    pub fn is_in_negative_loop(&self) -> bool {
        self.distance == Distance::NegativeInfinity
    }

    /// Two-channel gradient: positive distances push red up, negative ones push blue up.
    pub fn color(&self) -> Rgb {
        match self.distance {
            Distance::NegativeInfinity => NEGATIVE_LOOP_COLOR,
            Distance::Unreachable => UNREACHABLE_COLOR,
            Distance::Finite(d) => Rgb {
                r: channel(d),
                g: 191,
                b: channel(d.saturating_neg()),
            },
        }
    }
}

fn channel(d: i64) -> u8 {
    d.saturating_mul(COLOR_STEP).clamp(CHANNEL_MIN, CHANNEL_MAX) as u8
}

/// Annotations for one solve, keyed by vertex handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotations {
    by_vertex: HashMap<VertexId, Annotation>,
}

impl Annotations {
    pub fn get(&self, v: VertexId) -> Option<&Annotation> {
        self.by_vertex.get(&v)
    }

    pub fn len(&self) -> usize {
        self.by_vertex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_vertex.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VertexId, &Annotation)> {
        self.by_vertex.iter()
    }
}

/// Turns a solver reply line into per-vertex results.
pub struct ResponseInterpreter;

impl ResponseInterpreter {
    /// Parses `line` against a request that carried `vertex_count` vertices.
    ///
    /// # Errors
    /// - `MalformedResponse` if the line is not JSON, an entry has a missing or
    ///   mistyped field, an index is outside `0..vertex_count`, or an index repeats.
    /// - `ProtocolMismatch` if the document is not an object with a `vertices` array.
    pub fn parse(line: &str, vertex_count: usize) -> Result<Vec<VertexResult>, Error> {
        let document: Value = serde_json::from_str(line.trim())
            .map_err(|e| Error::MalformedResponse(format!("reply is not valid JSON: {}", e)))?;

        let entries = document
            .as_object()
            .ok_or_else(|| Error::ProtocolMismatch("top level is not an object".to_string()))?
            .get("vertices")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::ProtocolMismatch("missing `vertices` array".to_string()))?;

        let mut seen = vec![false; vertex_count];
        let mut results = Vec::with_capacity(entries.len());

        for (position, entry) in entries.iter().enumerate() {
            let result = VertexResult::deserialize(entry).map_err(|e| {
                Error::MalformedResponse(format!("entry {}: {}", position, e))
            })?;

            let slot = seen.get_mut(result.index).ok_or_else(|| {
                Error::MalformedResponse(format!(
                    "entry {}: index {} outside 0..{}",
                    position, result.index, vertex_count
                ))
            })?;
            if *slot {
                return Err(Error::MalformedResponse(format!(
                    "entry {}: index {} reported twice",
                    position, result.index
                )));
            }
            *slot = true;

            results.push(result);
        }

        Ok(results)
    }

    /// Parses `line` and maps every result back to the handle serialized at its index.
    pub fn annotate(line: &str, snapshot: &Snapshot) -> Result<Annotations, Error> {
        let results = Self::parse(line, snapshot.len())?;

        let mut by_vertex = HashMap::with_capacity(results.len());
        for result in &results {
            let v = snapshot
                .vertex_at(result.index)
                .ok_or(Error::NodeIndexOutOfBounds(result.index))?;
            by_vertex.insert(v, Annotation::from_result(result));
        }

        Ok(Annotations { by_vertex })
    }
}
