//! Tuples, relations, and the Pareto dominance test that drives preprocessing.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Outcome of comparing two tuples attribute-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dominance {
    /// At least as good everywhere, strictly better somewhere.
    Dominates,
    /// At most as good everywhere, strictly worse somewhere.
    DominatedBy,
    /// Neither tuple dominates the other (ties included).
    Incomparable,
}

/// A ranked tuple: an opaque identifier plus a fixed vector of numeric
/// ranking attributes. Immutable once constructed.
///
/// Equality and hashing are defined over the attribute vector only; the
/// identifier is presentation metadata and never participates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuple {
    id: String,
    attrs: Vec<f64>,
}

impl Tuple {
    /// Build a tuple from an identifier and finite attribute values.
    pub fn new(id: impl Into<String>, attrs: Vec<f64>) -> Result<Self, QueryError> {
        let id = id.into();
        if let Some(v) = attrs.iter().find(|v| !v.is_finite()) {
            return Err(QueryError::NonFiniteAttribute { id, value: *v });
        }
        Ok(Self { id, attrs })
    }

    /// Parse one ingestion record: index 0 is the identifier, the rest are
    /// floating-point attribute values.
    pub fn parse(fields: &[&str]) -> Result<Self, QueryError> {
        let (id, rest) = fields
            .split_first()
            .ok_or(QueryError::EmptyRecord)?;
        let attrs = rest
            .iter()
            .map(|f| {
                f.trim()
                    .parse::<f64>()
                    .map_err(|_| QueryError::UnparsableAttribute {
                        id: id.to_string(),
                        field: f.to_string(),
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;
        Self::new(id.trim(), attrs)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn attrs(&self) -> &[f64] {
        &self.attrs
    }

    /// Number of ranking attributes (the identifier slot excluded).
    pub fn arity(&self) -> usize {
        self.attrs.len()
    }

    /// Sum-of-attributes score under uniform weights; the default ranking
    /// order used when no weight vector has been chosen yet.
    pub fn default_score(&self) -> f64 {
        self.attrs.iter().sum()
    }

    /// Attribute-wise Pareto comparison against `other`.
    ///
    /// `Dominates` requires at-least-as-good on every attribute and strictly
    /// better on at least one; identical attribute vectors are incomparable.
    pub fn dominance(&self, other: &Tuple) -> Dominance {
        debug_assert_eq!(self.arity(), other.arity());
        let mut any_gt = false;
        let mut any_lt = false;
        for (a, b) in self.attrs.iter().zip(other.attrs.iter()) {
            if a > b {
                any_gt = true;
            } else if a < b {
                any_lt = true;
            }
        }
        match (any_gt, any_lt) {
            (true, false) => Dominance::Dominates,
            (false, true) => Dominance::DominatedBy,
            _ => Dominance::Incomparable,
        }
    }
}

impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.attrs == other.attrs
    }
}

impl Eq for Tuple {}

impl Hash for Tuple {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for v in &self.attrs {
            v.to_bits().hash(state);
        }
    }
}

/// An ordered collection of tuples sharing one schema. Read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    name: String,
    arity: usize,
    tuples: Vec<Tuple>,
}

impl Relation {
    /// Build a relation, enforcing non-emptiness and uniform arity.
    pub fn new(name: impl Into<String>, tuples: Vec<Tuple>) -> Result<Self, QueryError> {
        let name = name.into();
        let arity = match tuples.first() {
            Some(t) => t.arity(),
            None => return Err(QueryError::EmptyRelation { name }),
        };
        if arity == 0 {
            return Err(QueryError::NoAttributes { name });
        }
        if let Some(bad) = tuples.iter().find(|t| t.arity() != arity) {
            return Err(QueryError::ArityMismatch {
                id: bad.id().to_string(),
                found: bad.arity(),
                expected: arity,
            });
        }
        Ok(Self { name, arity, tuples })
    }

    /// Parse the ingestion text format: a `Relation <name>` header, an
    /// `ID,Attribute1,...` schema row, one comma-separated record per line,
    /// and an `End` sentinel.
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        let mut lines = input.lines();
        let header = lines.next().unwrap_or("").trim();
        let name = header
            .strip_prefix("Relation")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or("relation")
            .to_string();
        // Schema row is informational only; arity is checked per record.
        let _ = lines.next();
        let mut tuples = Vec::new();
        for line in lines {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "End" {
                break;
            }
            let fields: Vec<&str> = line.split(',').collect();
            tuples.push(Tuple::parse(&fields)?);
        }
        Self::new(name, tuples)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of ranking attributes shared by every tuple.
    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn tuples(&self) -> &[Tuple] {
        &self.tuples
    }

    pub fn get(&self, index: usize) -> Option<&Tuple> {
        self.tuples.get(index)
    }

    /// Look a tuple up by identifier.
    pub fn find(&self, id: &str) -> Option<&Tuple> {
        self.tuples.iter().find(|t| t.id() == id)
    }

    /// Rank of `tuple` under uniform weights (1 = best); the "why not yet"
    /// starting point shown to users.
    pub fn default_rank(&self, tuple: &Tuple) -> usize {
        1 + self
            .tuples
            .iter()
            .filter(|t| t.default_score() > tuple.default_score())
            .count()
    }

    /// Render in the same text format accepted by [`Relation::parse`].
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Relation {}\nID", self.name));
        for i in 1..=self.arity {
            out.push_str(&format!(",Attribute{i}"));
        }
        out.push('\n');
        for t in &self.tuples {
            out.push_str(t.id());
            for v in t.attrs() {
                out.push_str(&format!(",{v:.3}"));
            }
            out.push('\n');
        }
        out.push_str("End\n");
        out
    }
}
