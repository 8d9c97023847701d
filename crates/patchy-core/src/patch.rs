//! The patch model: which output ports feed which input ports.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single link from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Connection {
    /// Source (output) port name
    pub output: String,
    /// Destination (input) port name
    pub input: String,
}

impl Connection {
    /// Create a connection between two port names.
    #[must_use]
    pub fn new(output: impl Into<String>, input: impl Into<String>) -> Self {
        Self { output: output.into(), input: input.into() }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} -> {:?}", self.output, self.input)
    }
}

/// On-disk shape of a patch: output -> input -> `true`.
type PatchDocument = BTreeMap<String, BTreeMap<String, bool>>;

/// A set of connections keyed by output port.
///
/// An output is only present while it has at least one destination, so two
/// patches describing the same connections always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PatchDocument", into = "PatchDocument")]
pub struct Patch {
    links: BTreeMap<String, BTreeSet<String>>,
}

impl Patch {
    /// Create an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection. Returns `false` if it was already present.
    pub fn insert(&mut self, output: impl Into<String>, input: impl Into<String>) -> bool {
        self.links.entry(output.into()).or_default().insert(input.into())
    }

    /// Set the full destination set of an output. An empty set removes the output.
    pub fn set_destinations(&mut self, output: impl Into<String>, inputs: BTreeSet<String>) {
        let output = output.into();
        if inputs.is_empty() {
            self.links.remove(&output);
        } else {
            self.links.insert(output, inputs);
        }
    }

    /// Remove a connection. Returns `false` if it was not present.
    pub fn remove(&mut self, output: &str, input: &str) -> bool {
        let Some(inputs) = self.links.get_mut(output) else {
            return false;
        };
        let removed = inputs.remove(input);
        if inputs.is_empty() {
            self.links.remove(output);
        }
        removed
    }

    /// Check whether `output` feeds `input`.
    #[must_use]
    pub fn contains(&self, output: &str, input: &str) -> bool {
        self.links.get(output).is_some_and(|inputs| inputs.contains(input))
    }

    /// Destinations of an output, if it has any.
    #[must_use]
    pub fn destinations(&self, output: &str) -> Option<&BTreeSet<String>> {
        self.links.get(output)
    }

    /// Output ports with at least one connection.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// Every connection, ordered by output then input.
    pub fn connections(&self) -> impl Iterator<Item = Connection> + '_ {
        self.links.iter().flat_map(|(output, inputs)| {
            inputs.iter().map(move |input| Connection::new(output.as_str(), input.as_str()))
        })
    }

    /// Every port name the patch refers to, outputs and inputs alike.
    #[must_use]
    pub fn ports(&self) -> BTreeSet<&str> {
        self.links
            .iter()
            .flat_map(|(output, inputs)| {
                std::iter::once(output.as_str()).chain(inputs.iter().map(String::as_str))
            })
            .collect()
    }

    /// Number of connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl FromIterator<Connection> for Patch {
    fn from_iter<I: IntoIterator<Item = Connection>>(iter: I) -> Self {
        let mut patch = Self::new();
        for connection in iter {
            patch.insert(connection.output, connection.input);
        }
        patch
    }
}

impl From<PatchDocument> for Patch {
    fn from(document: PatchDocument) -> Self {
        // `false` entries mean "not connected"; outputs left empty are dropped.
        let mut patch = Self::new();
        for (output, inputs) in document {
            let inputs: BTreeSet<String> =
                inputs.into_iter().filter_map(|(input, on)| on.then_some(input)).collect();
            patch.set_destinations(output, inputs);
        }
        patch
    }
}

impl From<Patch> for PatchDocument {
    fn from(patch: Patch) -> Self {
        patch
            .links
            .into_iter()
            .map(|(output, inputs)| (output, inputs.into_iter().map(|i| (i, true)).collect()))
            .collect()
    }
}
