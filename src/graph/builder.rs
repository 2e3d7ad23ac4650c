//! Hyperstructure → node/link lists
//!
//! Every hyperedge becomes a relation node wired to its subject and object
//! entities. Context records (or bare temporal intervals) become shared
//! context nodes. State-change events become state nodes with an `affects`
//! link to the fact they change and `cause` links from the facts that
//! trigger them.
//!
//! Node ids are prefixed by kind (`ent:`, `rel:`, `ctx:`, `state:`) so an
//! entity called the same as a hyperedge never collides with it.

use super::types::{GraphData, GraphLink, GraphNode, LinkRole, LinkStyle, NodeKind};
use crate::geometry::Point;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum GraphBuildError {
    #[error("invalid hyperstructure JSON: {0}")]
    Json(#[from] serde_json::Error),
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Hyperstructure payload as delivered by the backend
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperstructure {
    #[serde(default)]
    pub name: String,
    /// Entity ids; entities referenced only by hyperedges are added too
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub hyperedges: Vec<Hyperedge>,
    #[serde(default)]
    pub state_events: Vec<StateEvent>,
}

impl Hyperstructure {
    pub fn from_json_str(json: &str) -> Result<Self, GraphBuildError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn unknown_relation() -> String {
    "unknown".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hyperedge {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "unknown_relation")]
    pub relation_type: String,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    /// All participants when explicit roles are missing
    #[serde(default)]
    pub entities: Vec<String>,
    #[serde(default)]
    pub temporal_intervals: Vec<TemporalInterval>,
    /// Raw spatial context values, decoded separately for the map
    #[serde(default)]
    pub spatial_contexts: Vec<Value>,
    #[serde(default)]
    pub contexts: Vec<ContextRecord>,
}

impl Hyperedge {
    /// Subject and object ids. Without explicit roles the first distinct
    /// participant is the subject and the rest are objects.
    pub fn roles(&self) -> (Vec<&str>, Vec<&str>) {
        if !self.subjects.is_empty() || !self.objects.is_empty() {
            return (
                self.subjects.iter().map(String::as_str).collect(),
                self.objects.iter().map(String::as_str).collect(),
            );
        }

        let mut seen = HashSet::new();
        let ordered: Vec<&str> = self
            .entities
            .iter()
            .map(String::as_str)
            .filter(|e| seen.insert(*e))
            .collect();
        match ordered.split_first() {
            Some((first, rest)) => (vec![*first], rest.to_vec()),
            None => (Vec::new(), Vec::new()),
        }
    }

    /// Whether this hyperedge is the fact `fact` refers to
    fn matches(&self, fact: &FactRef) -> bool {
        if self.relation_type != fact.relation_type {
            return false;
        }
        let (subjects, objects) = self.roles();
        same_set(&subjects, &fact.subjects) && same_set(&objects, &fact.objects)
    }
}

fn same_set(ours: &[&str], theirs: &[String]) -> bool {
    let a: HashSet<&str> = ours.iter().copied().collect();
    let b: HashSet<&str> = theirs.iter().map(String::as_str).collect();
    a == b
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalInterval {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub from_time: Option<String>,
    #[serde(default)]
    pub to_time: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
}

impl ContextRecord {
    fn from_interval(interval: &TemporalInterval) -> Self {
        Self {
            id: None,
            from_time: interval.start_time.clone(),
            to_time: interval.end_time.clone(),
            location_name: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.from_time.is_none()
            && self.to_time.is_none()
            && self.location_name.is_none()
    }

    /// Dedup key: the record id, or its content when there is none
    fn key(&self) -> String {
        match &self.id {
            Some(id) => id.clone(),
            None => format!(
                "{}|{}|{}",
                self.location_name.as_deref().unwrap_or(""),
                self.from_time.as_deref().unwrap_or(""),
                self.to_time.as_deref().unwrap_or("")
            ),
        }
    }

    fn label(&self, wrap_width: usize) -> String {
        let mut lines = Vec::new();
        if let Some(location) = &self.location_name {
            lines.push(wrap_label(location, wrap_width));
        }
        match (&self.from_time, &self.to_time) {
            (Some(from), Some(to)) => lines.push(format!("{from}\n→ {to}")),
            (Some(from), None) => lines.push(format!("from {from}")),
            (None, Some(to)) => lines.push(format!("until {to}")),
            (None, None) => {}
        }
        if lines.is_empty() {
            lines.push(wrap_label(self.id.as_deref().unwrap_or("context"), wrap_width));
        }
        lines.join("\n")
    }
}

/// Reference to a fact by its relation and participants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactRef {
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub objects: Vec<String>,
    #[serde(default)]
    pub relation_type: String,
    /// False when the cause only applies while a state holds
    #[serde(default = "default_true")]
    pub triggered_by_state: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    pub id: String,
    pub affected_fact: FactRef,
    /// Groups of causes; facts within a group are jointly required
    #[serde(default)]
    pub caused_by: Vec<Vec<FactRef>>,
}

// =============================================================================
// LABELS
// =============================================================================

/// Word-wrap a label at `width` characters. Underscores read as spaces.
pub fn wrap_label(text: &str, width: usize) -> String {
    let text = text.replace('_', " ");
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let fits = line.chars().count() + 1 + word.chars().count() <= width;
        if line.is_empty() {
            line.push_str(word);
        } else if fits {
            line.push(' ');
            line.push_str(word);
        } else {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines.join("\n")
}

// =============================================================================
// GRAPH ENGINE
// =============================================================================

/// Settings for building and seeding the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Initial positions are jittered around this point
    pub center: Point,
    /// Half-width of the jitter square
    pub jitter: f64,
    pub seed: u64,
    /// Label wrap width in characters
    pub wrap_width: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            center: Point::new(400.0, 300.0),
            jitter: 100.0,
            seed: 42,
            wrap_width: 16,
        }
    }
}

/// Builds [`GraphData`] from hyperstructures and skips redundant rebuilds
#[derive(Debug, Clone, Default)]
pub struct GraphEngine {
    config: BuildConfig,
    last_hash: Option<String>,
    data: GraphData,
}

impl GraphEngine {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            last_hash: None,
            data: GraphData::default(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Most recently built graph
    pub fn data(&self) -> &GraphData {
        &self.data
    }

    /// SHA-256 over the canonical JSON encoding, hex encoded
    pub fn content_hash(structure: &Hyperstructure) -> Result<String, GraphBuildError> {
        let bytes = serde_json::to_vec(structure)?;
        Ok(hex::encode(Sha256::digest(&bytes)))
    }

    /// Rebuild only when the content hash differs from the last build.
    ///
    /// Returns the new graph, or `None` when nothing changed.
    pub fn rebuild_if_changed(
        &mut self,
        structure: &Hyperstructure,
    ) -> Result<Option<&GraphData>, GraphBuildError> {
        let hash = Self::content_hash(structure)?;
        if self.last_hash.as_deref() == Some(hash.as_str()) {
            debug!(hash = %&hash[..12], "hyperstructure unchanged, skipping rebuild");
            return Ok(None);
        }

        self.data = self.build(structure);
        info!(
            name = %structure.name,
            nodes = self.data.nodes.len(),
            links = self.data.links.len(),
            hash = %&hash[..12],
            "graph rebuilt"
        );
        self.last_hash = Some(hash);
        Ok(Some(&self.data))
    }

    /// Build nodes and links. Deterministic for a given structure and seed.
    pub fn build(&self, structure: &Hyperstructure) -> GraphData {
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut graph = GraphAssembly::new(&self.config, &mut rng);

        for entity in &structure.entities {
            graph.entity(entity);
        }

        let mut relation_ids = Vec::with_capacity(structure.hyperedges.len());
        for (index, hyperedge) in structure.hyperedges.iter().enumerate() {
            let rel_id = match &hyperedge.id {
                Some(id) => format!("rel:{id}"),
                None => format!("rel:#{index}"),
            };
            graph.node(&rel_id, NodeKind::Relation, &hyperedge.relation_type);

            let (subjects, objects) = hyperedge.roles();
            for subject in subjects {
                let ent_id = graph.entity(subject);
                graph.link(&ent_id, &rel_id, false, LinkStyle::solid(LinkRole::Subject));
            }
            for object in objects {
                let ent_id = graph.entity(object);
                graph.link(&rel_id, &ent_id, true, LinkStyle::solid(LinkRole::Object));
            }

            let records: Vec<ContextRecord> = if hyperedge.contexts.is_empty() {
                hyperedge
                    .temporal_intervals
                    .iter()
                    .map(ContextRecord::from_interval)
                    .collect()
            } else {
                hyperedge.contexts.clone()
            };
            for record in records.iter().filter(|r| !r.is_empty()) {
                let ctx_id = format!("ctx:{}", record.key());
                let label = record.label(self.config.wrap_width);
                graph.node_with_label(&ctx_id, NodeKind::Context, label);
                graph.link(&rel_id, &ctx_id, false, LinkStyle::dashed(LinkRole::Context));
            }

            relation_ids.push(rel_id);
        }

        let find_relation = |fact: &FactRef| {
            structure
                .hyperedges
                .iter()
                .position(|h| h.matches(fact))
                .map(|i| relation_ids[i].clone())
        };

        for event in &structure.state_events {
            let state_id = format!("state:{}", event.id);
            graph.node(&state_id, NodeKind::State, &event.id);

            match find_relation(&event.affected_fact) {
                Some(rel_id) => {
                    graph.link(&state_id, &rel_id, true, LinkStyle::solid(LinkRole::Affects))
                }
                None => debug!(event = %event.id, "affected fact not in graph"),
            }

            for cause in event.caused_by.iter().flatten() {
                let Some(rel_id) = find_relation(cause) else {
                    debug!(event = %event.id, relation = %cause.relation_type, "cause not in graph");
                    continue;
                };
                let style = if cause.triggered_by_state {
                    LinkStyle::solid(LinkRole::Cause)
                } else {
                    LinkStyle::dashed(LinkRole::Cause)
                };
                graph.link(&rel_id, &state_id, true, style);
            }
        }

        graph.finish()
    }
}

/// Accumulates nodes and links while keeping ids and links unique
struct GraphAssembly<'a> {
    config: &'a BuildConfig,
    rng: &'a mut StdRng,
    data: GraphData,
    node_ids: HashSet<String>,
    link_keys: HashSet<(String, String)>,
}

impl<'a> GraphAssembly<'a> {
    fn new(config: &'a BuildConfig, rng: &'a mut StdRng) -> Self {
        Self {
            config,
            rng,
            data: GraphData::default(),
            node_ids: HashSet::new(),
            link_keys: HashSet::new(),
        }
    }

    fn entity(&mut self, name: &str) -> String {
        let id = format!("ent:{name}");
        self.node(&id, NodeKind::Entity, name);
        id
    }

    fn node(&mut self, id: &str, kind: NodeKind, text: &str) {
        let label = wrap_label(text, self.config.wrap_width);
        self.node_with_label(id, kind, label);
    }

    fn node_with_label(&mut self, id: &str, kind: NodeKind, label: String) {
        if !self.node_ids.insert(id.to_string()) {
            return;
        }
        let j = self.config.jitter.abs();
        let offset = if j > 0.0 {
            Point::new(self.rng.gen_range(-j..j), self.rng.gen_range(-j..j))
        } else {
            Point::ZERO
        };
        let node = GraphNode::new(id, kind, label).with_position(self.config.center + offset);
        self.data.nodes.push(node);
    }

    fn link(&mut self, source: &str, target: &str, directed: bool, style: LinkStyle) {
        if self.link_keys.insert((source.to_string(), target.to_string())) {
            self.data
                .links
                .push(GraphLink::new(source, target, directed, style));
        }
    }

    fn finish(self) -> GraphData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAYLOAD: &str = r#"{
        "name": "demo",
        "entities": ["Alice", "Acme_Corp"],
        "hyperedges": [
            {
                "id": "h1",
                "relation_type": "works_for",
                "subjects": ["Alice"],
                "objects": ["Acme_Corp"],
                "contexts": [
                    {"id": "c1", "from_time": "2020", "to_time": "2023", "location_name": "Boston"}
                ]
            },
            {
                "id": "h2",
                "relation_type": "located_in",
                "entities": ["Acme_Corp", "Boston", "Acme_Corp"],
                "temporal_intervals": [{"start_time": "2019"}]
            },
            {
                "id": "h3",
                "relation_type": "visits",
                "subjects": ["Alice"],
                "objects": ["Boston"],
                "contexts": [
                    {"id": "c1", "from_time": "2020", "to_time": "2023", "location_name": "Boston"}
                ]
            }
        ],
        "state_events": [
            {
                "id": "s1",
                "affected_fact": {"subjects": ["Alice"], "objects": ["Acme_Corp"], "relation_type": "works_for"},
                "caused_by": [[
                    {"subjects": ["Acme_Corp"], "objects": ["Boston"], "relation_type": "located_in"},
                    {"subjects": ["Alice"], "objects": ["Boston"], "relation_type": "visits", "triggered_by_state": false}
                ]]
            }
        ]
    }"#;

    fn structure() -> Hyperstructure {
        Hyperstructure::from_json_str(PAYLOAD).unwrap()
    }

    fn ids(data: &GraphData) -> Vec<&str> {
        data.nodes.iter().map(|n| n.id.as_str()).collect()
    }

    #[test]
    fn test_nodes_and_prefixes() {
        let data = GraphEngine::default().build(&structure());
        assert_eq!(
            ids(&data),
            vec![
                "ent:Alice",
                "ent:Acme_Corp",
                "rel:h1",
                "ctx:c1",
                "rel:h2",
                "ent:Boston",
                "ctx:|2019|",
                "rel:h3",
                "state:s1",
            ]
        );
    }

    #[test]
    fn test_role_fallback() {
        let s = structure();
        let (subjects, objects) = s.hyperedges[1].roles();
        assert_eq!(subjects, vec!["Acme_Corp"]);
        assert_eq!(objects, vec!["Boston"]);
    }

    #[test]
    fn test_context_nodes_are_shared() {
        let data = GraphEngine::default().build(&structure());
        let ctx_links: Vec<_> = data
            .links
            .iter()
            .filter(|l| l.target == "ctx:c1")
            .map(|l| l.source.as_str())
            .collect();
        assert_eq!(ctx_links, vec!["rel:h1", "rel:h3"]);
    }

    #[test]
    fn test_state_links() {
        let data = GraphEngine::default().build(&structure());
        let state: Vec<_> = data
            .links
            .iter()
            .filter(|l| l.source == "state:s1" || l.target == "state:s1")
            .map(|l| (l.source.as_str(), l.target.as_str(), l.style.role, l.style.dashed))
            .collect();
        assert_eq!(
            state,
            vec![
                ("state:s1", "rel:h1", LinkRole::Affects, false),
                ("rel:h2", "state:s1", LinkRole::Cause, false),
                ("rel:h3", "state:s1", LinkRole::Cause, true),
            ]
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let engine = GraphEngine::default();
        assert_eq!(engine.build(&structure()), engine.build(&structure()));

        let other = GraphEngine::new(BuildConfig {
            seed: 7,
            ..BuildConfig::default()
        });
        assert_ne!(
            engine.build(&structure()).nodes[0].position,
            other.build(&structure()).nodes[0].position
        );
    }

    #[test]
    fn test_jitter_stays_around_center() {
        let config = BuildConfig::default();
        let data = GraphEngine::new(config.clone()).build(&structure());
        for node in &data.nodes {
            let d = node.position - config.center;
            assert!(d.x.abs() <= config.jitter && d.y.abs() <= config.jitter);
        }
    }

    #[test]
    fn test_rebuild_skipped_when_unchanged() {
        let mut engine = GraphEngine::default();
        assert!(engine.rebuild_if_changed(&structure()).unwrap().is_some());
        assert!(engine.rebuild_if_changed(&structure()).unwrap().is_none());

        let mut changed = structure();
        changed.entities.push("Bob".into());
        let rebuilt = engine.rebuild_if_changed(&changed).unwrap();
        assert!(rebuilt.is_some_and(|d| d.nodes.iter().any(|n| n.id == "ent:Bob")));
    }

    #[test]
    fn test_wrap_label() {
        assert_eq!(wrap_label("works_for", 16), "works for");
        assert_eq!(
            wrap_label("is_the_primary_supplier_of", 16),
            "is the primary\nsupplier of"
        );
        assert_eq!(wrap_label("", 16), "");
    }

    #[test]
    fn test_missing_relation_type_defaults() {
        let s = Hyperstructure::from_json_str(r#"{"hyperedges": [{"subjects": ["a"]}]}"#).unwrap();
        assert_eq!(s.hyperedges[0].relation_type, "unknown");
        let data = GraphEngine::default().build(&s);
        assert!(ids(&data).contains(&"rel:#0"));
    }
}
