use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{Relationship, RelationshipKind, Resolver, Resource};
use crate::error::{AuditError, Result};

/// The full set of resources and relationships for one evaluation pass.
///
/// Resources live in an arena addressed by id; relationships are indexed by
/// `(source, kind)`. A graph can only be obtained through `GraphBuilder::build`,
/// so every relationship endpoint is known to resolve, and nothing hands out
/// mutable access afterwards.
#[derive(Debug, Clone)]
pub struct ResourceGraph {
    name: String,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    relationships: Vec<Relationship>,
    adjacency: HashMap<(usize, RelationshipKind), Vec<usize>>,
}

impl ResourceGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources in insertion order.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.index.get(id).map(|&i| &self.resources[i])
    }

    /// Relationships in insertion order.
    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(self)
    }

    /// Indices into `relationships` for edges of `kind` leaving `resource_id`.
    pub(crate) fn outgoing(&self, resource_id: &str, kind: RelationshipKind) -> &[usize] {
        self.index
            .get(resource_id)
            .and_then(|&i| self.adjacency.get(&(i, kind)))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Convert back into the serializable document form.
    pub fn to_document(&self) -> GraphDocument {
        GraphDocument {
            name: Some(self.name.clone()),
            resources: self.resources.clone(),
            relationships: self.relationships.clone(),
        }
    }
}

/// Collects resources and relationships, then validates them into a
/// `ResourceGraph`.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    name: String,
    resources: Vec<Resource>,
    index: HashMap<String, usize>,
    relationships: Vec<Relationship>,
}

impl GraphBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a resource. Ids must be unique, and attributes named in the
    /// kind's schema must hold the declared type.
    pub fn add_resource(&mut self, resource: Resource) -> Result<&mut Self> {
        if self.index.contains_key(resource.id()) {
            return Err(AuditError::DuplicateResource(resource.id().to_string()));
        }

        for (name, value) in resource.attributes() {
            match resource.kind().attribute_type(name) {
                Some(expected) if expected != value.kind() => {
                    return Err(resource.type_error(name, expected, value.kind()));
                }
                Some(_) => {}
                None => tracing::debug!(
                    resource = %resource.id(),
                    kind = %resource.kind(),
                    attribute = %name,
                    "attribute not in schema, keeping as-is"
                ),
            }
        }

        self.index.insert(resource.id().to_string(), self.resources.len());
        self.resources.push(resource);
        Ok(self)
    }

    /// Record a relationship. Endpoints are checked in `build`, so edges may
    /// be declared before their resources.
    pub fn relate(
        &mut self,
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationshipKind,
    ) -> &mut Self {
        self.relationships.push(Relationship::new(source, target, kind));
        self
    }

    pub fn build(self) -> Result<ResourceGraph> {
        let mut adjacency: HashMap<(usize, RelationshipKind), Vec<usize>> = HashMap::new();

        for (position, rel) in self.relationships.iter().enumerate() {
            let source = self.endpoint(rel, &rel.source)?;
            let target = self.endpoint(rel, &rel.target)?;

            let (source_kind, target_kind) =
                (self.resources[source].kind(), self.resources[target].kind());
            if !rel.kind.permits(source_kind, target_kind) {
                return Err(AuditError::InvalidRelationship {
                    from: rel.source.clone(),
                    to: rel.target.clone(),
                    kind: rel.kind,
                    from_kind: source_kind,
                    to_kind: target_kind,
                });
            }

            adjacency
                .entry((source, rel.kind))
                .or_default()
                .push(position);
        }

        tracing::debug!(
            graph = %self.name,
            resources = self.resources.len(),
            relationships = self.relationships.len(),
            "resource graph built"
        );

        Ok(ResourceGraph {
            name: self.name,
            resources: self.resources,
            index: self.index,
            relationships: self.relationships,
            adjacency,
        })
    }

    fn endpoint(&self, rel: &Relationship, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| AuditError::UnresolvedRelationship {
                from: rel.source.clone(),
                to: rel.target.clone(),
                kind: rel.kind,
                missing: id.to_string(),
            })
    }
}

/// Serializable form of a resource graph, as read from JSON or TOML.
///
/// `resources` is required and unknown top-level keys are rejected, so
/// unrelated files (package manifests, tool configs) never pass as an
/// empty graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub resources: Vec<Resource>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

impl GraphDocument {
    /// Validate the document into a graph. `fallback_name` is used when the
    /// document does not name itself.
    pub fn into_graph(self, fallback_name: &str) -> Result<ResourceGraph> {
        let name = self.name.unwrap_or_else(|| fallback_name.to_string());
        let mut builder = GraphBuilder::new(name);
        for resource in self.resources {
            builder.add_resource(resource)?;
        }
        for rel in self.relationships {
            builder.relate(rel.source, rel.target, rel.kind);
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceKind;

    #[test]
    fn duplicate_ids_rejected() {
        let mut builder = GraphBuilder::new("dup");
        builder
            .add_resource(Resource::new("bucket", ResourceKind::Bucket))
            .unwrap();
        let err = builder
            .add_resource(Resource::new("bucket", ResourceKind::Queue))
            .unwrap_err();
        assert!(matches!(err, AuditError::DuplicateResource(id) if id == "bucket"));
    }

    #[test]
    fn dangling_relationship_fails_build() {
        let mut builder = GraphBuilder::new("dangling");
        builder
            .add_resource(Resource::new("bucket", ResourceKind::Bucket))
            .unwrap();
        builder.relate("bucket", "topic", RelationshipKind::EventNotification);
        match builder.build() {
            Err(AuditError::UnresolvedRelationship { missing, .. }) => assert_eq!(missing, "topic"),
            other => panic!("expected unresolved relationship, got {other:?}"),
        }
    }

    #[test]
    fn relationship_kind_matrix_enforced() {
        let mut builder = GraphBuilder::new("bad-edge");
        builder
            .add_resource(Resource::new("bucket", ResourceKind::Bucket))
            .unwrap()
            .add_resource(Resource::new("acl", ResourceKind::WebAcl))
            .unwrap();
        builder.relate("bucket", "acl", RelationshipKind::WebAclAssociation);
        assert!(matches!(
            builder.build(),
            Err(AuditError::InvalidRelationship { .. })
        ));
    }

    #[test]
    fn schema_type_conflict_rejected() {
        let mut builder = GraphBuilder::new("typed");
        let table = Resource::new("table", ResourceKind::Table).with("pointInTimeRecovery", "yes");
        let err = builder.add_resource(table).unwrap_err();
        assert!(matches!(err, AuditError::AttributeType { .. }));
    }

    #[test]
    fn edges_may_precede_resources() {
        let mut builder = GraphBuilder::new("order");
        builder.relate("api", "acl", RelationshipKind::WebAclAssociation);
        builder
            .add_resource(Resource::new("api", ResourceKind::RestApi))
            .unwrap()
            .add_resource(Resource::new("acl", ResourceKind::WebAcl))
            .unwrap();
        let graph = builder.build().unwrap();
        assert_eq!(graph.outgoing("api", RelationshipKind::WebAclAssociation), &[0]);
        assert!(graph.outgoing("acl", RelationshipKind::WebAclAssociation).is_empty());
    }

    #[test]
    fn document_round_trips_through_graph() {
        let doc: GraphDocument = serde_json::from_str(
            r#"{
                "resources": [
                    {"id": "q", "kind": "queue"},
                    {"id": "b", "kind": "bucket", "attributes": {"enforceSSL": true}}
                ],
                "relationships": [{"source": "b", "target": "q", "kind": "event_notification"}]
            }"#,
        )
        .unwrap();
        let graph = doc.into_graph("fallback").unwrap();
        assert_eq!(graph.name(), "fallback");
        assert_eq!(graph.resources()[0].id(), "q");
        assert_eq!(graph.to_document().relationships.len(), 1);
    }

    #[test]
    fn document_requires_resources() {
        let err = serde_json::from_str::<GraphDocument>(r#"{"name": "sample-app"}"#).unwrap_err();
        assert!(err.to_string().contains("resources"), "{err}");

        let manifest = r#"{"name": "sample-app", "version": "0.1.0", "resources": []}"#;
        let err = serde_json::from_str::<GraphDocument>(manifest).unwrap_err();
        assert!(err.to_string().contains("version"), "{err}");
    }
}
