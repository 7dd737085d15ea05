use super::{Relationship, RelationshipKind, Resource, ResourceGraph, ResourceKind};

/// Read-only view of a graph's relationships, handed to rule predicates.
///
/// Lookups are pure and cannot fail: endpoints were resolved when the graph
/// was built.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'g> {
    graph: &'g ResourceGraph,
}

impl<'g> Resolver<'g> {
    pub fn new(graph: &'g ResourceGraph) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &'g ResourceGraph {
        self.graph
    }

    /// Relationships of `kind` whose source is `resource_id`, in insertion order.
    pub fn relationships_of(
        &self,
        resource_id: &str,
        kind: RelationshipKind,
    ) -> Vec<&'g Relationship> {
        let all = self.graph.relationships();
        self.graph
            .outgoing(resource_id, kind)
            .iter()
            .map(|&i| &all[i])
            .collect()
    }

    /// Target resources of `kind` edges leaving `resource_id`.
    pub fn targets(
        &self,
        resource_id: &str,
        kind: RelationshipKind,
    ) -> impl Iterator<Item = &'g Resource> + 'g {
        let graph = self.graph;
        let all = graph.relationships();
        graph
            .outgoing(resource_id, kind)
            .iter()
            .filter_map(move |&i| graph.resource(&all[i].target))
    }

    /// Whether `resource_id` has at least one `kind` edge, optionally
    /// restricted to targets of `target_kind`.
    pub fn has_target(
        &self,
        resource_id: &str,
        kind: RelationshipKind,
        target_kind: Option<ResourceKind>,
    ) -> bool {
        self.targets(resource_id, kind)
            .any(|target| target_kind.map_or(true, |k| target.kind() == k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GraphBuilder;

    fn graph() -> ResourceGraph {
        let mut builder = GraphBuilder::new("resolver");
        builder
            .add_resource(Resource::new("bucket", ResourceKind::Bucket))
            .unwrap()
            .add_resource(Resource::new("topic", ResourceKind::Topic))
            .unwrap()
            .add_resource(Resource::new("queue", ResourceKind::Queue))
            .unwrap();
        builder
            .relate("bucket", "queue", RelationshipKind::EventNotification)
            .relate("bucket", "topic", RelationshipKind::EventNotification);
        builder.build().unwrap()
    }

    #[test]
    fn relationships_keep_insertion_order() {
        let graph = graph();
        let resolver = graph.resolver();
        let targets: Vec<&str> = resolver
            .relationships_of("bucket", RelationshipKind::EventNotification)
            .iter()
            .map(|r| r.target.as_str())
            .collect();
        assert_eq!(targets, vec!["queue", "topic"]);
    }

    #[test]
    fn target_kind_filter() {
        let graph = graph();
        let resolver = graph.resolver();
        let notify = RelationshipKind::EventNotification;
        assert!(resolver.has_target("bucket", notify, Some(ResourceKind::Topic)));
        assert!(!resolver.has_target("bucket", notify, Some(ResourceKind::Function)));
        assert!(!resolver.has_target("topic", notify, None));
    }

    #[test]
    fn unknown_resource_has_no_edges() {
        let graph = graph();
        assert!(graph
            .resolver()
            .relationships_of("missing", RelationshipKind::LoggingDestination)
            .is_empty());
    }
}
