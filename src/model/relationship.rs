use serde::{Deserialize, Serialize};

use super::ResourceKind;

/// A directed edge between two resources of the same graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
}

impl Relationship {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationshipKind,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Bucket publishes object events to a topic, queue or function.
    EventNotification,
    /// Distribution serves content from this origin.
    OriginSource,
    /// Distribution falls back to this origin on failover status codes.
    FailoverOrigin,
    /// Distribution or API stage is protected by a web ACL.
    WebAclAssociation,
    /// Resource is encrypted with this key.
    EncryptionKey,
    /// Resource writes access/delivery logs here.
    LoggingDestination,
    /// Undeliverable messages land in this queue.
    DeadLetterQueue,
}

impl RelationshipKind {
    /// Source kinds that may carry this relationship.
    pub fn sources(self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Self::EventNotification => &[Bucket],
            Self::OriginSource | Self::FailoverOrigin => &[Distribution],
            Self::WebAclAssociation => &[Distribution, RestApi],
            Self::EncryptionKey => &[Bucket, Topic, Queue, Table, Function, LogGroup],
            Self::LoggingDestination => &[Bucket, Distribution, RestApi, WebAcl, Topic, Function],
            Self::DeadLetterQueue => &[Queue, Function, Topic],
        }
    }

    /// Target kinds this relationship may point at.
    pub fn targets(self) -> &'static [ResourceKind] {
        use ResourceKind::*;
        match self {
            Self::EventNotification => &[Topic, Queue, Function],
            Self::OriginSource | Self::FailoverOrigin => &[Bucket, RestApi],
            Self::WebAclAssociation => &[WebAcl],
            Self::EncryptionKey => &[Key],
            Self::LoggingDestination => &[Bucket, LogGroup],
            Self::DeadLetterQueue => &[Queue],
        }
    }

    pub fn permits(self, source: ResourceKind, target: ResourceKind) -> bool {
        self.sources().contains(&source) && self.targets().contains(&target)
    }
}

impl std::fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EventNotification => write!(f, "EventNotification"),
            Self::OriginSource => write!(f, "OriginSource"),
            Self::FailoverOrigin => write!(f, "FailoverOrigin"),
            Self::WebAclAssociation => write!(f, "WebAclAssociation"),
            Self::EncryptionKey => write!(f, "EncryptionKey"),
            Self::LoggingDestination => write!(f, "LoggingDestination"),
            Self::DeadLetterQueue => write!(f, "DeadLetterQueue"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waf_association_only_from_edge_resources() {
        let kind = RelationshipKind::WebAclAssociation;
        assert!(kind.permits(ResourceKind::RestApi, ResourceKind::WebAcl));
        assert!(kind.permits(ResourceKind::Distribution, ResourceKind::WebAcl));
        assert!(!kind.permits(ResourceKind::Bucket, ResourceKind::WebAcl));
        assert!(!kind.permits(ResourceKind::RestApi, ResourceKind::Bucket));
    }

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&RelationshipKind::WebAclAssociation).unwrap();
        assert_eq!(json, "\"web_acl_association\"");
    }
}
