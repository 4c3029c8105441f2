//! Link relationships between declared resources
//!
//! A link exists between two resources when the provider registry declares
//! one for their type pair, or when one resource's `linkSelector.byLabel`
//! matches the other's labels. The direction (which resource is side A)
//! decides which annotations apply to which resource.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::ast::{ElementCategory, Node, Payload};
use crate::error::Result;
use crate::provider::{cancellable, AnnotationDefinition, ProviderRegistry};

/// Link-relevant facts about a declared resource
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    pub name: String,
    pub resource_type: Option<String>,
    pub labels: BTreeMap<String, String>,
    /// `linkSelector.byLabel`
    pub selector: BTreeMap<String, String>,
    /// `linkSelector.exclude`
    pub exclude: Vec<String>,
}

impl ResourceInfo {
    pub fn from_declaration(node: &Node) -> Self {
        let string_map = |path: &str| -> BTreeMap<String, String> {
            node.find_path(path)
                .map(|mapping| {
                    mapping
                        .children
                        .iter()
                        .filter_map(|entry| Some((entry.label.clone(), scalar_text(entry)?)))
                        .collect()
                })
                .unwrap_or_default()
        };
        Self {
            name: node.label.clone(),
            resource_type: node.child("type").and_then(Node::as_str).map(str::to_string),
            labels: string_map("metadata/labels"),
            selector: string_map("linkSelector/byLabel"),
            exclude: node
                .find_path("linkSelector/exclude")
                .map(|list| list.string_items().into_iter().map(str::to_string).collect())
                .unwrap_or_default(),
        }
    }

    /// Whether this resource's selector matches one of `other`'s labels
    pub fn selects(&self, other: &ResourceInfo) -> bool {
        if self.exclude.contains(&other.name) {
            return false;
        }
        self.selector
            .iter()
            .any(|(key, value)| other.labels.get(key) == Some(value))
    }
}

/// All resources declared in a document
pub fn resources_in(root: &Node) -> Vec<ResourceInfo> {
    root.child(ElementCategory::Resource.section())
        .map(|section| {
            section
                .children
                .iter()
                .filter(|node| node.declared_category() == Some(ElementCategory::Resource))
                .map(ResourceInfo::from_declaration)
                .collect()
        })
        .unwrap_or_default()
}

fn scalar_text(node: &Node) -> Option<String> {
    match &node.payload {
        Payload::Scalar(scalar) => Some(scalar.to_string()),
        _ => None,
    }
}

/// A resource linked to the resource under edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedResourceCandidate {
    pub name: String,
    pub resource_type: String,
    /// Whether the resource under edit is side A of the link
    pub current_is_side_a: bool,
}

/// Annotation definitions per `typeA::typeB` pair
pub type AnnotationDefinitionCache = DashMap<String, Arc<BTreeMap<String, AnnotationDefinition>>>;

/// Finds link candidates and the annotations they bring
pub struct LinkResolver {
    registry: Arc<dyn ProviderRegistry>,
    cache: AnnotationDefinitionCache,
}

impl LinkResolver {
    pub fn new(registry: Arc<dyn ProviderRegistry>) -> Self {
        Self {
            registry,
            cache: DashMap::new(),
        }
    }

    /// Resources linked to `current`, with the side `current` occupies
    pub async fn linked_resources(
        &self,
        current: &ResourceInfo,
        all: &[ResourceInfo],
        token: &CancellationToken,
    ) -> Result<Vec<LinkedResourceCandidate>> {
        let Some(current_type) = current.resource_type.as_deref() else {
            return Ok(Vec::new());
        };

        let mut candidates = Vec::new();
        for other in all.iter().filter(|other| other.name != current.name) {
            let Some(other_type) = other.resource_type.as_deref() else {
                continue;
            };
            let provisional = self.registered_direction(current_type, other_type, token).await?;
            let by_selector = selector_direction(current, other);

            let side_a = match provisional {
                Some(registered) if current_type != other_type => Some(registered),
                // Same type on both sides: the registry can't tell the sides
                // apart, so the selector holder is side A. Without a selector
                // relationship the registration order is kept as is.
                Some(registered) => Some(by_selector.unwrap_or(registered)),
                None => by_selector,
            };
            if let Some(current_is_side_a) = side_a {
                candidates.push(LinkedResourceCandidate {
                    name: other.name.clone(),
                    resource_type: other_type.to_string(),
                    current_is_side_a,
                });
            }
        }
        Ok(candidates)
    }

    /// `Some(true)` when registered as (current, other), `Some(false)` when
    /// registered as (other, current)
    async fn registered_direction(
        &self,
        current_type: &str,
        other_type: &str,
        token: &CancellationToken,
    ) -> Result<Option<bool>> {
        if cancellable(token, self.registry.link(current_type, other_type))
            .await?
            .is_some()
        {
            return Ok(Some(true));
        }
        let reverse = cancellable(token, self.registry.link(other_type, current_type)).await?;
        Ok(reverse.map(|_| false))
    }

    /// Annotation definitions of the link registered as (`type_a`, `type_b`).
    ///
    /// Results are cached per type pair. A cancelled lookup leaves the cache
    /// untouched.
    pub async fn annotation_definitions(
        &self,
        type_a: &str,
        type_b: &str,
        token: &CancellationToken,
    ) -> Result<Arc<BTreeMap<String, AnnotationDefinition>>> {
        let key = format!("{}::{}", type_a, type_b);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached.clone());
        }

        let definitions = match cancellable(token, self.registry.link(type_a, type_b)).await? {
            Some(link) => cancellable(token, self.registry.annotation_definitions(&link)).await?,
            None => BTreeMap::new(),
        };
        let definitions = Arc::new(definitions);
        self.cache.insert(key, definitions.clone());
        Ok(definitions)
    }

    /// Annotations applying to `current`'s type across all of its links
    pub async fn annotation_keys_for(
        &self,
        current: &ResourceInfo,
        all: &[ResourceInfo],
        token: &CancellationToken,
    ) -> Result<BTreeMap<String, AnnotationDefinition>> {
        let Some(current_type) = current.resource_type.as_deref() else {
            return Ok(BTreeMap::new());
        };

        let mut keys = BTreeMap::new();
        for candidate in self.linked_resources(current, all, token).await? {
            let (type_a, type_b) = if candidate.current_is_side_a {
                (current_type, candidate.resource_type.as_str())
            } else {
                (candidate.resource_type.as_str(), current_type)
            };
            let definitions = self.annotation_definitions(type_a, type_b, token).await?;
            for (name, definition) in definitions.iter() {
                if definition.applies_to == current_type {
                    keys.entry(name.clone()).or_insert_with(|| definition.clone());
                }
            }
        }
        Ok(keys)
    }

    pub fn cached_pairs(&self) -> usize {
        self.cache.len()
    }
}

/// Which side `current` takes based on selectors alone. Mutual selection
/// is settled by name order so both perspectives agree.
fn selector_direction(current: &ResourceInfo, other: &ResourceInfo) -> Option<bool> {
    match (current.selects(other), other.selects(current)) {
        (true, false) => Some(true),
        (false, true) => Some(false),
        (true, true) => Some(current.name < other.name),
        (false, false) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SyntaxVariant;
    use crate::error::Error;
    use crate::parser::parse_document;
    use crate::provider::StaticRegistry;
    use assert_matches::assert_matches;

    const BLUEPRINT: &str = r#"resources:
  worker:
    type: aws/ecs/service
    metadata:
      labels:
        app: orders
  frontend:
    type: aws/ecs/service
    linkSelector:
      byLabel:
        app: orders
  handler:
    type: aws/lambda/function
    linkSelector:
      byLabel:
        app: orders
  ordersTable:
    type: aws/dynamodb/table
  queue:
    type: aws/sqs/queue
    metadata:
      labels:
        app: orders
"#;

    fn registry() -> Arc<dyn ProviderRegistry> {
        let access = AnnotationDefinition {
            applies_to: "aws/lambda/function".to_string(),
            description: Some("Access level granted to the function".to_string()),
            allowed_values: vec!["read".to_string(), "readwrite".to_string()],
            default_value: None,
            required: false,
        };
        let table_side = AnnotationDefinition {
            applies_to: "aws/dynamodb/table".to_string(),
            description: None,
            allowed_values: Vec::new(),
            default_value: None,
            required: false,
        };
        Arc::new(
            StaticRegistry::new()
                .with_link(
                    "aws/lambda/function",
                    "aws/dynamodb/table",
                    [
                        ("aws.lambda.dynamodb.accessType".to_string(), access),
                        ("aws.dynamodb.lambda.stream".to_string(), table_side),
                    ],
                )
                .with_link(
                    "aws/ecs/service",
                    "aws/ecs/service",
                    Vec::<(String, AnnotationDefinition)>::new(),
                ),
        )
    }

    fn resources() -> Vec<ResourceInfo> {
        let parsed = parse_document(BLUEPRINT, SyntaxVariant::Yaml).unwrap();
        resources_in(&parsed.root)
    }

    fn named<'a>(all: &'a [ResourceInfo], name: &str) -> &'a ResourceInfo {
        all.iter().find(|r| r.name == name).unwrap()
    }

    fn side_of(candidates: &[LinkedResourceCandidate], name: &str) -> Option<bool> {
        candidates
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.current_is_side_a)
    }

    #[test]
    fn test_resource_info_from_declaration() {
        let all = resources();
        assert_eq!(all.len(), 5);
        let frontend = named(&all, "frontend");
        assert_eq!(frontend.resource_type.as_deref(), Some("aws/ecs/service"));
        assert_eq!(frontend.selector.get("app").map(String::as_str), Some("orders"));
        assert!(frontend.selects(named(&all, "worker")));
        assert!(!named(&all, "worker").selects(frontend));
    }

    #[test]
    fn test_exclude_prevents_selection() {
        let mut holder = ResourceInfo {
            name: "a".to_string(),
            ..Default::default()
        };
        holder.selector.insert("app".to_string(), "x".to_string());
        let mut target = ResourceInfo {
            name: "b".to_string(),
            ..Default::default()
        };
        target.labels.insert("app".to_string(), "x".to_string());
        assert!(holder.selects(&target));
        holder.exclude.push("b".to_string());
        assert!(!holder.selects(&target));
    }

    #[tokio::test]
    async fn test_registered_direction_is_authoritative_for_different_types() {
        let resolver = LinkResolver::new(registry());
        let all = resources();
        let token = CancellationToken::new();

        let from_handler = resolver
            .linked_resources(named(&all, "handler"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_handler, "ordersTable"), Some(true));

        let from_table = resolver
            .linked_resources(named(&all, "ordersTable"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_table, "handler"), Some(false));
    }

    #[tokio::test]
    async fn test_same_type_selector_holder_is_side_a() {
        let resolver = LinkResolver::new(registry());
        let all = resources();
        let token = CancellationToken::new();

        // `worker` is declared first but `frontend` holds the selector
        let from_worker = resolver
            .linked_resources(named(&all, "worker"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_worker, "frontend"), Some(false));

        let from_frontend = resolver
            .linked_resources(named(&all, "frontend"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_frontend, "worker"), Some(true));
    }

    #[tokio::test]
    async fn test_selector_link_without_registration() {
        let resolver = LinkResolver::new(registry());
        let all = resources();
        let token = CancellationToken::new();

        let from_handler = resolver
            .linked_resources(named(&all, "handler"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_handler, "queue"), Some(true));
        // No registration and no selector
        assert_eq!(side_of(&from_handler, "frontend"), None);

        let from_queue = resolver
            .linked_resources(named(&all, "queue"), &all, &token)
            .await
            .unwrap();
        assert_eq!(side_of(&from_queue, "handler"), Some(false));
    }

    #[tokio::test]
    async fn test_mutual_selection_is_complementary() {
        let resolver = LinkResolver::new(registry());
        let mut a = ResourceInfo {
            name: "alpha".to_string(),
            resource_type: Some("aws/ecs/service".to_string()),
            ..Default::default()
        };
        let mut b = ResourceInfo {
            name: "beta".to_string(),
            resource_type: Some("aws/ecs/service".to_string()),
            ..Default::default()
        };
        for info in [&mut a, &mut b] {
            info.labels.insert("tier".to_string(), "web".to_string());
            info.selector.insert("tier".to_string(), "web".to_string());
        }
        let all = vec![b.clone(), a.clone()];
        let token = CancellationToken::new();

        let from_a = resolver.linked_resources(&a, &all, &token).await.unwrap();
        let from_b = resolver.linked_resources(&b, &all, &token).await.unwrap();
        assert_eq!(side_of(&from_a, "beta"), Some(true));
        assert_eq!(side_of(&from_b, "alpha"), Some(false));
    }

    #[tokio::test]
    async fn test_annotation_keys_for_side() {
        let resolver = LinkResolver::new(registry());
        let all = resources();
        let token = CancellationToken::new();

        let keys = resolver
            .annotation_keys_for(named(&all, "handler"), &all, &token)
            .await
            .unwrap();
        assert!(keys.contains_key("aws.lambda.dynamodb.accessType"));
        assert!(!keys.contains_key("aws.dynamodb.lambda.stream"));

        let keys = resolver
            .annotation_keys_for(named(&all, "ordersTable"), &all, &token)
            .await
            .unwrap();
        assert_eq!(
            keys.keys().collect::<Vec<_>>(),
            vec!["aws.dynamodb.lambda.stream"]
        );
    }

    #[tokio::test]
    async fn test_annotation_definitions_are_cached_per_pair() {
        let resolver = LinkResolver::new(registry());
        let token = CancellationToken::new();
        let first = resolver
            .annotation_definitions("aws/lambda/function", "aws/dynamodb/table", &token)
            .await
            .unwrap();
        let second = resolver
            .annotation_definitions("aws/lambda/function", "aws/dynamodb/table", &token)
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cached_pairs(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_lookup_leaves_cache_untouched() {
        let resolver = LinkResolver::new(registry());
        let token = CancellationToken::new();
        token.cancel();
        let result = resolver
            .annotation_definitions("aws/lambda/function", "aws/dynamodb/table", &token)
            .await;
        assert_matches!(result, Err(Error::Cancelled));
        assert_eq!(resolver.cached_pairs(), 0);
    }
}
