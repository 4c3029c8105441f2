//! In-memory provider registry loaded from a JSON catalog
//!
//! ```json
//! {
//!   "resources": { "aws/dynamodb/table": { "type": "object", "attributes": {} } },
//!   "dataSources": { "aws/vpc": { "type": "object" } },
//!   "links": [
//!     {
//!       "resourceTypeA": "aws/lambda/function",
//!       "resourceTypeB": "aws/dynamodb/table",
//!       "annotations": {
//!         "aws.lambda.dynamodb.accessType": { "appliesTo": "aws/lambda/function" }
//!       }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::schema::SchemaNode;

use super::{AnnotationDefinition, LinkDeclaration, ProviderRegistry};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogFile {
    #[serde(default)]
    resources: BTreeMap<String, SchemaNode>,
    #[serde(default)]
    data_sources: BTreeMap<String, SchemaNode>,
    #[serde(default)]
    links: Vec<CatalogLink>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogLink {
    #[serde(flatten)]
    declaration: LinkDeclaration,
    #[serde(default)]
    annotations: BTreeMap<String, AnnotationDefinition>,
}

/// Registry backed by a static catalog
#[derive(Debug, Default)]
pub struct StaticRegistry {
    resources: BTreeMap<String, Arc<SchemaNode>>,
    data_sources: BTreeMap<String, Arc<SchemaNode>>,
    links: Vec<CatalogLink>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let catalog: CatalogFile = serde_json::from_str(json)?;
        for link in &catalog.links {
            check_link(link)?;
        }
        Ok(Self {
            resources: wrap(catalog.resources),
            data_sources: wrap(catalog.data_sources),
            links: catalog.links,
        })
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let registry = Self::from_json(&json)?;
        tracing::info!(
            "Loaded provider catalog {} ({} resource types, {} links)",
            path.display(),
            registry.resources.len(),
            registry.links.len()
        );
        Ok(registry)
    }

    pub fn with_resource(mut self, resource_type: &str, schema: SchemaNode) -> Self {
        self.resources.insert(resource_type.to_string(), Arc::new(schema));
        self
    }

    pub fn with_data_source(mut self, data_source_type: &str, schema: SchemaNode) -> Self {
        self.data_sources
            .insert(data_source_type.to_string(), Arc::new(schema));
        self
    }

    pub fn with_link<I>(mut self, type_a: &str, type_b: &str, annotations: I) -> Self
    where
        I: IntoIterator<Item = (String, AnnotationDefinition)>,
    {
        self.links.push(CatalogLink {
            declaration: LinkDeclaration {
                resource_type_a: type_a.to_string(),
                resource_type_b: type_b.to_string(),
                description: None,
            },
            annotations: annotations.into_iter().collect(),
        });
        self
    }
}

/// Annotations must sit on one of the linked types, and a default must be
/// one of the allowed values
fn check_link(link: &CatalogLink) -> Result<()> {
    let LinkDeclaration {
        resource_type_a,
        resource_type_b,
        ..
    } = &link.declaration;
    for (name, annotation) in &link.annotations {
        if annotation.applies_to != *resource_type_a && annotation.applies_to != *resource_type_b {
            return Err(Error::Registry(format!(
                "annotation `{}` of link {} -> {} applies to unlinked type `{}`",
                name, resource_type_a, resource_type_b, annotation.applies_to
            )));
        }
        if let Some(default) = &annotation.default_value {
            if !annotation.allowed_values.is_empty() && !annotation.allowed_values.contains(default) {
                return Err(Error::Registry(format!(
                    "annotation `{}` defaults to `{}`, which is not an allowed value",
                    name, default
                )));
            }
        }
    }
    Ok(())
}

fn wrap(schemas: BTreeMap<String, SchemaNode>) -> BTreeMap<String, Arc<SchemaNode>> {
    schemas.into_iter().map(|(k, v)| (k, Arc::new(v))).collect()
}

#[tower_lsp::async_trait]
impl ProviderRegistry for StaticRegistry {
    async fn resource_types(&self) -> Result<Vec<String>> {
        Ok(self.resources.keys().cloned().collect())
    }

    async fn data_source_types(&self) -> Result<Vec<String>> {
        Ok(self.data_sources.keys().cloned().collect())
    }

    async fn resource_schema(&self, resource_type: &str) -> Result<Option<Arc<SchemaNode>>> {
        Ok(self.resources.get(resource_type).cloned())
    }

    async fn data_source_schema(&self, data_source_type: &str) -> Result<Option<Arc<SchemaNode>>> {
        Ok(self.data_sources.get(data_source_type).cloned())
    }

    async fn link(&self, type_a: &str, type_b: &str) -> Result<Option<LinkDeclaration>> {
        Ok(self
            .links
            .iter()
            .find(|l| l.declaration.resource_type_a == type_a && l.declaration.resource_type_b == type_b)
            .map(|l| l.declaration.clone()))
    }

    async fn annotation_definitions(
        &self,
        link: &LinkDeclaration,
    ) -> Result<BTreeMap<String, AnnotationDefinition>> {
        Ok(self
            .links
            .iter()
            .find(|l| &l.declaration == link)
            .map(|l| l.annotations.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    const CATALOG: &str = r#"{
        "resources": {
            "aws/dynamodb/table": {
                "type": "object",
                "description": "A DynamoDB table",
                "attributes": { "tableName": { "type": "scalar", "scalarType": "string" } }
            },
            "aws/lambda/function": { "type": "object" }
        },
        "links": [
            {
                "resourceTypeA": "aws/lambda/function",
                "resourceTypeB": "aws/dynamodb/table",
                "annotations": {
                    "aws.lambda.dynamodb.accessType": {
                        "appliesTo": "aws/lambda/function",
                        "allowedValues": ["read", "readwrite"]
                    }
                }
            }
        ]
    }"#;

    #[tokio::test]
    async fn test_catalog_lookups() {
        let registry = StaticRegistry::from_json(CATALOG).unwrap();
        assert_eq!(registry.resource_types().await.unwrap().len(), 2);
        let schema = registry
            .resource_schema("aws/dynamodb/table")
            .await
            .unwrap()
            .unwrap();
        assert!(schema.attributes.contains_key("tableName"));
        assert!(registry.resource_schema("aws/unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_link_lookup_is_ordered() {
        let registry = StaticRegistry::from_json(CATALOG).unwrap();
        let link = registry
            .link("aws/lambda/function", "aws/dynamodb/table")
            .await
            .unwrap()
            .expect("registered order");
        assert!(registry
            .link("aws/dynamodb/table", "aws/lambda/function")
            .await
            .unwrap()
            .is_none());

        let annotations = registry.annotation_definitions(&link).await.unwrap();
        assert_eq!(
            annotations["aws.lambda.dynamodb.accessType"].allowed_values,
            vec!["read", "readwrite"]
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, CATALOG).unwrap();
        let registry = StaticRegistry::load(&path).await.unwrap();
        assert_eq!(registry.data_source_types().await.unwrap().len(), 0);
    }

    #[test]
    fn test_invalid_catalog_is_an_error() {
        assert!(StaticRegistry::from_json("{ not json").is_err());
    }

    #[test]
    fn test_inconsistent_annotations_are_rejected() {
        let unlinked = CATALOG.replace(
            r#""appliesTo": "aws/lambda/function""#,
            r#""appliesTo": "aws/sqs/queue""#,
        );
        assert_matches!(StaticRegistry::from_json(&unlinked), Err(Error::Registry(_)));

        let bad_default = CATALOG.replace(
            r#""allowedValues": ["read", "readwrite"]"#,
            r#""allowedValues": ["read", "readwrite"], "defaultValue": "write""#,
        );
        assert_matches!(StaticRegistry::from_json(&bad_default), Err(Error::Registry(_)));
    }
}
