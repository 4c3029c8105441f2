//! Hover text
//!
//! Markdown for references, declarations, bare element names, resource and
//! data source `type` values, and annotation keys.

use crate::ast::{ElementCategory, Node, NodeKind, Position, Reference};
use crate::links::resources_in;
use crate::literal::{self, LiteralValue};
use crate::path::{render_path, PathSegment};
use crate::provider::cancellable;
use crate::resolve::{path_matches, resolve_identity, ElementIdentity};
use crate::schema::{self, SchemaLookup};
use crate::workspace::{Services, Snapshot};

/// Hover markdown for `pos`, `None` when there is nothing to describe
pub async fn hover_text(services: &Services, snapshot: &Snapshot, pos: Position) -> Option<String> {
    let root = snapshot.tree()?;
    let stack = root.enclosing(pos);
    let innermost = *stack.last()?;

    if let Some((reference, hovered)) = hovered_reference(&stack) {
        return Some(reference_hover(services, snapshot, root, reference, hovered).await);
    }
    if innermost.kind == NodeKind::Scalar {
        if let Some(text) = scalar_hover(services, snapshot, root, innermost).await {
            return Some(text);
        }
    }
    let identity = resolve_identity(&stack)?;
    Some(element_summary(root, &identity))
}

/// The reference under the cursor and the number of its path items up to
/// and including the hovered one
fn hovered_reference<'a>(stack: &[&'a Node]) -> Option<(&'a Reference, usize)> {
    let (index, node) = stack
        .iter()
        .enumerate()
        .rev()
        .find(|(_, node)| node.kind == NodeKind::Reference)?;
    let reference = node.as_reference()?;
    let hovered = match stack.get(index + 1) {
        Some(item) => node
            .children
            .iter()
            .position(|child| std::ptr::eq(child, *item))
            .map(|at| at + 1)
            .unwrap_or(node.children.len()),
        None => node.children.len(),
    };
    Some((reference, hovered))
}

async fn reference_hover(
    services: &Services,
    snapshot: &Snapshot,
    root: &Node,
    reference: &Reference,
    hovered: usize,
) -> String {
    let identity = ElementIdentity::new(reference.category, reference.name.clone());
    let mut text = element_summary(root, &identity);
    // The first two items are the namespace and the element name
    let path = &reference.path[..hovered.saturating_sub(2).min(reference.path.len())];
    if path.is_empty() {
        return text;
    }
    let Some(declaration) = root.find_path(&identity.definition_path) else {
        return text;
    };
    if let Some(detail) = path_detail(services, snapshot, declaration, reference.category, path).await {
        text.push_str("\n\n---\n\n");
        text.push_str(&format!("`{}`", render_path(path)));
        text.push_str(&detail);
    }
    text
}

/// Type and description of what `path` addresses inside an element
async fn path_detail(
    services: &Services,
    snapshot: &Snapshot,
    declaration: &Node,
    category: ElementCategory,
    path: &[PathSegment],
) -> Option<String> {
    match category {
        ElementCategory::Resource if path.first()?.as_field() == Some("spec") => {
            let schema = match services.resource_schema(declaration, &snapshot.token).await {
                Ok(schema) => schema,
                Err(err) => {
                    tracing::debug!("No schema for hover: {}", err);
                    return None;
                }
            };
            let node = match schema::navigate(&schema, path) {
                SchemaLookup::NotFound => return None,
                lookup => lookup.node()?,
            };
            let mut detail = format!(": `{}`", node.type_label());
            if node.computed {
                detail.push_str(" (computed)");
            }
            if let Some(description) = &node.description {
                detail.push_str(&format!("\n\n{}", description));
            }
            Some(detail)
        }
        ElementCategory::Resource => {
            let metadata = LiteralValue::from_node(declaration.child("metadata")?);
            let value = literal::navigate(&metadata, path.get(1..)?)?;
            Some(format!(": `{}`", value.type_label()))
        }
        ElementCategory::Value => {
            let value = LiteralValue::from_node(declaration.child("value")?);
            let found = literal::navigate(&value, path)?;
            Some(format!(": `{}`", found.type_label()))
        }
        _ => None,
    }
}

/// Hover for plain scalars with a meaning of their own
async fn scalar_hover(
    services: &Services,
    snapshot: &Snapshot,
    root: &Node,
    node: &Node,
) -> Option<String> {
    let token = &snapshot.token;
    if path_matches(&node.path, "/resources/*/type") {
        let resource_type = node.as_str()?;
        let schema = cancellable(token, services.registry.resource_schema(resource_type))
            .await
            .ok()??;
        return Some(type_summary("resource type", resource_type, schema.description.as_deref()));
    }
    if path_matches(&node.path, "/datasources/*/type") {
        let data_source_type = node.as_str()?;
        let schema = cancellable(token, services.registry.data_source_schema(data_source_type))
            .await
            .ok()??;
        return Some(type_summary(
            "data source type",
            data_source_type,
            schema.description.as_deref(),
        ));
    }
    if path_matches(&node.path, "/resources/*/metadata/annotations/*") {
        let resource = node.path.split('/').nth(2)?;
        let all = resources_in(root);
        let current = all.iter().find(|info| info.name == resource)?;
        let definitions = match services.links.annotation_keys_for(current, &all, token).await {
            Ok(definitions) => definitions,
            Err(err) => {
                tracing::debug!("No annotation definitions for hover: {}", err);
                return None;
            }
        };
        let definition = definitions.get(&node.label)?;
        let mut text = format!("**annotation** `{}`", node.label);
        if let Some(description) = &definition.description {
            text.push_str(&format!("\n\n{}", description));
        }
        if !definition.allowed_values.is_empty() {
            let allowed: Vec<String> = definition
                .allowed_values
                .iter()
                .map(|value| format!("`{}`", value))
                .collect();
            text.push_str(&format!("\n\nAllowed values: {}", allowed.join(", ")));
        }
        if let Some(default) = &definition.default_value {
            text.push_str(&format!("\n\nDefault: `{}`", default));
        }
        if definition.required {
            text.push_str("\n\nRequired");
        }
        return Some(text);
    }
    None
}

fn type_summary(kind: &str, name: &str, description: Option<&str>) -> String {
    match description {
        Some(description) => format!("**{}** `{}`\n\n{}", kind, name, description),
        None => format!("**{}** `{}`", kind, name),
    }
}

/// Heading plus the declaration's most useful fields
pub fn element_summary(root: &Node, identity: &ElementIdentity) -> String {
    let heading = format!("**{}** `{}`", identity.category.display_name(), identity.name);
    let Some(declaration) = root.find_path(&identity.definition_path) else {
        return format!("{}\n\nNot declared in this blueprint", heading);
    };
    let field = |key: &str| declaration.child(key).and_then(Node::as_str);

    let mut lines = vec![heading];
    let detail_keys: &[(&str, &str)] = match identity.category {
        ElementCategory::Resource | ElementCategory::DataSource => &[("type", "Type")],
        ElementCategory::Variable => &[("type", "Type"), ("default", "Default")],
        ElementCategory::Value => &[("type", "Type")],
        ElementCategory::Child => &[("path", "Path")],
    };
    for (key, title) in detail_keys {
        if let Some(value) = field(key) {
            lines.push(format!("{}: `{}`", title, value));
        } else if let Some(node) = declaration.child(key) {
            if let Some(value) = scalar_text(node) {
                lines.push(format!("{}: `{}`", title, value));
            }
        }
    }
    if let Some(description) = field("description") {
        lines.push(description.to_string());
    }
    lines.join("\n\n")
}

fn scalar_text(node: &Node) -> Option<String> {
    match &node.payload {
        crate::ast::Payload::Scalar(scalar) => Some(scalar.to_string()),
        _ => None,
    }
}
