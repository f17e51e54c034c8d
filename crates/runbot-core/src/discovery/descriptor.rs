//! Build descriptor (`pom.xml`) profile extraction.

use super::ScanError;

/// Extract every profile id declared in a build descriptor.
///
/// Only an `<id>` that is a direct child of a `<profile>` element counts;
/// ids nested deeper (plugin executions, repositories) are ignored.
/// Returns an error when the document is not well-formed XML.
pub fn parse_profile_ids(xml: &str) -> Result<Vec<String>, ScanError> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| ScanError::Descriptor(e.to_string()))?;

    let ids = doc
        .descendants()
        .filter(|node| is_element(node, "profile"))
        .flat_map(|profile| profile.children().filter(|child| is_element(child, "id")))
        .map(|id| text_content(&id))
        .filter(|id| !id.is_empty())
        .collect();

    Ok(ids)
}

fn is_element(node: &roxmltree::Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name
}

/// Trimmed text of a node and everything below it, CDATA included.
fn text_content(node: &roxmltree::Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect::<String>()
        .trim()
        .to_string()
}
