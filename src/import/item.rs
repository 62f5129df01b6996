//! Uniform field access over a captured export node

use super::reader::XmlNode;

/// Read-only view over one export record
///
/// Parsers only see this interface, never the node representation.
/// Missing fields read as absent, never as errors.
#[derive(Debug, Clone, Copy)]
pub struct Item<'a> {
    node: &'a XmlNode,
}

impl<'a> Item<'a> {
    pub fn new(node: &'a XmlNode) -> Self {
        Self { node }
    }

    /// Tag name of the wrapped record
    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    /// Text content of the record itself
    pub fn text(&self) -> &'a str {
        &self.node.text
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.node
            .attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text of the first sub-field with this name
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.node
            .children
            .iter()
            .find(|child| child.name == name)
            .map(|child| child.text.as_str())
    }

    /// Trimmed text of the first sub-field, treating blank as absent
    pub fn field_trimmed(&self, name: &str) -> Option<&'a str> {
        self.field(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// Texts of every occurrence of a repeated sub-field, in source order
    pub fn fields(&self, name: &str) -> Vec<&'a str> {
        self.children(name).map(|child| child.text()).collect()
    }

    /// Every nested record with this name, in source order
    pub fn children<'n>(&self, name: &'n str) -> impl Iterator<Item = Item<'a>> + 'n
    where
        'a: 'n,
    {
        let node = self.node;
        node.children
            .iter()
            .filter(move |child| child.name == name)
            .map(Item::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, text: &str) -> XmlNode {
        let mut node = XmlNode::new(name);
        node.text = text.to_string();
        node
    }

    fn sample() -> XmlNode {
        let mut meta_a = XmlNode::new("wp:postmeta");
        meta_a.children.push(leaf("wp:meta_key", "color"));
        meta_a.children.push(leaf("wp:meta_value", "red"));
        let mut meta_b = XmlNode::new("wp:postmeta");
        meta_b.children.push(leaf("wp:meta_key", "color"));
        meta_b.children.push(leaf("wp:meta_value", "blue"));

        let mut category = leaf("category", "News");
        category.attributes.push(("domain".into(), "category".into()));

        let mut item = XmlNode::new("item");
        item.children.push(leaf("title", "Hello"));
        item.children.push(leaf("wp:post_id", "  12 "));
        item.children.push(leaf("wp:post_password", "   "));
        item.children.push(meta_a);
        item.children.push(category);
        item.children.push(meta_b);
        item
    }

    #[test]
    fn test_single_field_access() {
        let node = sample();
        let item = Item::new(&node);

        assert_eq!(item.name(), "item");
        assert_eq!(item.field("title"), Some("Hello"));
        assert_eq!(item.field_trimmed("wp:post_id"), Some("12"));
        assert_eq!(item.field_trimmed("wp:post_password"), None);
        assert_eq!(item.field("missing"), None);
    }

    #[test]
    fn test_repeated_children_keep_source_order() {
        let node = sample();
        let item = Item::new(&node);

        let values: Vec<_> = item
            .children("wp:postmeta")
            .filter_map(|meta| meta.field("wp:meta_value"))
            .collect();
        assert_eq!(values, vec!["red", "blue"]);
        assert_eq!(item.fields("category"), vec!["News"]);
        assert!(item.fields("wp:comment").is_empty());
    }

    #[test]
    fn test_attribute_access() {
        let node = sample();
        let item = Item::new(&node);
        let category = item.children("category").next().unwrap();

        assert_eq!(category.attr("domain"), Some("category"));
        assert_eq!(category.attr("term_id"), None);
        assert_eq!(category.text(), "News");
    }
}
