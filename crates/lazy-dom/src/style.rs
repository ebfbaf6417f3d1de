//! Inline style declarations (`element.style`)

/// Ordered `property: value` list backing the `style` attribute
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    properties: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `a: b; c: d`
    pub fn parse(css_text: &str) -> Self {
        let mut style = Self::new();
        for decl in css_text.split(';') {
            if let Some((name, value)) = decl.split_once(':') {
                let name = name.trim();
                let value = value.trim();
                if !name.is_empty() && !value.is_empty() {
                    style.set_property(name, value);
                }
            }
        }
        style
    }

    pub fn get_property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_property(&mut self, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.properties.push((name, value.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Serialize back to attribute form
    pub fn css_text(&self) -> String {
        self.properties
            .iter()
            .map(|(n, v)| format!("{}: {};", n, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize() {
        let style = InlineStyle::parse("opacity: 0.7; transition: opacity 0.3s ease;;");
        assert_eq!(style.get_property("opacity"), Some("0.7"));
        assert_eq!(style.get_property("transition"), Some("opacity 0.3s ease"));
        assert_eq!(style.css_text(), "opacity: 0.7; transition: opacity 0.3s ease;");
    }

    #[test]
    fn test_set_overwrites() {
        let mut style = InlineStyle::new();
        style.set_property("Opacity", "0.7");
        style.set_property("opacity", "1");
        assert_eq!(style.get_property("opacity"), Some("1"));
        assert_eq!(style.css_text(), "opacity: 1;");
    }
}
