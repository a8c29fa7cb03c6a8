use template::{Content, ContentEntry, TemplateConfig, TemplateFactory, TemplateResult};

/// Selector each message body is placed into.
pub const MESSAGE_SELECTOR: &str = "div";

/// Ordered message key → renderable template. Nothing renders until a factory is used.
#[derive(Clone, Debug)]
pub struct Messages {
    template: TemplateConfig,
    entries: Vec<(String, TemplateFactory)>,
}

impl Messages {
    /// `template` is the base every message is rendered into. Its shape is checked here.
    pub fn new(template: TemplateConfig) -> TemplateResult<Self> {
        TemplateFactory::new(template.clone())?;
        Ok(Self {
            template,
            entries: Vec::new(),
        })
    }

    /// Store `message` under `key`. An existing key keeps its position.
    pub fn set(&mut self, key: impl Into<String>, message: impl Into<ContentEntry>) -> TemplateResult<()> {
        let key = key.into();
        let mut config = self.template.clone();
        config.content = vec![(MESSAGE_SELECTOR.to_string(), message.into())];
        let factory = TemplateFactory::with_checked_template(config)?;
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = factory,
            None => self.entries.push((key, factory)),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&TemplateFactory> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn get_first(&self) -> Option<&TemplateFactory> {
        self.entries.first().map(|(_, f)| f)
    }

    /// Each entry's resolved content joined with `", "`, in insertion order.
    pub fn get_all_as_text_array(&self) -> TemplateResult<Vec<String>> {
        self.entries
            .iter()
            .map(|(_, factory)| {
                let parts: Vec<String> = factory.get_content()?.iter().map(Content::text).collect();
                Ok(parts.join(", "))
            })
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use template::{ShapeError, TemplateError};

    fn messages() -> Messages {
        Messages::new(TemplateConfig::default().with_template(r#"<div class="invalid-feedback"></div>"#))
            .expect("valid base template")
    }

    #[test]
    fn first_entry_is_the_earliest_key() {
        let mut m = messages();
        assert!(m.get_first().is_none());
        m.set("k", "v").expect("set");
        m.set("other", "w").expect("set");
        let first = m.get_first().expect("one entry");
        assert_eq!(first.get_content().expect("content"), [Content::Text("v".to_string())]);
    }

    #[test]
    fn overwriting_keeps_position_and_count() {
        let mut m = messages();
        m.set("a", "1").expect("set");
        m.set("b", "2").expect("set");
        assert_eq!(m.count(), 2);
        m.set("a", "3").expect("set");
        assert_eq!(m.count(), 2);
        assert_eq!(m.keys().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(m.get_all_as_text_array().expect("texts"), ["3", "2"]);
    }

    #[test]
    fn message_renders_into_the_base_template() {
        let mut m = messages();
        m.set("valueMissing", "Please fill out this field.").expect("set");
        let html = m.get("valueMissing").expect("present").get_html().expect("render");
        assert_eq!(html, r#"<div class="invalid-feedback">Please fill out this field.</div>"#);
        assert!(m.has("valueMissing"));
        assert!(!m.has("tooLong"));
    }

    #[test]
    fn clear_removes_every_entry() {
        let mut m = messages();
        m.set("a", "1").expect("set");
        m.clear();
        assert!(m.is_empty());
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn base_template_shape_is_checked_once() {
        let err = Messages::new(TemplateConfig::default().with_template("<p></p><p></p>"))
            .expect_err("two roots");
        assert!(matches!(err, TemplateError::Shape(ShapeError::RootCount { found: 2 })));
    }
}
