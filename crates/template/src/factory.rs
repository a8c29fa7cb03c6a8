use crate::append::AppendTarget;
use crate::config::{TemplateConfig, set_entry};
use crate::content::{Content, ContentEntry};
use crate::error::{ShapeError, TemplateResult};
use crate::typecheck::Options;
use html::dom_utils::{add_classes, set_text_content};
use html::select::{find_one_path, node_at_mut};
use html::{Node, Selector, parse_fragment, text_content, to_html};

/// Renders a markup skeleton populated with content. Every render starts from a fresh
/// parse of the template, so renders never observe each other.
#[derive(Clone, Debug)]
pub struct TemplateFactory {
    config: TemplateConfig,
}

impl TemplateFactory {
    /// Validates content selectors and the template shape up front.
    pub fn new(config: TemplateConfig) -> TemplateResult<Self> {
        let factory = Self { config };
        for (selector, _) in &factory.config.content {
            Selector::parse(selector)?;
        }
        factory.parse_template()?;
        Ok(factory)
    }

    /// Like [`TemplateFactory::new`] without parsing the template. For callers that
    /// already checked `config.template` and build many factories from it; a bad
    /// template then surfaces on first render.
    pub fn with_checked_template(config: TemplateConfig) -> TemplateResult<Self> {
        for (selector, _) in &config.content {
            Selector::parse(selector)?;
        }
        Ok(Self { config })
    }

    pub fn from_options(options: &Options) -> TemplateResult<Self> {
        Self::new(TemplateConfig::from_options(options)?)
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Resolved, non-empty entries in content order. Entries are not sanitized.
    pub fn get_content(&self) -> TemplateResult<Vec<Content>> {
        let mut out = Vec::with_capacity(self.config.content.len());
        for (_, entry) in &self.config.content {
            if let Some(content) = entry.resolve(self)? {
                out.push(content);
            }
        }
        Ok(out)
    }

    pub fn has_content(&self) -> TemplateResult<bool> {
        Ok(!self.get_content()?.is_empty())
    }

    /// Replace the content mapping. On error the previous mapping is kept.
    pub fn change_content<S, E>(&mut self, content: impl IntoIterator<Item = (S, E)>) -> TemplateResult<&mut Self>
    where
        S: Into<String>,
        E: Into<ContentEntry>,
    {
        let mut next = Vec::new();
        for (selector, entry) in content {
            let selector = selector.into();
            Selector::parse(&selector)?;
            set_entry(&mut next, selector, entry.into());
        }
        self.config.content = next;
        Ok(self)
    }

    pub fn to_html(&self) -> TemplateResult<Node> {
        // The wrapper makes the root itself a candidate target.
        let mut wrapper = Node::element("div", Vec::new(), vec![self.parse_template()?]);

        for (selector, entry) in &self.config.content {
            let selector = Selector::parse(selector)?;
            let Some(path) = find_one_path(&wrapper, &selector) else {
                log::trace!(target: "template", "no target for '{}'", selector.as_str());
                continue;
            };
            match entry.resolve(self)? {
                None => remove_at(&mut wrapper, &path),
                Some(content) => {
                    if let Some(target) = node_at_mut(&mut wrapper, &path) {
                        self.put_content(target, content);
                    }
                }
            }
        }

        let Some(mut root) = into_children(wrapper).into_iter().next() else {
            return Err(ShapeError::RootCount { found: 0 }.into());
        };
        let extra_class = self.config.extra_class.resolve(self);
        add_classes(&mut root, extra_class.split_whitespace());
        Ok(root)
    }

    /// Outer HTML of a fresh render.
    pub fn get_html(&self) -> TemplateResult<String> {
        Ok(to_html(&self.to_html()?))
    }

    /// Render and hand the node to `target`.
    pub fn append(&self, target: &mut dyn AppendTarget) -> TemplateResult<()> {
        target.append_node(self.to_html()?);
        Ok(())
    }

    fn markup_nodes(&self, markup: &str) -> Vec<Node> {
        if !self.config.sanitize {
            return parse_fragment(markup);
        }
        sanitizer::sanitize_fragment(
            markup,
            &self.config.allow_list,
            self.config.sanitize_fn.as_deref(),
        )
    }

    fn parse_template(&self) -> TemplateResult<Node> {
        let mut elements = self
            .markup_nodes(&self.config.template)
            .into_iter()
            .filter(|n| matches!(n, Node::Element { .. }));
        match (elements.next(), elements.next()) {
            (Some(root), None) => Ok(root),
            (first, second) => {
                let found =
                    usize::from(first.is_some()) + usize::from(second.is_some()) + elements.count();
                Err(ShapeError::RootCount { found }.into())
            }
        }
    }

    fn put_content(&self, target: &mut Node, content: Content) {
        match content {
            Content::Element(node) if !self.config.html => {
                set_text_content(target, &text_content(&node));
            }
            Content::Element(node) => {
                if *target == node || target.children() == std::slice::from_ref(&node) {
                    return;
                }
                if let Some(children) = target.children_mut() {
                    children.clear();
                    children.push(node);
                }
            }
            Content::Text(markup) if self.config.html => {
                let nodes = self.markup_nodes(&markup);
                if let Some(children) = target.children_mut() {
                    *children = nodes;
                }
            }
            Content::Text(text) => set_text_content(target, &text),
        }
    }
}

fn remove_at(scope: &mut Node, path: &[usize]) {
    let Some((last, parent)) = path.split_last() else {
        return;
    };
    if let Some(children) = node_at_mut(scope, parent).and_then(Node::children_mut)
        && *last < children.len()
    {
        children.remove(*last);
    }
}

fn into_children(node: Node) -> Vec<Node> {
    match node {
        Node::Element { children, .. } | Node::Document { children, .. } => children,
        Node::Text { .. } | Node::Comment { .. } => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use html::SelectorError;
    use pretty_assertions::assert_eq;

    fn render(config: TemplateConfig) -> String {
        TemplateFactory::new(config)
            .and_then(|f| f.get_html())
            .expect("render succeeds")
    }

    fn span_template() -> TemplateConfig {
        TemplateConfig::default().with_template(r#"<div><span class="a"></span></div>"#)
    }

    #[test]
    fn plain_text_content_is_never_interpreted() {
        let factory = TemplateFactory::new(span_template().with_content(".a", "<b>hello</b>"))
            .expect("valid config");
        let root = factory.to_html().expect("render");
        let selector = Selector::parse(".a").expect("selector");
        let target = html::find_one(&root, &selector).expect("target present");
        assert_eq!(target.children(), &[Node::text("<b>hello</b>")]);
        assert_eq!(
            factory.get_html().expect("render"),
            r#"<div><span class="a">&lt;b&gt;hello&lt;/b&gt;</span></div>"#
        );
    }

    #[test]
    fn html_content_is_sanitized_before_insertion() {
        let out = render(
            span_template()
                .with_html(true)
                .with_content(".a", r#"<b onclick="x()">hi</b><script>1</script>"#),
        );
        assert_eq!(out, r#"<div><span class="a"><b>hi</b></span></div>"#);
    }

    #[test]
    fn html_content_is_kept_verbatim_without_sanitizing() {
        let out = render(
            span_template()
                .with_html(true)
                .with_sanitize(false)
                .with_content(".a", r#"<i onclick="x()">hi</i>"#),
        );
        assert_eq!(out, r#"<div><span class="a"><i onclick="x()">hi</i></span></div>"#);
    }

    #[test]
    fn custom_sanitize_fn_decides_attributes() {
        let out = render(
            span_template()
                .with_html(true)
                .with_sanitize_fn(|_, attr, _| attr == "onclick" || attr == "class")
                .with_content(".a", r#"<b onclick="x()" title="t">hi</b>"#),
        );
        assert_eq!(out, r#"<div><span class="a"><b onclick="x()">hi</b></span></div>"#);
    }

    #[test]
    fn empty_entry_removes_its_target() {
        assert_eq!(render(span_template().with_content(".a", ContentEntry::Empty)), "<div></div>");
        assert_eq!(render(span_template().with_content(".a", "")), "<div></div>");
    }

    #[test]
    fn deferred_extra_class_is_unioned_into_root_classes() {
        let out = render(
            TemplateConfig::default()
                .with_template(r#"<div class="tip x"></div>"#)
                .with_deferred_extra_class(|_| "x  y".to_string()),
        );
        assert_eq!(out, r#"<div class="tip x y"></div>"#);
    }

    #[test]
    fn template_must_have_exactly_one_root() {
        for (template, found) in [("<p></p><p></p>", 2), ("", 0), ("just text", 0)] {
            let err = TemplateFactory::new(TemplateConfig::default().with_template(template))
                .expect_err("bad shape");
            assert!(
                matches!(err, TemplateError::Shape(ShapeError::RootCount { found: f }) if f == found),
                "{template:?}: {err}"
            );
        }
        let padded = render(TemplateConfig::default().with_template(" <p></p>\n<!-- note -->"));
        assert_eq!(padded, "<p></p>");
    }

    #[test]
    fn template_markup_is_sanitized() {
        let out = render(TemplateConfig::default().with_template(r#"<div onclick="x()"><span></span></div>"#));
        assert_eq!(out, "<div><span></span></div>");
    }

    #[test]
    fn root_itself_can_be_targeted() {
        let out = render(
            TemplateConfig::default()
                .with_template(r#"<div class="a"></div>"#)
                .with_content("div", "t"),
        );
        assert_eq!(out, r#"<div class="a">t</div>"#);

        let factory = TemplateFactory::new(TemplateConfig::default().with_content("div", ContentEntry::Empty))
            .expect("valid config");
        assert!(matches!(
            factory.to_html(),
            Err(TemplateError::Shape(ShapeError::RootCount { found: 0 }))
        ));
    }

    #[test]
    fn missing_target_is_skipped() {
        assert_eq!(
            render(span_template().with_content(".missing", "x")),
            r#"<div><span class="a"></span></div>"#
        );
    }

    #[test]
    fn element_content_copies_text_unless_html() {
        let bold = Node::element("b", Vec::new(), vec![Node::text("bold")]);
        assert_eq!(
            render(span_template().with_content(".a", bold.clone())),
            r#"<div><span class="a">bold</span></div>"#
        );
        assert_eq!(
            render(span_template().with_html(true).with_content(".a", bold)),
            r#"<div><span class="a"><b>bold</b></span></div>"#
        );
    }

    #[test]
    fn element_identical_to_target_is_left_alone() {
        let same = parse_fragment(r#"<span class="a">keep</span>"#).remove(0);
        let out = render(
            TemplateConfig::default()
                .with_template(r#"<div><span class="a">keep</span></div>"#)
                .with_html(true)
                .with_content(".a", same),
        );
        assert_eq!(out, r#"<div><span class="a">keep</span></div>"#);
    }

    #[test]
    fn checked_template_constructor_defers_the_shape_check_to_render() {
        let factory = TemplateFactory::with_checked_template(span_template().with_content(".a", "ok"))
            .expect("valid selectors");
        assert_eq!(factory.get_html().expect("render"), r#"<div><span class="a">ok</span></div>"#);

        let two_roots = TemplateConfig::default().with_template("<p></p><p></p>");
        let factory = TemplateFactory::with_checked_template(two_roots).expect("template not parsed yet");
        assert!(matches!(
            factory.to_html(),
            Err(TemplateError::Shape(ShapeError::RootCount { found: 2 }))
        ));

        let err = TemplateFactory::with_checked_template(span_template().with_content("[a", "x"))
            .expect_err("selectors are still checked");
        assert!(matches!(err, TemplateError::InvalidSelector(_)));
    }

    #[test]
    fn invalid_selectors_are_rejected() {
        let err = TemplateFactory::new(span_template().with_content("[a", "x")).expect_err("bad selector");
        assert!(matches!(err, TemplateError::InvalidSelector(SelectorError::Unterminated { .. })));

        let mut factory = TemplateFactory::new(span_template().with_content(".a", "x")).expect("valid");
        assert!(factory.change_content([(">>", "y")]).is_err());
        assert_eq!(factory.config().content.len(), 1);
    }

    #[test]
    fn change_content_rerenders_from_scratch() {
        let mut factory = TemplateFactory::new(span_template().with_content(".a", "one")).expect("valid");
        let first = factory.to_html().expect("render");
        factory.change_content([(".a", "two")]).expect("valid selector");
        let second = factory.get_html().expect("render");
        assert_eq!(html::text_content(&first), "one");
        assert_eq!(second, r#"<div><span class="a">two</span></div>"#);
    }

    #[test]
    fn get_content_resolves_and_drops_empty_entries() {
        let mut factory = TemplateFactory::new(TemplateConfig::default()).expect("valid");
        factory
            .change_content([
                ("a", ContentEntry::from("x")),
                ("b", ContentEntry::Empty),
                ("c", ContentEntry::deferred(|_| "y".into())),
                ("d", ContentEntry::from("")),
            ])
            .expect("valid selectors");
        assert_eq!(
            factory.get_content().expect("resolves"),
            vec![Content::Text("x".to_string()), Content::Text("y".to_string())]
        );
        assert!(factory.has_content().expect("resolves"));

        factory.change_content([("a", ContentEntry::Empty)]).expect("valid");
        assert!(!factory.has_content().expect("resolves"));
    }

    #[test]
    fn append_hands_the_render_to_the_target() {
        let factory = TemplateFactory::new(span_template().with_content(".a", "x")).expect("valid");
        let mut sink: Vec<Node> = Vec::new();
        factory.append(&mut sink).expect("render");
        factory.append(&mut sink).expect("render");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink[0], sink[1]);

        let mut parent = Node::element("section", Vec::new(), Vec::new());
        factory.append(&mut parent).expect("render");
        assert_eq!(to_html(&parent), r#"<section><div><span class="a">x</span></div></section>"#);
    }
}
