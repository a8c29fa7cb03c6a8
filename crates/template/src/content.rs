use crate::error::ShapeError;
use crate::factory::TemplateFactory;
use html::Node;
use std::fmt;
use std::rc::Rc;

/// Upper bound on chained deferred entries before resolution gives up.
pub const MAX_DEFERRED_STEPS: usize = 8;

pub type DeferredFn = Rc<dyn Fn(&TemplateFactory) -> ContentEntry>;

/// What a content selector should receive.
#[derive(Clone)]
pub enum ContentEntry {
    Text(String),
    /// A caller-built node. Only read or copied, never consumed.
    Element(Node),
    /// Produced on demand from the rendering factory.
    Deferred(DeferredFn),
    /// Removes the target from the template.
    Empty,
}

/// A settled, non-empty content entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Text(String),
    Element(Node),
}

impl Content {
    /// Text form used by message listings: the string itself or the node's text.
    pub fn text(&self) -> String {
        match self {
            Content::Text(text) => text.clone(),
            Content::Element(node) => html::text_content(node),
        }
    }
}

impl ContentEntry {
    pub fn deferred(f: impl Fn(&TemplateFactory) -> ContentEntry + 'static) -> Self {
        ContentEntry::Deferred(Rc::new(f))
    }

    fn settle(self) -> Option<Content> {
        match self {
            ContentEntry::Text(text) if text.is_empty() => None,
            ContentEntry::Text(text) => Some(Content::Text(text)),
            ContentEntry::Element(node) => Some(Content::Element(node)),
            ContentEntry::Empty | ContentEntry::Deferred(_) => None,
        }
    }

    /// Follow deferred entries until a value settles. `Ok(None)` means "remove".
    pub fn resolve(&self, factory: &TemplateFactory) -> Result<Option<Content>, ShapeError> {
        let mut next = match self {
            ContentEntry::Deferred(f) => f(factory),
            settled => return Ok(settled.clone().settle()),
        };
        for _ in 1..MAX_DEFERRED_STEPS {
            next = match next {
                ContentEntry::Deferred(f) => f(factory),
                settled => return Ok(settled.settle()),
            };
        }
        match next {
            ContentEntry::Deferred(_) => Err(ShapeError::DeferredTooDeep {
                limit: MAX_DEFERRED_STEPS,
            }),
            settled => Ok(settled.settle()),
        }
    }
}

impl fmt::Debug for ContentEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentEntry::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ContentEntry::Element(node) => f.debug_tuple("Element").field(node).finish(),
            ContentEntry::Deferred(_) => f.write_str("Deferred(..)"),
            ContentEntry::Empty => f.write_str("Empty"),
        }
    }
}

impl From<&str> for ContentEntry {
    fn from(text: &str) -> Self {
        ContentEntry::Text(text.to_string())
    }
}

impl From<String> for ContentEntry {
    fn from(text: String) -> Self {
        ContentEntry::Text(text)
    }
}

impl From<Node> for ContentEntry {
    fn from(node: Node) -> Self {
        ContentEntry::Element(node)
    }
}

impl<T: Into<ContentEntry>> From<Option<T>> for ContentEntry {
    fn from(value: Option<T>) -> Self {
        value.map_or(ContentEntry::Empty, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TemplateConfig;
    use std::cell::Cell;

    fn factory() -> TemplateFactory {
        TemplateFactory::new(TemplateConfig::default()).expect("default config is valid")
    }

    #[test]
    fn empty_text_and_none_settle_to_removal() {
        let f = factory();
        assert_eq!(ContentEntry::from("").resolve(&f), Ok(None));
        assert_eq!(ContentEntry::from(None::<&str>).resolve(&f), Ok(None));
        assert_eq!(
            ContentEntry::from("x").resolve(&f),
            Ok(Some(Content::Text("x".to_string())))
        );
    }

    #[test]
    fn deferred_chains_resolve_with_the_factory() {
        let f = factory();
        let entry = ContentEntry::deferred(|factory| {
            let html = factory.config().html;
            ContentEntry::deferred(move |_| format!("html={html}").into())
        });
        assert_eq!(
            entry.resolve(&f),
            Ok(Some(Content::Text("html=false".to_string())))
        );
    }

    #[test]
    fn self_referencing_entries_hit_the_step_limit() {
        fn forever() -> ContentEntry {
            ContentEntry::deferred(|_| forever())
        }
        assert_eq!(
            forever().resolve(&factory()),
            Err(ShapeError::DeferredTooDeep {
                limit: MAX_DEFERRED_STEPS
            })
        );
    }

    #[test]
    fn chain_of_exactly_the_limit_settles() {
        let calls = Rc::new(Cell::new(0));
        fn chain(left: usize, calls: Rc<Cell<usize>>) -> ContentEntry {
            ContentEntry::deferred(move |_| {
                calls.set(calls.get() + 1);
                if left == 1 {
                    "done".into()
                } else {
                    chain(left - 1, calls.clone())
                }
            })
        }
        let entry = chain(MAX_DEFERRED_STEPS, calls.clone());
        assert_eq!(
            entry.resolve(&factory()),
            Ok(Some(Content::Text("done".to_string())))
        );
        assert_eq!(calls.get(), MAX_DEFERRED_STEPS);
    }
}
