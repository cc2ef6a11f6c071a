//! Integration tests for namespace extensions
//!
//! Extensions are registered on a `Manager` per parent tag, then found while
//! walking documents whose elements carry foreign-namespace children and
//! attributes.

use feedspec::{
    walk, Cardinality, CheckerConfig, Depth, DepthWatcher, Element, ElementRule, ErrorChecker,
    ExtensionHandle, FlagRegistry, Flags, Manager, Name, ParentRef, ParserError, Step,
    TextAttribute, Visitor, VisitorRef,
};
use feedspec::token::{CharData, EndElement, StartElement};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const MEDIA: &str = "http://search.yahoo.com/mrss/";
const REVIEW: &str = "urn:example:review";

fn entry_rule() -> ElementRule {
    ElementRule::new("entry")
        .child(ElementRule::leaf("id"), Cardinality::ExistsAndUnique)
        .child(ElementRule::leaf("title"), Cardinality::Unique)
}

fn thumbnail() -> Name {
    Name::namespaced(MEDIA, "thumbnail")
}

fn rating() -> Name {
    Name::namespaced(REVIEW, "rating")
}

/// A hand-written extension visitor: a score from 0 to 5
struct Rating {
    depth: DepthWatcher,
    text: String,
    flag: Flags,
    parent: ParentRef,
}

impl Rating {
    fn score(&self) -> Option<u8> {
        self.text.trim().parse().ok()
    }
}

impl Visitor for Rating {
    fn process_start_element(&mut self, _start: &StartElement) -> Step {
        if self.depth.is_root() {
            self.text.clear();
        }
        self.depth.down();
        Step::stay()
    }

    fn process_end_element(&mut self, _end: &EndElement) -> Step {
        match self.depth.up() {
            Depth::Root => {
                let error = match self.score() {
                    Some(score) if score <= 5 => None,
                    _ => Some(ParserError::new(
                        self.flag,
                        format!("'{}' is not a rating", self.text.trim()),
                    )),
                };
                Step::leave().with_error(error)
            }
            _ => Step::stay(),
        }
    }

    fn process_char_data(&mut self, data: &CharData) -> Step {
        if self.depth.level() == 1 {
            self.text.push_str(&data.text);
        }
        Step::stay()
    }

    fn reset(&mut self) {
        self.depth.reset();
        self.text.clear();
    }

    fn parent(&self) -> Option<VisitorRef> {
        self.parent.upgrade()
    }
}

/// An extension that refuses its own subtree and records what reaches it
struct Opaque {
    decline: bool,
    seen: Vec<String>,
    parent: ParentRef,
}

impl Visitor for Opaque {
    fn process_start_element(&mut self, start: &StartElement) -> Step {
        self.seen.push(format!("<{}>", start.name.local));
        if self.decline {
            Step::leave()
        } else {
            Step::skip()
        }
    }

    fn process_end_element(&mut self, end: &EndElement) -> Step {
        self.seen.push(format!("</{}>", end.name.local));
        Step::leave()
    }

    fn process_char_data(&mut self, data: &CharData) -> Step {
        self.seen.push(data.text.clone());
        Step::stay()
    }

    fn reset(&mut self) {
        self.seen.clear();
    }

    fn parent(&self) -> Option<VisitorRef> {
        self.parent.upgrade()
    }
}

fn manager(registry: &mut FlagRegistry) -> Arc<Manager> {
    let rating_flag = registry.mint("rating").unwrap();

    let mut manager = Manager::new();
    manager
        .register_element_rule(
            "entry",
            thumbnail(),
            Cardinality::Unique,
            ElementRule::leaf("thumbnail")
                .attribute("url", Cardinality::ExistsAndUnique)
                .attribute("width", Cardinality::Optional),
        )
        .unwrap();
    manager
        .register_element("entry", rating(), Cardinality::Optional, move |parent, _| {
            ExtensionHandle::new(Rating {
                depth: DepthWatcher::new(),
                text: String::new(),
                flag: rating_flag,
                parent,
            })
        })
        .unwrap();
    manager
        .register_attribute(
            "entry",
            Name::namespaced(REVIEW, "lang"),
            Cardinality::Optional,
            || Box::new(TextAttribute::default()),
        )
        .unwrap();
    Arc::new(manager)
}

fn document(body: &str) -> String {
    format!(
        r#"<entry xmlns:media="{}" xmlns:r="{}" r:lang="en"><id>1</id>{}</entry>"#,
        MEDIA, REVIEW, body
    )
}

#[test]
fn test_extension_round_trip() {
    let manager = manager(&mut FlagRegistry::new());
    let root = Element::root(entry_rule(), Some(manager));
    let xml = document(
        r#"<media:thumbnail url="http://example.org/t.png" width="75"/><r:rating>4</r:rating>"#,
    );

    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let entry = root.borrow();
    let thumb = entry.extensions().element_as::<Element>(&thumbnail()).unwrap();
    assert_eq!(thumb.borrow().attribute("url"), Some("http://example.org/t.png"));
    assert_eq!(thumb.borrow().attribute("width"), Some("75"));

    let rating = entry.extensions().element_as::<Rating>(&rating()).unwrap();
    assert_eq!(rating.borrow().score(), Some(4));

    let lang = entry
        .extensions()
        .attribute_as::<TextAttribute>(&Name::namespaced(REVIEW, "lang"))
        .unwrap();
    assert_eq!(lang.value, "en");
}

#[test]
fn test_duplicated_unique_extension() {
    let manager = manager(&mut FlagRegistry::new());
    let xml = document(r#"<media:thumbnail url="a"/><media:thumbnail url="b"/>"#);

    let root = Element::root(entry_rule(), Some(Arc::clone(&manager)));
    let err = walk(xml.as_bytes(), root, &ErrorChecker::strict(), 8).unwrap_err();
    assert!(err.has(Flags::DUPLICATED));
    assert_eq!(
        err.to_string(),
        "in 'entry': {http://search.yahoo.com/mrss/}thumbnail should be unique"
    );

    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::lenient(), 8).unwrap();
    let entry = root.borrow();
    let group = entry.extensions().elements(&thumbnail()).unwrap();
    assert_eq!(group.len(), 2);
    let last = group[1].downcast::<Element>().unwrap();
    assert_eq!(last.borrow().attribute("url"), Some("b"));
}

#[test]
fn test_repeatable_extension_keeps_every_value() {
    let manager = manager(&mut FlagRegistry::new());
    let xml = document("<r:rating>1</r:rating><r:rating>5</r:rating>");
    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let entry = root.borrow();
    let scores: Vec<_> = entry
        .extensions()
        .elements(&rating())
        .unwrap()
        .iter()
        .map(|handle| handle.downcast::<Rating>().unwrap().borrow().score())
        .collect();
    assert_eq!(scores, [Some(1), Some(5)]);
}

#[test]
fn test_extension_errors_go_through_the_checker() {
    let mut registry = FlagRegistry::new();
    let manager = manager(&mut registry);
    let xml = document(r#"<media:thumbnail/>"#);

    let root = Element::root(entry_rule(), Some(Arc::clone(&manager)));
    let err = walk(xml.as_bytes(), root, &ErrorChecker::strict(), 8).unwrap_err();
    assert_eq!(err.to_string(), "in 'entry': in 'thumbnail': url should exist");

    let mut checker = ErrorChecker::strict();
    checker.disable("thumbnail", Flags::MISSING);
    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &checker, 8).unwrap();
    assert!(root.borrow().extensions().element(&thumbnail()).is_some());
}

#[test]
fn test_minted_flag_configured_by_name() {
    let mut registry = FlagRegistry::new();
    let manager = manager(&mut registry);
    let xml = document("<r:rating>eleven</r:rating>");

    let root = Element::root(entry_rule(), Some(Arc::clone(&manager)));
    let err = walk(xml.as_bytes(), root, &ErrorChecker::strict(), 8).unwrap_err();
    assert_eq!(err.flags(), registry.get("rating").unwrap());
    assert_eq!(registry.describe(err.flags()), ["rating"]);

    let config =
        CheckerConfig::from_json(r#"{"elements": {"rating": {"disable": ["rating"]}}}"#).unwrap();
    let checker = ErrorChecker::from_config(&config, &registry).unwrap();
    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &checker, 8).unwrap();

    let entry = root.borrow();
    let rating = entry.extensions().element_as::<Rating>(&rating()).unwrap();
    assert_eq!(rating.borrow().text, "eleven");
}

#[test]
fn test_unregistered_extension_is_skipped() {
    let manager = manager(&mut FlagRegistry::new());
    let xml = document(
        r#"<r:comment><id>2</id><media:thumbnail url="x"/></r:comment><title>t</title>"#,
    );
    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let entry = root.borrow();
    assert_eq!(entry.count("id"), 1);
    assert!(entry.extensions().element(&thumbnail()).is_none());
    assert_eq!(entry.child_text("title").as_deref(), Some("t"));
}

#[test]
fn test_extensions_are_bound_per_tag() {
    let manager = manager(&mut FlagRegistry::new());
    let rule = ElementRule::new("feed").child(entry_rule(), Cardinality::Optional);
    let xml = format!(
        r#"<feed xmlns:media="{}"><media:thumbnail url="feed-level"/>{}</feed>"#,
        MEDIA,
        document(r#"<media:thumbnail url="entry-level"/>"#)
    );

    let root = Element::root(rule, Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let feed = root.borrow();
    assert!(feed.extensions().is_empty());
    let entry = feed.child("entry").unwrap();
    let entry = entry.borrow();
    let thumb = entry.extensions().element_as::<Element>(&thumbnail()).unwrap();
    assert_eq!(thumb.borrow().attribute("url"), Some("entry-level"));
}

#[test]
fn test_snapshot_includes_extensions() {
    let manager = manager(&mut FlagRegistry::new());
    let xml = document(r#"<media:thumbnail url="u"/>"#);
    let root = Element::root(entry_rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let snapshot = root.borrow().snapshot();
    assert_eq!(snapshot.attributes["{urn:example:review}lang"], "en");
    let thumbs = &snapshot.extensions["{http://search.yahoo.com/mrss/}thumbnail"];
    assert_eq!(thumbs.len(), 1);
    assert_eq!(thumbs[0].attributes["url"], "u");
}

#[test]
fn test_same_name_element_and_attribute_are_counted_apart() {
    let thumb = Name::namespaced("urn:x", "thumb");
    let mut manager = Manager::new();
    manager
        .register_element_rule(
            "entry",
            thumb.clone(),
            Cardinality::Unique,
            ElementRule::leaf("thumb"),
        )
        .unwrap();
    manager
        .register_attribute("entry", thumb.clone(), Cardinality::Optional, || {
            Box::new(TextAttribute::default())
        })
        .unwrap();
    let manager = Arc::new(manager);
    let rule = || ElementRule::new("entry");

    let xml = r#"<entry xmlns:x="urn:x"><x:thumb/><x:thumb/></entry>"#;
    let root = Element::root(rule(), Some(Arc::clone(&manager)));
    let err = walk(xml.as_bytes(), root, &ErrorChecker::strict(), 8).unwrap_err();
    assert!(err.has(Flags::DUPLICATED));
    assert_eq!(err.to_string(), "in 'entry': {urn:x}thumb should be unique");

    let xml = r#"<entry xmlns:x="urn:x" x:thumb="small"><x:thumb/></entry>"#;
    let root = Element::root(rule(), Some(manager));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();
    let entry = root.borrow();
    assert_eq!(entry.extensions().elements(&thumb).unwrap().len(), 1);
    let value = entry.extensions().attribute_as::<TextAttribute>(&thumb).unwrap();
    assert_eq!(value.value, "small");
}

#[test]
fn test_extension_may_refuse_its_subtree() {
    let skipped = Name::namespaced("urn:x", "opaque");
    let declined = Name::namespaced("urn:x", "declined");
    let mut manager = Manager::new();
    for (name, decline) in [(skipped.clone(), false), (declined.clone(), true)] {
        manager
            .register_element("entry", name, Cardinality::Optional, move |parent, _| {
                ExtensionHandle::new(Opaque {
                    decline,
                    seen: Vec::new(),
                    parent,
                })
            })
            .unwrap();
    }
    let xml = concat!(
        r#"<entry xmlns:x="urn:x">"#,
        "<x:opaque><id>9</id></x:opaque>",
        "<x:declined><id>8</id></x:declined>",
        "<id>1</id></entry>"
    );

    let root = Element::root(entry_rule(), Some(Arc::new(manager)));
    walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8).unwrap();

    let entry = root.borrow();
    assert_eq!(entry.count("id"), 1);
    assert_eq!(entry.child_text("id").as_deref(), Some("1"));
    let opaque = entry.extensions().element_as::<Opaque>(&skipped).unwrap();
    assert_eq!(opaque.borrow().seen, ["<opaque>"]);
    let declined = entry.extensions().element_as::<Opaque>(&declined).unwrap();
    assert_eq!(declined.borrow().seen, ["<declined>"]);
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn test_manager_is_shared_across_threads() {
    assert_send_sync::<Manager>();
    assert_send_sync::<Arc<Manager>>();

    let manager = manager(&mut FlagRegistry::new());
    let walks: Vec<_> = [2u8, 7]
        .into_iter()
        .map(|score| {
            let manager = Arc::clone(&manager);
            std::thread::spawn(move || -> Result<Option<u8>, ParserError> {
                let root = Element::root(entry_rule(), Some(manager));
                let xml = document(&format!("<r:rating>{}</r:rating>", score));
                walk(xml.as_bytes(), root.clone(), &ErrorChecker::strict(), 8)?;
                let entry = root.borrow();
                let rating = entry.extensions().element_as::<Rating>(&rating()).unwrap();
                let score = rating.borrow().score();
                Ok(score)
            })
        })
        .collect();

    let results: Vec<_> = walks.into_iter().map(|walk| walk.join().unwrap()).collect();
    assert_eq!(results[0], Ok(Some(2)));
    assert_eq!(
        results[1].as_ref().unwrap_err().to_string(),
        "in 'entry': in 'rating': '7' is not a rating"
    );
}
