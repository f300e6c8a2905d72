// 📖 Document Reader - structural pass of a load
//
// Streams through the XML once. Element and attribute names are matched
// against the accessor of the object currently being read; child objects are
// created through their child slots. Reference attributes only store their
// identifier here, and the owning object is noted in PendingReferences for
// the resolution pass.
//
// Failure policy:
// - broken container syntax        → ReadError, nothing is returned
// - unconvertible scalar           → LoadIssue::TypeConversion, field keeps default
// - unknown attribute or element   → skipped (debug log only)

use crate::accessor::{AttributeKind, ChildKey, Descriptor, SerializationAccessor};
use crate::config::ReaderConfig;
use crate::error::{LoadIssue, LoadReport, ReadError};
use crate::resolve::{resolve_references, PendingReferences, Registry, ResolutionSummary};
use crate::serializable::{ObjectPath, Serializable};
use crate::value::Value;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader as XmlReader;
use std::fmt::Display;
use std::ops::ControlFlow;
use tracing::{debug, warn};

/// Progress sink: receives the fraction of input consumed (0.0..=1.0).
/// Returning `ControlFlow::Break` cancels the read.
pub type ProgressHook<'p> = Box<dyn FnMut(f64) -> ControlFlow<()> + 'p>;

// ============================================================================
// PARSE RESULT
// ============================================================================

/// Outcome of the structural pass: the object, the deferred references and
/// the issues met so far.
#[derive(Debug)]
pub struct Parsed<T> {
    pub object: T,
    pub pending: PendingReferences,
    pub report: LoadReport,
}

impl<T: Serializable> Parsed<T> {
    /// Run the resolution pass against `registry`. Misses are added to the
    /// report.
    pub fn resolve_with(&mut self, registry: &dyn Registry) -> ResolutionSummary {
        resolve_references(&mut self.object, &self.pending, registry, &mut self.report)
    }

    pub fn into_parts(self) -> (T, LoadReport) {
        (self.object, self.report)
    }
}

// ============================================================================
// READER
// ============================================================================

pub struct DocumentReader<'p> {
    config: ReaderConfig,
    progress: Option<ProgressHook<'p>>,
}

impl Default for DocumentReader<'_> {
    fn default() -> Self {
        DocumentReader::new(ReaderConfig::default())
    }
}

impl<'p> DocumentReader<'p> {
    pub fn new(config: ReaderConfig) -> Self {
        DocumentReader {
            config,
            progress: None,
        }
    }

    pub fn with_progress<F>(mut self, hook: F) -> Self
    where
        F: FnMut(f64) -> ControlFlow<()> + 'p,
    {
        self.progress = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    /// Read a document whose root element is `root_tag` into `root`.
    pub fn read_into(
        &mut self,
        input: &str,
        root_tag: &str,
        root: &mut dyn Serializable,
    ) -> Result<(PendingReferences, LoadReport), ReadError> {
        let progress = Progress::new(
            self.progress.take(),
            input.len(),
            self.config.progress_granules,
        );
        let mut state = ReadState::new(input, progress);
        let result = state.read_document(root_tag, root);
        self.progress = state.progress.hook.take();
        result?;

        debug!(
            root = root_tag,
            pending = state.pending.len(),
            issues = state.report.len(),
            "structural pass done"
        );
        Ok((state.pending, state.report))
    }

    /// Read into a fresh `T::default()`.
    pub fn read<T: Serializable + Default>(
        &mut self,
        input: &str,
        root_tag: &str,
    ) -> Result<Parsed<T>, ReadError> {
        let mut object = T::default();
        let (pending, report) = self.read_into(input, root_tag, &mut object)?;
        Ok(Parsed {
            object,
            pending,
            report,
        })
    }
}

// ============================================================================
// PROGRESS
// ============================================================================

/// Fires the hook at most once per granule of input.
struct Progress<'p> {
    hook: Option<ProgressHook<'p>>,
    total: usize,
    delta: usize,
    last: usize,
}

impl<'p> Progress<'p> {
    fn new(hook: Option<ProgressHook<'p>>, total: usize, granules: u32) -> Self {
        let delta = if granules == 0 {
            0
        } else {
            total / granules as usize + 1
        };
        Progress {
            hook,
            total,
            delta,
            last: 0,
        }
    }

    fn advance(&mut self, position: usize) -> Result<(), ReadError> {
        let crossed = self.delta > 0 && self.last / self.delta < position / self.delta;
        self.last = self.last.max(position);
        if !crossed {
            return Ok(());
        }
        let Some(hook) = self.hook.as_mut() else {
            return Ok(());
        };
        let fraction = (position as f64 / self.total.max(1) as f64).min(1.0);
        match hook(fraction) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(ReadError::Cancelled { fraction }),
        }
    }
}

// ============================================================================
// STREAM STATE
// ============================================================================

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

struct ReadState<'i, 'p> {
    xml: XmlReader<&'i [u8]>,
    progress: Progress<'p>,
    pending: PendingReferences,
    report: LoadReport,
}

impl<'i, 'p> ReadState<'i, 'p> {
    fn new(input: &'i str, progress: Progress<'p>) -> Self {
        let mut xml = XmlReader::from_str(input);
        // End tags are checked here, to report them as MismatchedEnd
        xml.check_end_names(false);
        ReadState {
            xml,
            progress,
            pending: PendingReferences::new(),
            report: LoadReport::new(),
        }
    }

    fn syntax(&self, err: impl Display) -> ReadError {
        ReadError::Syntax {
            position: self.xml.buffer_position(),
            message: err.to_string(),
        }
    }

    fn raw_event(&mut self) -> Result<Event<'i>, ReadError> {
        let event = self.xml.read_event().map_err(|e| self.syntax(e))?;
        self.progress.advance(self.xml.buffer_position())?;
        Ok(event)
    }

    /// Next event that carries structure: comments, declarations,
    /// processing instructions and blank text are dropped.
    fn next_event(&mut self) -> Result<Event<'i>, ReadError> {
        loop {
            match self.raw_event()? {
                Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(text) if text.iter().all(|b| b.is_ascii_whitespace()) => {}
                event => return Ok(event),
            }
        }
    }

    fn read_document(&mut self, root_tag: &str, root: &mut dyn Serializable) -> Result<(), ReadError> {
        let mut path = ObjectPath::root();
        let (start, empty) = match self.next_event()? {
            Event::Start(start) => (start, false),
            Event::Empty(start) => (start, true),
            Event::Eof => {
                return Err(ReadError::MissingRoot {
                    expected: root_tag.to_string(),
                })
            }
            Event::End(end) => {
                return Err(ReadError::MismatchedEnd {
                    expected: root_tag.to_string(),
                    found: element_name(end.name().as_ref()),
                })
            }
            _ => return Err(self.syntax("text outside the root element")),
        };

        let found = element_name(start.name().as_ref());
        if found != root_tag {
            return Err(ReadError::UnexpectedRoot {
                expected: root_tag.to_string(),
                found,
            });
        }
        self.read_object(root, &start, empty, &mut path)?;

        match self.next_event()? {
            Event::Eof => Ok(()),
            _ => Err(ReadError::TrailingContent {
                position: self.xml.buffer_position(),
            }),
        }
    }

    /// Read the element opened by `start` into `object`, up to and
    /// including its end tag.
    fn read_object(
        &mut self,
        object: &mut dyn Serializable,
        start: &BytesStart<'_>,
        empty: bool,
        path: &mut ObjectPath,
    ) -> Result<(), ReadError> {
        let element = element_name(start.name().as_ref());
        object.prepare_read();
        {
            let mut accessor = object.serialization_accessor();

            for attr in start.attributes() {
                let attr = attr.map_err(|e| self.syntax(e))?;
                let name = element_name(attr.key.as_ref());
                let text = attr.unescape_value().map_err(|e| self.syntax(e))?;
                match accessor.find_mut(&name) {
                    Some(descriptor) if descriptor.kind() == AttributeKind::Scalar => {
                        self.assign(descriptor, &element, &text, path);
                    }
                    _ => debug!(element = %element, attribute = %name, "skipping unknown attribute"),
                }
            }

            if !empty {
                self.read_content(&mut accessor, &element, path)?;
            }
            for descriptor in accessor.descriptors_mut() {
                if let Some(children) = descriptor.children_mut() {
                    children.finished_read();
                }
            }
        }
        object.finished_read();
        Ok(())
    }

    fn read_content(
        &mut self,
        accessor: &mut SerializationAccessor<'_>,
        element: &str,
        path: &mut ObjectPath,
    ) -> Result<(), ReadError> {
        loop {
            match self.next_event()? {
                Event::Start(start) => self.read_member(accessor, element, &start, false, path)?,
                Event::Empty(start) => self.read_member(accessor, element, &start, true, path)?,
                Event::End(end) => {
                    let found = element_name(end.name().as_ref());
                    if found != element {
                        return Err(ReadError::MismatchedEnd {
                            expected: element.to_string(),
                            found,
                        });
                    }
                    return Ok(());
                }
                Event::Eof => {
                    return Err(ReadError::Truncated {
                        element: element.to_string(),
                    })
                }
                _ => debug!(element, "skipping stray text"),
            }
        }
    }

    /// One nested element of the current object.
    fn read_member(
        &mut self,
        accessor: &mut SerializationAccessor<'_>,
        parent: &str,
        start: &BytesStart<'_>,
        empty: bool,
        path: &mut ObjectPath,
    ) -> Result<(), ReadError> {
        let name = element_name(start.name().as_ref());
        let Some(descriptor) = accessor.find_mut(&name) else {
            debug!(element = parent, child = %name, "skipping unknown element");
            return self.skip_unless_empty(&name, empty);
        };

        match descriptor.kind() {
            AttributeKind::Scalar => {
                let text = if empty { String::new() } else { self.read_text(&name)? };
                self.assign(descriptor, parent, &text, path);
            }
            AttributeKind::ScalarList => {
                let text = match descriptor.item_key() {
                    Some(key) => {
                        let value = self.attribute_value(start, key)?;
                        self.skip_unless_empty(&name, empty)?;
                        value.unwrap_or_default()
                    }
                    None if empty => String::new(),
                    None => self.read_text(&name)?,
                };
                self.assign(descriptor, parent, &text, path);
            }
            AttributeKind::ChildList => {
                let attribute = descriptor.name();
                let Some(children) = descriptor.children_mut() else {
                    return self.skip_unless_empty(&name, empty);
                };
                let key = match children.key_attribute() {
                    Some(key_attribute) => match self.attribute_value(start, key_attribute)? {
                        Some(key) if !key.is_empty() => Some(key),
                        _ => {
                            warn!(element = %name, attribute = key_attribute, "keyed child without key, skipped");
                            self.report.record(LoadIssue::MissingKey {
                                element: name.clone(),
                                attribute: key_attribute.to_string(),
                            });
                            return self.skip_unless_empty(&name, empty);
                        }
                    },
                    None => None,
                };
                if let Some(key) = &key {
                    if children.child_mut(&ChildKey::Name(key.clone())).is_some() {
                        warn!(element = %name, key = %key, "repeated key, skipped");
                        self.report.record(LoadIssue::DuplicateKey {
                            element: name.clone(),
                            key: key.clone(),
                        });
                        return self.skip_unless_empty(&name, empty);
                    }
                }
                let Some((child_key, child)) = children.new_child(key) else {
                    return self.skip_unless_empty(&name, empty);
                };
                path.push(attribute, child_key);
                let result = self.read_object(child, start, empty, path);
                path.pop();
                result?;
            }
        }
        Ok(())
    }

    /// Inject `text` into a scalar or scalar-list descriptor. Empty text is
    /// absent for a scalar and leaves the field at its default; list items
    /// are always appended so positions survive.
    fn assign(&mut self, descriptor: &mut Descriptor<'_>, element: &str, text: &str, path: &ObjectPath) {
        if text.is_empty() && descriptor.kind() == AttributeKind::Scalar {
            return;
        }
        match descriptor.set(Value::Scalar(text.to_string())) {
            Ok(()) => {
                if descriptor.is_reference() && !text.is_empty() {
                    self.pending.record(path, descriptor.name(), text);
                }
            }
            Err(err) => {
                warn!(element, attribute = descriptor.name(), value = text, "{}", err);
                self.report.record(LoadIssue::TypeConversion {
                    element: element.to_string(),
                    attribute: descriptor.name().to_string(),
                    value: text.to_string(),
                    expected: err.expected.to_string(),
                });
            }
        }
    }

    fn attribute_value(&self, start: &BytesStart<'_>, key: &str) -> Result<Option<String>, ReadError> {
        match start.try_get_attribute(key) {
            Ok(Some(attr)) => attr
                .unescape_value()
                .map(|value| Some(value.into_owned()))
                .map_err(|e| self.syntax(e)),
            Ok(None) => Ok(None),
            Err(err) => Err(self.syntax(err)),
        }
    }

    /// Text content of a scalar element. Nested elements are skipped.
    fn read_text(&mut self, name: &str) -> Result<String, ReadError> {
        let mut text = String::new();
        loop {
            match self.raw_event()? {
                Event::Text(chunk) => {
                    let chunk = chunk.unescape().map_err(|e| self.syntax(e))?;
                    text.push_str(&chunk);
                }
                Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                Event::Start(inner) => {
                    let inner = element_name(inner.name().as_ref());
                    debug!(element = name, child = %inner, "skipping element inside text");
                    self.skip_element(&inner)?;
                }
                Event::End(end) => {
                    let found = element_name(end.name().as_ref());
                    if found != name {
                        return Err(ReadError::MismatchedEnd {
                            expected: name.to_string(),
                            found,
                        });
                    }
                    return Ok(text);
                }
                Event::Eof => {
                    return Err(ReadError::Truncated {
                        element: name.to_string(),
                    })
                }
                _ => {}
            }
        }
    }

    fn skip_unless_empty(&mut self, name: &str, empty: bool) -> Result<(), ReadError> {
        if empty {
            Ok(())
        } else {
            self.skip_element(name)
        }
    }

    /// Consume everything up to the end tag of `name`. Nested end tags
    /// must match their start tags even though the content is ignored.
    fn skip_element(&mut self, name: &str) -> Result<(), ReadError> {
        let mut open = vec![name.to_string()];
        loop {
            match self.raw_event()? {
                Event::Start(start) => open.push(element_name(start.name().as_ref())),
                Event::End(end) => {
                    let found = element_name(end.name().as_ref());
                    let expected = open.pop().unwrap_or_default();
                    if found != expected {
                        return Err(ReadError::MismatchedEnd { expected, found });
                    }
                    if open.is_empty() {
                        return Ok(());
                    }
                }
                Event::Eof => {
                    return Err(ReadError::Truncated {
                        element: open.pop().unwrap_or_default(),
                    })
                }
                _ => {}
            }
        }
    }
}
