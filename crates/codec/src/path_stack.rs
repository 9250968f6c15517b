//! Structural position of the node currently being encoded.
//!
//! Responsibilities:
//! - Track the path from the walk root to the current node, together with node names.
//! - Render that position in each walker mode (path, named, expanded).
//! - Record a containment label for every archetype slot the walk passes through.
//!
//! Notes:
//! - Frames are pushed and popped through [`StackFrame`], so a frame is released on every exit
//!   path of the code that pushed it, including early returns via `?`.
//! - Containment labels are recorded when their frame is released. A label already present
//!   keeps its first path. The table is ordered, so two encodings of the same tree produce
//!   identical tables.

use crate::constants::{TAG_ACTIVITIES, TAG_EVENTS, TAG_ITEMS};
use crate::path::node_key;
use openehr::ArchetypeId;
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone)]
struct Frame {
    segment: String,
    name: Option<String>,
    label: Option<String>,
    path: String,
}

/// Stack of path segments, names and containment labels.
#[derive(Debug, Default)]
pub struct PathStack {
    frames: Vec<Frame>,
    containment: BTreeMap<String, String>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a node onto the stack.
    ///
    /// The segment carries a name predicate when a name is given and the node is an archetype
    /// slot or a member of an activities, items or events collection.
    ///
    /// # Arguments
    ///
    /// * `attribute` - Attribute key the node hangs under (`/items`).
    /// * `node_id` - Archetype node id of the node.
    /// * `name` - Node name, or `None` for nodes addressed by id alone (elements).
    pub fn push(&mut self, attribute: &str, node_id: &str, name: Option<&str>) {
        let is_slot = ArchetypeId::is_archetype_id(node_id);
        let predicate_name = name.filter(|_| {
            is_slot || matches!(attribute, TAG_ACTIVITIES | TAG_ITEMS | TAG_EVENTS)
        });
        let segment = node_key(attribute, node_id, predicate_name);
        let path = format!("{}{}", self.path_dump(), segment);

        let label = is_slot.then(|| match self.current_label() {
            Some(parent) => format!("{parent}.{}", normalize_label(node_id)),
            None => normalize_label(node_id),
        });

        tracing::trace!(%path, "push");
        self.frames.push(Frame {
            segment,
            name: name.map(str::to_owned),
            label,
            path,
        });
    }

    /// Pop the innermost frame, recording its containment label if it has one.
    pub fn pop(&mut self) {
        let Some(frame) = self.frames.pop() else {
            tracing::warn!("pop on empty path stack");
            return;
        };
        tracing::trace!(path = %frame.path, "pop");
        if let Some(label) = frame.label {
            self.containment.entry(label).or_insert(frame.path);
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Concatenated path segments, root first.
    pub fn path_dump(&self) -> String {
        self.frames.iter().map(|f| f.segment.as_str()).collect()
    }

    /// Node names, lower-cased with spaces as `_`, each followed by `/`.
    pub fn named_dump(&self) -> String {
        self.frames
            .iter()
            .filter_map(|f| f.name.as_deref())
            .map(|name| format!("{}/", name_token(name)))
            .collect()
    }

    /// Each named frame as `name{{segment}}/`, with the name as in [`PathStack::named_dump`].
    pub fn expanded_dump(&self) -> String {
        self.frames
            .iter()
            .filter_map(|f| f.name.as_deref().map(|name| (name, f.segment.as_str())))
            .map(|(name, segment)| format!("{}{{{{{segment}}}}}/", name_token(name)))
            .collect()
    }

    /// Labels recorded so far, mapped to the path of the slot they label.
    pub fn containment(&self) -> &BTreeMap<String, String> {
        &self.containment
    }

    pub fn into_containment(self) -> BTreeMap<String, String> {
        self.containment
    }

    fn current_label(&self) -> Option<&str> {
        self.frames.iter().rev().find_map(|f| f.label.as_deref())
    }
}

/// Anything that owns a [`PathStack`] and can be scoped by a [`StackFrame`].
pub trait StackHolder {
    fn path_stack(&mut self) -> &mut PathStack;
}

impl StackHolder for PathStack {
    fn path_stack(&mut self) -> &mut PathStack {
        self
    }
}

/// A pushed frame. Derefs to the holder and pops the frame when dropped.
pub struct StackFrame<'a, H: StackHolder> {
    holder: &'a mut H,
}

impl<'a, H: StackHolder> StackFrame<'a, H> {
    /// Push a frame onto `holder`'s stack for the lifetime of the returned guard.
    pub fn enter(holder: &'a mut H, attribute: &str, node_id: &str, name: Option<&str>) -> Self {
        holder.path_stack().push(attribute, node_id, name);
        Self { holder }
    }
}

impl<H: StackHolder> Deref for StackFrame<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.holder
    }
}

impl<H: StackHolder> DerefMut for StackFrame<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.holder
    }
}

impl<H: StackHolder> Drop for StackFrame<'_, H> {
    fn drop(&mut self) {
        self.holder.path_stack().pop();
    }
}

fn name_token(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Turn an archetype id into a label token: anything outside `[A-Za-z0-9_]` becomes `_`.
fn normalize_label(node_id: &str) -> String {
    node_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}
