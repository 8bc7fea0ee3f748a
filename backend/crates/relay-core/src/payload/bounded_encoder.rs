//! Structural size bounding for payloads headed to the transport.
//!
//! Reduction runs in cycles. Each cycle first drops the last element of every
//! sequence in the tree, then (only if still over budget) shortens every long
//! string by a fixed chunk. A cycle that leaves the encoded length unchanged is a
//! fixed point, so the result may still exceed the budget: `max_length` is a soft
//! target.
//!
//! The tree is encoded once up front. Every node then carries the length of its
//! own encoding, and each pass subtracts exactly the bytes it removes, so a cycle
//! only visits the parts of the tree that can still shrink.

use crate::Payload;
use crate::payload::{Scalar, encoded_len_of};

use std::borrow::Cow;

/// Strings at or below this many characters are never shortened
pub const STRING_SHRINK_THRESHOLD: usize = 4095;

/// Characters removed from a long string per cycle
pub const STRING_SHRINK_CHUNK: usize = 128;

/// Suffix that replaces the tail of a shortened string
pub const TRUNCATION_MARKER: &str = "...";

/// Reduce `value` until its JSON encoding fits in `max_length` bytes, or until
/// no further reduction is possible.
///
/// Returns `Cow::Borrowed(value)` untouched when it already fits.
pub fn bound(value: &Payload, max_length: usize) -> Cow<'_, Payload> {
    let mut current = value.encoded_len();
    if current <= max_length {
        return Cow::Borrowed(value);
    }

    let mut working = Node::build(value.clone());
    loop {
        working.shrink_sequences();
        if working.len > max_length {
            working.shrink_strings();
        }

        let reduced = working.len;
        if reduced <= max_length || reduced >= current {
            break;
        }
        current = reduced;
    }

    Cow::Owned(working.into_payload())
}

/// Working copy of a payload node with the byte length of its compact encoding
struct Node {
    len: usize,
    kind: Kind,
}

enum Kind {
    Scalar(Scalar),
    Text {
        text: String,
        chars: usize,
    },
    /// `live` holds the ascending indices of items that can still shrink
    Sequence {
        items: Vec<Node>,
        live: Vec<usize>,
    },
    Mapping {
        keys: Vec<String>,
        values: Vec<Node>,
        live: Vec<usize>,
    },
}

impl Node {
    fn build(payload: Payload) -> Self {
        match payload {
            Payload::Scalar(scalar) => Self {
                len: encoded_len_of(&scalar),
                kind: Kind::Scalar(scalar),
            },
            Payload::Text(text) => {
                let len = encoded_len_of(text.as_str());
                let chars = text.chars().count();

                Self {
                    len,
                    kind: Kind::Text { text, chars },
                }
            }
            Payload::Sequence(items) => {
                let items: Vec<Node> = items.into_iter().map(Self::build).collect();
                let len = 2
                    + items.iter().map(|item| item.len).sum::<usize>()
                    + items.len().saturating_sub(1);
                let live = live_indices(&items);

                Self {
                    len,
                    kind: Kind::Sequence { items, live },
                }
            }
            Payload::Mapping(fields) => {
                let (keys, values): (Vec<String>, Vec<Node>) = fields
                    .into_iter()
                    .map(|(key, value)| (key, Self::build(value)))
                    .unzip();
                let len = 2
                    + keys
                        .iter()
                        .zip(&values)
                        .map(|(key, value)| encoded_len_of(key.as_str()) + 1 + value.len)
                        .sum::<usize>()
                    + keys.len().saturating_sub(1);
                let live = live_indices(&values);

                Self {
                    len,
                    kind: Kind::Mapping { keys, values, live },
                }
            }
        }
    }

    /// Whether a later pass could still remove bytes from this node
    fn is_reducible(&self) -> bool {
        match &self.kind {
            Kind::Scalar(_) => false,
            Kind::Text { chars, .. } => *chars > STRING_SHRINK_THRESHOLD,
            Kind::Sequence { items, .. } => !items.is_empty(),
            Kind::Mapping { live, .. } => !live.is_empty(),
        }
    }

    /// Drop the last element of every sequence, returning the bytes removed
    fn shrink_sequences(&mut self) -> usize {
        let removed = match &mut self.kind {
            Kind::Sequence { items, live } => {
                let mut removed = 0;
                if let Some(last) = items.pop() {
                    // The separating comma goes with it unless it was the only item
                    removed += last.len + usize::from(!items.is_empty());
                    if live.last() == Some(&items.len()) {
                        live.pop();
                    }
                }
                removed + shrink_live(items, live, Self::shrink_sequences)
            }
            Kind::Mapping { values, live, .. } => shrink_live(values, live, Self::shrink_sequences),
            Kind::Scalar(_) | Kind::Text { .. } => 0,
        };

        self.len -= removed;
        removed
    }

    /// Shorten every long string by one chunk, returning the bytes removed
    fn shrink_strings(&mut self) -> usize {
        let removed = match &mut self.kind {
            Kind::Text { text, chars } => shorten_text(text, chars),
            Kind::Sequence {
                items: children,
                live,
            }
            | Kind::Mapping {
                values: children,
                live,
                ..
            } => shrink_live(children, live, Self::shrink_strings),
            Kind::Scalar(_) => 0,
        };

        self.len -= removed;
        removed
    }

    fn into_payload(self) -> Payload {
        match self.kind {
            Kind::Scalar(scalar) => Payload::Scalar(scalar),
            Kind::Text { text, .. } => Payload::Text(text),
            Kind::Sequence { items, .. } => {
                Payload::Sequence(items.into_iter().map(Self::into_payload).collect())
            }
            Kind::Mapping { keys, values, .. } => Payload::Mapping(
                keys.into_iter()
                    .zip(values.into_iter().map(Self::into_payload))
                    .collect(),
            ),
        }
    }
}

fn live_indices(children: &[Node]) -> Vec<usize> {
    children
        .iter()
        .enumerate()
        .filter(|(_, child)| child.is_reducible())
        .map(|(index, _)| index)
        .collect()
}

/// Run `pass` over the reducible children only, forgetting those that can no longer shrink
fn shrink_live(children: &mut [Node], live: &mut Vec<usize>, pass: fn(&mut Node) -> usize) -> usize {
    let mut removed = 0;
    live.retain(|&index| {
        let child = &mut children[index];
        removed += pass(child);
        child.is_reducible()
    });
    removed
}

/// Replace the tail of a long string so it ends up one chunk shorter, marker included.
/// Returns the bytes removed from its encoding.
fn shorten_text(text: &mut String, chars: &mut usize) -> usize {
    if *chars <= STRING_SHRINK_THRESHOLD {
        return 0;
    }

    // Scan from the end: only the last chunk plus the marker width is replaced
    let replaced = STRING_SHRINK_CHUNK + TRUNCATION_MARKER.len();
    let cut = text
        .char_indices()
        .rev()
        .nth(replaced - 1)
        .map_or(0, |(index, _)| index);

    let removed = encoded_len_of(&text[cut..]) - encoded_len_of(TRUNCATION_MARKER);
    text.truncate(cut);
    text.push_str(TRUNCATION_MARKER);
    *chars -= STRING_SHRINK_CHUNK;

    removed
}
