//! MIME part trees: flattening and best-part selection
//!
//! A message's structure arrives from the server as a nested
//! BODYSTRUCTURE. It is converted into a [`PartNode`] tree once, with
//! IMAP section paths assigned up front, and from then on only the
//! flattened pre-order list is consulted.

use async_imap::imap_proto::types::{BodyStructure, ContentEncoding, ContentType};

/// One node of a message's MIME structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDescriptor {
    /// Dotted section path; `None` when the node is not individually
    /// addressable (a multipart root).
    pub part_id: Option<String>,
    pub media_type: String,
    pub subtype: String,
    pub charset: Option<String>,
    /// Content-Transfer-Encoding of the part, lowercased.
    pub encoding: Option<String>,
}

impl PartDescriptor {
    #[must_use]
    pub fn new(part_id: Option<&str>, media_type: &str, subtype: &str) -> Self {
        Self {
            part_id: part_id.map(str::to_string),
            media_type: media_type.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            charset: None,
            encoding: None,
        }
    }

    /// The descriptor assumed for a part fetched without structural
    /// knowledge.
    #[must_use]
    pub fn assumed_plain_text(part_id: Option<&str>) -> Self {
        Self::new(part_id, "text", "plain")
    }

    #[must_use]
    pub fn is(&self, media_type: &str, subtype: &str) -> bool {
        self.media_type.eq_ignore_ascii_case(media_type)
            && self.subtype.eq_ignore_ascii_case(subtype)
    }

    /// `type/subtype`
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.media_type, self.subtype)
    }
}

/// A message structure tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartNode {
    Leaf(PartDescriptor),
    Container {
        descriptor: PartDescriptor,
        children: Vec<PartNode>,
    },
    /// A subtree the server described in a way that cannot be
    /// interpreted. It is kept in the tree but never expanded.
    Unparseable,
}

impl PartNode {
    /// Convert a server BODYSTRUCTURE, numbering sections per RFC 3501
    /// section 6.4.5.
    #[must_use]
    pub fn from_body_structure(bs: &BodyStructure<'_>) -> Self {
        match bs {
            BodyStructure::Multipart { .. } => convert(bs, None),
            // A single-part message's body is section 1.
            _ => convert(bs, Some("1".to_string())),
        }
    }
}

fn convert(bs: &BodyStructure<'_>, part_id: Option<String>) -> PartNode {
    match bs {
        BodyStructure::Multipart { common, bodies, .. } => {
            if bodies.is_empty() || common.ty.subtype.is_empty() {
                return PartNode::Unparseable;
            }
            let children = bodies
                .iter()
                .enumerate()
                .map(|(idx, child)| {
                    let n = idx + 1;
                    let child_id = part_id
                        .as_ref()
                        .map_or_else(|| n.to_string(), |parent| format!("{parent}.{n}"));
                    convert(child, Some(child_id))
                })
                .collect();
            PartNode::Container {
                descriptor: describe(&common.ty, None, part_id),
                children,
            }
        }
        BodyStructure::Basic { common, other, .. }
        | BodyStructure::Text { common, other, .. }
        | BodyStructure::Message { common, other, .. } => {
            if common.ty.ty.is_empty() || common.ty.subtype.is_empty() {
                return PartNode::Unparseable;
            }
            PartNode::Leaf(describe(
                &common.ty,
                Some(&other.transfer_encoding),
                part_id,
            ))
        }
    }
}

fn describe(
    ty: &ContentType<'_>,
    encoding: Option<&ContentEncoding<'_>>,
    part_id: Option<String>,
) -> PartDescriptor {
    let charset = ty.params.as_ref().and_then(|params| {
        params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("charset"))
            .map(|(_, value)| value.to_string())
    });

    PartDescriptor {
        part_id,
        media_type: ty.ty.to_ascii_lowercase(),
        subtype: ty.subtype.to_ascii_lowercase(),
        charset,
        encoding: encoding.map(encoding_name),
    }
}

fn encoding_name(encoding: &ContentEncoding<'_>) -> String {
    match encoding {
        ContentEncoding::SevenBit => "7bit".to_string(),
        ContentEncoding::EightBit => "8bit".to_string(),
        ContentEncoding::Binary => "binary".to_string(),
        ContentEncoding::Base64 => "base64".to_string(),
        ContentEncoding::QuotedPrintable => "quoted-printable".to_string(),
        ContentEncoding::Other(other) => other.to_ascii_lowercase(),
    }
}

/// Flatten a part tree into pre-order: each container before its
/// children, children in their original order.
///
/// An absent root yields an empty list. `Unparseable` subtrees
/// contribute nothing.
#[must_use]
pub fn flatten(root: Option<&PartNode>) -> Vec<PartDescriptor> {
    let mut out = Vec::new();
    if let Some(node) = root {
        visit(node, &mut out);
    }
    out
}

fn visit(node: &PartNode, out: &mut Vec<PartDescriptor>) {
    match node {
        PartNode::Leaf(descriptor) => out.push(descriptor.clone()),
        PartNode::Container {
            descriptor,
            children,
        } => {
            out.push(descriptor.clone());
            for child in children {
                visit(child, out);
            }
        }
        PartNode::Unparseable => {}
    }
}

/// Pick the part to display: the first `text/html`, otherwise the
/// first `text/plain`.
#[must_use]
pub fn select_best_part(parts: &[PartDescriptor]) -> Option<&PartDescriptor> {
    parts
        .iter()
        .find(|p| p.is("text", "html"))
        .or_else(|| parts.iter().find(|p| p.is("text", "plain")))
}
