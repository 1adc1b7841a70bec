// SPDX-FileCopyrightText: 2026 Replyscope Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text extraction from network message content.
//!
//! Extractors run in priority order across all parts of a message; the first
//! one to produce non-empty text wins. Captionless media falls through to an
//! iconographic placeholder so the conversation still shows something.

use replyscope_core::{ContentKind, ContentPart};

/// Text and kind tag extracted from a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub body: String,
    pub kind: ContentKind,
}

type Extractor = fn(&ContentPart) -> Option<Extracted>;

/// Extractors in priority order.
const EXTRACTORS: &[Extractor] = &[plain_text, caption, interactive_reply, placeholder];

fn non_empty(text: &str, kind: ContentKind) -> Option<Extracted> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(Extracted {
            body: trimmed.to_string(),
            kind,
        })
    }
}

fn plain_text(part: &ContentPart) -> Option<Extracted> {
    match part {
        ContentPart::Conversation { text } | ContentPart::ExtendedText { text } => {
            non_empty(text, ContentKind::Text)
        }
        _ => None,
    }
}

fn caption(part: &ContentPart) -> Option<Extracted> {
    match part {
        ContentPart::Image { caption: Some(c) } => non_empty(c, ContentKind::Image),
        ContentPart::Video { caption: Some(c) } => non_empty(c, ContentKind::Video),
        ContentPart::Document {
            caption: Some(c), ..
        } => non_empty(c, ContentKind::Document),
        _ => None,
    }
}

fn interactive_reply(part: &ContentPart) -> Option<Extracted> {
    match part {
        ContentPart::ButtonsResponse {
            selected_text: Some(t),
        }
        | ContentPart::TemplateButtonReply {
            selected_text: Some(t),
        } => non_empty(t, ContentKind::ButtonReply),
        ContentPart::ListResponse { title: Some(t) } => non_empty(t, ContentKind::ListReply),
        _ => None,
    }
}

fn placeholder(part: &ContentPart) -> Option<Extracted> {
    let (body, kind) = match part {
        ContentPart::Image { .. } => ("📷 Image".to_string(), ContentKind::Image),
        ContentPart::Video { .. } => ("🎥 Video".to_string(), ContentKind::Video),
        ContentPart::Audio { voice_note: true } => {
            ("🎤 Voice message".to_string(), ContentKind::Audio)
        }
        ContentPart::Audio { voice_note: false } => ("🎵 Audio".to_string(), ContentKind::Audio),
        ContentPart::Document { file_name, .. } => {
            let body = match file_name.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => format!("📄 {name}"),
                _ => "📄 Document".to_string(),
            };
            (body, ContentKind::Document)
        }
        ContentPart::Sticker => ("🏷️ Sticker".to_string(), ContentKind::Sticker),
        ContentPart::Location { name } => {
            let body = match name.as_deref().map(str::trim) {
                Some(n) if !n.is_empty() => format!("📍 {n}"),
                _ => "📍 Location".to_string(),
            };
            (body, ContentKind::Location)
        }
        ContentPart::ContactCard { display_name } => {
            let body = match display_name.as_deref().map(str::trim) {
                Some(n) if !n.is_empty() => format!("👤 {n}"),
                _ => "👤 Contact".to_string(),
            };
            (body, ContentKind::ContactCard)
        }
        _ => return None,
    };
    Some(Extracted { body, kind })
}

/// Extract displayable text from a message's content parts.
///
/// Returns `None` for messages with nothing to show (reactions, protocol
/// messages, empty text).
pub fn extract_text(parts: &[ContentPart]) -> Option<Extracted> {
    EXTRACTORS
        .iter()
        .find_map(|extract| parts.iter().find_map(|part| extract(part)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_wins_over_media() {
        let parts = vec![
            ContentPart::Image { caption: None },
            ContentPart::ExtendedText {
                text: " quoted reply ".into(),
            },
        ];
        assert_eq!(
            extract_text(&parts),
            Some(Extracted {
                body: "quoted reply".into(),
                kind: ContentKind::Text,
            })
        );
    }

    #[test]
    fn caption_is_used_before_placeholder() {
        let parts = vec![ContentPart::Image {
            caption: Some("invoice".into()),
        }];
        let got = extract_text(&parts).unwrap();
        assert_eq!(got.body, "invoice");
        assert_eq!(got.kind, ContentKind::Image);
    }

    #[test]
    fn captionless_media_gets_placeholder() {
        let got = extract_text(&[ContentPart::Audio { voice_note: true }]).unwrap();
        assert_eq!(got.body, "🎤 Voice message");
        assert_eq!(got.kind, ContentKind::Audio);

        let got = extract_text(&[ContentPart::Document {
            caption: Some("  ".into()),
            file_name: Some("contract.pdf".into()),
        }])
        .unwrap();
        assert_eq!(got.body, "📄 contract.pdf");
    }

    #[test]
    fn interactive_replies_use_selected_text() {
        let got = extract_text(&[ContentPart::ListResponse {
            title: Some("Opening hours".into()),
        }])
        .unwrap();
        assert_eq!(got.kind, ContentKind::ListReply);
        assert_eq!(got.body, "Opening hours");
    }

    #[test]
    fn nothing_to_show() {
        assert_eq!(extract_text(&[]), None);
        assert_eq!(
            extract_text(&[
                ContentPart::Reaction { text: "👍".into() },
                ContentPart::Protocol
            ]),
            None
        );
        assert_eq!(
            extract_text(&[ContentPart::Conversation { text: "   ".into() }]),
            None
        );
    }
}
