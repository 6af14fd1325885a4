use chrono::{DateTime, Utc};

use crate::contract::ContractView;

/// Characters per content page, matching the on-screen reader.
pub const DEFAULT_PAGE_SIZE: usize = 1800;

pub const SIGNATURE_BANNER: &str = "=== SIGNATURES ===";

/// Slices a contract body into fixed-size pages and synthesizes the
/// trailing signature page.
///
/// Both the on-screen renderer and the exporter slice with the offsets
/// computed here; there is deliberately no second pagination algorithm, so
/// display and export can never disagree about page content.
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Byte ranges of each content page, split every `page_size` chars on
    /// a character boundary.
    #[must_use]
    pub fn page_offsets(&self, body: &str) -> Vec<(usize, usize)> {
        let mut offsets = Vec::new();
        let mut start = 0;
        let mut chars_on_page = 0;

        for (idx, _) in body.char_indices() {
            if chars_on_page == self.page_size {
                offsets.push((start, idx));
                start = idx;
                chars_on_page = 0;
            }
            chars_on_page += 1;
        }
        if chars_on_page > 0 {
            offsets.push((start, body.len()));
        }

        offsets
    }

    /// ceil(chars / page_size); an empty body has zero content pages.
    #[must_use]
    pub fn content_page_count(&self, body: &str) -> usize {
        self.page_offsets(body).len()
    }

    /// Content pages plus exactly one signature page when at least one
    /// signature exists.
    #[must_use]
    pub fn total_page_count(&self, body: &str, signature_count: usize) -> usize {
        self.content_page_count(body) + usize::from(signature_count > 0)
    }

    /// Text of 1-based content page `page`, or None when out of range.
    #[must_use]
    pub fn page_text<'a>(&self, body: &'a str, page: usize) -> Option<&'a str> {
        let (start, end) = *self.page_offsets(body).get(page.checked_sub(1)?)?;
        Some(&body[start..end])
    }

    /// The synthesized final page: a banner, one block per signature, and
    /// a title/generation-time/total-pages footer. Never a body slice.
    #[must_use]
    pub fn signature_page(&self, view: &ContractView, generated_at: DateTime<Utc>) -> String {
        let mut page = String::new();
        page.push_str(SIGNATURE_BANNER);
        page.push_str("\n\n");

        for signature in &view.signatures {
            page.push_str(&format!("Signed by: {}\n", signature.signer_name));
            if let Some(email) = &signature.signer_email {
                page.push_str(&format!("Email: {email}\n"));
            }
            page.push_str(&format!(
                "Signed at: {}\n",
                signature.signed_at.format("%Y-%m-%d %H:%M UTC")
            ));
            page.push_str(&format!("Status: {}\n\n", signature.status));
        }

        let total = self.total_page_count(&view.contract.body, view.signatures.len());
        page.push_str(&format!(
            "{} | generated {} | {} pages\n",
            view.contract.title,
            generated_at.format("%Y-%m-%d %H:%M UTC"),
            total
        ));
        page
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Contract, Signature};
    use uuid::Uuid;

    fn view_with_signatures(body: &str, count: usize) -> ContractView {
        let contract = Contract::new(Uuid::new_v4(), "Lease Agreement".into(), body.into());
        let signatures = (0..count)
            .map(|i| {
                Signature::new(contract.id, format!("Signer {i}"), "payload".into())
                    .with_email(format!("signer{i}@example.com"))
            })
            .collect();
        ContractView {
            contract,
            signatures,
        }
    }

    #[test]
    fn test_page_count_is_ceiling() {
        let p = Paginator::new(10);
        assert_eq!(p.content_page_count(""), 0);
        assert_eq!(p.content_page_count(&"x".repeat(9)), 1);
        assert_eq!(p.content_page_count(&"x".repeat(10)), 1);
        assert_eq!(p.content_page_count(&"x".repeat(11)), 2);
        assert_eq!(p.content_page_count(&"x".repeat(30)), 3);
    }

    #[test]
    fn test_signature_page_adds_exactly_one() {
        let p = Paginator::new(10);
        let body = "x".repeat(25);
        assert_eq!(p.total_page_count(&body, 0), 3);
        assert_eq!(p.total_page_count(&body, 1), 4);
        assert_eq!(p.total_page_count(&body, 5), 4);
    }

    #[test]
    fn test_pages_cover_body_without_gaps() {
        let p = Paginator::new(7);
        let body = "The quick brown fox jumps over the lazy dog";
        let offsets = p.page_offsets(body);
        let mut rebuilt = String::new();
        for (start, end) in offsets {
            rebuilt.push_str(&body[start..end]);
        }
        assert_eq!(rebuilt, body);
    }

    #[test]
    fn test_multibyte_bodies_split_on_char_boundaries() {
        let p = Paginator::new(4);
        let body = "héllo wörld ünïcode";
        let offsets = p.page_offsets(body);
        for (start, end) in offsets {
            // Slicing must not panic mid-codepoint.
            let _ = &body[start..end];
        }
        let rebuilt: String = p
            .page_offsets(body)
            .iter()
            .map(|(s, e)| &body[*s..*e])
            .collect();
        assert_eq!(rebuilt, body);
    }

    #[test]
    fn test_page_text_matches_offsets() {
        let p = Paginator::new(5);
        let body = "abcdefghij";
        assert_eq!(p.page_text(body, 1), Some("abcde"));
        assert_eq!(p.page_text(body, 2), Some("fghij"));
        assert_eq!(p.page_text(body, 3), None);
        assert_eq!(p.page_text(body, 0), None);
    }

    #[test]
    fn test_signature_page_is_synthesized_listing() {
        let p = Paginator::default();
        let view = view_with_signatures("body text", 2);
        let page = p.signature_page(&view, Utc::now());

        assert!(page.starts_with(SIGNATURE_BANNER));
        assert!(page.contains("Signed by: Signer 0"));
        assert!(page.contains("Email: signer1@example.com"));
        assert!(page.contains("Status: signed"));
        assert!(page.contains("Lease Agreement"));
        assert!(page.contains("2 pages"));
        assert!(!page.contains("body text"));
    }
}
