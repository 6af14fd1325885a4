use chrono::{NaiveDate, Utc};

use crate::capture::SignatureRaster;
use crate::contract::ContractView;
use crate::paginate::{Paginator, SIGNATURE_BANNER};

/// Columns used when rendering an ink raster into the export.
const EMBED_COLS: u32 = 48;

/// Shown for a signature whose image payload cannot be decoded.
const FALLBACK_LINE: &str = "________________________";

/// Assembled download artifact: content pages identical to the on-screen
/// slices, plus the synthesized signature page.
#[derive(Debug, Clone)]
pub struct ExportDocument {
    pub filename: String,
    pub pages: Vec<String>,
}

impl ExportDocument {
    /// Page texts joined with form feeds, ready to stream as a download.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.pages.join("\u{c}\n").into_bytes()
    }
}

/// Deterministic, collision-resistant-per-day download name: the title
/// with non-alphanumerics stripped and lower-cased, a fixed `_signed_`
/// marker, and the date.
#[must_use]
pub fn export_filename(title: &str, date: NaiveDate) -> String {
    let slug: String = title
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect::<String>()
        .to_lowercase();
    format!("{slug}_signed_{}.txt", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Exporter {
    paginator: Paginator,
}

impl Exporter {
    #[must_use]
    pub fn new(paginator: Paginator) -> Self {
        Self { paginator }
    }

    /// Assemble the full document for download.
    ///
    /// Content pages reuse the exact display offsets. Each signature gets
    /// an attempted image embed; a malformed payload degrades to a textual
    /// placeholder plus a drawn line for that signature only. The export as
    /// a whole never fails.
    #[must_use]
    pub fn export(&self, view: &ContractView) -> ExportDocument {
        let body = &view.contract.body;
        let mut pages: Vec<String> = self
            .paginator
            .page_offsets(body)
            .into_iter()
            .map(|(start, end)| body[start..end].to_string())
            .collect();

        if !view.signatures.is_empty() {
            pages.push(self.signature_page(view));
        }

        ExportDocument {
            filename: export_filename(&view.contract.title, Utc::now().date_naive()),
            pages,
        }
    }

    fn signature_page(&self, view: &ContractView) -> String {
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
            page.push_str(&format!("Status: {}\n", signature.status));

            match SignatureRaster::from_payload(&signature.image_payload) {
                Ok(raster) => {
                    page.push_str(&render_ink(&raster));
                }
                Err(e) => {
                    tracing::warn!(
                        signature = %signature.id,
                        error = %e,
                        "signature image failed to embed, using fallback"
                    );
                    page.push_str("[signature image unavailable]\n");
                    page.push_str(FALLBACK_LINE);
                    page.push('\n');
                }
            }
            page.push('\n');
        }

        let total = self
            .paginator
            .total_page_count(&view.contract.body, view.signatures.len());
        page.push_str(&format!(
            "{} | generated {} | {} pages\n",
            view.contract.title,
            Utc::now().format("%Y-%m-%d %H:%M UTC"),
            total
        ));
        page
    }
}

/// Downsample a raster into a fixed-width block of ink characters.
fn render_ink(raster: &SignatureRaster) -> String {
    if raster.width == 0 || raster.height == 0 {
        return String::new();
    }
    let cols = EMBED_COLS.min(raster.width).max(1);
    // Terminal cells are roughly twice as tall as wide.
    let rows = (raster.height * cols / raster.width / 2).max(1);

    let mut out = String::new();
    for row in 0..rows {
        for col in 0..cols {
            let x0 = col * raster.width / cols;
            let x1 = ((col + 1) * raster.width / cols).max(x0 + 1);
            let y0 = row * raster.height / rows;
            let y1 = ((row + 1) * raster.height / rows).max(y0 + 1);

            let mut inked = false;
            'cell: for y in y0..y1.min(raster.height) {
                for x in x0..x1.min(raster.width) {
                    if raster.pixels[(y * raster.width + x) as usize] < 128 {
                        inked = true;
                        break 'cell;
                    }
                }
            }
            out.push(if inked { '#' } else { ' ' });
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SignaturePad;
    use crate::contract::{Contract, ContractView, Signature};
    use uuid::Uuid;

    fn drawn_payload() -> String {
        let mut pad = SignaturePad::default();
        pad.pointer_down(20.0, 50.0);
        pad.pointer_move(200.0, 80.0);
        pad.pointer_up();
        pad.payload().unwrap().to_string()
    }

    fn view(body: &str, payloads: Vec<String>) -> ContractView {
        let contract = Contract::new(Uuid::new_v4(), "Service Agreement #7".into(), body.into());
        let signatures = payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| Signature::new(contract.id, format!("Signer {i}"), p))
            .collect();
        ContractView {
            contract,
            signatures,
        }
    }

    #[test]
    fn test_filename_convention() {
        let date = NaiveDate::from_ymd_opt(2026, 8, 24).unwrap();
        assert_eq!(
            export_filename("Service Agreement #7", date),
            "serviceagreement7_signed_2026-08-24.txt"
        );
    }

    #[test]
    fn test_content_pages_match_display_slices() {
        let paginator = Paginator::new(10);
        let exporter = Exporter::new(paginator);
        let body = "a".repeat(25);
        let v = view(&body, vec![drawn_payload()]);

        let doc = exporter.export(&v);
        assert_eq!(doc.pages.len(), 4);
        for n in 1..=3 {
            assert_eq!(doc.pages[n - 1], paginator.page_text(&body, n).unwrap());
        }
    }

    #[test]
    fn test_no_signature_page_without_signatures() {
        let exporter = Exporter::new(Paginator::new(10));
        let doc = exporter.export(&view("short body", vec![]));
        assert_eq!(doc.pages.len(), 1);
        assert!(!doc.pages[0].contains(SIGNATURE_BANNER));
    }

    #[test]
    fn test_valid_signature_embeds_ink() {
        let exporter = Exporter::new(Paginator::new(10));
        let doc = exporter.export(&view("body", vec![drawn_payload()]));
        let sig_page = doc.pages.last().unwrap();
        assert!(sig_page.starts_with(SIGNATURE_BANNER));
        assert!(sig_page.contains('#'));
        assert!(!sig_page.contains("[signature image unavailable]"));
    }

    #[test]
    fn test_oversized_header_payload_falls_back() {
        use base64::{engine::general_purpose::STANDARD, Engine};

        // A stored payload claiming 65536x65536 pixels with no pixel data.
        // The export must degrade to the fallback, not panic.
        let crafted = STANDARD.encode(b"P5 65536 65536 255\n");
        let exporter = Exporter::new(Paginator::new(10));
        let doc = exporter.export(&view("body text", vec![crafted]));

        let sig_page = doc.pages.last().unwrap();
        assert!(sig_page.contains("[signature image unavailable]"));
        assert!(sig_page.contains(FALLBACK_LINE));
        assert!(sig_page.contains("Signed by: Signer 0"));
    }

    #[test]
    fn test_malformed_payload_falls_back_per_signature() {
        let exporter = Exporter::new(Paginator::new(10));
        let doc = exporter.export(&view(
            "body text here",
            vec!["not-an-image".to_string(), drawn_payload()],
        ));

        let sig_page = doc.pages.last().unwrap();
        // The broken signature gets a placeholder and a drawn line; the
        // good one still embeds. The export itself never fails.
        assert!(sig_page.contains("[signature image unavailable]"));
        assert!(sig_page.contains(FALLBACK_LINE));
        assert!(sig_page.contains('#'));
        assert!(sig_page.contains("Signed by: Signer 0"));
        assert!(sig_page.contains("Signed by: Signer 1"));
        assert_eq!(doc.pages.len(), 3);
    }

    #[test]
    fn test_into_bytes_joins_pages() {
        let doc = ExportDocument {
            filename: "x_signed_2026-08-24.txt".into(),
            pages: vec!["one".into(), "two".into()],
        };
        assert_eq!(doc.into_bytes(), b"one\x0c\ntwo".to_vec());
    }
}
