//! PDF guestbook export
//!
//! [`layout`] computes a page model (positions in millimetres from the top
//! left of an A4 page) and [`render`] draws it with printpdf. Keeping the
//! two apart lets pagination be checked without parsing PDF output.

use chrono::{DateTime, Utc};
use memento_common::{Contribution, ContributionKind, Error, Event, Payload, Result};
use printpdf::{BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, Point};

pub const PAGE_WIDTH_MM: f32 = 210.0;
pub const PAGE_HEIGHT_MM: f32 = 297.0;
pub const MARGIN_MM: f32 = 20.0;

/// Characters per line of wrapped message text
pub const WRAP_COLUMNS: usize = 90;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Italic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        text: String,
        x_mm: f32,
        y_mm: f32,
        size_pt: f32,
        style: FontStyle,
        align: Align,
    },
    Rule {
        y_mm: f32,
        thickness_pt: f32,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub elements: Vec<Element>,
}

impl Page {
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            Element::Text { text, .. } => Some(text.as_str()),
            Element::Rule { .. } => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentModel {
    pub title: String,
    pub pages: Vec<Page>,
}

impl DocumentModel {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Greedy word wrap; words longer than a line are split
pub fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > columns {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(columns);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let needed = if line.is_empty() { word.len() } else { line.chars().count() + 1 + word.len() };
            if needed > columns && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

/// Writes elements top to bottom, starting new pages as space runs out
struct PageWriter {
    pages: Vec<Page>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Page::default()],
            y: MARGIN_MM,
        }
    }

    /// Start a new page unless at least `reserve_mm` remain above the bottom edge
    fn ensure(&mut self, reserve_mm: f32) {
        if self.y > PAGE_HEIGHT_MM - reserve_mm {
            self.pages.push(Page::default());
            self.y = MARGIN_MM;
        }
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn text(&mut self, text: impl Into<String>, size_pt: f32, style: FontStyle, align: Align, advance_mm: f32) {
        self.push(Element::Text {
            text: text.into(),
            x_mm: MARGIN_MM,
            y_mm: self.y,
            size_pt,
            style,
            align,
        });
        self.y += advance_mm;
    }

    fn rule(&mut self, thickness_pt: f32, advance_mm: f32) {
        self.push(Element::Rule {
            y_mm: self.y,
            thickness_pt,
        });
        self.y += advance_mm;
    }
}

/// Lay out the guestbook for `contributions` (already in chronological order)
pub fn layout(event: &Event, contributions: &[Contribution], exported_at: DateTime<Utc>) -> DocumentModel {
    let mut w = PageWriter::new();

    w.text(event.title.clone(), 24.0, FontStyle::Bold, Align::Center, 15.0);
    w.text(
        format!("Event date: {}", event.event_date.format(DATE_FORMAT)),
        12.0,
        FontStyle::Regular,
        Align::Center,
        10.0,
    );
    w.text(
        format!("Exported: {}", exported_at.format("%Y-%m-%d")),
        12.0,
        FontStyle::Regular,
        Align::Center,
        10.0,
    );
    w.text(
        format!("Contributions: {}", contributions.len()),
        12.0,
        FontStyle::Regular,
        Align::Center,
        20.0,
    );
    w.rule(0.5, 15.0);

    for (i, c) in contributions.iter().enumerate() {
        w.ensure(40.0);
        w.text(format!("Contribution #{}", i + 1), 14.0, FontStyle::Bold, Align::Left, 8.0);
        w.text(format!("From: {}", c.guest_name), 10.0, FontStyle::Regular, Align::Left, 6.0);
        w.text(format!("Type: {}", c.kind.label()), 10.0, FontStyle::Regular, Align::Left, 6.0);
        w.text(
            format!("Date: {}", c.created_at.format(DATE_FORMAT)),
            10.0,
            FontStyle::Regular,
            Align::Left,
            if c.question_answered.is_some() { 6.0 } else { 8.0 },
        );
        if let Some(question) = &c.question_answered {
            w.text(format!("Question: {}", question), 10.0, FontStyle::Regular, Align::Left, 8.0);
        }

        match &c.payload {
            Payload::Text { content } => {
                for line in wrap_text(content, WRAP_COLUMNS) {
                    w.ensure(20.0);
                    w.text(line, 10.0, FontStyle::Italic, Align::Left, 6.0);
                }
                w.y += 5.0;
            }
            Payload::Media { url } => {
                let label = match c.kind {
                    ContributionKind::Video => {
                        format!("Video ({}s)", c.duration_seconds.unwrap_or(0))
                    }
                    _ => "Photo".to_string(),
                };
                w.ensure(20.0);
                w.text(label, 10.0, FontStyle::Regular, Align::Left, 6.0);
                w.text(format!("Link: {}", url), 8.0, FontStyle::Regular, Align::Left, 8.0);
            }
        }

        w.ensure(30.0);
        w.rule(0.2, 10.0);
    }

    let total = w.pages.len();
    for (i, page) in w.pages.iter_mut().enumerate() {
        page.elements.push(Element::Text {
            text: format!("Page {} of {}", i + 1, total),
            x_mm: MARGIN_MM,
            y_mm: PAGE_HEIGHT_MM - 10.0,
            size_pt: 8.0,
            style: FontStyle::Regular,
            align: Align::Center,
        });
    }

    DocumentModel {
        title: event.title.clone(),
        pages: w.pages,
    }
}

/// Rough Helvetica text width, good enough for centering
fn approx_width_mm(text: &str, size_pt: f32) -> f32 {
    text.chars().count() as f32 * size_pt * 0.5 * 0.3528
}

fn pdf_error(e: impl std::fmt::Display) -> Error {
    Error::Internal(format!("Failed to render PDF: {}", e))
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

impl Fonts {
    fn get(&self, style: FontStyle) -> &IndirectFontRef {
        match style {
            FontStyle::Regular => &self.regular,
            FontStyle::Bold => &self.bold,
            FontStyle::Italic => &self.italic,
        }
    }
}

/// Draw a laid-out document
pub fn render(model: &DocumentModel) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(model.title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");

    let fonts = Fonts {
        regular: doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?,
        bold: doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?,
        italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique).map_err(pdf_error)?,
    };

    for (i, page) in model.pages.iter().enumerate() {
        let (page_index, layer_index) = if i == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for element in &page.elements {
            match element {
                Element::Text {
                    text,
                    x_mm,
                    y_mm,
                    size_pt,
                    style,
                    align,
                } => {
                    let x = match align {
                        Align::Left => *x_mm,
                        Align::Center => ((PAGE_WIDTH_MM - approx_width_mm(text, *size_pt)) / 2.0).max(MARGIN_MM),
                    };
                    layer.use_text(text.as_str(), *size_pt, Mm(x), Mm(PAGE_HEIGHT_MM - y_mm), fonts.get(*style));
                }
                Element::Rule { y_mm, thickness_pt } => {
                    let y = Mm(PAGE_HEIGHT_MM - y_mm);
                    layer.set_outline_thickness(*thickness_pt);
                    layer.add_line(Line {
                        points: vec![
                            (Point::new(Mm(MARGIN_MM), y), false),
                            (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), y), false),
                        ],
                        is_closed: false,
                    });
                }
            }
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use memento_common::{ContributionStatus, EventSettings, EventStatus};
    use uuid::Uuid;

    fn event() -> Event {
        let now = Utc::now();
        Event {
            id: Uuid::new_v4(),
            host_user_id: "host".into(),
            title: "Summer Party".into(),
            description: None,
            event_date: now,
            event_code: "ABC-DEFGH".into(),
            status: EventStatus::Active,
            settings: EventSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }

    fn text(message: &str) -> Contribution {
        let now = Utc::now();
        Contribution {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            guest_name: "Ann".into(),
            kind: ContributionKind::Text,
            payload: Payload::Text {
                content: message.into(),
            },
            thumbnail_url: None,
            question_answered: None,
            status: ContributionStatus::Approved,
            duration_seconds: None,
            file_size_bytes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_wrap_text() {
        let lines = wrap_text("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(lines.iter().all(|l| l.chars().count() <= 10));

        let lines = wrap_text("abcdefghijklmnop", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p"]);

        assert_eq!(wrap_text("one\ntwo", 20), vec!["one", "two"]);
    }

    #[test]
    fn test_single_entry_fits_one_page() {
        let model = layout(&event(), &[text("Congratulations!")], Utc::now());
        assert_eq!(model.page_count(), 1);
        let texts: Vec<&str> = model.pages[0].texts().collect();
        assert!(texts.contains(&"Contribution #1"));
        assert!(texts.contains(&"Congratulations!"));
        assert!(texts.contains(&"Page 1 of 1"));
    }

    #[test]
    fn test_paginates_and_numbers_every_page() {
        let contributions: Vec<Contribution> = (0..30).map(|i| text(&format!("Message {}", i))).collect();
        let model = layout(&event(), &contributions, Utc::now());
        let n = model.page_count();
        assert!(n > 1);

        for (i, page) in model.pages.iter().enumerate() {
            let footer = format!("Page {} of {}", i + 1, n);
            assert!(page.texts().any(|t| t == footer), "missing footer on page {}", i + 1);
            for element in &page.elements {
                if let Element::Text { y_mm, .. } = element {
                    assert!(*y_mm <= PAGE_HEIGHT_MM - 10.0);
                }
            }
        }

        let numbered = model
            .pages
            .iter()
            .flat_map(|p| p.texts())
            .filter(|t| t.starts_with("Contribution #"))
            .count();
        assert_eq!(numbered, 30);
    }

    #[test]
    fn test_long_message_spans_pages() {
        let long = "word ".repeat(2500);
        let model = layout(&event(), &[text(&long)], Utc::now());
        assert!(model.page_count() > 1);
    }

    #[test]
    fn test_render_produces_pdf() {
        let model = layout(&event(), &[text("Hello")], Utc::now());
        let bytes = render(&model).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
