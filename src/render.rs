//! On-screen resume rendering.
//!
//! [`ResumeDocumentRenderer`] turns [`ResumeData`] into a [`RenderedView`]: a
//! sectioned visual tree held as SVG markup at A4 width in CSS pixels. The view
//! is what the user previews and what the raster strategy captures. Rendering
//! is a pure function of the data, so two renders of the same resume produce
//! byte-identical markup.

use crate::model::{join_technologies, ResumeData, Section};
use crate::typography::{wrap_px, Font, FontStyle};
use std::fmt::Write as _;
use std::ops::{Deref, DerefMut};
use tokio::sync::watch;

/// A4 width at 96 dpi.
pub const VIEW_WIDTH_PX: f32 = 794.0;

const PADDING_PX: f32 = 48.0;
const LINE_SPACING: f32 = 1.4;
const FONT_FAMILY: &str = "Helvetica, Arial, sans-serif";

const NAME_PX: f32 = 28.0;
const SECTION_PX: f32 = 18.0;
const HEADING_PX: f32 = 15.0;
const BODY_PX: f32 = 13.0;
const META_PX: f32 = 12.0;

const INK: &str = "#1f2937";
const BODY_INK: &str = "#374151";
const MUTED_INK: &str = "#6b7280";
const ACCENT: &str = "#2563eb";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overflow {
    Visible,
    Hidden,
    /// Scroll container; clips like `Hidden` when captured.
    Auto,
}

impl Overflow {
    fn clips(self) -> bool {
        !matches!(self, Overflow::Visible)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Height {
    /// Grows with the content.
    Auto,
    Fixed(f32),
}

/// The styling of the view's outer box that affects what a capture sees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewStyle {
    pub overflow: Overflow,
    pub height: Height,
}

impl ViewStyle {
    /// Box sized to the whole content.
    pub const FULL_CONTENT: ViewStyle = ViewStyle {
        overflow: Overflow::Visible,
        height: Height::Auto,
    };

    /// A fixed-height scrolling preview pane.
    pub fn preview_pane(height_px: f32) -> Self {
        Self {
            overflow: Overflow::Auto,
            height: Height::Fixed(height_px),
        }
    }
}

impl Default for ViewStyle {
    fn default() -> Self {
        Self::FULL_CONTENT
    }
}

/// Rendered resume plus the mutable box styling of its host element.
#[derive(Debug)]
pub struct RenderedView {
    body: String,
    content_height: f32,
    sections: Vec<Section>,
    pub style: ViewStyle,
    ready: watch::Receiver<bool>,
}

/// Held by whoever loads the view's fonts and images; signals readiness.
#[derive(Debug)]
pub struct ReadyHandle(watch::Sender<bool>);

impl ReadyHandle {
    pub fn mark_ready(self) {
        // No receivers left means nobody is waiting any more.
        let _ = self.0.send(true);
    }
}

impl RenderedView {
    /// The visual markup without the outer `<svg>` element.
    pub fn markup(&self) -> &str {
        &self.body
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Resolves once all resources report loaded. Returns `false` if the
    /// loader went away without signalling.
    pub async fn wait_ready(&self) -> bool {
        let mut ready = self.ready.clone();
        let loaded = ready.wait_for(|loaded| *loaded).await.is_ok();
        loaded
    }

    /// Size of the element box a capture would see, in CSS pixels.
    pub fn box_size(&self) -> (f32, f32) {
        let height = match self.style.height {
            Height::Auto => self.content_height,
            Height::Fixed(height) => height.max(0.0),
        };
        (VIEW_WIDTH_PX, height)
    }

    /// Serializes the view as it currently appears inside its box.
    pub fn to_svg(&self) -> String {
        let (width, height) = self.box_size();
        let mut svg = String::with_capacity(self.body.len() + 512);
        let _ = write!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width:.2}" height="{height:.2}" viewBox="0 0 {width:.2} {height:.2}">"#
        );
        let _ = write!(
            svg,
            r##"<rect x="0" y="0" width="{width:.2}" height="{height:.2}" fill="#ffffff"/>"##
        );
        if self.style.overflow.clips() {
            let _ = write!(
                svg,
                r#"<defs><clipPath id="viewport"><rect x="0" y="0" width="{width:.2}" height="{height:.2}"/></clipPath></defs><g clip-path="url(#viewport)">"#
            );
            svg.push_str(&self.body);
            svg.push_str("</g>");
        } else {
            svg.push_str(&self.body);
        }
        svg.push_str("</svg>");
        svg
    }

    /// Temporarily replaces the box style; the original comes back when the
    /// returned guard is dropped.
    pub fn override_style(&mut self, style: ViewStyle) -> StyleOverride<'_> {
        let saved = std::mem::replace(&mut self.style, style);
        StyleOverride { view: self, saved }
    }
}

/// Restores the view's original style on drop, whatever path the holder
/// leaves by.
#[derive(Debug)]
pub struct StyleOverride<'a> {
    view: &'a mut RenderedView,
    saved: ViewStyle,
}

impl StyleOverride<'_> {
    pub fn saved(&self) -> ViewStyle {
        self.saved
    }
}

impl Deref for StyleOverride<'_> {
    type Target = RenderedView;

    fn deref(&self) -> &RenderedView {
        self.view
    }
}

impl DerefMut for StyleOverride<'_> {
    fn deref_mut(&mut self) -> &mut RenderedView {
        self.view
    }
}

impl Drop for StyleOverride<'_> {
    fn drop(&mut self) {
        self.view.style = self.saved;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResumeDocumentRenderer {
    style: ViewStyle,
}

impl ResumeDocumentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders into a host box with the given styling, e.g. a preview pane.
    pub fn with_style(style: ViewStyle) -> Self {
        Self { style }
    }

    /// Renders a view whose resources are already available.
    pub fn render(&self, data: &ResumeData) -> RenderedView {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        self.build(data, rx)
    }

    /// Renders a view that stays not-ready until the handle is signalled.
    pub fn render_pending(&self, data: &ResumeData) -> (RenderedView, ReadyHandle) {
        let (tx, rx) = watch::channel(false);
        (self.build(data, rx), ReadyHandle(tx))
    }

    fn build(&self, data: &ResumeData, ready: watch::Receiver<bool>) -> RenderedView {
        let mut canvas = Canvas::new();
        canvas.header(data);

        let sections = data.sections();
        for section in &sections {
            canvas.section_title(section.title());
            match section {
                Section::Summary => canvas.paragraph(&data.summary, body(), BODY_INK),
                Section::Experience => {
                    for entry in data.experience.iter().filter(|e| !e.is_empty()) {
                        canvas.entry_heading(
                            &entry.position,
                            &entry.company,
                            entry.date_range().as_deref(),
                        );
                        canvas.paragraph(&entry.description, body(), BODY_INK);
                        if let Some(tech) = join_technologies(&entry.technologies) {
                            canvas.paragraph(&format!("Technologies: {tech}"), meta(), MUTED_INK);
                        }
                        canvas.gap(8.0);
                    }
                }
                Section::Education => {
                    for entry in data.education.iter().filter(|e| !e.is_empty()) {
                        canvas.entry_heading(
                            &entry.title(),
                            &entry.institution,
                            entry.date_range().as_deref(),
                        );
                        if !entry.gpa.trim().is_empty() {
                            canvas.paragraph(&format!("GPA: {}", entry.gpa.trim()), meta(), MUTED_INK);
                        }
                        canvas.gap(8.0);
                    }
                }
                Section::Skills => {
                    for group in data.skill_groups() {
                        canvas.paragraph(group.category, Font::new(FontStyle::Bold, px_to_pt(BODY_PX)), INK);
                        canvas.paragraph(&group.summary(), body(), BODY_INK);
                        canvas.gap(4.0);
                    }
                }
                Section::Projects => {
                    for project in data.projects.iter().filter(|p| !p.is_empty()) {
                        canvas.paragraph(&project.name, heading(), INK);
                        canvas.paragraph(&project.description, body(), BODY_INK);
                        if let Some(tech) = join_technologies(&project.technologies) {
                            canvas.paragraph(&format!("Technologies: {tech}"), meta(), MUTED_INK);
                        }
                        canvas.paragraph(&project.link, meta(), ACCENT);
                        canvas.gap(8.0);
                    }
                }
                Section::Certifications => {
                    for cert in data.certifications.iter().filter(|c| !c.is_empty()) {
                        let date = (!cert.date.trim().is_empty()).then(|| cert.date.trim());
                        canvas.entry_heading(&cert.name, &cert.issuer, date);
                        canvas.paragraph(&cert.link, meta(), ACCENT);
                        canvas.gap(8.0);
                    }
                }
            }
        }

        let content_height = canvas.cursor + PADDING_PX;
        RenderedView {
            body: canvas.body,
            content_height,
            sections,
            style: self.style,
            ready,
        }
    }
}

fn px_to_pt(px: f32) -> f32 {
    px * 0.75
}

fn body() -> Font {
    Font::new(FontStyle::Regular, px_to_pt(BODY_PX))
}

fn meta() -> Font {
    Font::new(FontStyle::Regular, px_to_pt(META_PX))
}

fn heading() -> Font {
    Font::new(FontStyle::Bold, px_to_pt(HEADING_PX))
}

/// Top-down SVG builder with a vertical cursor in CSS pixels.
struct Canvas {
    body: String,
    cursor: f32,
}

impl Canvas {
    fn new() -> Self {
        Self {
            body: String::new(),
            cursor: PADDING_PX,
        }
    }

    fn content_width() -> f32 {
        VIEW_WIDTH_PX - 2.0 * PADDING_PX
    }

    fn header(&mut self, data: &ResumeData) {
        self.line(data.full_name(), Font::new(FontStyle::Bold, px_to_pt(NAME_PX)), INK, PADDING_PX, "start");
        if let Some(contact) = data.personal_info.contact_line() {
            self.paragraph(&contact, meta(), MUTED_INK);
        }
        self.gap(6.0);
    }

    fn section_title(&mut self, title: &str) {
        self.gap(10.0);
        self.line(title, Font::new(FontStyle::Bold, px_to_pt(SECTION_PX)), ACCENT, PADDING_PX, "start");
        let _ = write!(
            self.body,
            r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="1.50" fill="{ACCENT}"/>"#,
            PADDING_PX,
            self.cursor,
            Self::content_width()
        );
        self.gap(8.0);
    }

    /// Title line, then the organisation with its dates right-aligned.
    fn entry_heading(&mut self, title: &str, organisation: &str, dates: Option<&str>) {
        self.paragraph(title, heading(), INK);
        let organisation = organisation.trim();
        if organisation.is_empty() && dates.is_none() {
            return;
        }
        let top = self.cursor;
        if let Some(dates) = dates {
            self.line(dates, meta(), MUTED_INK, VIEW_WIDTH_PX - PADDING_PX, "end");
            self.cursor = top;
        }
        if organisation.is_empty() {
            self.advance(META_PX);
        } else {
            self.line(organisation, body(), BODY_INK, PADDING_PX, "start");
        }
    }

    fn paragraph(&mut self, text: &str, font: Font, fill: &str) {
        for line in wrap_px(text.trim(), font, Self::content_width()) {
            self.line(&line, font, fill, PADDING_PX, "start");
        }
    }

    fn line(&mut self, text: &str, font: Font, fill: &str, x: f32, anchor: &str) {
        if text.trim().is_empty() {
            return;
        }
        let size_px = font.size_pt / 0.75;
        let baseline = self.cursor + size_px;
        let _ = write!(
            self.body,
            r#"<text x="{x:.2}" y="{baseline:.2}" font-family="{FONT_FAMILY}" font-size="{size_px:.2}" font-weight="{}" fill="{fill}" text-anchor="{anchor}">{}</text>"#,
            font.style.css_weight(),
            escape_xml(text)
        );
        self.advance(size_px);
    }

    fn advance(&mut self, size_px: f32) {
        self.cursor += size_px * LINE_SPACING;
    }

    fn gap(&mut self, px: f32) {
        self.cursor += px;
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c if c.is_control() => {}
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExperienceEntry, Skill};
    use pretty_assertions::assert_eq;

    fn sample() -> ResumeData {
        let mut data = ResumeData::default();
        data.personal_info.full_name = "Jane Q. Public".to_string();
        data.personal_info.email = "jane@example.com".to_string();
        data.summary = "Engineer <systems> & tooling.".to_string();
        data.experience.push(ExperienceEntry {
            company: "Acme".to_string(),
            position: "Staff Engineer".to_string(),
            start_date: "2020-01".to_string(),
            current: true,
            description: "Built the export pipeline.".to_string(),
            technologies: vec!["Rust".to_string()],
            ..Default::default()
        });
        data.skills.push(Skill {
            name: "Rust".to_string(),
            category: "Languages".to_string(),
            level: 5,
            ..Default::default()
        });
        data
    }

    #[test]
    fn test_render_is_deterministic() {
        let renderer = ResumeDocumentRenderer::new();
        let first = renderer.render(&sample());
        let second = renderer.render(&sample());

        assert_eq!(first.to_svg(), second.to_svg());
        assert_eq!(first.sections(), second.sections());
        assert_eq!(first.content_height(), second.content_height());
    }

    #[test]
    fn test_empty_sections_are_omitted() {
        let view = ResumeDocumentRenderer::new().render(&sample());

        assert_eq!(
            view.sections(),
            &[Section::Summary, Section::Experience, Section::Skills]
        );
        assert!(view.markup().contains("Work Experience"));
        assert!(!view.markup().contains("Education"));
        assert!(!view.markup().contains("Certifications"));
        assert!(view.markup().contains("2020-01 - Present"));
    }

    #[test]
    fn test_text_is_escaped() {
        let view = ResumeDocumentRenderer::new().render(&sample());
        assert!(view.markup().contains("Engineer &lt;systems&gt; &amp; tooling."));
    }

    #[test]
    fn test_name_only_renders_header() {
        let mut data = ResumeData::default();
        data.personal_info.full_name = "Alex".to_string();
        let view = ResumeDocumentRenderer::new().render(&data);

        assert!(view.sections().is_empty());
        assert_eq!(view.markup().matches("<text").count(), 1);
        assert!(view.content_height() > 0.0);
    }

    #[test]
    fn test_fixed_height_box_clips_capture() {
        let renderer = ResumeDocumentRenderer::with_style(ViewStyle::preview_pane(100.0));
        let view = renderer.render(&sample());

        assert_eq!(view.box_size(), (VIEW_WIDTH_PX, 100.0));
        assert!(view.to_svg().contains("clip-path"));
    }

    #[test]
    fn test_style_override_restores_on_drop() {
        let renderer = ResumeDocumentRenderer::with_style(ViewStyle::preview_pane(100.0));
        let mut view = renderer.render(&sample());
        let full_height = view.content_height();

        {
            let guard = view.override_style(ViewStyle::FULL_CONTENT);
            assert_eq!(guard.box_size(), (VIEW_WIDTH_PX, full_height));
            assert_eq!(guard.saved(), ViewStyle::preview_pane(100.0));
        }
        assert_eq!(view.style, ViewStyle::preview_pane(100.0));
    }

    #[tokio::test]
    async fn test_pending_view_waits_for_signal() {
        let (view, handle) = ResumeDocumentRenderer::new().render_pending(&sample());
        assert!(!view.is_ready());

        handle.mark_ready();
        assert!(view.wait_ready().await);
        assert!(view.is_ready());
    }

    #[tokio::test]
    async fn test_abandoned_loader_is_not_ready() {
        let (view, handle) = ResumeDocumentRenderer::new().render_pending(&sample());
        drop(handle);
        assert!(!view.wait_ready().await);
    }
}
