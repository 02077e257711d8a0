//! Text-layout export: flows resume data straight into a paginated document.
//!
//! This path never touches the rendered view, so it works whenever the raster
//! capture cannot. Layout runs top-down with a cursor in millimetres; a block
//! that would end below the page-break line moves to a fresh page first.
//! Entry headings (title plus organisation line) are kept together, and a
//! section title always travels with its first entry. Body text may continue
//! on the next page line by line.

use crate::artifact::{text_filename, ExportArtifact, ExportMode};
use crate::config::{ExportConfig, TextLayoutConfig};
use crate::error::{LayoutError, WriterError};
use crate::model::{is_blank, join_technologies, ResumeData, Section};
use crate::typography::{wrap_mm, Font, FontStyle, MM_PER_PT};
use crate::writer::{DocumentWriter, PageFormat, WriterFactory};
use std::sync::Arc;
use tracing::debug;

/// Share of the font size above the baseline.
const ASCENT: f32 = 0.8;

pub struct TextLayoutExportStrategy {
    writers: Arc<dyn WriterFactory>,
    format: PageFormat,
    layout: TextLayoutConfig,
}

impl TextLayoutExportStrategy {
    /// Creates a strategy drawing into documents from `writers`, laid out
    /// with the page format and text metrics from `config`.
    pub fn new(writers: Arc<dyn WriterFactory>, config: &ExportConfig) -> Self {
        Self {
            writers,
            format: config.page_format(),
            layout: config.text_layout.clone(),
        }
    }

    /// Lays `data` out as flowed text: header, then each non-empty section
    /// in display order, starting a new page when the cursor passes the
    /// page-break line.
    ///
    /// # Errors
    ///
    /// Returns `LayoutError::Writer` if drawing or encoding the document
    /// fails. Resume content itself never causes an error.
    pub fn export(&self, data: &ResumeData) -> Result<ExportArtifact, LayoutError> {
        let mut flow = Flow {
            writer: self.writers.create(self.format),
            layout: &self.layout,
            format: self.format,
            cursor: self.layout.top_mm,
        };

        flow.header(data)?;

        // Sections flow on from the header; entries keep their headings together
        for section in data.sections() {
            let entries = self.entries(&flow, data, section);
            flow.section(section.title(), &entries)?;
        }

        let page_count = flow.writer.page_count();
        let bytes = flow.writer.finish()?;
        debug!(pages = page_count, bytes = bytes.len(), "Text document assembled");

        Ok(ExportArtifact {
            filename: text_filename(data.full_name()),
            bytes,
            page_count,
            mode: ExportMode::Text,
        })
    }

    fn entries(&self, flow: &Flow<'_>, data: &ResumeData, section: Section) -> Vec<Entry> {
        let layout = &self.layout;
        let title = Style::new(FontStyle::Bold, layout.heading_size_pt, layout.heading_line_mm);
        let body = Style::new(FontStyle::Regular, layout.body_size_pt, layout.body_line_mm);

        match section {
            Section::Summary => vec![Entry {
                heading: Vec::new(),
                body: flow.wrap(&data.summary, body),
            }],
            Section::Experience => data
                .experience
                .iter()
                .filter(|e| !e.is_empty())
                .map(|e| {
                    let mut heading = flow.wrap(&e.position, title);
                    heading.extend(flow.wrap(&joined(&e.company, e.date_range()), body));
                    let mut lines = flow.wrap(&e.description, body);
                    if let Some(tech) = join_technologies(&e.technologies) {
                        lines.extend(flow.wrap(&format!("Technologies: {tech}"), body));
                    }
                    Entry { heading, body: lines }
                })
                .collect(),
            Section::Education => data
                .education
                .iter()
                .filter(|e| !e.is_empty())
                .map(|e| {
                    let mut heading = flow.wrap(&e.title(), title);
                    heading.extend(flow.wrap(&joined(&e.institution, e.date_range()), body));
                    let lines = if is_blank(&e.gpa) {
                        Vec::new()
                    } else {
                        flow.wrap(&format!("GPA: {}", e.gpa.trim()), body)
                    };
                    Entry { heading, body: lines }
                })
                .collect(),
            Section::Skills => data
                .skill_groups()
                .iter()
                .map(|group| Entry {
                    heading: Vec::new(),
                    body: flow.wrap(&format!("{}: {}", group.category, group.summary()), body),
                })
                .collect(),
            Section::Projects => data
                .projects
                .iter()
                .filter(|p| !p.is_empty())
                .map(|p| {
                    let mut lines = flow.wrap(&p.description, body);
                    if let Some(tech) = join_technologies(&p.technologies) {
                        lines.extend(flow.wrap(&format!("Technologies: {tech}"), body));
                    }
                    lines.extend(flow.wrap(&p.link, body));
                    Entry {
                        heading: flow.wrap(&p.name, title),
                        body: lines,
                    }
                })
                .collect(),
            Section::Certifications => data
                .certifications
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| {
                    let date = (!is_blank(&c.date)).then(|| c.date.trim().to_string());
                    let mut heading = flow.wrap(&c.name, title);
                    heading.extend(flow.wrap(&joined(&c.issuer, date), body));
                    Entry {
                        heading,
                        body: flow.wrap(&c.link, body),
                    }
                })
                .collect(),
        }
    }
}

/// `"Acme | 2020 - Present"`, or whichever part is present.
fn joined(organisation: &str, dates: Option<String>) -> String {
    match (organisation.trim(), dates) {
        ("", None) => String::new(),
        ("", Some(dates)) => dates,
        (organisation, None) => organisation.to_string(),
        (organisation, Some(dates)) => format!("{organisation} | {dates}"),
    }
}

#[derive(Debug, Clone, Copy)]
struct Style {
    font: Font,
    line_mm: f32,
}

impl Style {
    fn new(style: FontStyle, size_pt: f32, line_mm: f32) -> Self {
        Self {
            font: Font::new(style, size_pt),
            line_mm,
        }
    }
}

#[derive(Debug, Clone)]
struct Line {
    text: String,
    style: Style,
}

/// One resume item: heading lines stay on one page, body lines flow.
#[derive(Debug, Clone, Default)]
struct Entry {
    heading: Vec<Line>,
    body: Vec<Line>,
}

impl Entry {
    /// Height that must fit before the entry may start on the current page.
    fn lead_height(&self) -> f32 {
        if self.heading.is_empty() {
            self.body.first().map(|l| l.style.line_mm).unwrap_or_default()
        } else {
            height(&self.heading)
        }
    }
}

fn height(lines: &[Line]) -> f32 {
    lines.iter().map(|l| l.style.line_mm).sum()
}

struct Flow<'a> {
    writer: Box<dyn DocumentWriter>,
    layout: &'a TextLayoutConfig,
    format: PageFormat,
    cursor: f32,
}

impl Flow<'_> {
    fn content_width(&self) -> f32 {
        self.format.width_mm - 2.0 * self.layout.margin_mm
    }

    fn wrap(&self, text: &str, style: Style) -> Vec<Line> {
        wrap_mm(text.trim(), style.font, self.content_width())
            .into_iter()
            .map(|text| Line { text, style })
            .collect()
    }

    /// Starts a new page unless `height_mm` still fits above the break line.
    /// A page that is still empty is never abandoned.
    fn ensure_room(&mut self, height_mm: f32) {
        let at_top = self.cursor <= self.layout.top_mm;
        if !at_top && self.cursor + height_mm > self.layout.page_break_mm {
            self.writer.add_page();
            self.cursor = self.layout.top_mm;
        }
    }

    fn write_line(&mut self, line: &Line) -> Result<(), WriterError> {
        let baseline = self.cursor + line.style.font.size_pt * MM_PER_PT * ASCENT;
        self.writer
            .draw_text(&line.text, line.style.font, self.layout.margin_mm, baseline)?;
        self.cursor += line.style.line_mm;
        Ok(())
    }

    fn write_together(&mut self, lines: &[Line]) -> Result<(), WriterError> {
        self.ensure_room(height(lines));
        lines.iter().try_for_each(|line| self.write_line(line))
    }

    fn write_flowing(&mut self, lines: &[Line]) -> Result<(), WriterError> {
        for line in lines {
            self.ensure_room(line.style.line_mm);
            self.write_line(line)?;
        }
        Ok(())
    }

    fn header(&mut self, data: &ResumeData) -> Result<(), WriterError> {
        let layout = self.layout;
        let name = Style::new(FontStyle::Bold, layout.name_size_pt, layout.name_line_mm);
        let body = Style::new(FontStyle::Regular, layout.body_size_pt, layout.body_line_mm);

        let mut lines = self.wrap(data.full_name(), name);
        if let Some(contact) = data.personal_info.contact_line() {
            lines.extend(self.wrap(&contact, body));
        }
        self.write_together(&lines)?;
        self.cursor += layout.section_gap_mm;
        Ok(())
    }

    fn section(&mut self, title: &str, entries: &[Entry]) -> Result<(), WriterError> {
        let Some(first) = entries.first() else {
            return Ok(());
        };
        let layout = self.layout;
        let title_lines = self.wrap(
            title,
            Style::new(FontStyle::Bold, layout.section_size_pt, layout.section_line_mm),
        );

        self.ensure_room(height(&title_lines) + first.lead_height());
        for line in &title_lines {
            self.write_line(line)?;
        }

        for (index, entry) in entries.iter().enumerate() {
            if index == 0 {
                // Room for the first heading was reserved with the title.
                for line in &entry.heading {
                    self.write_line(line)?;
                }
            } else {
                self.write_together(&entry.heading)?;
            }
            self.write_flowing(&entry.body)?;
            if !entry.heading.is_empty() {
                self.cursor += layout.block_gap_mm;
            }
        }
        self.cursor += layout.section_gap_mm;
        Ok(())
    }
}
