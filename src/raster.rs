//! Raster export: capture the rendered view as a bitmap and place it on a page.

use crate::artifact::{raster_filename, ExportArtifact, ExportMode};
use crate::config::ExportConfig;
use crate::error::CaptureError;
use crate::model::ResumeData;
use crate::render::{RenderedView, ViewStyle};
use crate::writer::{Bitmap, PageFormat, Placement, WriterFactory};
use async_trait::async_trait;
use resvg::tiny_skia;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use usvg::fontdb;

/// Turns a rendered view into pixels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Captures the view's current box at `scale` device pixels per CSS pixel.
    async fn capture(&self, view: &RenderedView, scale: f32) -> Result<Bitmap, CaptureError>;
}

/// Rasterizer backed by usvg/resvg.
pub struct ResvgRasterizer {
    fontdb: Arc<fontdb::Database>,
}

impl ResvgRasterizer {
    /// Creates a rasterizer with the system fonts loaded.
    pub fn new() -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        info!(faces = db.len(), "Loaded system fonts for capture");
        Self::with_fontdb(Arc::new(db))
    }

    pub fn with_fontdb(fontdb: Arc<fontdb::Database>) -> Self {
        Self { fontdb }
    }
}

impl Default for ResvgRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Rasterizer for ResvgRasterizer {
    async fn capture(&self, view: &RenderedView, scale: f32) -> Result<Bitmap, CaptureError> {
        let svg = view.to_svg();
        let fontdb = self.fontdb.clone();
        tokio::task::spawn_blocking(move || rasterize(&svg, fontdb, scale))
            .await
            .map_err(|e| CaptureError::Rasterize(format!("capture task failed: {e}")))?
    }
}

fn rasterize(svg: &str, fontdb: Arc<fontdb::Database>, scale: f32) -> Result<Bitmap, CaptureError> {
    let options = usvg::Options {
        fontdb,
        ..usvg::Options::default()
    };
    let tree = usvg::Tree::from_str(svg, &options)
        .map_err(|e| CaptureError::Rasterize(format!("failed to parse view: {e}")))?;

    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;
    if width == 0 || height == 0 {
        return Err(CaptureError::EmptyCapture { width, height });
    }

    let mut pixmap = tiny_skia::Pixmap::new(width, height).ok_or_else(|| {
        CaptureError::Rasterize(format!("cannot allocate a {width}x{height} pixmap"))
    })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    let rgb = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue()]
        })
        .collect();

    debug!(width, height, "View rasterized");
    Ok(Bitmap::new(width, height, rgb)?)
}

/// How long to wait for a view's fonts and images before capturing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Readiness {
    pub settle_delay: Duration,
    pub timeout: Duration,
}

impl Readiness {
    pub async fn wait(&self, view: &RenderedView) -> Result<(), CaptureError> {
        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }
        match tokio::time::timeout(self.timeout, view.wait_ready()).await {
            Ok(true) => Ok(()),
            _ => Err(CaptureError::NotReady(self.timeout.as_millis() as u64)),
        }
    }
}

/// Centres the bitmap on the page, fitting its width unless it is
/// proportionally taller than the page, in which case its height is fitted.
pub fn fit_to_page(bitmap: &Bitmap, format: PageFormat) -> Placement {
    let ratio = bitmap.aspect_ratio();
    let (width_mm, height_mm) = if ratio > format.aspect_ratio() {
        (format.height_mm / ratio, format.height_mm)
    } else {
        (format.width_mm, format.width_mm * ratio)
    };
    Placement {
        x_mm: (format.width_mm - width_mm) / 2.0,
        y_mm: (format.height_mm - height_mm) / 2.0,
        width_mm,
        height_mm,
    }
}

pub struct RasterExportStrategy {
    rasterizer: Arc<dyn Rasterizer>,
    writers: Arc<dyn WriterFactory>,
    format: PageFormat,
    scale: f32,
    readiness: Readiness,
}

impl RasterExportStrategy {
    /// Creates a strategy that captures through `rasterizer` and assembles
    /// pages with documents from `writers`, using the scale, page format and
    /// readiness bounds from `config`.
    pub fn new(
        rasterizer: Arc<dyn Rasterizer>,
        writers: Arc<dyn WriterFactory>,
        config: &ExportConfig,
    ) -> Self {
        Self {
            rasterizer,
            writers,
            format: config.page_format(),
            scale: config.raster_scale,
            readiness: Readiness {
                settle_delay: config.settle_delay(),
                timeout: config.readiness_timeout(),
            },
        }
    }

    /// Captures `view` and embeds it in a one-page document.
    ///
    /// The view is switched to full-content styling for the capture only; its
    /// original style is back in place when this returns, on every path.
    ///
    /// # Arguments
    ///
    /// * `data` - Resume the view was rendered from; names the artifact
    /// * `view` - Rendered view to capture, if one is mounted
    ///
    /// # Errors
    ///
    /// - `MissingElement` when there is no view
    /// - `NotReady` when the view does not signal readiness in time
    /// - `Rasterize` / `EmptyCapture` when capture yields no usable bitmap
    /// - `Writer` when the bitmap cannot be embedded or the PDF encoded
    pub async fn export(
        &self,
        data: &ResumeData,
        view: Option<&mut RenderedView>,
    ) -> Result<ExportArtifact, CaptureError> {
        let view = view.ok_or(CaptureError::MissingElement)?;
        self.readiness.wait(view).await?;

        // Capture with the box expanded to the whole content
        let bitmap = {
            let expanded = view.override_style(ViewStyle::FULL_CONTENT);
            self.rasterizer.capture(&expanded, self.scale).await?
        };
        if bitmap.is_empty() {
            return Err(CaptureError::EmptyCapture {
                width: bitmap.width,
                height: bitmap.height,
            });
        }

        // Place on a single page, aspect preserved
        let placement = fit_to_page(&bitmap, self.format);
        let mut writer = self.writers.create(self.format);
        writer.draw_image(&bitmap, placement)?;
        let page_count = writer.page_count();
        let bytes = writer.finish()?;

        debug!(
            width = bitmap.width,
            height = bitmap.height,
            bytes = bytes.len(),
            "Raster document assembled"
        );
        Ok(ExportArtifact {
            filename: raster_filename(data.full_name()),
            bytes,
            page_count,
            mode: ExportMode::Raster,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ResumeDocumentRenderer, VIEW_WIDTH_PX};
    use crate::writer::LopdfWriterFactory;
    use pretty_assertions::assert_eq;

    fn resume(name: &str) -> ResumeData {
        let mut data = ResumeData::default();
        data.personal_info.full_name = name.to_string();
        data
    }

    fn strategy(rasterizer: impl Rasterizer + 'static, config: &ExportConfig) -> RasterExportStrategy {
        RasterExportStrategy::new(Arc::new(rasterizer), Arc::new(LopdfWriterFactory), config)
    }

    fn white(width: u32, height: u32) -> Bitmap {
        Bitmap::new(width, height, vec![255; (width * height * 3) as usize]).unwrap()
    }

    #[test]
    fn test_fit_wide_image_to_width() {
        let placement = fit_to_page(&white(200, 100), PageFormat::A4);
        assert_eq!(placement.width_mm, 210.0);
        assert_eq!(placement.height_mm, 105.0);
        assert_eq!(placement.x_mm, 0.0);
        assert_eq!(placement.y_mm, 96.0);
    }

    #[test]
    fn test_fit_tall_image_to_height() {
        let placement = fit_to_page(&white(100, 600), PageFormat::A4);
        assert_eq!(placement.height_mm, 297.0);
        assert!((placement.width_mm - 49.5).abs() < 1e-4);
        assert!((placement.x_mm - 80.25).abs() < 1e-4);
        assert_eq!(placement.y_mm, 0.0);
    }

    #[tokio::test]
    async fn test_capture_uses_full_content_style_and_restores_it() {
        let pane = ViewStyle::preview_pane(120.0);
        let mut view = ResumeDocumentRenderer::with_style(pane).render(&resume("Alex"));

        let mut rasterizer = MockRasterizer::new();
        rasterizer
            .expect_capture()
            .withf(|view, scale| view.style == ViewStyle::FULL_CONTENT && *scale == 2.0)
            .times(1)
            .returning(|_, _| Ok(white(20, 10)));

        let artifact = strategy(rasterizer, &ExportConfig::default())
            .export(&resume("Alex"), Some(&mut view))
            .await
            .unwrap();

        assert_eq!(artifact.filename, "Alex.pdf");
        assert_eq!(artifact.mode, ExportMode::Raster);
        assert_eq!(artifact.page_count, 1);
        assert!(artifact.bytes.starts_with(b"%PDF"));
        assert_eq!(view.style, pane);
    }

    #[tokio::test]
    async fn test_style_restored_when_capture_fails() {
        let pane = ViewStyle::preview_pane(120.0);
        let mut view = ResumeDocumentRenderer::with_style(pane).render(&resume("Alex"));

        let mut rasterizer = MockRasterizer::new();
        rasterizer
            .expect_capture()
            .times(1)
            .returning(|_, _| Err(CaptureError::Rasterize("tainted canvas".to_string())));

        let result = strategy(rasterizer, &ExportConfig::default())
            .export(&resume("Alex"), Some(&mut view))
            .await;

        assert!(matches!(result, Err(CaptureError::Rasterize(_))));
        assert_eq!(view.style, pane);
    }

    #[tokio::test]
    async fn test_missing_view_fails_without_capture() {
        let mut rasterizer = MockRasterizer::new();
        rasterizer.expect_capture().never();

        let result = strategy(rasterizer, &ExportConfig::default())
            .export(&resume("Alex"), None)
            .await;

        assert!(matches!(result, Err(CaptureError::MissingElement)));
    }

    #[tokio::test]
    async fn test_empty_bitmap_is_a_failure() {
        let mut view = ResumeDocumentRenderer::new().render(&resume("Alex"));
        let mut rasterizer = MockRasterizer::new();
        rasterizer
            .expect_capture()
            .returning(|_, _| Ok(Bitmap::new(0, 0, Vec::new()).unwrap()));

        let result = strategy(rasterizer, &ExportConfig::default())
            .export(&resume("Alex"), Some(&mut view))
            .await;

        assert!(matches!(result, Err(CaptureError::EmptyCapture { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unready_view_times_out() {
        let (mut view, _loader) = ResumeDocumentRenderer::new().render_pending(&resume("Alex"));
        let mut rasterizer = MockRasterizer::new();
        rasterizer.expect_capture().never();

        let config = ExportConfig {
            settle_delay_ms: 100,
            readiness_timeout_ms: 250,
            ..ExportConfig::default()
        };
        let result = strategy(rasterizer, &config)
            .export(&resume("Alex"), Some(&mut view))
            .await;

        assert!(matches!(result, Err(CaptureError::NotReady(250))));
    }

    #[tokio::test]
    async fn test_resvg_capture_is_oversampled() {
        let data = resume("Alex");
        let view = ResumeDocumentRenderer::new().render(&data);
        let rasterizer = ResvgRasterizer::with_fontdb(Arc::new(fontdb::Database::new()));

        let bitmap = rasterizer.capture(&view, 2.0).await.unwrap();

        assert_eq!(bitmap.width, (VIEW_WIDTH_PX * 2.0).ceil() as u32);
        // The markup rounds lengths to two decimals.
        let expected_height = (view.content_height() * 2.0).ceil() as u32;
        assert!(bitmap.height.abs_diff(expected_height) <= 1);
        assert_eq!(bitmap.rgb.len(), (bitmap.width * bitmap.height * 3) as usize);
    }
}
