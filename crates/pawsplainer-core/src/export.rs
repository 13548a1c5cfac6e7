//! Writes slides to disk as they arrive
//!
//! Each request gets its own directory holding one image per slide and a
//! `slides.md` index pairing every caption with its picture.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::explain::SlideSink;
use crate::fragment::{ImageData, Slide};

pub const INDEX_FILE: &str = "slides.md";

/// File name of the image for the slide at `index` (zero based)
pub fn slide_file_name(index: usize, image: &ImageData) -> String {
    format!("slide-{:02}.{}", index + 1, image.extension())
}

pub struct SlideExporter {
    dir: PathBuf,
    question: String,
    entries: Vec<(String, String)>,
}

impl SlideExporter {
    /// Create a fresh timestamped directory under `root`
    pub fn create(root: &Path, question: &str) -> Result<Self> {
        let stamp = Local::now().format("%Y%m%d-%H%M%S-%3f").to_string();
        let dir = root.join(stamp);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create slide directory {}", dir.display()))?;

        Ok(Self {
            dir,
            question: question.to_string(),
            entries: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn write_index(&self) -> Result<PathBuf> {
        let mut index = format!("# {}\n", self.question.trim());
        for (caption, file_name) in &self.entries {
            index.push_str(&format!("\n![]({})\n\n{}\n", file_name, caption.trim()));
        }

        let path = self.dir.join(INDEX_FILE);
        fs::write(&path, index)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl SlideSink for SlideExporter {
    fn on_slide(&mut self, index: usize, slide: &Slide) -> Result<()> {
        let file_name = slide_file_name(index, &slide.image);
        let path = self.dir.join(&file_name);
        fs::write(&path, &slide.image.bytes)
            .with_context(|| format!("Failed to save slide image {}", path.display()))?;
        self.entries.push((slide.caption.clone(), file_name));
        Ok(())
    }

    fn on_finished(&mut self, slides: usize) -> Result<()> {
        let path = self.write_index()?;
        info!(slides, index = %path.display(), "slides exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(caption: &str, mime: &str) -> Slide {
        Slide {
            caption: caption.to_string(),
            image: ImageData::new(vec![0x89, b'P', b'N', b'G'], mime),
        }
    }

    #[test]
    fn test_file_names_are_one_based_with_extension() {
        let png = ImageData::new(Vec::new(), "image/png");
        let jpeg = ImageData::new(Vec::new(), "image/jpeg");
        assert_eq!(slide_file_name(0, &png), "slide-01.png");
        assert_eq!(slide_file_name(11, &jpeg), "slide-12.jpg");
    }

    #[test]
    fn test_exports_images_and_index() {
        let root = tempfile::tempdir().unwrap();
        let mut exporter = SlideExporter::create(root.path(), "What is DNS?").unwrap();
        assert!(exporter.dir().starts_with(root.path()));

        exporter.on_slide(0, &slide("Puppies ask for directions.", "image/png")).unwrap();
        exporter.on_slide(1, &slide("A big dog knows every street.", "image/jpeg")).unwrap();
        exporter.on_finished(2).unwrap();

        let first = fs::read(exporter.dir().join("slide-01.png")).unwrap();
        assert_eq!(first, vec![0x89, b'P', b'N', b'G']);
        assert!(exporter.dir().join("slide-02.jpg").exists());

        let index = fs::read_to_string(exporter.dir().join(INDEX_FILE)).unwrap();
        assert!(index.starts_with("# What is DNS?\n"));
        assert!(index.contains("![](slide-01.png)\n\nPuppies ask for directions."));
        assert!(index.contains("![](slide-02.jpg)\n\nA big dog knows every street."));
    }

    #[test]
    fn test_empty_request_still_writes_index() {
        let root = tempfile::tempdir().unwrap();
        let mut exporter = SlideExporter::create(root.path(), "q").unwrap();
        exporter.on_finished(0).unwrap();
        let index = fs::read_to_string(exporter.dir().join(INDEX_FILE)).unwrap();
        assert_eq!(index, "# q\n");
    }
}
