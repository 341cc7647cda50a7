use std::fmt;

use serde::Serialize;

use crate::io::image_dir::{ImageDir, file_stem as stem};

/// A navigation request that was valid but could not move the cursor.
/// These are reported to the user, never raised as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NavWarning {
    /// Already at the first image
    FirstImage,
    /// Already at the last image
    LastImage,
    /// No un-annotated image after the current one
    AllAnnotated,
    /// The directory has no images
    NoImages,
}

impl fmt::Display for NavWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            NavWarning::FirstImage => "this is the first image",
            NavWarning::LastImage => "this is the last image",
            NavWarning::AllAnnotated => "every remaining image is annotated",
            NavWarning::NoImages => "no images in this directory",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NavError {
    #[error("image not found in this directory: {0}")]
    UnknownImage(String),
    #[error("no image to annotate")]
    NoImage,
    #[error("directory scan failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of saving the annotation for the current image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub annotation: String,
    pub warnings: Vec<NavWarning>,
}

/// Counters shown alongside the cursor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavStatus {
    pub image_index: usize,
    pub annotation_file_index: usize,
    pub current: Option<String>,
    pub total: usize,
    pub annotated: usize,
    pub remaining: usize,
}

/// Session cursor over one directory's images and their annotation files.
///
/// Both indices move together under next/previous. Jumping to an
/// un-annotated or named image moves only `image_index`.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    images: Vec<String>,
    annotations: Vec<String>,
    image_index: usize,
    annotation_file_index: usize,
}

fn report(warning: NavWarning) -> Vec<NavWarning> {
    tracing::warn!(%warning, "navigation");
    vec![warning]
}

impl Navigator {
    pub fn from_lists(images: Vec<String>, annotations: Vec<String>) -> Self {
        Navigator {
            images,
            annotations,
            image_index: 0,
            annotation_file_index: 0,
        }
    }

    /// Scan `dir` and start at the first image
    pub fn open(dir: &dyn ImageDir) -> Result<Self, NavError> {
        Ok(Navigator::from_lists(dir.image_files()?, dir.annotation_files()?))
    }

    /// Re-scan `dir`, rebuild both lists and reset the cursor
    pub fn refresh(&mut self, dir: &dyn ImageDir) -> Result<(), NavError> {
        *self = Navigator::open(dir)?;
        tracing::debug!(images = self.images.len(), annotations = self.annotations.len(), "refreshed");
        Ok(())
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn annotations(&self) -> &[String] {
        &self.annotations
    }

    pub fn image_index(&self) -> usize {
        self.image_index
    }

    pub fn annotation_file_index(&self) -> usize {
        self.annotation_file_index
    }

    pub fn current_image(&self) -> Option<&str> {
        self.images.get(self.image_index).map(String::as_str)
    }

    pub fn is_annotated(&self, image: &str) -> bool {
        let image_stem = stem(image);
        self.annotations.iter().any(|a| stem(a) == image_stem)
    }

    pub fn next_image(&mut self) -> Vec<NavWarning> {
        if self.images.is_empty() {
            return report(NavWarning::NoImages);
        }
        if self.image_index + 1 >= self.images.len() {
            return report(NavWarning::LastImage);
        }
        self.image_index += 1;
        self.annotation_file_index += 1;
        Vec::new()
    }

    pub fn previous_image(&mut self) -> Vec<NavWarning> {
        if self.images.is_empty() {
            return report(NavWarning::NoImages);
        }
        if self.image_index == 0 {
            return report(NavWarning::FirstImage);
        }
        self.image_index -= 1;
        self.annotation_file_index = self.annotation_file_index.saturating_sub(1);
        Vec::new()
    }

    /// Index of the first image after the current one with no annotation
    pub fn next_unannotated(&self) -> Option<usize> {
        self.images
            .iter()
            .enumerate()
            .skip(self.image_index + 1)
            .find(|(_, image)| !self.is_annotated(image))
            .map(|(i, _)| i)
    }

    /// Move to the next un-annotated image. When there is none, warn and
    /// behave like [`next_image`](Self::next_image).
    pub fn jump_to_next_unannotated(&mut self) -> Vec<NavWarning> {
        match self.next_unannotated() {
            Some(index) => {
                self.image_index = index;
                Vec::new()
            }
            None => {
                let mut warnings = report(NavWarning::AllAnnotated);
                warnings.extend(self.next_image());
                warnings
            }
        }
    }

    /// Move to a named image
    pub fn go_to(&mut self, image: &str) -> Result<(), NavError> {
        let index = self
            .images
            .iter()
            .position(|name| name == image)
            .ok_or_else(|| NavError::UnknownImage(image.to_string()))?;
        self.image_index = index;
        Ok(())
    }

    /// Persist the current image's annotation through `dir`, track the new
    /// file, then jump to the next un-annotated image
    pub fn save_annotation(&mut self, dir: &dyn ImageDir, content: &[u8]) -> Result<SaveOutcome, NavError> {
        let image = self.current_image().ok_or(NavError::NoImage)?.to_string();
        let annotation = dir.save_annotation(&image, content)?;
        if !self.annotations.contains(&annotation) {
            self.annotations.push(annotation.clone());
        }
        let warnings = self.jump_to_next_unannotated();
        Ok(SaveOutcome {
            annotation,
            warnings,
        })
    }

    pub fn status(&self) -> NavStatus {
        let total = self.images.len();
        let annotated = self.images.iter().filter(|i| self.is_annotated(i)).count();
        NavStatus {
            image_index: self.image_index,
            annotation_file_index: self.annotation_file_index,
            current: self.current_image().map(str::to_string),
            total,
            annotated,
            remaining: total - annotated,
        }
    }
}
