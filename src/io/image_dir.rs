use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::io::workspace_io::atomic_write;
use crate::model::config::ImageConfig;
use crate::model::project::{DATA_GROUP, FileGroups};

/// Directory collaborator for an annotation session: lists the images to
/// walk through, lists the annotation files that already exist, and
/// persists new annotation artifacts.
pub trait ImageDir {
    /// Image file names, sorted
    fn image_files(&self) -> io::Result<Vec<String>>;
    /// Annotation file names that exist on disk, sorted
    fn annotation_files(&self) -> io::Result<Vec<String>>;
    /// Name of the annotation artifact that belongs to `image`
    fn annotation_file_name(&self, image: &str) -> String;
    /// Persist the annotation for `image`; returns the annotation file name
    fn save_annotation(&self, image: &str, content: &[u8]) -> io::Result<String>;
}

/// Images and labels in two (possibly identical) local directories
#[derive(Debug, Clone)]
pub struct FsImageDir {
    pub img_dir: PathBuf,
    pub label_dir: PathBuf,
    pub extensions: Vec<String>,
    pub annotation_extension: String,
}

impl FsImageDir {
    pub fn new(img_dir: &Path, label_dir: &Path, config: &ImageConfig) -> Self {
        FsImageDir {
            img_dir: img_dir.to_path_buf(),
            label_dir: label_dir.to_path_buf(),
            extensions: config.extensions.clone(),
            annotation_extension: config.annotation_extension.clone(),
        }
    }
}

impl ImageDir for FsImageDir {
    fn image_files(&self) -> io::Result<Vec<String>> {
        list_files(&self.img_dir, &self.extensions)
    }

    fn annotation_files(&self) -> io::Result<Vec<String>> {
        if !self.label_dir.is_dir() {
            return Ok(Vec::new());
        }
        list_files(&self.label_dir, std::slice::from_ref(&self.annotation_extension))
    }

    fn annotation_file_name(&self, image: &str) -> String {
        annotation_file_name(image, &self.annotation_extension)
    }

    fn save_annotation(&self, image: &str, content: &[u8]) -> io::Result<String> {
        fs::create_dir_all(&self.label_dir)?;
        let name = self.annotation_file_name(image);
        atomic_write(&self.label_dir.join(&name), content)?;
        tracing::info!(image, annotation = %name, "annotation saved");
        Ok(name)
    }
}

/// Name without its final extension: `img.0001.png` → `img.0001`.
/// Images and annotation files pair up by this stem.
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(name)
}

/// `<image stem>.<ext>`, e.g. `b.jpg` → `b.xml`
pub fn annotation_file_name(image: &str, extension: &str) -> String {
    format!("{}.{}", file_stem(image), extension)
}

/// Sorted names of the regular files in `dir` whose extension is in
/// `extensions` (case-insensitive)
pub fn list_files(dir: &Path, extensions: &[String]) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)));
        if matches && let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Data files for a new project: every image in `dir`, sorted, under the
/// `"."` group
pub fn data_files(dir: &Path, extensions: &[String]) -> io::Result<FileGroups> {
    let mut groups = FileGroups::new();
    groups.insert(DATA_GROUP.to_string(), list_files(dir, extensions)?);
    Ok(groups)
}

/// Minimal Pascal VOC document naming the image, used when a session saves
/// an annotation without box data of its own
pub fn empty_voc_annotation(image: &str) -> String {
    let escaped = image
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!(
        "<annotation>\n  <filename>{}</filename>\n</annotation>\n",
        escaped
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_annotation_file_name() {
        assert_eq!(annotation_file_name("b.jpg", "xml"), "b.xml");
        assert_eq!(annotation_file_name("noext", "xml"), "noext.xml");
    }

    #[test]
    fn test_dotted_names_keep_distinct_annotations() {
        assert_eq!(annotation_file_name("img.0001.png", "xml"), "img.0001.xml");
        assert_eq!(annotation_file_name("frame.001.jpg", "xml"), "frame.001.xml");
        assert_ne!(
            annotation_file_name("frame.001.jpg", "xml"),
            annotation_file_name("frame.002.jpg", "xml")
        );
        assert_eq!(file_stem("frame.001.xml"), "frame.001");
    }

    #[test]
    fn test_list_files_filters_and_sorts() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "c.jpg");
        touch(tmp.path(), "a.JPG");
        touch(tmp.path(), "b.png");
        touch(tmp.path(), "notes.txt");
        fs::create_dir(tmp.path().join("sub.jpg")).unwrap();

        let exts: Vec<String> = vec!["jpg".into(), "png".into()];
        let names = list_files(tmp.path(), &exts).unwrap();
        assert_eq!(names, vec!["a.JPG", "b.png", "c.jpg"]);
    }

    #[test]
    fn test_data_files_group() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "b.jpg");
        touch(tmp.path(), "a.jpg");
        let groups = data_files(tmp.path(), &["jpg".to_string()]).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups["."], vec!["a.jpg", "b.jpg"]);
    }

    #[test]
    fn test_fs_image_dir_round_trip() {
        let tmp = TempDir::new().unwrap();
        let images = tmp.path().join("images");
        let labels = tmp.path().join("labels");
        fs::create_dir_all(&images).unwrap();
        touch(&images, "a.jpg");
        touch(&images, "b.jpg");

        let dir = FsImageDir::new(&images, &labels, &ImageConfig::default());
        assert_eq!(dir.image_files().unwrap(), vec!["a.jpg", "b.jpg"]);
        assert!(dir.annotation_files().unwrap().is_empty());

        let name = dir
            .save_annotation("b.jpg", empty_voc_annotation("b.jpg").as_bytes())
            .unwrap();
        assert_eq!(name, "b.xml");
        assert_eq!(dir.annotation_files().unwrap(), vec!["b.xml"]);
        let written = fs::read_to_string(labels.join("b.xml")).unwrap();
        assert!(written.contains("<filename>b.jpg</filename>"));
    }

    #[test]
    fn test_shared_image_and_label_dir() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.jpg");
        touch(tmp.path(), "a.xml");
        let dir = FsImageDir::new(tmp.path(), tmp.path(), &ImageConfig::default());
        assert_eq!(dir.image_files().unwrap(), vec!["a.jpg"]);
        assert_eq!(dir.annotation_files().unwrap(), vec!["a.xml"]);
    }
}
