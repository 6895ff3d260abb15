//! Skin directory layout

use std::path::{Path, PathBuf};

use super::{SkinError, XmlElement};
use crate::config::{SkinConfig, SkinResolution};
use crate::foundation::math::Resolution;

/// The active skin: root directory, resolution folders and media folder
#[derive(Debug, Clone)]
pub struct SkinInfo {
    root: PathBuf,
    resolutions: Vec<SkinResolution>,
    media_folder: String,
}

impl SkinInfo {
    /// Describe the skin named by the configuration
    pub fn new(config: &SkinConfig) -> Self {
        Self {
            root: config.path.clone(),
            resolutions: config.resolutions.clone(),
            media_folder: config.media_folder.clone(),
        }
    }

    /// Skin root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory textures are looked up in
    pub fn media_path(&self) -> PathBuf {
        self.root.join(&self.media_folder)
    }

    /// Resolution used when a window does not come from a resolution folder
    pub fn default_resolution(&self) -> Resolution {
        self.resolutions
            .first()
            .map_or_else(Resolution::default, |r| r.resolution)
    }

    /// Locate `xml_file`; the first resolution folder containing it wins.
    ///
    /// Absolute paths are used as-is with the default resolution.
    pub fn resolve(&self, xml_file: &str) -> Option<(PathBuf, Resolution)> {
        let direct = Path::new(xml_file);
        if direct.is_absolute() {
            return direct.is_file().then(|| (direct.to_path_buf(), self.default_resolution()));
        }
        self.resolutions.iter().find_map(|res| {
            let candidate = self.root.join(&res.folder).join(xml_file);
            candidate.is_file().then_some((candidate, res.resolution))
        })
    }

    /// Read and parse a window file, returning its root element and
    /// coordinate resolution
    pub fn load_window(&self, xml_file: &str) -> Result<(XmlElement, Resolution), SkinError> {
        let (path, resolution) = self
            .resolve(xml_file)
            .ok_or_else(|| SkinError::WindowNotFound(xml_file.to_string()))?;
        log::debug!("Loading window XML {:?} at {}x{}", path, resolution.width, resolution.height);

        let source = std::fs::read_to_string(&path)?;
        let root = XmlElement::parse(&source)?;
        if !root.name.eq_ignore_ascii_case("window") {
            return Err(SkinError::MissingRoot);
        }
        Ok((root, resolution))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skin_with(dir: &Path) -> SkinInfo {
        SkinInfo::new(&SkinConfig {
            path: dir.to_path_buf(),
            resolutions: vec![
                SkinResolution {
                    folder: "1080i".to_string(),
                    resolution: Resolution::HD_1080,
                },
                SkinResolution {
                    folder: "720p".to_string(),
                    resolution: Resolution::HD_720,
                },
            ],
            media_folder: "media".to_string(),
        })
    }

    #[test]
    fn test_first_resolution_folder_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("720p")).unwrap();
        std::fs::create_dir_all(dir.path().join("1080i")).unwrap();
        std::fs::write(dir.path().join("720p/Home.xml"), "<window/>").unwrap();
        std::fs::write(dir.path().join("720p/Only720.xml"), "<window/>").unwrap();
        std::fs::write(dir.path().join("1080i/Home.xml"), "<window/>").unwrap();

        let skin = skin_with(dir.path());
        assert_eq!(skin.resolve("Home.xml").unwrap().1, Resolution::HD_1080);
        assert_eq!(skin.resolve("Only720.xml").unwrap().1, Resolution::HD_720);
        assert!(skin.resolve("Missing.xml").is_none());
        assert_eq!(skin.media_path(), dir.path().join("media"));
    }

    #[test]
    fn test_load_window_rejects_other_roots() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("720p")).unwrap();
        std::fs::write(dir.path().join("720p/Bad.xml"), "<includes/>").unwrap();
        std::fs::write(dir.path().join("720p/Broken.xml"), "<window><controls>").unwrap();

        let skin = skin_with(dir.path());
        assert!(matches!(skin.load_window("Bad.xml"), Err(SkinError::MissingRoot)));
        assert!(matches!(skin.load_window("Broken.xml"), Err(SkinError::Xml { .. })));
        assert!(matches!(skin.load_window("Nope.xml"), Err(SkinError::WindowNotFound(_))));
    }
}
