use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AssetError;

/// Logical names the renderer looks up
pub mod names {
    /// Vertex shader shared by both pipelines
    pub const SCENE_VERTEX_SHADER: &str = "shader.scene.vert";
    /// Fragment shader of the opaque pipeline
    pub const OPAQUE_FRAGMENT_SHADER: &str = "shader.opaque.frag";
    /// Fragment shader of the alpha-blended pipeline
    pub const ALPHA_FRAGMENT_SHADER: &str = "shader.alpha.frag";
    /// Ground plane texture
    pub const FLOOR_TEXTURE: &str = "texture.floor";
    /// Billboard sprite texture
    pub const SPRITE_TEXTURE: &str = "texture.sprite";
}

/// Mapping from logical asset name to file path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetManifest {
    entries: BTreeMap<String, PathBuf>,
}

impl Default for AssetManifest {
    fn default() -> Self {
        [
            (names::SCENE_VERTEX_SHADER, "target/shaders/scene.spv"),
            (names::OPAQUE_FRAGMENT_SHADER, "target/shaders/opaque.spv"),
            (names::ALPHA_FRAGMENT_SHADER, "target/shaders/alpha.spv"),
            (names::FLOOR_TEXTURE, "billboard_app/resources/textures/asphalt.png"),
            (names::SPRITE_TEXTURE, "billboard_app/resources/textures/explosion.png"),
        ]
        .into_iter()
        .collect()
    }
}

impl AssetManifest {
    /// Manifest with no entries
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, path: impl Into<PathBuf>) {
        self.entries.insert(name.into(), path.into());
    }

    /// Resolve a logical name to its file path
    pub fn resolve(&self, name: &str) -> Result<&Path, AssetError> {
        self.entries
            .get(name)
            .map(PathBuf::as_path)
            .ok_or_else(|| AssetError::UnknownAsset(name.to_string()))
    }

    /// Iterate entries in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.entries.iter().map(|(name, path)| (name.as_str(), path.as_path()))
    }
}

impl<N: Into<String>, P: Into<PathBuf>> FromIterator<(N, P)> for AssetManifest {
    fn from_iter<I: IntoIterator<Item = (N, P)>>(iter: I) -> Self {
        let mut manifest = Self::empty();
        for (name, path) in iter {
            manifest.insert(name, path);
        }
        manifest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_covers_every_name() {
        let manifest = AssetManifest::default();
        for name in [
            names::SCENE_VERTEX_SHADER,
            names::OPAQUE_FRAGMENT_SHADER,
            names::ALPHA_FRAGMENT_SHADER,
            names::FLOOR_TEXTURE,
            names::SPRITE_TEXTURE,
        ] {
            assert!(manifest.resolve(name).is_ok(), "missing {name}");
        }
    }

    #[test]
    fn test_unknown_name() {
        let manifest = AssetManifest::empty();
        assert!(matches!(
            manifest.resolve(names::FLOOR_TEXTURE),
            Err(AssetError::UnknownAsset(name)) if name == names::FLOOR_TEXTURE
        ));
    }

    #[test]
    fn test_insert_overrides() {
        let mut manifest = AssetManifest::default();
        manifest.insert(names::SPRITE_TEXTURE, "custom/sprite.png");
        assert_eq!(
            manifest.resolve(names::SPRITE_TEXTURE).unwrap(),
            Path::new("custom/sprite.png")
        );
    }
}
