//! On-disk layout consumed by the browser player: `base.svg`, `deltas.json`, `metadata.json`.

use crate::{DeltaSet, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const FORMAT_VERSION: &str = "1.0";
pub const BASE_SVG_FILE: &str = "base.svg";
pub const DELTAS_FILE: &str = "deltas.json";
pub const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaMetadata {
    /// Frames including the base.
    pub frame_count: usize,
    pub delta_count: usize,
    pub fallback_count: usize,
    pub format_version: String,
    pub compression: String,
}

impl DeltaSet {
    pub fn metadata(&self) -> DeltaMetadata {
        DeltaMetadata {
            frame_count: self.frame_count(),
            delta_count: self.deltas.len(),
            fallback_count: self.fallback_count(),
            format_version: FORMAT_VERSION.to_string(),
            compression: "delta".to_string(),
        }
    }

    /// Writes the three files into `dir`, creating it if needed.
    pub fn write_to_dir(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        std::fs::write(dir.join(BASE_SVG_FILE), &self.base_svg)?;
        std::fs::write(dir.join(DELTAS_FILE), serde_json::to_vec(&self.deltas)?)?;
        std::fs::write(
            dir.join(METADATA_FILE),
            serde_json::to_vec_pretty(&self.metadata())?,
        )?;
        tracing::debug!(dir = %dir.display(), deltas = self.deltas.len(), "wrote delta files");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute_svg_deltas;

    #[test]
    fn writes_base_deltas_and_metadata() {
        let frames = [
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="line2d_1" opacity="1"/></svg>"#,
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g id="line2d_1" opacity="0"/></svg>"#,
        ];
        let set = compute_svg_deltas(&frames).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("anim");
        set.write_to_dir(&out).unwrap();

        let base = std::fs::read_to_string(out.join(BASE_SVG_FILE)).unwrap();
        assert_eq!(base, set.base_svg);

        let deltas = std::fs::read_to_string(out.join(DELTAS_FILE)).unwrap();
        assert!(!deltas.contains('\n'));
        let deltas: serde_json::Value = serde_json::from_str(&deltas).unwrap();
        assert_eq!(
            deltas,
            serde_json::json!([{ "frame": 1, "changes": { "line2d_1": { "opacity": "0" } } }])
        );

        let meta: DeltaMetadata =
            serde_json::from_slice(&std::fs::read(out.join(METADATA_FILE)).unwrap()).unwrap();
        assert_eq!(
            meta,
            DeltaMetadata {
                frame_count: 2,
                delta_count: 1,
                fallback_count: 0,
                format_version: "1.0".to_string(),
                compression: "delta".to_string(),
            }
        );
    }
}
