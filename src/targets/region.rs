//! Region capture targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::{ImageFormat, Rect};
use crate::store::{self, BootstrapEnv, StoreError, StoreRecord};
use crate::targets::Target;
use crate::utils;

/// A capturable rectangle on the virtual desktop. Shares every common field
/// with [`crate::targets::Screen`] but selects its area explicitly instead of
/// by component index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub view_id: Uuid,
    pub name: String,
    pub folder: String,
    pub macro_template: String,
    pub rect: Rect,
    pub format: ImageFormat,
    pub quality: u8,
    pub scale: u32,
    pub mouse: bool,
    pub active: bool,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            view_id: Uuid::nil(),
            name: String::new(),
            folder: String::new(),
            macro_template: String::new(),
            rect: Rect { x: 0, y: 0, width: 0, height: 0 },
            format: ImageFormat::default(),
            quality: 0,
            scale: 0,
            mouse: false,
            active: false,
        }
    }
}

impl Target for Region {
    fn view_id(&self) -> Uuid {
        self.view_id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl StoreRecord for Region {
    const LIST_TAG: &'static str = "regions";
    const ENTRY_TAG: &'static str = "region";

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn apply_field(&mut self, tag: &str, value: &str) -> Result<(), StoreError> {
        match tag {
            "active" => self.active = store::parse_bool(tag, value)?,
            "id" => self.view_id = store::parse_uuid(tag, value)?,
            "name" => self.name = value.to_string(),
            "folder" => self.folder = value.to_string(),
            "macro" => self.macro_template = value.to_string(),
            "x" => self.rect.x = store::parse_num(tag, value)?,
            "y" => self.rect.y = store::parse_num(tag, value)?,
            "width" => self.rect.width = store::parse_num(tag, value)?,
            "height" => self.rect.height = store::parse_num(tag, value)?,
            "format" => self.format = store::parse_format(tag, value)?,
            "quality" => self.quality = store::parse_num(tag, value)?,
            "scale" => self.scale = store::parse_num(tag, value)?,
            "mouse" => self.mouse = store::parse_bool(tag, value)?,
            _ => {}
        }
        Ok(())
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("active", self.active.to_string()),
            ("id", self.view_id.to_string()),
            ("name", self.name.clone()),
            ("folder", utils::correct_folder_path(&self.folder)),
            ("macro", self.macro_template.clone()),
            ("x", self.rect.x.to_string()),
            ("y", self.rect.y.to_string()),
            ("width", self.rect.width.to_string()),
            ("height", self.rect.height.to_string()),
            ("format", self.format.name().to_string()),
            ("quality", self.quality.to_string()),
            ("scale", self.scale.to_string()),
            ("mouse", self.mouse.to_string()),
        ]
    }

    /// Regions are never synthesized: an absent file yields an empty
    /// collection.
    fn bootstrap(_env: &BootstrapEnv) -> Vec<Self> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BootstrapEnv;

    #[test]
    fn rectangle_fields_fill_the_rect() {
        let mut region = Region::default();
        region.apply_field("x", "-10").unwrap();
        region.apply_field("y", "20").unwrap();
        region.apply_field("width", "640").unwrap();
        region.apply_field("height", "480").unwrap();
        assert_eq!(region.rect, Rect { x: -10, y: 20, width: 640, height: 480 });
    }

    #[test]
    fn no_bootstrap_targets() {
        let env = BootstrapEnv {
            displays: Vec::new(),
            screenshots_folder: "shots/".to_string(),
            filename_macro: "%date%.%format%".to_string(),
        };
        assert!(Region::bootstrap(&env).is_empty());
    }
}
