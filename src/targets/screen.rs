//! Screen capture targets.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::capture::ImageFormat;
use crate::store::{self, BootstrapEnv, StoreError, StoreRecord};
use crate::targets::{Target, TargetCollection};
use crate::utils;

/// Image quality for bootstrapped targets.
pub const DEFAULT_QUALITY: u8 = 100;

/// Resolution scale percentage for bootstrapped targets.
pub const DEFAULT_SCALE: u32 = 100;

/// A capturable screen: the active window (`component == 0`) or a specific
/// enumerated display (`component >= 1`).
///
/// `Default` produces the type-default staging value the store fills during
/// parsing; real targets come from [`Screen::for_display`] or the edit dialog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Screen {
    pub view_id: Uuid,
    pub name: String,
    /// Destination-folder template.
    pub folder: String,
    /// Filename macro template.
    pub macro_template: String,
    pub component: i32,
    pub format: ImageFormat,
    /// 0-100.
    pub quality: u8,
    /// Resolution scale percentage, > 0 for valid targets.
    pub scale: u32,
    /// Composite the mouse cursor into the grab.
    pub mouse: bool,
    /// Participates in capture passes.
    pub active: bool,
}

impl Screen {
    /// Default target for a detected display, used when no store file exists.
    pub fn for_display(number: u32, screenshots_folder: &str, filename_macro: &str) -> Self {
        Self {
            view_id: Uuid::new_v4(),
            name: format!("Screen {number}"),
            folder: screenshots_folder.to_string(),
            macro_template: filename_macro.to_string(),
            component: number as i32,
            format: ImageFormat::default(),
            quality: DEFAULT_QUALITY,
            scale: DEFAULT_SCALE,
            mouse: true,
            active: true,
        }
    }
}

impl Target for Screen {
    fn view_id(&self) -> Uuid {
        self.view_id
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl StoreRecord for Screen {
    const LIST_TAG: &'static str = "screens";
    const ENTRY_TAG: &'static str = "screen";

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
            "component" => self.component = store::parse_num(tag, value)?,
            "format" => self.format = store::parse_format(tag, value)?,
            "quality" => self.quality = store::parse_num(tag, value)?,
            "scale" => self.scale = store::parse_num(tag, value)?,
            "mouse" => self.mouse = store::parse_bool(tag, value)?,
            // Unknown tags leave fields at their defaults.
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
            ("component", self.component.to_string()),
            ("format", self.format.name().to_string()),
            ("quality", self.quality.to_string()),
            ("scale", self.scale.to_string()),
            ("mouse", self.mouse.to_string()),
        ]
    }

    fn bootstrap(env: &BootstrapEnv) -> Vec<Self> {
        (1..=env.displays.len() as u32)
            .map(|number| {
                Screen::for_display(number, &env.screenshots_folder, &env.filename_macro)
            })
            .collect()
    }
}

impl TargetCollection<Screen> {
    /// Look up a screen by its component index. Component uniqueness is a
    /// caller responsibility; the first match wins.
    pub fn get_by_component(&self, component: i32) -> Option<&Screen> {
        self.iter().find(|screen| screen.component == component)
    }
}
