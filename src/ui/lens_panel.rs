/// Lens panel
///
/// Dropdowns and toggles for manual lens assignment. The panel only holds
/// widget state; `options()` turns it into `ApplyOptions` when the user
/// clicks Apply.

use chrono::NaiveDateTime;
use iced::widget::{button, checkbox, column, pick_list, row, text, text_input};
use iced::{Alignment, Element, Length};

use crate::apply::ApplyOptions;
use crate::lens::tables::{FILM_CAMERAS, FILM_STOCKS};
use crate::lens::LensTables;
use crate::metadata::edit::EXIF_DATETIME_FORMAT;

#[derive(Debug, Clone, PartialEq)]
pub enum PanelMessage {
    PresetSelected(String),
    OverrideTimeToggled(bool),
    CaptureTimeChanged(String),
    CameraSelected(String),
    FilmStockSelected(String),
    /// Reset every choice
    Clear,
}

#[derive(Debug, Clone, Default)]
pub struct LensPanel {
    preset: Option<String>,
    override_time: bool,
    capture_time: String,
    camera: Option<String>,
    film_stock: Option<String>,
}

impl LensPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, message: PanelMessage) {
        match message {
            PanelMessage::PresetSelected(preset) => self.preset = Some(preset),
            PanelMessage::OverrideTimeToggled(enabled) => self.override_time = enabled,
            PanelMessage::CaptureTimeChanged(value) => self.capture_time = value,
            PanelMessage::CameraSelected(camera) => self.camera = Some(camera),
            PanelMessage::FilmStockSelected(stock) => self.film_stock = Some(stock),
            PanelMessage::Clear => *self = Self::default(),
        }
    }

    /// Snapshot the current choices for one apply run
    pub fn options(&self) -> Result<ApplyOptions, String> {
        let capture_time = if self.override_time {
            let value = self.capture_time.trim();
            let time = NaiveDateTime::parse_from_str(value, EXIF_DATETIME_FORMAT).map_err(|_| {
                format!(
                    "Capture time must look like 1985:06:21 14:30:00, got '{}'",
                    value
                )
            })?;
            Some(time)
        } else {
            None
        };

        Ok(ApplyOptions {
            preset: self.preset.clone(),
            capture_time,
            camera: self.camera.clone(),
            film_stock: self.film_stock.clone(),
        })
    }

    pub fn view(&self, tables: &LensTables) -> Element<'_, PanelMessage> {
        let presets: Vec<String> = tables.presets().iter().map(|p| p.id.clone()).collect();
        let cameras: Vec<String> = FILM_CAMERAS.iter().map(|c| c.to_string()).collect();
        let stocks: Vec<String> = FILM_STOCKS.iter().map(|s| s.to_string()).collect();

        let mut time_input = text_input("1985:06:21 14:30:00", &self.capture_time).width(220);
        if self.override_time {
            time_input = time_input.on_input(PanelMessage::CaptureTimeChanged);
        }

        column![
            text("Lens").size(20),
            pick_list(presets, self.preset.clone(), PanelMessage::PresetSelected)
                .placeholder("Lens preset")
                .width(Length::Fill),
            row![
                checkbox("Set capture time", self.override_time)
                    .on_toggle(PanelMessage::OverrideTimeToggled),
                time_input,
            ]
            .spacing(10)
            .align_y(Alignment::Center),
            text("Film").size(20),
            pick_list(cameras, self.camera.clone(), PanelMessage::CameraSelected)
                .placeholder("Camera")
                .width(Length::Fill),
            pick_list(stocks, self.film_stock.clone(), PanelMessage::FilmStockSelected)
                .placeholder("Film stock")
                .width(Length::Fill),
            button("Clear").on_press(PanelMessage::Clear).padding(6),
        ]
        .spacing(10)
        .width(320)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_empty_panel_gives_empty_options() {
        let options = LensPanel::new().options().unwrap();
        assert!(options.is_empty());
    }

    #[test]
    fn test_options_snapshot() {
        let mut panel = LensPanel::new();
        panel.update(PanelMessage::PresetSelected("Helios 44-2 58mm f/2".to_string()));
        panel.update(PanelMessage::CameraSelected("Zenit E".to_string()));
        panel.update(PanelMessage::FilmStockSelected("Kodak Gold 200".to_string()));
        panel.update(PanelMessage::OverrideTimeToggled(true));
        panel.update(PanelMessage::CaptureTimeChanged(" 1984:02:29 08:15:00 ".to_string()));

        let options = panel.options().unwrap();
        assert_eq!(options.preset.as_deref(), Some("Helios 44-2 58mm f/2"));
        assert_eq!(options.camera.as_deref(), Some("Zenit E"));
        assert_eq!(options.film_stock.as_deref(), Some("Kodak Gold 200"));
        assert_eq!(
            options.capture_time,
            NaiveDate::from_ymd_opt(1984, 2, 29)
                .unwrap()
                .and_hms_opt(8, 15, 0)
        );
    }

    #[test]
    fn test_capture_time_ignored_when_not_overridden() {
        let mut panel = LensPanel::new();
        panel.update(PanelMessage::CaptureTimeChanged("garbage".to_string()));
        assert_eq!(panel.options().unwrap().capture_time, None);
    }

    #[test]
    fn test_bad_capture_time_is_rejected() {
        let mut panel = LensPanel::new();
        panel.update(PanelMessage::OverrideTimeToggled(true));
        panel.update(PanelMessage::CaptureTimeChanged("1984-02-29".to_string()));
        assert!(panel.options().is_err());
    }

    #[test]
    fn test_clear() {
        let mut panel = LensPanel::new();
        panel.update(PanelMessage::PresetSelected("X".to_string()));
        panel.update(PanelMessage::Clear);
        assert!(panel.options().unwrap().is_empty());
    }
}
