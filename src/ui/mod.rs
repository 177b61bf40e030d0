/// User interface widgets
///
/// - Lens panel for manual lens assignment (lens_panel.rs)

pub mod lens_panel;
