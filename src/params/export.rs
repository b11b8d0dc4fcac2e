//! Image export configuration for the command-line tool.

/// Where and how simulation snapshots are written
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Output directory for images
    pub output_dir: String,

    /// Simulation time of the exported snapshot (seconds)
    pub time_s: f32,

    /// Also write the FFT butterfly table as an image
    pub butterfly: bool,
}

impl ExportConfig {
    pub fn new(output_dir: impl Into<String>, time_s: f32) -> Self {
        Self {
            output_dir: output_dir.into(),
            time_s,
            butterfly: false,
        }
    }

    /// Height map image path
    pub fn heightmap_path(&self) -> String {
        format!("{}/heightmap.png", self.output_dir)
    }

    /// Butterfly table image path
    pub fn butterfly_path(&self) -> String {
        format!("{}/butterfly.png", self.output_dir)
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new("ocean", 0.0)
    }
}
