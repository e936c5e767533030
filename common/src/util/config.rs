use serde::Deserialize;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// How the grid is cut into regions.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LayoutPolicy {
    /// Near-square factorization of the region count.
    #[default]
    Balanced,
    /// Single-axis stripes along the longer grid dimension.
    Stripes,
    /// Factorization whose column/row ratio follows the grid aspect ratio.
    Aspect,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RoutingConfig {
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_regions")]
    pub regions: usize,
    #[serde(default)]
    pub layout: LayoutPolicy,
    #[serde(default = "default_min_region_edge")]
    pub min_region_edge: u32,
    #[serde(default = "default_max_layers")]
    pub max_layers: u8,
    #[serde(default = "default_max_runtime_secs")]
    pub max_runtime_secs: f64,
    #[serde(default = "default_wire_pitch")]
    pub wire_pitch: f64,
    #[serde(default = "default_grid_margin")]
    pub grid_margin: f64,
    #[serde(default = "default_max_expansions")]
    pub max_expansions: u32,
    #[serde(default)]
    pub random_probes: usize,
    #[serde(default = "default_show_progress")]
    pub show_progress: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            threads: default_threads(),
            regions: default_regions(),
            layout: LayoutPolicy::default(),
            min_region_edge: default_min_region_edge(),
            max_layers: default_max_layers(),
            max_runtime_secs: default_max_runtime_secs(),
            wire_pitch: default_wire_pitch(),
            grid_margin: default_grid_margin(),
            max_expansions: default_max_expansions(),
            random_probes: 0,
            show_progress: default_show_progress(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InputConfig {
    #[serde(default = "default_segments_file")]
    pub segments_file: String,
    #[serde(default = "default_output_file")]
    pub output_file: String,
    #[serde(default)]
    pub image_file: Option<String>,
    #[serde(default)]
    pub verify: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            segments_file: default_segments_file(),
            output_file: default_output_file(),
            image_file: None,
            verify: false,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_regions() -> usize {
    26
}

fn default_min_region_edge() -> u32 {
    20
}

fn default_max_layers() -> u8 {
    5
}

fn default_max_runtime_secs() -> f64 {
    60.0
}

fn default_wire_pitch() -> f64 {
    3.0
}

fn default_grid_margin() -> f64 {
    80.0
}

fn default_max_expansions() -> u32 {
    2_000_000
}

fn default_show_progress() -> bool {
    true
}

fn default_segments_file() -> String {
    "inputs/segments.seg".to_string()
}

fn default_output_file() -> String {
    "output/routed.txt".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.routing.regions, 26);
        assert_eq!(config.routing.min_region_edge, 20);
        assert_eq!(config.routing.layout, LayoutPolicy::Balanced);
        assert_eq!(config.input.output_file, "output/routed.txt");
        assert!(config.input.image_file.is_none());
    }

    #[test]
    fn overrides_are_applied() {
        let config: Config = toml::from_str(
            "[routing]\nthreads = 2\nlayout = \"aspect\"\nmax_runtime_secs = 0.5\n\n[input]\nverify = true\n",
        )
        .unwrap();
        assert_eq!(config.routing.threads, 2);
        assert_eq!(config.routing.layout, LayoutPolicy::Aspect);
        assert_eq!(config.routing.max_runtime_secs, 0.5);
        assert_eq!(config.routing.wire_pitch, 3.0);
        assert!(config.input.verify);
    }
}
