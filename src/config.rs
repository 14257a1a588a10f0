// SPDX-License-Identifier: MPL-2.0

//! Settings surface consumed by the processing core
//!
//! Persistence/JSON loading lives outside this crate; these structs only
//! define the knobs and their defaults. Another thread may replace them at
//! any time; the orchestrator copies them at the start of each cycle, so
//! updates take effect with the next capture.

use serde::{Deserialize, Serialize};

use crate::pipelines::tables::Connectivity;

/// Which side of the configured plane gets invalidated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaneFilteringMode {
    #[default]
    None,
    /// Invalidate points above the plane (positive normal side)
    Above,
    /// Invalidate points below the plane (negative normal side)
    Below,
}

/// Depth filter pipeline settings
///
/// Distances are meters, rotations degrees; the pipeline converts to
/// millimeters internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSettings {
    // basic: fractional crop window of the depth resolution
    pub min_width_f: f32,
    pub max_width_f: f32,
    pub min_height_f: f32,
    pub max_height_f: f32,
    // basic: fractional sub-range of the mode's depth range
    pub min_depth_f: f32,
    pub max_depth_f: f32,

    // color-based
    pub filter_depth_with_color: bool,
    /// Reference color, RGB 0-1
    pub filter_color: [f32; 3],
    /// Max absolute HSV difference (H in degrees, S/V 0-1)
    pub max_diff_color: [f32; 3],

    // infra-based (extension point, no implementation yet)
    pub filter_depth_with_infra: bool,
    // body-tracking (extension point, no implementation yet)
    pub filter_depth_with_body_tracking: bool,

    // geometry
    pub filter_depth_with_cloud: bool,
    pub plane_mode: PlaneFilteringMode,
    /// Three points defining the plane, meters
    pub plane_a: [f32; 3],
    pub plane_b: [f32; 3],
    pub plane_c: [f32; 3],
    pub filter_with_sphere: bool,
    /// Sphere center, meters
    pub sphere_center: [f32; 3],
    /// Max distance from the sphere center, meters
    pub max_sphere_distance: f32,
    pub keep_only_points_inside_box: bool,
    /// Oriented-box center, meters
    pub box_position: [f32; 3],
    /// Oriented-box rotation, per-axis degrees
    pub box_rotation: [f32; 3],
    /// Oriented-box full extent per axis, meters
    pub box_size: [f32; 3],

    // complex: local difference
    pub do_local_diff_filtering: bool,
    /// Max average absolute depth difference to valid neighbors, mm
    pub max_local_diff: f32,
    pub local_diff_connectivity: Connectivity,

    // complex: minimum neighbours
    pub do_min_neighbours_filtering: bool,
    pub nb_min_neighbours: u8,
    pub min_neighbours_loops: u8,
    pub min_neighbours_connectivity: Connectivity,

    // complex: erosion
    pub do_erosion: bool,
    pub erosion_loops: u8,
    /// Minimum count of valid neighbors a pixel must keep to survive
    pub erosion_min_neighbours: u8,
    pub erosion_connectivity: Connectivity,

    // complex: largest cluster
    pub keep_only_biggest_cluster: bool,

    // complex: closest-point cutoff
    pub remove_after_closest_point: bool,
    /// Margin past the global minimum valid depth, meters
    pub max_distance_after_closest_point: f32,

    // depth-sized color / infra invalidation
    pub invalidate_color_from_depth: bool,
    pub invalidate_infra_from_depth: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            min_width_f: 0.0,
            max_width_f: 1.0,
            min_height_f: 0.0,
            max_height_f: 1.0,
            min_depth_f: 0.0,
            max_depth_f: 1.0,
            filter_depth_with_color: false,
            filter_color: [0.0, 0.5, 0.08],
            max_diff_color: [20.0, 0.5, 0.5],
            filter_depth_with_infra: false,
            filter_depth_with_body_tracking: false,
            filter_depth_with_cloud: false,
            plane_mode: PlaneFilteringMode::None,
            plane_a: [0.0; 3],
            plane_b: [0.0; 3],
            plane_c: [0.0; 3],
            filter_with_sphere: false,
            sphere_center: [0.0; 3],
            max_sphere_distance: 2.0,
            keep_only_points_inside_box: false,
            box_position: [0.0; 3],
            box_rotation: [0.0; 3],
            box_size: [1.0, 1.0, 1.0],
            do_local_diff_filtering: true,
            max_local_diff: 10.0,
            local_diff_connectivity: Connectivity::Horizontal2,
            do_min_neighbours_filtering: false,
            nb_min_neighbours: 1,
            min_neighbours_loops: 1,
            min_neighbours_connectivity: Connectivity::Four,
            do_erosion: false,
            erosion_loops: 1,
            erosion_min_neighbours: 4,
            erosion_connectivity: Connectivity::Eight,
            keep_only_biggest_cluster: false,
            remove_after_closest_point: false,
            max_distance_after_closest_point: 0.2,
            invalidate_color_from_depth: false,
            invalidate_infra_from_depth: false,
        }
    }
}

/// Per-channel display-frame generation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    pub color_image: bool,
    pub depth_sized_color_image: bool,
    /// False-color depth preview
    pub depth_image: bool,
    /// Grayscale infrared preview
    pub infra_image: bool,
    pub body_index_image: bool,
    pub cloud: bool,
    /// Color cloud vertices from the depth-sized color image instead of the
    /// depth gradient
    pub cloud_color_from_image: bool,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            color_image: true,
            depth_sized_color_image: true,
            depth_image: true,
            infra_image: true,
            body_index_image: false,
            cloud: true,
            cloud_color_from_image: true,
        }
    }
}

/// Per-channel compressed-frame flags plus lossy quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionSettings {
    pub color: bool,
    pub depth_sized_color: bool,
    pub depth: bool,
    pub infra: bool,
    pub body_index: bool,
    pub cloud: bool,
    /// Lossy encoder quality, 0-100
    pub jpeg_quality: u8,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            color: true,
            depth_sized_color: false,
            depth: true,
            infra: false,
            body_index: false,
            cloud: true,
            jpeg_quality: 80,
        }
    }
}

/// Capture-side enable flags and output delay
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSettings {
    pub capture_audio: bool,
    pub capture_imu: bool,
    pub capture_bodies: bool,
    pub generation: GenerationSettings,
    pub compression: CompressionSettings,
    /// Emission delay applied to both output queues, milliseconds
    pub delay_ms: u64,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            capture_audio: true,
            capture_imu: true,
            capture_bodies: false,
            generation: GenerationSettings::default(),
            compression: CompressionSettings::default(),
            delay_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_defaults() {
        let f = FilterSettings::default();
        assert_eq!(f.max_width_f, 1.0);
        assert_eq!(f.plane_mode, PlaneFilteringMode::None);
        assert!(f.do_local_diff_filtering);
        assert!(!f.keep_only_biggest_cluster);
    }
}
