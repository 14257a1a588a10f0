// SPDX-License-Identifier: MPL-2.0

//! Integration tests for the settings structs

use depthcap::config::{CompressionSettings, DataSettings, FilterSettings, PlaneFilteringMode};
use depthcap::pipelines::Connectivity;

#[test]
fn test_filter_settings_defaults() {
    let settings = FilterSettings::default();

    // full crop window and depth range by default
    assert_eq!(settings.min_width_f, 0.0);
    assert_eq!(settings.max_width_f, 1.0);
    assert_eq!(settings.min_depth_f, 0.0);
    assert_eq!(settings.max_depth_f, 1.0);

    assert_eq!(settings.plane_mode, PlaneFilteringMode::None);
    assert!(!settings.filter_depth_with_color);
    assert!(!settings.keep_only_biggest_cluster);
}

#[test]
fn test_settings_json_round_trip() {
    let mut settings = FilterSettings::default();
    settings.filter_depth_with_color = true;
    settings.max_diff_color = [15.0, 0.3, 0.3];
    settings.min_neighbours_connectivity = Connectivity::Eight;
    settings.plane_mode = PlaneFilteringMode::Above;

    let json = serde_json::to_string(&settings).expect("settings serialize");
    let restored: FilterSettings = serde_json::from_str(&json).expect("settings deserialize");
    assert_eq!(restored, settings);
}

#[test]
fn test_data_settings_round_trip() {
    let mut settings = DataSettings::default();
    settings.delay_ms = 250;
    settings.compression = CompressionSettings {
        jpeg_quality: 95,
        ..Default::default()
    };

    let json = serde_json::to_string(&settings).expect("settings serialize");
    let restored: DataSettings = serde_json::from_str(&json).expect("settings deserialize");
    assert_eq!(restored, settings);
    assert_eq!(restored.compression.jpeg_quality, 95);
}

#[test]
fn test_generation_defaults_enable_previews() {
    let settings = DataSettings::default();
    assert!(settings.generation.depth_image);
    assert!(settings.generation.cloud);
    assert!(!settings.generation.body_index_image);
    assert_eq!(settings.delay_ms, 0);
}
