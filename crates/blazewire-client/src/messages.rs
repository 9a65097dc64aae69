//! Records decoded from controller JSON.
//!
//! Every field defaults when absent. Collections are capped at the limits
//! given in [`ClientConfig`](crate::ClientConfig); extra entries are dropped
//! with a warning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Periodic statistics pushed by the controller (`"fps"` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    pub fps: f64,
    pub vmerr: i64,
    pub vmerrpc: i64,
    #[serde(rename = "mem")]
    pub mem_bytes: i64,
    #[serde(rename = "exp")]
    pub expansions: i64,
    pub render_type: i64,
    #[serde(rename = "uptime")]
    pub uptime_ms: i64,
    #[serde(rename = "storageUsed")]
    pub storage_bytes_used: i64,
    #[serde(rename = "storageSize")]
    pub storage_bytes_size: i64,
    pub rr0: i64,
    pub rr1: i64,
    pub reboot_counter: i64,
}

impl Stats {
    pub fn from_json(json: &Value) -> serde_json::Result<Self> {
        Self::deserialize(json)
    }
}

/// Controller settings (`"pixelCount"` key in a `getConfig` reply).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub name: String,
    pub brand_name: String,
    pub pixel_count: i64,
    pub brightness: f64,
    pub max_brightness: f64,
    pub color_order: String,
    #[serde(rename = "dataSpeed")]
    pub data_speed_hz: i64,
    pub led_type: i64,
    #[serde(rename = "sequenceTimer")]
    pub sequence_timer_ms: i64,
    #[serde(rename = "transitionDuration")]
    pub transition_duration_ms: i64,
    pub sequencer_mode: i64,
    pub run_sequencer: bool,
    pub simple_ui_mode: bool,
    pub learning_ui_mode: bool,
    #[serde(rename = "discoveryEnable")]
    pub discovery_enabled: bool,
    pub timezone: String,
    pub auto_off_enable: bool,
    pub auto_off_start: String,
    pub auto_off_end: String,
    #[serde(rename = "cpuSpeed")]
    pub cpu_speed_mhz: i64,
    pub network_power_save: bool,
    pub mapper_fit: i64,
    pub leader_id: i64,
    pub node_id: i64,
    pub sound_src: i64,
    pub accel_src: i64,
    pub light_src: i64,
    pub analog_src: i64,
    pub exp: i64,
    #[serde(rename = "ver")]
    pub version: String,
    pub chip_id: i64,
}

impl Settings {
    pub fn from_json(json: &Value) -> serde_json::Result<Self> {
        Self::deserialize(json)
    }
}

/// A named pattern control and its value.
///
/// Sliders carry a number; colour pickers carry an array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub name: String,
    pub value: Value,
}

impl Control {
    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_f64()
    }
}

fn controls_from_map(map: &Map<String, Value>, limit: usize) -> Vec<Control> {
    if map.len() > limit {
        warn!(count = map.len(), limit, "more controls than can be kept");
    }
    map.iter()
        .take(limit)
        .map(|(name, value)| Control {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Active pattern and sequencer state (`"activeProgram"` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SequencerState {
    pub name: String,
    pub active_program_id: String,
    pub controls: Vec<Control>,
    pub sequencer_mode: i64,
    pub run_sequencer: bool,
    pub playlist_position: i64,
    pub playlist_id: String,
    pub ttl_ms: i64,
    pub remaining_ms: i64,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ActiveProgramWire {
    name: String,
    active_program_id: String,
    controls: Map<String, Value>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PlaylistPositionWire {
    position: i64,
    id: String,
    ms: i64,
    remaining_ms: i64,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct SequencerWire {
    active_program: ActiveProgramWire,
    sequencer_mode: i64,
    run_sequencer: bool,
    playlist: PlaylistPositionWire,
}

impl SequencerState {
    pub fn from_json(json: &Value, control_limit: usize) -> serde_json::Result<Self> {
        let wire = SequencerWire::deserialize(json)?;
        Ok(Self {
            name: wire.active_program.name,
            active_program_id: wire.active_program.active_program_id,
            controls: controls_from_map(&wire.active_program.controls, control_limit),
            sequencer_mode: wire.sequencer_mode,
            run_sequencer: wire.run_sequencer,
            playlist_position: wire.playlist.position,
            playlist_id: wire.playlist.id,
            ttl_ms: wire.playlist.ms,
            remaining_ms: wire.playlist.remaining_ms,
        })
    }
}

/// One pattern on a playlist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistItem {
    pub id: String,
    #[serde(rename = "ms")]
    pub duration_ms: i64,
}

/// Reply to `getPlaylist` (`"playlist"."position"` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Playlist {
    pub id: String,
    pub position: i64,
    pub current_duration_ms: i64,
    pub remaining_current_ms: i64,
    pub items: Vec<PlaylistItem>,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct PlaylistWire {
    id: String,
    position: i64,
    ms: i64,
    remaining_ms: i64,
    items: Vec<PlaylistItem>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PlaylistEnvelope {
    playlist: PlaylistWire,
}

fn cap_items(mut items: Vec<PlaylistItem>, limit: usize) -> Vec<PlaylistItem> {
    if items.len() > limit {
        warn!(count = items.len(), limit, "more playlist items than can be kept");
        items.truncate(limit);
    }
    items
}

impl Playlist {
    pub fn from_json(json: &Value, playlist_limit: usize) -> serde_json::Result<Self> {
        let wire = PlaylistEnvelope::deserialize(json)?.playlist;
        Ok(Self {
            id: wire.id,
            position: wire.position,
            current_duration_ms: wire.ms,
            remaining_current_ms: wire.remaining_ms,
            items: cap_items(wire.items, playlist_limit),
        })
    }
}

/// Playlist contents pushed after an edit (`"playlist"` without `"position"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaylistUpdate {
    pub id: String,
    pub items: Vec<PlaylistItem>,
}

impl PlaylistUpdate {
    pub fn from_json(json: &Value, playlist_limit: usize) -> serde_json::Result<Self> {
        let wire = PlaylistEnvelope::deserialize(json)?.playlist;
        Ok(Self {
            id: wire.id,
            items: cap_items(wire.items, playlist_limit),
        })
    }
}

/// Another controller on the network (`"peers"` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Peer {
    pub id: i64,
    pub ip_address: String,
    pub name: String,
    #[serde(rename = "ver")]
    pub version: String,
    pub is_following: bool,
    pub node_id: i64,
    pub follower_count: i64,
}

pub fn peers_from_json(json: &Value, peer_limit: usize) -> serde_json::Result<Vec<Peer>> {
    let mut peers = match json.get("peers") {
        Some(value) => Vec::<Peer>::deserialize(value)?,
        None => Vec::new(),
    };
    if peers.len() > peer_limit {
        warn!(count = peers.len(), limit = peer_limit, "more peers than can be kept");
        peers.truncate(peer_limit);
    }
    Ok(peers)
}

/// Controls from a `getControls` reply: `{"controls": {"<patternId>": {...}}}`.
pub fn controls_from_json(json: &Value, control_limit: usize) -> Vec<Control> {
    let Some(by_pattern) = json.get("controls").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut merged = Map::new();
    for controls in by_pattern.values().filter_map(Value::as_object) {
        merged.extend(controls.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    controls_from_map(&merged, control_limit)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn stats_fields_map() {
        let stats = Stats::from_json(&json!({
            "fps": 59.5, "vmerr": 0, "mem": 10240, "exp": 1,
            "uptime": 123456, "storageUsed": 10, "storageSize": 100,
            "renderType": 2, "rebootCounter": 3
        }))
        .unwrap();
        assert_eq!(stats.fps, 59.5);
        assert_eq!(stats.mem_bytes, 10240);
        assert_eq!(stats.expansions, 1);
        assert_eq!(stats.uptime_ms, 123456);
        assert_eq!(stats.render_type, 2);
        assert_eq!(stats.reboot_counter, 3);
    }

    #[test]
    fn settings_missing_fields_default() {
        let settings = Settings::from_json(&json!({
            "name": "Porch", "pixelCount": 300, "brightness": 0.5, "ver": "3.40"
        }))
        .unwrap();
        assert_eq!(settings.name, "Porch");
        assert_eq!(settings.pixel_count, 300);
        assert_eq!(settings.version, "3.40");
        assert!(!settings.run_sequencer);
    }

    #[test]
    fn sequencer_controls_are_capped() {
        let state = SequencerState::from_json(
            &json!({
                "activeProgram": {
                    "name": "Rainbow",
                    "activeProgramId": "abc",
                    "controls": {"sliderA": 0.1, "sliderB": 0.2, "sliderC": 0.3}
                },
                "sequencerMode": 1,
                "runSequencer": true,
                "playlist": {"position": 4, "id": "_defaultplaylist_", "ms": 30000, "remainingMs": 100}
            }),
            2,
        )
        .unwrap();
        assert_eq!(state.name, "Rainbow");
        assert_eq!(state.controls.len(), 2);
        assert_eq!(state.controls[0].name, "sliderA");
        assert_eq!(state.playlist_position, 4);
        assert_eq!(state.remaining_ms, 100);
    }

    #[test]
    fn playlist_and_update() {
        let json = json!({"playlist": {
            "id": "_defaultplaylist_", "position": 1, "ms": 5000, "remainingMs": 20,
            "items": [{"id": "a", "ms": 100}, {"id": "b", "ms": 200}, {"id": "c", "ms": 300}]
        }});
        let playlist = Playlist::from_json(&json, 2).unwrap();
        assert_eq!(playlist.position, 1);
        assert_eq!(playlist.items.len(), 2);
        assert_eq!(playlist.items[1].duration_ms, 200);

        let update = PlaylistUpdate::from_json(&json, 10).unwrap();
        assert_eq!(update.items.len(), 3);
    }

    #[test]
    fn controls_reply_flattens_pattern_object() {
        let controls = controls_from_json(
            &json!({"controls": {"abc": {"sliderSpeed": 0.5, "hsvPickerColor": [0.1, 1, 1]}}}),
            25,
        );
        assert_eq!(controls.len(), 2);
        let speed = controls.iter().find(|c| c.name == "sliderSpeed").unwrap();
        assert_eq!(speed.as_f64(), Some(0.5));
    }

    #[test]
    fn peers_decode() {
        let peers = peers_from_json(
            &json!({"peers": [{"id": 7, "ipAddress": "10.0.0.2", "name": "Shed", "ver": "3.30"}]}),
            25,
        )
        .unwrap();
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].ip_address, "10.0.0.2");
        assert_eq!(peers[0].version, "3.30");
    }

    #[test]
    fn wrong_type_is_a_decode_error() {
        assert!(Settings::from_json(&json!({"pixelCount": "lots"})).is_err());
    }
}
