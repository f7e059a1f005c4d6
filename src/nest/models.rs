use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Token: POST /oauth2/access_token
// ---------------------------------------------------------------------------

/// Payload of a successful authorization-code exchange.
///
/// Nest access tokens are long-lived; `expires_in` is in **seconds**
/// (typically 315360000, i.e. ten years).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,

    #[serde(default)]
    pub expires_in: i64,
}

// ---------------------------------------------------------------------------
// Thermostat: GET /devices/thermostats/{device_id}
//
// Every field is optional on the wire: the API omits fields the device does
// not support (e.g. `target_temperature_high_c` outside heat-cool mode).
// Temperatures come in pairs, Celsius as a half-degree float and Fahrenheit
// as an integer.
// ---------------------------------------------------------------------------

/// Wire shape of a single thermostat object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ThermostatData {
    pub device_id: Option<String>,
    pub name: Option<String>,
    pub name_long: Option<String>,
    pub label: Option<String>,
    pub locale: Option<String>,
    pub software_version: Option<String>,
    pub structure_id: Option<String>,
    pub where_id: Option<String>,
    pub where_name: Option<String>,
    pub is_online: Option<bool>,
    pub temperature_scale: Option<String>,

    pub humidity: Option<i64>,
    pub ambient_temperature_c: Option<f64>,
    pub ambient_temperature_f: Option<i64>,

    pub target_temperature_c: Option<f64>,
    pub target_temperature_f: Option<i64>,
    pub target_temperature_high_c: Option<f64>,
    pub target_temperature_high_f: Option<i64>,
    pub target_temperature_low_c: Option<f64>,
    pub target_temperature_low_f: Option<i64>,
    pub eco_temperature_high_c: Option<f64>,
    pub eco_temperature_low_c: Option<f64>,
    pub locked_temp_min_c: Option<f64>,
    pub locked_temp_max_c: Option<f64>,

    pub hvac_mode: Option<String>,
    pub previous_hvac_mode: Option<String>,
    pub hvac_state: Option<String>,
    pub can_heat: Option<bool>,
    pub can_cool: Option<bool>,
    pub is_using_emergency_heat: Option<bool>,
    pub has_leaf: Option<bool>,
    pub is_locked: Option<bool>,
    pub time_to_target: Option<String>,

    pub has_fan: Option<bool>,
    pub fan_timer_active: Option<bool>,
    /// RFC 3339; the epoch when no timer is running.
    pub fan_timer_timeout: Option<String>,
    pub fan_timer_duration: Option<i64>,

    pub sunlight_correction_enabled: Option<bool>,
    pub sunlight_correction_active: Option<bool>,
}
