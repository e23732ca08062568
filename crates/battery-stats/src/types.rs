use std::fmt;

use serde::{Deserialize, Serialize};

pub const MS_IN_HOUR: f64 = 3_600_000.0;
pub const US_IN_MS: i64 = 1_000;
pub const INVALID_VALUE: i32 = -1;
pub const SCREEN_BRIGHTNESS_BIN: i16 = 5;
pub const RADIO_SIGNAL_BIN: i16 = 5;
/// uid / divisor gives the owning user id.
pub const UID_TRANSFORM_DIVISOR: i32 = 200_000;

/// Average-power table keys.
pub mod keys {
    pub const BLUETOOTH_ON: &str = "bluetooth_on";
    pub const BLUETOOTH_SCAN: &str = "bluetooth_scan";
    pub const BLUETOOTH_RX: &str = "bluetooth_rx";
    pub const BLUETOOTH_TX: &str = "bluetooth_tx";
    pub const WIFI_ON: &str = "wifi_on";
    pub const WIFI_SCAN: &str = "wifi_scan";
    pub const WIFI_RX: &str = "wifi_rx";
    pub const WIFI_TX: &str = "wifi_tx";
    pub const RADIO_ON: &str = "radio_on";
    pub const RADIO_SCAN: &str = "radio_scan";
    pub const RADIO_ACTIVE: &str = "radio_active";
    pub const RADIO_RX: &str = "radio_rx";
    pub const RADIO_TX: &str = "radio_tx";
    pub const CAMERA_ON: &str = "camera_on";
    pub const FLASHLIGHT_ON: &str = "flashlight_on";
    pub const GPS_ON: &str = "gps_on";
    pub const SENSOR_GRAVITY: &str = "sensor_gravity_on";
    pub const SENSOR_PROXIMITY: &str = "sensor_proximity_on";
    pub const AUDIO_ON: &str = "audio_on";
    pub const SCREEN_ON: &str = "screen_on";
    pub const SCREEN_BRIGHTNESS: &str = "screen_brightness";
    pub const ALARM_ON: &str = "alarm_on";
    pub const CPU_AWAKE: &str = "cpu_awake";
    pub const CPU_IDLE: &str = "cpu_idle";
    pub const CPU_SUSPEND: &str = "cpu_suspend";
    pub const CPU_ACTIVE: &str = "cpu_active";
    pub const CPU_CLUSTER: &str = "cpu_clusters";
    /// Suffixed with the cluster index, e.g. `cpu_speed_cluster0`.
    pub const CPU_SPEED: &str = "cpu_speed_cluster";
}

/// Kind of activity an event or query refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsType {
    Invalid,
    BluetoothOn,
    BluetoothScan,
    BluetoothRx,
    BluetoothTx,
    WifiOn,
    WifiScan,
    WifiRx,
    WifiTx,
    RadioOn,
    RadioScan,
    PhoneActive,
    RadioRx,
    RadioTx,
    CameraOn,
    FlashlightOn,
    GpsOn,
    SensorGravityOn,
    SensorProximityOn,
    AudioOn,
    ScreenOn,
    ScreenBrightness,
    Alarm,
    WakelockHold,
    PhoneIdle,
    CpuCluster,
    CpuSpeed,
    CpuActive,
    CpuSuspend,
}

impl StatsType {
    pub const ALL: [StatsType; 29] = [
        StatsType::Invalid,
        StatsType::BluetoothOn,
        StatsType::BluetoothScan,
        StatsType::BluetoothRx,
        StatsType::BluetoothTx,
        StatsType::WifiOn,
        StatsType::WifiScan,
        StatsType::WifiRx,
        StatsType::WifiTx,
        StatsType::RadioOn,
        StatsType::RadioScan,
        StatsType::PhoneActive,
        StatsType::RadioRx,
        StatsType::RadioTx,
        StatsType::CameraOn,
        StatsType::FlashlightOn,
        StatsType::GpsOn,
        StatsType::SensorGravityOn,
        StatsType::SensorProximityOn,
        StatsType::AudioOn,
        StatsType::ScreenOn,
        StatsType::ScreenBrightness,
        StatsType::Alarm,
        StatsType::WakelockHold,
        StatsType::PhoneIdle,
        StatsType::CpuCluster,
        StatsType::CpuSpeed,
        StatsType::CpuActive,
        StatsType::CpuSuspend,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            StatsType::Invalid => "invalid",
            StatsType::BluetoothOn => "bluetooth_on",
            StatsType::BluetoothScan => "bluetooth_scan",
            StatsType::BluetoothRx => "bluetooth_rx",
            StatsType::BluetoothTx => "bluetooth_tx",
            StatsType::WifiOn => "wifi_on",
            StatsType::WifiScan => "wifi_scan",
            StatsType::WifiRx => "wifi_rx",
            StatsType::WifiTx => "wifi_tx",
            StatsType::RadioOn => "radio_on",
            StatsType::RadioScan => "radio_scan",
            StatsType::PhoneActive => "radio_active",
            StatsType::RadioRx => "radio_rx",
            StatsType::RadioTx => "radio_tx",
            StatsType::CameraOn => "camera_on",
            StatsType::FlashlightOn => "flashlight_on",
            StatsType::GpsOn => "gps_on",
            StatsType::SensorGravityOn => "sensor_gravity_on",
            StatsType::SensorProximityOn => "sensor_proximity_on",
            StatsType::AudioOn => "audio_on",
            StatsType::ScreenOn => "screen_on",
            StatsType::ScreenBrightness => "screen_brightness",
            StatsType::Alarm => "alarm",
            StatsType::WakelockHold => "cpu_awake",
            StatsType::PhoneIdle => "cpu_idle",
            StatsType::CpuCluster => "cpu_clusters",
            StatsType::CpuSpeed => "cpu_speed_cluster",
            StatsType::CpuActive => "cpu_active",
            StatsType::CpuSuspend => "cpu_suspend",
        }
    }

    pub fn from_key(key: &str) -> Option<StatsType> {
        Self::ALL.iter().copied().find(|t| t.key() == key)
    }
}

impl fmt::Display for StatsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// State carried by a state-change event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsState {
    Invalid,
    Activated,
    Deactivated,
    DisplayOff,
    DisplayDim,
    DisplayOn,
    DisplaySuspend,
    DisplayUnknown,
    NetworkUnknown,
    NetworkInService,
    NetworkNoService,
    NetworkEmergencyOnly,
    NetworkSearch,
    NetworkPowerOff,
}

/// Consumer category a power figure is attributed to.
///
/// Ids are negative so they never collide with uids when persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConsumptionType {
    Invalid,
    App,
    Bluetooth,
    Idle,
    Phone,
    Radio,
    Screen,
    User,
    Wifi,
    Camera,
    Flashlight,
    Audio,
    Sensor,
    Gps,
    Cpu,
    Wakelock,
    Alarm,
}

impl ConsumptionType {
    pub const ALL: [ConsumptionType; 17] = [
        ConsumptionType::Invalid,
        ConsumptionType::App,
        ConsumptionType::Bluetooth,
        ConsumptionType::Idle,
        ConsumptionType::Phone,
        ConsumptionType::Radio,
        ConsumptionType::Screen,
        ConsumptionType::User,
        ConsumptionType::Wifi,
        ConsumptionType::Camera,
        ConsumptionType::Flashlight,
        ConsumptionType::Audio,
        ConsumptionType::Sensor,
        ConsumptionType::Gps,
        ConsumptionType::Cpu,
        ConsumptionType::Wakelock,
        ConsumptionType::Alarm,
    ];

    pub fn id(&self) -> i32 {
        // Invalid = -18 up to Alarm = -2, in declaration order
        *self as i32 - 18
    }

    pub fn from_id(id: i32) -> Option<ConsumptionType> {
        Self::ALL.iter().copied().find(|t| t.id() == id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ConsumptionType::Invalid => "invalid",
            ConsumptionType::App => "app",
            ConsumptionType::Bluetooth => "bluetooth",
            ConsumptionType::Idle => "idle",
            ConsumptionType::Phone => "phone",
            ConsumptionType::Radio => "radio",
            ConsumptionType::Screen => "screen",
            ConsumptionType::User => "user",
            ConsumptionType::Wifi => "wifi",
            ConsumptionType::Camera => "camera",
            ConsumptionType::Flashlight => "flashlight",
            ConsumptionType::Audio => "audio",
            ConsumptionType::Sensor => "sensor",
            ConsumptionType::Gps => "gps",
            ConsumptionType::Cpu => "cpu",
            ConsumptionType::Wakelock => "wakelock",
            ConsumptionType::Alarm => "alarm",
        }
    }
}

impl fmt::Display for ConsumptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of a stats query.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatsInfo {
    pub uid: i32,
    pub user_id: i32,
    pub consumption_type: ConsumptionType,
    pub power_mah: f64,
}

impl StatsInfo {
    pub fn hardware(consumption_type: ConsumptionType, power_mah: f64) -> Self {
        Self {
            uid: INVALID_VALUE,
            user_id: INVALID_VALUE,
            consumption_type,
            power_mah,
        }
    }

    pub fn app(uid: i32, power_mah: f64) -> Self {
        Self {
            uid,
            user_id: user_id_of(uid),
            consumption_type: ConsumptionType::App,
            power_mah,
        }
    }

    pub fn user(user_id: i32, power_mah: f64) -> Self {
        Self {
            uid: INVALID_VALUE,
            user_id,
            consumption_type: ConsumptionType::User,
            power_mah,
        }
    }
}

pub fn user_id_of(uid: i32) -> i32 {
    uid / UID_TRANSFORM_DIVISOR
}

/// Normalized activity event handed to the aggregation core.
///
/// Serialized externally tagged, one JSON object per event, e.g.
/// `{"state": {"stats_type": "camera_on", "state": "activated", "uid": 10010}}`.
/// Omitted `level` and `uid` default to -1.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsEvent {
    /// A state or level change (screen on, radio signal, wakelock, ...).
    State {
        stats_type: StatsType,
        state: StatsState,
        #[serde(default = "invalid_level")]
        level: i16,
        #[serde(default = "invalid_uid")]
        uid: i32,
    },
    /// A traffic report carrying its own duration and byte count.
    Traffic {
        stats_type: StatsType,
        time_ms: i64,
        data: i64,
        #[serde(default = "invalid_uid")]
        uid: i32,
    },
    /// Charger plugged (false) or unplugged (true).
    Battery { on_battery: bool },
}

fn invalid_level() -> i16 {
    INVALID_VALUE as i16
}

fn invalid_uid() -> i32 {
    INVALID_VALUE
}

impl StatsEvent {
    pub fn state(stats_type: StatsType, state: StatsState, uid: i32) -> Self {
        StatsEvent::State {
            stats_type,
            state,
            level: INVALID_VALUE as i16,
            uid,
        }
    }

    pub fn level(stats_type: StatsType, state: StatsState, level: i16) -> Self {
        StatsEvent::State {
            stats_type,
            state,
            level,
            uid: INVALID_VALUE,
        }
    }
}
