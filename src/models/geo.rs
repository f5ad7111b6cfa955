use serde::Serialize;

/// 日志中的一条基站记录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tower {
    #[serde(rename = "CID")]
    pub cell_id: u32,
    #[serde(rename = "Signal")]
    pub signal_level: u32,
    pub lat: f64,
    pub lon: f64,
}

/// 计算出的设备位置
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DeviceLocation {
    pub lat: f64,
    pub lon: f64,
}

/// 单行日志能识别出的记录
#[derive(Debug, Clone, PartialEq)]
pub enum GeoRecord {
    Tower(Tower),
    DeviceLocation(DeviceLocation),
}

/// 一次解析的结果：零或多个基站，零或一个设备位置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogReport {
    pub device_location: Option<DeviceLocation>,
    pub towers: Vec<Tower>,
}
