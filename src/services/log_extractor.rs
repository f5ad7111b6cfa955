use crate::models::{DeviceLocation, GeoRecord, LogReport, Tower};

const TOWER_ANCHOR: &str = "MCC=";
const DEVICE_ANCHOR: &str = "Рассчитанное местоположение устройства: LAT=";

/// 顺序消费一行文本的游标
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(rest: &'a str) -> Self {
        Self { rest }
    }

    fn literal(&mut self, lit: &str) -> Option<()> {
        self.rest = self.rest.strip_prefix(lit)?;
        Some(())
    }

    /// 贪婪匹配 accept 接受的 ASCII 字符，至少一个
    fn take(&mut self, accept: impl Fn(u8) -> bool) -> Option<&'a str> {
        let len = self.rest.bytes().take_while(|b| accept(*b)).count();
        if len == 0 {
            return None;
        }
        let (token, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(token)
    }

    fn integer(&mut self) -> Option<u32> {
        self.take(|b| b.is_ascii_digit())?.parse().ok()
    }

    fn decimal(&mut self) -> Option<f64> {
        self.take(|b| b.is_ascii_digit() || b == b'.')?.parse().ok()
    }
}

/// `MCC=.., MNC=.., CID=.., Уровень сигнала=.., LAT=.., LONG=..`，从 MCC= 开始
fn tower_at(text: &str) -> Option<Tower> {
    let mut c = Cursor::new(text);
    c.literal(TOWER_ANCHOR)?;
    c.integer()?;
    c.literal(", MNC=")?;
    c.integer()?;
    c.literal(", CID=")?;
    let cell_id = c.integer()?;
    c.literal(", Уровень сигнала=")?;
    let signal_level = c.integer()?;
    c.literal(", LAT=")?;
    let lat = c.decimal()?;
    c.literal(", LONG=")?;
    let lon = c.decimal()?;

    Some(Tower { cell_id, signal_level, lat, lon })
}

fn device_at(text: &str) -> Option<DeviceLocation> {
    let mut c = Cursor::new(text);
    c.literal(DEVICE_ANCHOR)?;
    let lat = c.decimal()?;
    c.literal(", LONG=")?;
    let lon = c.decimal()?;

    Some(DeviceLocation { lat, lon })
}

/// 在行内任意位置查找第一个完整匹配
fn find_in<T>(line: &str, anchor: &str, parse: fn(&str) -> Option<T>) -> Option<T> {
    line.match_indices(anchor)
        .find_map(|(idx, _)| parse(&line[idx..]))
}

/// 识别单行；基站格式优先，匹配上就不再看设备位置
pub fn match_line(line: &str) -> Option<GeoRecord> {
    if let Some(tower) = find_in(line, TOWER_ANCHOR, tower_at) {
        return Some(GeoRecord::Tower(tower));
    }
    find_in(line, DEVICE_ANCHOR, device_at).map(GeoRecord::DeviceLocation)
}

/// 解析整份日志
///
/// 基站按文件顺序保留（不去重不排序）；设备位置取最后一次出现的值。
/// 其他行直接忽略。
pub fn parse(text: &str) -> LogReport {
    let mut report = LogReport::default();

    for line in text.lines() {
        match match_line(line) {
            Some(GeoRecord::Tower(tower)) => report.towers.push(tower),
            Some(GeoRecord::DeviceLocation(location)) => report.device_location = Some(location),
            None => {}
        }
    }

    report
}
