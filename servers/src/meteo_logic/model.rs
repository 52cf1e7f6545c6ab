use serde::{Deserialize, Serialize};

/// Sparse display state as carried on the bus. Every field is optional;
/// an absent field means "no news", not "reset".
///
/// Numeric fields stay `f64` on purpose: the wire contract accepts any
/// JSON number and the encoder clamps/rounds at render time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplayRecord {
    pub hours: Option<f64>,
    pub minutes: Option<f64>,
    pub wind: Option<Wind>,
    pub pressure: Option<Pressure>,
    pub clouds: Option<Clouds>,
    pub visibility: Option<Visibility>,
    pub humidity: Option<f64>,
    pub temperature: Option<f64>,
    pub has_thunder: Option<bool>,
    pub events: Option<f64>,
    pub is_urgent: Option<bool>,
    pub unit_id: Option<f64>,
    pub has_icing: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wind {
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub max_speed: Option<f64>,
    pub max_perpendicular_speed: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Pressure {
    pub h_pa: Option<f64>,
    pub mm_hg: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Clouds {
    pub n: Option<f64>,
    pub nh: Option<f64>,
    pub height: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Visibility {
    pub s: Option<f64>,
    pub l1: Option<f64>,
    pub l2: Option<f64>,
    pub l3: Option<f64>,
}

fn overwrite<T>(current: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *current = update;
    }
}

impl DisplayRecord {
    /// Deep-merges `update` into `self`. Present scalars overwrite, present
    /// groups recurse, absent fields leave the current value alone — a later
    /// `{wind:{speed:5}}` must not erase an earlier `wind.heading`.
    pub fn merge_from(&mut self, update: DisplayRecord) {
        overwrite(&mut self.hours, update.hours);
        overwrite(&mut self.minutes, update.minutes);
        match (&mut self.wind, update.wind) {
            (Some(current), Some(incoming)) => current.merge_from(incoming),
            (current, Some(incoming)) => *current = Some(incoming),
            _ => {}
        }
        match (&mut self.pressure, update.pressure) {
            (Some(current), Some(incoming)) => current.merge_from(incoming),
            (current, Some(incoming)) => *current = Some(incoming),
            _ => {}
        }
        match (&mut self.clouds, update.clouds) {
            (Some(current), Some(incoming)) => current.merge_from(incoming),
            (current, Some(incoming)) => *current = Some(incoming),
            _ => {}
        }
        match (&mut self.visibility, update.visibility) {
            (Some(current), Some(incoming)) => current.merge_from(incoming),
            (current, Some(incoming)) => *current = Some(incoming),
            _ => {}
        }
        overwrite(&mut self.humidity, update.humidity);
        overwrite(&mut self.temperature, update.temperature);
        overwrite(&mut self.has_thunder, update.has_thunder);
        overwrite(&mut self.events, update.events);
        overwrite(&mut self.is_urgent, update.is_urgent);
        overwrite(&mut self.unit_id, update.unit_id);
        overwrite(&mut self.has_icing, update.has_icing);
    }
}

impl Wind {
    fn merge_from(&mut self, update: Wind) {
        overwrite(&mut self.heading, update.heading);
        overwrite(&mut self.speed, update.speed);
        overwrite(&mut self.max_speed, update.max_speed);
        overwrite(
            &mut self.max_perpendicular_speed,
            update.max_perpendicular_speed,
        );
    }
}

impl Pressure {
    fn merge_from(&mut self, update: Pressure) {
        overwrite(&mut self.h_pa, update.h_pa);
        overwrite(&mut self.mm_hg, update.mm_hg);
    }
}

impl Clouds {
    fn merge_from(&mut self, update: Clouds) {
        overwrite(&mut self.n, update.n);
        overwrite(&mut self.nh, update.nh);
        overwrite(&mut self.height, update.height);
    }
}

impl Visibility {
    fn merge_from(&mut self, update: Visibility) {
        overwrite(&mut self.s, update.s);
        overwrite(&mut self.l1, update.l1);
        overwrite(&mut self.l2, update.l2);
        overwrite(&mut self.l3, update.l3);
    }
}
