//! Positional encoder for the meteo display device.
//!
//! The device consumes one fixed 47-character line per update. Every field
//! of a [`DisplayRecord`] owns a fixed slice of character positions; absent
//! fields leave their positions at the fill character. There is no framing
//! and no delimiter, so a digit in the wrong column is silently wrong on
//! the physical panel — the placement table below is the device contract.

use crate::meteo_logic::model::DisplayRecord;

/// Length of the device line.
pub const CODE_LEN: usize = 47;

const FILL: u8 = b'-';

/// Line with no data: all fill, except position 24 which reads `1` when the
/// urgent indicator is off (the device's marker values are inverted).
const DEFAULT_CODE: &[u8; CODE_LEN] = b"------------------------1----------------------";

/// Rounds half toward positive infinity, then clamps into `[min, max]`.
///
/// Not `f64::round`: that rounds halves away from zero, which disagrees on
/// negative input (-2.5 must become -2, not -3), and temperature is signed.
fn clamp_round(value: f64, min: i64, max: i64) -> i64 {
    let rounded = (value + 0.5).floor();
    if rounded.is_nan() {
        return min;
    }
    (rounded as i64).clamp(min, max)
}

/// Decimal digit of `value` at `place` (0 = units, 1 = tens, ...).
fn digit(value: i64, place: u32) -> u8 {
    b'0' + (value / 10_i64.pow(place)).rem_euclid(10) as u8
}

/// Like [`digit`], but a would-be leading zero is blanked: when `value` has
/// no digit at `place`, the fill character is emitted instead of `0`.
fn digit_if_present(value: i64, place: u32) -> u8 {
    if value >= 10_i64.pow(place) {
        digit(value, place)
    } else {
        FILL
    }
}

/// Renders a (possibly sparse) record into the 47-character device line.
///
/// Total and pure: out-of-range numbers are clamped, never rejected, and
/// every field writes a disjoint position range, so field order is
/// irrelevant.
pub fn encode(record: &DisplayRecord) -> String {
    let mut code = *DEFAULT_CODE;

    if let Some(hours) = record.hours {
        let hours = clamp_round(hours, 0, 99);
        code[0] = digit(hours, 1);
        code[1] = digit(hours, 0);
    }
    if let Some(minutes) = record.minutes {
        let minutes = clamp_round(minutes, 0, 99);
        code[2] = digit(minutes, 1);
        code[3] = digit(minutes, 0);
    }
    if let Some(wind) = &record.wind {
        if let Some(heading) = wind.heading {
            // Degrees rounded to the nearest ten; the device drops the
            // trailing zero column itself.
            let heading = clamp_round(heading / 10.0, 0, 99) * 10;
            code[4] = digit_if_present(heading, 2);
            code[5] = digit(heading, 1);
        }
        if let Some(speed) = wind.speed {
            let speed = clamp_round(speed, 0, 99);
            code[6] = digit_if_present(speed, 1);
            code[7] = digit(speed, 0);
        }
        if let Some(speed) = wind.max_speed {
            let speed = clamp_round(speed, 0, 99);
            code[20] = digit_if_present(speed, 1);
            code[21] = digit(speed, 0);
        }
        if let Some(speed) = wind.max_perpendicular_speed {
            let speed = clamp_round(speed, 0, 99);
            code[44] = digit_if_present(speed, 1);
            code[45] = digit(speed, 0);
        }
    }
    if let Some(pressure) = &record.pressure {
        if let Some(h_pa) = pressure.h_pa {
            let h_pa = clamp_round(h_pa, 0, 9999);
            code[8] = digit_if_present(h_pa, 3);
            code[9] = digit_if_present(h_pa, 2);
            code[10] = digit_if_present(h_pa, 1);
            code[11] = digit(h_pa, 0);
        }
        if let Some(mm_hg) = pressure.mm_hg {
            let mm_hg = clamp_round(mm_hg, 0, 999);
            code[29] = digit_if_present(mm_hg, 2);
            code[30] = digit_if_present(mm_hg, 1);
            code[31] = digit(mm_hg, 0);
        }
    }
    if let Some(clouds) = &record.clouds {
        if let Some(n) = clouds.n {
            code[12] = digit(n.floor() as i64, 0);
        }
        if let Some(nh) = clouds.nh {
            code[19] = digit(nh.floor() as i64, 0);
        }
        if let Some(height) = clouds.height {
            let height = clamp_round(height / 10.0, 0, 999) * 10;
            code[26] = digit_if_present(height, 3);
            code[27] = digit_if_present(height, 2);
            code[28] = digit(height, 1);
        }
    }
    if let Some(visibility) = &record.visibility {
        // All four channels share the meters-rounded-to-tens layout.
        let channels = [
            (visibility.l1, 32usize),
            (visibility.l2, 35),
            (visibility.l3, 38),
            (visibility.s, 41),
        ];
        for (distance, base) in channels {
            if let Some(distance) = distance {
                let distance = clamp_round(distance / 10.0, 0, 999) * 10;
                code[base] = digit_if_present(distance, 3);
                code[base + 1] = digit_if_present(distance, 2);
                code[base + 2] = digit(distance, 1);
            }
        }
    }
    if let Some(humidity) = record.humidity {
        let humidity = clamp_round(humidity, 0, 999);
        code[13] = digit_if_present(humidity, 2);
        code[14] = digit_if_present(humidity, 1);
        code[15] = digit(humidity, 0);
    }
    if let Some(temperature) = record.temperature {
        let temperature = clamp_round(temperature, -99, 99);
        // Inverted sign marker: fill for zero/positive, `1` for negative.
        code[16] = if temperature >= 0 { FILL } else { b'1' };
        code[17] = digit_if_present(temperature.abs(), 1);
        code[18] = digit(temperature.abs(), 0);
    }
    if record.has_thunder == Some(true) {
        // An explicit `false` leaves the column untouched rather than
        // resetting it.
        code[22] = b'1';
    }
    if let Some(events) = record.events {
        code[23] = digit(clamp_round(events, 0, 9), 0);
    }
    if record.is_urgent == Some(true) {
        code[24] = b'0';
    }
    if let Some(unit_id) = record.unit_id {
        code[25] = digit(clamp_round(unit_id, 0, 9), 0);
    }
    if record.has_icing.is_some() {
        // Presence alone lights the icing indicator, even `hasIcing: false`.
        // Diverges from hasThunder/isUrgent; the device fleet depends on it
        // as shipped, so it is preserved rather than unified.
        code[46] = b'1';
    }

    String::from_utf8_lossy(&code).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meteo_logic::model::DisplayRecord;

    const EMPTY: &str = "------------------------1----------------------";

    fn encode_json(json: &str) -> String {
        let record: DisplayRecord = serde_json::from_str(json).unwrap();
        encode(&record)
    }

    /// Asserts that `code` differs from the empty baseline exactly at
    /// `expected` (position, character) pairs.
    fn assert_positions(code: &str, expected: &[(usize, char)]) {
        assert_eq!(code.len(), CODE_LEN);
        let baseline: Vec<char> = EMPTY.chars().collect();
        for (i, c) in code.chars().enumerate() {
            match expected.iter().find(|(p, _)| *p == i) {
                Some((_, want)) => assert_eq!(c, *want, "position {i}"),
                None => assert_eq!(c, baseline[i], "position {i} should be default"),
            }
        }
    }

    #[test]
    fn empty_record_is_all_defaults() {
        assert_eq!(encode(&DisplayRecord::default()), EMPTY);
    }

    #[test]
    fn clock_and_negative_temperature() {
        let code = encode_json(r#"{"hours": 7, "minutes": 5, "temperature": -3}"#);
        assert_positions(
            &code,
            &[(0, '0'), (1, '7'), (2, '0'), (3, '5'), (16, '1'), (17, '-'), (18, '3')],
        );
    }

    #[test]
    fn positive_temperature_keeps_fill_sign() {
        let code = encode_json(r#"{"temperature": 21}"#);
        assert_positions(&code, &[(17, '2'), (18, '1')]);
    }

    #[test]
    fn zero_temperature_writes_plain_units_digit() {
        let code = encode_json(r#"{"temperature": 0}"#);
        assert_positions(&code, &[(18, '0')]);
    }

    #[test]
    fn halves_round_toward_positive_infinity() {
        // f64::round would give -3 here; the device expects -2.
        let code = encode_json(r#"{"temperature": -2.5}"#);
        assert_positions(&code, &[(16, '1'), (18, '2')]);

        let code = encode_json(r#"{"humidity": 49.5}"#);
        assert_positions(&code, &[(14, '5'), (15, '0')]);
    }

    #[test]
    fn pressure_hpa_fills_all_four_columns() {
        let code = encode_json(r#"{"pressure": {"hPa": 1013}}"#);
        assert_positions(&code, &[(8, '1'), (9, '0'), (10, '1'), (11, '3')]);
    }

    #[test]
    fn pressure_leading_zeros_are_suppressed() {
        let code = encode_json(r#"{"pressure": {"hPa": 998, "mmHg": 49}}"#);
        assert_positions(
            &code,
            &[(9, '9'), (10, '9'), (11, '8'), (30, '4'), (31, '9')],
        );
    }

    #[test]
    fn single_digit_wind_speed_blanks_tens_column() {
        let code = encode_json(r#"{"wind": {"speed": 5}}"#);
        assert_positions(&code, &[(7, '5')]);
    }

    #[test]
    fn ten_is_the_suppression_boundary() {
        let code = encode_json(r#"{"wind": {"speed": 10}}"#);
        assert_positions(&code, &[(6, '1'), (7, '0')]);
    }

    #[test]
    fn wind_heading_rounds_to_tens() {
        let code = encode_json(r#"{"wind": {"heading": 87}}"#);
        assert_positions(&code, &[(5, '9')]);

        let code = encode_json(r#"{"wind": {"heading": 234}}"#);
        assert_positions(&code, &[(4, '2'), (5, '3')]);
    }

    #[test]
    fn wind_heading_clamps_at_full_circle_scale() {
        let code = encode_json(r#"{"wind": {"heading": 1250}}"#);
        assert_positions(&code, &[(4, '9'), (5, '9')]);
    }

    #[test]
    fn max_speeds_land_in_their_own_columns() {
        let code =
            encode_json(r#"{"wind": {"maxSpeed": 18, "maxPerpendicularSpeed": 4}}"#);
        assert_positions(&code, &[(20, '1'), (21, '8'), (45, '4')]);
    }

    #[test]
    fn clouds_render_coverage_digits_and_scaled_height() {
        let code = encode_json(r#"{"clouds": {"n": 3, "nh": 7, "height": 1200}}"#);
        assert_positions(&code, &[(12, '3'), (19, '7'), (26, '1'), (27, '2'), (28, '0')]);
    }

    #[test]
    fn visibility_channels_share_the_tens_scaling() {
        let code = encode_json(r#"{"visibility": {"l1": 4500, "s": 500}}"#);
        assert_positions(
            &code,
            &[(32, '4'), (33, '5'), (34, '0'), (42, '5'), (43, '0')],
        );
    }

    #[test]
    fn clamping_is_idempotent() {
        assert_eq!(
            encode_json(r#"{"wind": {"speed": 150}}"#),
            encode_json(r#"{"wind": {"speed": 99}}"#)
        );
        assert_eq!(
            encode_json(r#"{"temperature": -200}"#),
            encode_json(r#"{"temperature": -99}"#)
        );
        assert_eq!(
            encode_json(r#"{"humidity": 55}"#),
            encode_json(r#"{"humidity": 55.0}"#)
        );
    }

    #[test]
    fn thunder_checks_the_value() {
        assert_eq!(encode_json(r#"{"hasThunder": false}"#), EMPTY);
        let code = encode_json(r#"{"hasThunder": true}"#);
        assert_positions(&code, &[(22, '1')]);
    }

    #[test]
    fn urgent_true_drops_the_marker_to_zero() {
        let code = encode_json(r#"{"isUrgent": true}"#);
        assert_positions(&code, &[(24, '0')]);
        assert_eq!(encode_json(r#"{"isUrgent": false}"#), EMPTY);
    }

    #[test]
    fn icing_is_triggered_by_presence_alone() {
        let lit = &[(46, '1')][..];
        assert_positions(&encode_json(r#"{"hasIcing": true}"#), lit);
        assert_positions(&encode_json(r#"{"hasIcing": false}"#), lit);
    }

    #[test]
    fn events_and_unit_id_clamp_to_one_digit() {
        let code = encode_json(r#"{"events": 12, "unitId": 4}"#);
        assert_positions(&code, &[(23, '9'), (25, '4')]);
    }

    #[test]
    fn full_record_touches_every_field_region() {
        let code = encode_json(
            r#"{
                "hours": 23, "minutes": 59,
                "wind": {"heading": 360, "speed": 12, "maxSpeed": 25,
                         "maxPerpendicularSpeed": 7},
                "pressure": {"hPa": 1013, "mmHg": 760},
                "clouds": {"n": 8, "nh": 5, "height": 300},
                "visibility": {"s": 2000, "l1": 1500, "l2": 1800, "l3": 900},
                "humidity": 87, "temperature": -12,
                "hasThunder": true, "events": 2, "isUrgent": true,
                "unitId": 1, "hasIcing": true
            }"#,
        );
        assert_eq!(code, "2359361210138-871125251201-30760150180-90200-71");
    }
}
