//! # Display Code Smoke Test
//!
//! Feeds sample bus payloads through the data model and encoder and prints
//! the resulting 47-character device lines, with a column ruler for
//! eyeballing positions against the device documentation.

use anyhow::Result;
use servers::meteo_logic::encoder;
use servers::meteo_logic::model::DisplayRecord;

const SAMPLES: &[(&str, &str)] = &[
    ("empty record", "{}"),
    ("clock only", r#"{"hours": 7, "minutes": 5}"#),
    (
        "cold snap",
        r#"{"temperature": -12, "humidity": 91, "hasIcing": true}"#,
    ),
    (
        "gusty afternoon",
        r#"{"wind": {"heading": 234, "speed": 12, "maxSpeed": 25}, "hasThunder": true}"#,
    ),
    (
        "full station report",
        r#"{
            "wind": {"heading": 360, "speed": 12, "maxSpeed": 25,
                     "maxPerpendicularSpeed": 7},
            "pressure": {"hPa": 1013, "mmHg": 760},
            "clouds": {"n": 8, "nh": 5, "height": 300},
            "visibility": {"s": 2000, "l1": 1500, "l2": 1800, "l3": 900},
            "humidity": 87, "temperature": -12,
            "events": 2, "isUrgent": true, "unitId": 1
        }"#,
    ),
];

fn main() -> Result<()> {
    let ruler: String = (0..encoder::CODE_LEN)
        .map(|i| char::from_digit((i % 10) as u32, 10).unwrap_or('?'))
        .collect();

    println!("[*] Encoding {} sample payloads...\n", SAMPLES.len());
    println!("    {ruler}");
    println!("    {}", "-".repeat(encoder::CODE_LEN));

    for (label, payload) in SAMPLES {
        let record: DisplayRecord = serde_json::from_str(payload)?;
        let code = encoder::encode(&record);
        println!("    {code}  <- {label}");
    }

    println!("\n[*] Merge walkthrough (piecemeal updates):");
    let mut state = DisplayRecord::default();
    for payload in [
        r#"{"wind": {"heading": 120}}"#,
        r#"{"wind": {"speed": 8}}"#,
        r#"{"pressure": {"hPa": 1003}}"#,
    ] {
        let update: DisplayRecord = serde_json::from_str(payload)?;
        state.merge_from(update);
        println!("    {}  <- after {payload}", encoder::encode(&state));
    }

    Ok(())
}
