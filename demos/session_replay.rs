//! Replay a short recorded typing session and print the emitted records

fn main() {
    let events = r#"
{"at":"2024-01-15T14:00:00.000Z","type":"focus_in"}
{"at":"2024-01-15T14:00:00.200Z","type":"key_down"}
{"at":"2024-01-15T14:00:00.200Z","type":"character_typed"}
{"at":"2024-01-15T14:00:00.260Z","type":"key_up"}
{"at":"2024-01-15T14:00:00.380Z","type":"key_down"}
{"at":"2024-01-15T14:00:00.380Z","type":"character_typed"}
{"at":"2024-01-15T14:00:00.450Z","type":"key_up"}
{"at":"2024-01-15T14:00:00.600Z","type":"word_boundary"}
{"at":"2024-01-15T14:00:01.400Z","type":"key_down"}
{"at":"2024-01-15T14:00:01.400Z","type":"character_typed"}
{"at":"2024-01-15T14:00:01.470Z","type":"key_up"}
{"at":"2024-01-15T14:00:01.700Z","type":"backspace"}
{"at":"2024-01-15T14:00:01.700Z","type":"character_deleted"}
{"at":"2024-01-15T14:00:02.100Z","type":"pressure_sample","value":3}
{"at":"2024-01-15T14:00:03.000Z","type":"focus_out"}
"#;

    match keystroke_flux::replay_to_json(events.to_string(), "demo-user".to_string()) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
